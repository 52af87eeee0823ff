use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;

use strata::errors::{ErrorKind, StrataError};
use strata::migration::{Migration, MigrationLock, MigrationRegistry, Version};
use strata::schema::{drop_collection_if_exists, CollectionBuilder, Field};
use strata::store::StoreOperations;
use strata_int_test::test_util::{cleanup, create_test_context, run_test};

fn collection_migration(
    version: u64,
    name: &'static str,
    journal: &Arc<Mutex<Vec<String>>>,
) -> Migration {
    let up_journal = journal.clone();
    let down_journal = journal.clone();
    Migration::new(
        Version::new(version),
        name,
        move |tx| {
            up_journal.lock().push(format!("up {}", name));
            CollectionBuilder::base(name)
                .field(Field::text("title"))
                .open_all()
                .ensure(tx)?;
            Ok(())
        },
        move |tx| {
            down_journal.lock().push(format!("down {}", name));
            drop_collection_if_exists(tx, name)
        },
    )
}

fn three_collections(journal: &Arc<Mutex<Vec<String>>>) -> MigrationRegistry {
    let mut registry = MigrationRegistry::new();
    registry.register(collection_migration(300, "gamma", journal)).unwrap();
    registry.register(collection_migration(100, "alpha", journal)).unwrap();
    registry.register(collection_migration(200, "beta", journal)).unwrap();
    registry
}

#[test]
fn test_full_migrate_up_then_noop() {
    run_test(
        create_test_context,
        |ctx| {
            let journal = Arc::new(Mutex::new(Vec::new()));
            let runner = ctx.runner(three_collections(&journal));

            let applied = runner.migrate_up(None)?;
            assert_eq!(applied, vec![Version::new(100), Version::new(200), Version::new(300)]);
            assert!(runner.status()?.pending.is_empty());

            assert!(runner.migrate_up(None)?.is_empty());
            assert_eq!(journal.lock().len(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_rollback_is_reverse_of_application() {
    run_test(
        create_test_context,
        |ctx| {
            let journal = Arc::new(Mutex::new(Vec::new()));
            let runner = ctx.runner(three_collections(&journal));
            runner.migrate_up(None)?;
            journal.lock().clear();

            runner.migrate_down(2)?;
            assert_eq!(*journal.lock(), vec!["down gamma", "down beta"]);

            let store = ctx.store();
            assert!(store.has_collection("alpha")?);
            assert!(!store.has_collection("beta")?);
            assert!(!store.has_collection("gamma")?);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_round_trip_restores_log() {
    run_test(
        create_test_context,
        |ctx| {
            let journal = Arc::new(Mutex::new(Vec::new()));
            let runner = ctx.runner(three_collections(&journal));
            runner.migrate_up(None)?;
            let before = runner
                .status()?
                .applied
                .iter()
                .map(|a| a.version)
                .collect::<Vec<_>>();

            runner.migrate_down(before.len())?;
            assert!(runner.status()?.applied.is_empty());
            assert_eq!(ctx.store().collection_names()?, vec!["_superusers", "users"]);

            runner.migrate_up(None)?;
            let after = runner
                .status()?
                .applied
                .iter()
                .map(|a| a.version)
                .collect::<Vec<_>>();
            assert_eq!(before, after);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_failed_forward_is_not_rolled_back() {
    run_test(
        create_test_context,
        |ctx| {
            let journal = Arc::new(Mutex::new(Vec::new()));
            let mut registry = MigrationRegistry::new();
            registry.register(collection_migration(100, "alpha", &journal))?;
            registry.register(Migration::new(
                Version::new(200),
                "broken",
                |tx| {
                    CollectionBuilder::base("half_done").open_all().ensure(tx)?;
                    Err(StrataError::new("disk on fire", ErrorKind::InternalError))
                },
                |_| Err(StrataError::new("must never run", ErrorKind::InternalError)),
            ))?;

            let runner = ctx.runner(registry);
            let err = runner.migrate_up(None).unwrap_err();
            assert_eq!(err.version(), Some(Version::new(200)));
            assert!(!ctx.store().has_collection("half_done")?);

            // only the committed unit rolls back, the failed one never ran backward
            assert_eq!(runner.migrate_down(10)?, vec![Version::new(100)]);
            assert_eq!(*journal.lock(), vec!["up alpha", "down alpha"]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_second_runner_is_rejected_while_running() {
    run_test(
        create_test_context,
        |ctx| {
            let journal = Arc::new(Mutex::new(Vec::new()));
            let runner = ctx.runner(three_collections(&journal));

            let held = MigrationLock::acquire(&ctx.store())?;
            let contender = runner.clone();
            let result = thread::spawn(move || contender.migrate_up(None))
                .join()
                .expect("runner thread panicked");
            let err = result.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::MigrationInProgress);
            assert!(journal.lock().is_empty());

            drop(held);
            assert_eq!(runner.migrate_up(None)?.len(), 3);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_duplicate_version_registration() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let mut registry = MigrationRegistry::new();
    registry.register(collection_migration(100, "alpha", &journal)).unwrap();
    let err = registry
        .register(collection_migration(100, "other", &journal))
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DuplicateVersion(Version::new(100)));
    assert_eq!(registry.len(), 1);
}
