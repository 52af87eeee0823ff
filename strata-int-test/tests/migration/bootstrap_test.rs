use chrono::Utc;
use strata::common::{verify_password, SUPERUSERS_COLLECTION, USERS_COLLECTION};
use strata::errors::ErrorKind;
use strata::migration::{Migration, MigrationRegistry, Version};
use strata::migrations::{admin_user, server_settings, tags_and_links};
use strata::record::Record;
use strata::schema::{CollectionBuilder, Field};
use strata::store::StoreOperations;
use strata_int_test::test_util::{cleanup, create_test_context, run_test};

#[test]
fn test_bootstrap_migrations() {
    run_test(
        create_test_context,
        |ctx| {
            let runner = ctx.bootstrap_runner()?;
            let applied = runner.migrate_up(None)?;
            assert_eq!(
                applied,
                vec![server_settings::VERSION, admin_user::VERSION, tags_and_links::VERSION]
            );

            let store = ctx.store();
            let settings = store.settings()?;
            assert_eq!(settings.meta.app_name, "LinknLink");
            assert_eq!(settings.logs.max_days, 2);

            let admin = store.find_auth_record_by_identifier(
                SUPERUSERS_COLLECTION,
                ctx.config().admin_email(),
            )?;
            let hash = admin.password_hash().unwrap_or_default();
            assert!(verify_password(ctx.config().admin_password(), &hash)?);

            assert!(store.has_collection("tags")?);
            assert!(store.has_collection("links")?);

            let status = runner.status()?;
            assert!(status.is_up_to_date());
            assert!(status.applied.iter().all(|a| a.applied_at <= Utc::now()));
            assert_eq!(status.applied[1].name, admin_user::NAME);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_bootstrap_full_rollback() {
    run_test(
        create_test_context,
        |ctx| {
            let runner = ctx.bootstrap_runner()?;
            runner.migrate_up(None)?;

            let reverted = runner.migrate_down(3)?;
            assert_eq!(
                reverted,
                vec![tags_and_links::VERSION, admin_user::VERSION, server_settings::VERSION]
            );

            let store = ctx.store();
            assert_eq!(store.collection_names()?, vec!["_superusers", "users"]);
            assert!(store.find_records(SUPERUSERS_COLLECTION)?.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_admin_seed_skips_existing_superuser() {
    run_test(
        create_test_context,
        |ctx| {
            let store = ctx.store();

            // an operator created the superuser before the first migration run
            let superusers = store.find_collection_by_name_or_id(SUPERUSERS_COLLECTION)?;
            let mut admin = Record::new(&superusers);
            admin.set("email", ctx.config().admin_email());
            admin.set("password", "chosen-by-operator");
            store.save_record(&mut admin)?;

            ctx.bootstrap_runner()?.migrate_up(Some(admin_user::VERSION))?;

            let admins = store.find_records(SUPERUSERS_COLLECTION)?;
            assert_eq!(admins.len(), 1);
            let hash = admins[0].password_hash().unwrap_or_default();
            assert!(verify_password("chosen-by-operator", &hash)?);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_duplicate_superuser_is_rejected_by_store() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.bootstrap_runner()?.migrate_up(Some(admin_user::VERSION))?;

            let store = ctx.store();
            let superusers = store.find_collection_by_name_or_id(SUPERUSERS_COLLECTION)?;
            let mut duplicate = Record::new(&superusers);
            duplicate.set("email", ctx.config().admin_email().to_uppercase());
            duplicate.set("password", "another-password");
            let err = store.save_record(&mut duplicate).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::UniqueConstraintViolation);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_links_before_tags_fails_on_missing_collection() {
    run_test(
        create_test_context,
        |ctx| {
            let mut registry = MigrationRegistry::new();
            registry.register(Migration::irreversible(Version::new(200), "links_first", |tx| {
                CollectionBuilder::base("links")
                    .field(Field::url("url").required())
                    .field(Field::relation("tags", "pbc_1234567890").required())
                    .open_all()
                    .ensure(tx)?;
                Ok(())
            }))?;

            let err = ctx.runner(registry).migrate_up(None).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::MigrationFailed(Version::new(200)));
            assert_eq!(err.root_cause().kind(), &ErrorKind::ValidationError);
            assert!(err.to_string().contains("pbc_1234567890"));
            assert!(!ctx.store().has_collection("links")?);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_tags_applied_even_when_links_pending() {
    run_test(
        create_test_context,
        |ctx| {
            let mut registry = MigrationRegistry::new();
            registry.register(Migration::irreversible(Version::new(100), "tags", |tx| {
                CollectionBuilder::base("tags")
                    .field(Field::text("name").required())
                    .open_all()
                    .ensure(tx)?;
                Ok(())
            }))?;
            registry.register(Migration::irreversible(Version::new(200), "links", |tx| {
                let tags = tx.find_collection_by_name_or_id("tags")?;
                CollectionBuilder::base("links")
                    .field(Field::relation("tags", tags.id()).required())
                    .open_all()
                    .ensure(tx)?;
                Ok(())
            }))?;

            let runner = ctx.runner(registry);
            assert_eq!(runner.migrate_up(Some(Version::new(100)))?, vec![Version::new(100)]);
            assert_eq!(runner.status()?.pending, vec![Version::new(200)]);
            assert_eq!(runner.migrate_up(None)?, vec![Version::new(200)]);

            let tags = ctx.store().find_collection_by_name_or_id("tags")?;
            let links = ctx.store().find_collection_by_name_or_id("links")?;
            assert_eq!(
                links.field("tags").and_then(|f| f.relation_target()),
                Some(tags.id())
            );
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_user_owned_records_after_bootstrap() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.bootstrap_runner()?.migrate_up(None)?;
            let store = ctx.store();

            let users = store.find_collection_by_name_or_id(USERS_COLLECTION)?;
            let mut user = Record::new(&users);
            user.set("email", "reader@example.com");
            user.set("password", "long-enough-password");
            store.save_record(&mut user)?;

            let links = store.find_collection_by_name_or_id("links")?;
            let mut link = Record::new(&links);
            link.set("url", "not a url");
            link.set("user", user.id());
            let err = store.save_record(&mut link).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ValidationError);

            link.set("url", "https://example.com/article");
            link.set("title", "An article");
            store.save_record(&mut link)?;
            assert_eq!(store.find_records("links")?.len(), 1);
            Ok(())
        },
        cleanup,
    )
}
