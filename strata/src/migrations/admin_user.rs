use crate::common::{AUTH_EMAIL, AUTH_PASSWORD, SUPERUSERS_COLLECTION};
use crate::config::SeedConfig;
use crate::migration::{Migration, Version};
use crate::store::StoreOperations;

pub const VERSION: Version = Version::new(1768297641);
pub const NAME: &str = "admin_user";

/// Seeds the initial superuser from the configured credentials.
///
/// Forward fails when `_superusers` is missing and does nothing when a
/// superuser with the configured email already exists. Backward deletes
/// that superuser if present.
pub fn migration(config: &SeedConfig) -> Migration {
    let email = config.admin_email().to_string();
    let password = config.admin_password().to_string();
    let rollback_email = email.clone();

    Migration::new(
        VERSION,
        NAME,
        move |tx| {
            let superusers = tx.find_collection_by_name_or_id(SUPERUSERS_COLLECTION)?;

            match tx.find_auth_record_by_identifier(superusers.id(), &email) {
                Ok(existing) => {
                    log::info!("Superuser {} already exists ({})", email, existing.id());
                    return Ok(());
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }

            let mut record = tx.new_record(&superusers);
            record.set(AUTH_EMAIL, email.as_str());
            record.set(AUTH_PASSWORD, password.as_str());
            tx.save_record(&mut record)?;

            log::info!("Created superuser {}", email);
            Ok(())
        },
        move |tx| {
            let record = tx.find_auth_record_by_identifier(SUPERUSERS_COLLECTION, &rollback_email)?;
            tx.delete_record(&record)?;
            log::info!("Deleted superuser {}", rollback_email);
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::verify_password;
    use crate::errors::{ErrorKind, StrataResult};
    use crate::migration::{MigrationRegistry, MigrationRunner};
    use crate::store::memory::InMemoryStore;
    use crate::store::Store;

    fn runner(store: Store, config: &SeedConfig) -> StrataResult<MigrationRunner> {
        let mut registry = MigrationRegistry::new();
        registry.register(migration(config))?;
        Ok(MigrationRunner::new(store, registry))
    }

    #[test]
    fn test_seed_creates_hashed_superuser() -> StrataResult<()> {
        let store = InMemoryStore::new()?.into_store();
        let config = SeedConfig::default().with_admin_email("Root@Example.com");
        runner(store.clone(), &config)?.migrate_up(None)?;

        let admin =
            store.find_auth_record_by_identifier(SUPERUSERS_COLLECTION, "root@example.com")?;
        let hash = admin.password_hash().unwrap_or_default();
        assert_ne!(hash, "admin123456789");
        assert!(verify_password("admin123456789", &hash)?);
        Ok(())
    }

    #[test]
    fn test_seed_is_idempotent() -> StrataResult<()> {
        let store = InMemoryStore::new()?.into_store();
        let config = SeedConfig::default();
        runner(store.clone(), &config)?.migrate_up(None)?;

        // a fresh log, same store: the seed runs again
        let tx = store.begin_transaction()?;
        tx.remove_applied(VERSION)?;
        tx.commit()?;
        runner(store.clone(), &config)?.migrate_up(None)?;

        assert_eq!(store.find_records(SUPERUSERS_COLLECTION)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_rollback_tolerates_missing_superuser() -> StrataResult<()> {
        let store = InMemoryStore::new()?.into_store();
        let runner = runner(store.clone(), &SeedConfig::default())?;
        runner.migrate_up(None)?;

        let admin =
            store.find_auth_record_by_identifier(SUPERUSERS_COLLECTION, "admin@example.com")?;
        store.delete_record(&admin)?;

        assert_eq!(runner.migrate_down(1)?, vec![VERSION]);
        assert!(runner.status()?.applied.is_empty());
        Ok(())
    }

    #[test]
    fn test_short_password_fails_the_migration() -> StrataResult<()> {
        let store = InMemoryStore::new()?.into_store();
        let config = SeedConfig::default().with_admin_password("short");
        let err = runner(store.clone(), &config)?.migrate_up(None).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::MigrationFailed(VERSION));
        assert_eq!(err.root_cause().kind(), &ErrorKind::ValidationError);
        assert!(store.find_records(SUPERUSERS_COLLECTION)?.is_empty());
        Ok(())
    }
}
