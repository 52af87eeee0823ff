use uuid::Uuid;

use crate::errors::{ErrorKind, StrataError, StrataResult};
use crate::store::Store;

/// Exclusive claim on a store's migration lock.
///
/// Released when dropped.
pub struct MigrationLock {
    store: Store,
    holder: String,
}

impl MigrationLock {
    /// Claims the lock under a fresh holder id.
    ///
    /// # Errors
    ///
    /// `MigrationInProgress` when another holder owns the lock.
    pub fn acquire(store: &Store) -> StrataResult<MigrationLock> {
        let holder = Uuid::new_v4().to_string();
        if !store.try_acquire_migration_lock(&holder)? {
            let owner = store.migration_lock_holder()?.unwrap_or_default();
            log::warn!("Migration lock is held by {}", owner);
            return Err(StrataError::new(
                &format!("Another migration run ({}) is in progress", owner),
                ErrorKind::MigrationInProgress,
            ));
        }

        log::debug!("Migration lock acquired by {}", holder);
        Ok(MigrationLock {
            store: store.clone(),
            holder,
        })
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        match self.store.release_migration_lock(&self.holder) {
            Ok(()) => log::debug!("Migration lock released by {}", self.holder),
            Err(e) => log::error!("Failed to release migration lock {}: {}", self.holder, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    #[test]
    fn test_lock_is_exclusive_until_dropped() -> StrataResult<()> {
        let store = InMemoryStore::new()?.into_store();
        let lock = MigrationLock::acquire(&store)?;
        assert_eq!(store.migration_lock_holder()?.as_deref(), Some(lock.holder()));

        let err = MigrationLock::acquire(&store).err().map(|e| e.kind().clone());
        assert_eq!(err, Some(ErrorKind::MigrationInProgress));

        drop(lock);
        assert_eq!(store.migration_lock_holder()?, None);
        assert!(MigrationLock::acquire(&store).is_ok());
        Ok(())
    }
}
