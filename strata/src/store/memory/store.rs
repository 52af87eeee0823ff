use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use super::state::StoreState;
use super::InMemoryTransaction;
use crate::errors::{ErrorKind, StrataError, StrataResult};
use crate::migration::AppliedMigration;
use crate::store::{Store, StoreProvider, TransactionProvider};

/// In-process implementation of a strata store.
///
/// # Purpose
/// `InMemoryStore` keeps the whole store (schema, records, settings and
/// the applied-version log) in persistent `im` maps. It backs the test
/// suites and embedded use where nothing has to survive the process.
///
/// # Characteristics
/// - **Snapshot transactions**: a transaction works on an O(1) clone of
///   the committed state and swaps it back in on commit
/// - **Optimistic commits**: a commit fails with `TransactionConflict`
///   when another transaction committed writes in between
/// - **Exclusive migrations**: holds the advisory migration lock
///
/// # Usage
/// ```text
/// let store = InMemoryStore::new()?.into_store();
/// let runner = MigrationRunner::new(store.clone(), registry);
/// runner.migrate_up(None)?;
/// ```
#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<InMemoryStoreInner>,
}

impl InMemoryStore {
    /// Creates a store holding only the `_superusers` and `users` collections.
    pub fn new() -> StrataResult<InMemoryStore> {
        Ok(InMemoryStore {
            inner: Arc::new(InMemoryStoreInner::new(StoreState::bootstrap()?)),
        })
    }

    /// Wraps this provider in a [`Store`] handle.
    pub fn into_store(self) -> Store {
        Store::new(self)
    }
}

impl StoreProvider for InMemoryStore {
    fn begin(&self) -> StrataResult<Box<dyn TransactionProvider>> {
        Ok(Box::new(InMemoryTransaction::new(self.inner.clone())))
    }

    fn applied_migrations(&self) -> StrataResult<Vec<AppliedMigration>> {
        Ok(self.inner.state.read().applied())
    }

    fn try_acquire_migration_lock(&self, holder: &str) -> StrataResult<bool> {
        self.inner.try_acquire_lock(holder)
    }

    fn release_migration_lock(&self, holder: &str) -> StrataResult<()> {
        self.inner.release_lock(holder)
    }

    fn migration_lock_holder(&self) -> StrataResult<Option<String>> {
        Ok(self.inner.lock_holder.lock().clone())
    }
}

pub(crate) struct InMemoryStoreInner {
    state: RwLock<StoreState>,
    lock_holder: Mutex<Option<String>>,
}

impl InMemoryStoreInner {
    fn new(state: StoreState) -> InMemoryStoreInner {
        InMemoryStoreInner {
            state: RwLock::new(state),
            lock_holder: Mutex::new(None),
        }
    }

    pub(crate) fn snapshot(&self) -> StoreState {
        self.state.read().clone()
    }

    /// Publishes `working` if nothing was committed since `base_revision`.
    pub(crate) fn publish(&self, working: StoreState, base_revision: u64) -> StrataResult<()> {
        let mut state = self.state.write();
        if state.revision() != base_revision {
            log::error!(
                "Transaction based on revision {} conflicts with committed revision {}",
                base_revision,
                state.revision()
            );
            return Err(StrataError::new(
                "Another transaction committed changes first",
                ErrorKind::TransactionConflict,
            ));
        }
        *state = working.with_revision(base_revision + 1);
        Ok(())
    }

    fn try_acquire_lock(&self, holder: &str) -> StrataResult<bool> {
        let mut current = self.lock_holder.lock();
        match current.as_deref() {
            None => {
                *current = Some(holder.to_string());
                Ok(true)
            }
            Some(owner) if owner == holder => Ok(true),
            Some(_) => Ok(false),
        }
    }

    fn release_lock(&self, holder: &str) -> StrataResult<()> {
        let mut current = self.lock_holder.lock();
        match current.as_deref() {
            Some(owner) if owner == holder => {
                *current = None;
                Ok(())
            }
            Some(owner) => {
                log::warn!("Lock release by {} ignored, lock is held by {}", holder, owner);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::Version;
    use crate::schema::Collection;
    use crate::store::StoreOperations;

    #[test]
    fn test_new_store_has_system_collections() -> StrataResult<()> {
        let store = InMemoryStore::new()?.into_store();
        assert_eq!(store.collection_names()?, vec!["_superusers", "users"]);
        assert!(store.applied_migrations()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_committed_changes_are_visible() -> StrataResult<()> {
        let store = InMemoryStore::new()?.into_store();
        let tx = store.begin_transaction()?;
        let mut tags = Collection::new_base("tags");
        tx.save_collection(&mut tags)?;
        tx.record_applied(AppliedMigration::new(Version::new(1), "tags"))?;

        assert!(!store.has_collection("tags")?);
        assert!(store.applied_migrations()?.is_empty());

        tx.commit()?;
        assert!(store.has_collection("tags")?);
        assert_eq!(store.applied_migrations()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_dropped_transaction_rolls_back() -> StrataResult<()> {
        let store = InMemoryStore::new()?.into_store();
        {
            let tx = store.begin_transaction()?;
            tx.save_collection(&mut Collection::new_base("tags"))?;
        }
        assert!(!store.has_collection("tags")?);
        Ok(())
    }

    #[test]
    fn test_concurrent_writers_conflict() -> StrataResult<()> {
        let store = InMemoryStore::new()?.into_store();
        let first = store.begin_transaction()?;
        let second = store.begin_transaction()?;

        first.save_collection(&mut Collection::new_base("tags"))?;
        second.save_collection(&mut Collection::new_base("links"))?;

        first.commit()?;
        let err = second.commit().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::TransactionConflict);
        assert_eq!(store.collection_names()?, vec!["_superusers", "tags", "users"]);
        Ok(())
    }

    #[test]
    fn test_read_only_transaction_does_not_conflict() -> StrataResult<()> {
        let store = InMemoryStore::new()?.into_store();
        let reader = store.begin_transaction()?;
        let writer = store.begin_transaction()?;

        reader.collection_names()?;
        writer.save_collection(&mut Collection::new_base("tags"))?;
        writer.commit()?;
        reader.commit()?;
        Ok(())
    }

    #[test]
    fn test_migration_lock() -> StrataResult<()> {
        let store = InMemoryStore::new()?;
        assert!(store.try_acquire_migration_lock("a")?);
        assert!(store.try_acquire_migration_lock("a")?);
        assert!(!store.try_acquire_migration_lock("b")?);
        assert_eq!(store.migration_lock_holder()?.as_deref(), Some("a"));

        store.release_migration_lock("b")?;
        assert_eq!(store.migration_lock_holder()?.as_deref(), Some("a"));

        store.release_migration_lock("a")?;
        assert!(store.try_acquire_migration_lock("b")?);
        Ok(())
    }
}
