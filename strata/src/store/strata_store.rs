use std::ops::Deref;
use std::sync::Arc;

use super::{StoreOperations, Transaction, TransactionProvider};
use crate::errors::StrataResult;
use crate::migration::AppliedMigration;
use crate::record::Record;
use crate::schema::Collection;
use crate::settings::Settings;

/// Contract every storage backend implements.
///
/// # Key Responsibilities
/// - **Transactions**: hand out isolated transactions that commit atomically
/// - **Bookkeeping**: persist the applied-version log next to the data it describes
/// - **Coordination**: provide the advisory lock that keeps migration runs exclusive
///
/// # Implementations
/// - `InMemoryStore`: in-process storage for tests and embedded use
///
/// # Thread Safety
/// Implementers must be `Send + Sync`; one store is shared by the
/// application and the migration runner.
pub trait StoreProvider: Send + Sync {
    /// Opens a new transaction over the current committed state.
    fn begin(&self) -> StrataResult<Box<dyn TransactionProvider>>;

    /// Committed applied-version log, in application order.
    fn applied_migrations(&self) -> StrataResult<Vec<AppliedMigration>>;

    /// Takes the migration lock for `holder`.
    ///
    /// Returns `Ok(false)` when a different holder owns it.
    fn try_acquire_migration_lock(&self, holder: &str) -> StrataResult<bool>;

    /// Releases the migration lock if `holder` owns it.
    fn release_migration_lock(&self, holder: &str) -> StrataResult<()>;

    /// Current owner of the migration lock, if any.
    fn migration_lock_holder(&self) -> StrataResult<Option<String>>;
}

/// Cheap, cloneable handle over a [`StoreProvider`].
///
/// # Notes
/// - The provider is wrapped in an `Arc`; cloning only bumps the count
/// - `StoreOperations` on a `Store` runs each call in its own transaction
#[derive(Clone)]
pub struct Store {
    inner: Arc<dyn StoreProvider>,
}

impl Store {
    pub fn new<T: StoreProvider + 'static>(inner: T) -> Self {
        Store {
            inner: Arc::new(inner),
        }
    }

    pub fn begin_transaction(&self) -> StrataResult<Transaction> {
        Ok(Transaction::new(self.inner.begin()?))
    }

    /// Runs `f` in a fresh transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err`.
    pub fn run_in_transaction<T, F>(&self, f: F) -> StrataResult<T>
    where
        F: FnOnce(&Transaction) -> StrataResult<T>,
    {
        let transaction = self.begin_transaction()?;
        match f(&transaction) {
            Ok(value) => {
                transaction.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_error) = transaction.rollback() {
                    log::error!("Rollback after failure also failed: {}", rollback_error);
                }
                Err(e)
            }
        }
    }
}

impl Deref for Store {
    type Target = Arc<dyn StoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl StoreOperations for Store {
    fn find_collection_by_name_or_id(&self, name_or_id: &str) -> StrataResult<Collection> {
        self.run_in_transaction(|tx| tx.find_collection_by_name_or_id(name_or_id))
    }

    fn collection_names(&self) -> StrataResult<Vec<String>> {
        self.run_in_transaction(|tx| tx.collection_names())
    }

    fn save_collection(&self, collection: &mut Collection) -> StrataResult<()> {
        self.run_in_transaction(|tx| tx.save_collection(collection))
    }

    fn delete_collection(&self, collection: &Collection) -> StrataResult<()> {
        self.run_in_transaction(|tx| tx.delete_collection(collection))
    }

    fn save_record(&self, record: &mut Record) -> StrataResult<()> {
        self.run_in_transaction(|tx| tx.save_record(record))
    }

    fn delete_record(&self, record: &Record) -> StrataResult<()> {
        self.run_in_transaction(|tx| tx.delete_record(record))
    }

    fn find_record_by_id(&self, collection: &str, id: &str) -> StrataResult<Record> {
        self.run_in_transaction(|tx| tx.find_record_by_id(collection, id))
    }

    fn find_records(&self, collection: &str) -> StrataResult<Vec<Record>> {
        self.run_in_transaction(|tx| tx.find_records(collection))
    }

    fn find_auth_record_by_identifier(
        &self,
        collection: &str,
        identifier: &str,
    ) -> StrataResult<Record> {
        self.run_in_transaction(|tx| tx.find_auth_record_by_identifier(collection, identifier))
    }

    fn settings(&self) -> StrataResult<Settings> {
        self.run_in_transaction(|tx| tx.settings())
    }

    fn save_settings(&self, settings: &Settings) -> StrataResult<()> {
        self.run_in_transaction(|tx| tx.save_settings(settings))
    }
}
