use uuid::Uuid;

use super::StoreOperations;
use crate::errors::{ErrorKind, StrataError, StrataResult};
use crate::migration::{AppliedMigration, Version};
use crate::record::Record;
use crate::schema::Collection;
use crate::settings::Settings;

/// Backend half of a transaction.
///
/// Besides the regular store operations, a transaction provider exposes
/// the applied-version log. Those methods are only reachable through the
/// crate's own [`Transaction`] wrapper, so migration bodies (which only
/// see a `&Transaction`) cannot edit the log.
pub trait TransactionProvider: StoreOperations + Send {
    /// Applied migrations visible in this transaction, in application order.
    fn applied_migrations(&self) -> StrataResult<Vec<AppliedMigration>>;

    /// Appends an entry to the applied-version log.
    fn record_applied(&self, entry: AppliedMigration) -> StrataResult<()>;

    /// Removes a version from the applied-version log; `false` if absent.
    fn remove_applied(&self, version: Version) -> StrataResult<bool>;

    /// Makes every change of this transaction durable and visible.
    fn commit(self: Box<Self>) -> StrataResult<()>;

    /// Discards every change of this transaction.
    fn rollback(self: Box<Self>) -> StrataResult<()>;
}

/// An open transaction against a [`crate::store::Store`].
///
/// Dropping a transaction without committing rolls it back.
pub struct Transaction {
    id: String,
    inner: Option<Box<dyn TransactionProvider>>,
}

impl Transaction {
    pub(crate) fn new(inner: Box<dyn TransactionProvider>) -> Self {
        Transaction {
            id: Uuid::new_v4().to_string(),
            inner: Some(inner),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn commit(mut self) -> StrataResult<()> {
        match self.inner.take() {
            Some(inner) => {
                log::debug!("Committing transaction {}", self.id);
                inner.commit()
            }
            None => Err(closed()),
        }
    }

    pub fn rollback(mut self) -> StrataResult<()> {
        match self.inner.take() {
            Some(inner) => {
                log::debug!("Rolling back transaction {}", self.id);
                inner.rollback()
            }
            None => Err(closed()),
        }
    }

    pub(crate) fn applied_migrations(&self) -> StrataResult<Vec<AppliedMigration>> {
        self.provider()?.applied_migrations()
    }

    pub(crate) fn record_applied(&self, entry: AppliedMigration) -> StrataResult<()> {
        self.provider()?.record_applied(entry)
    }

    pub(crate) fn remove_applied(&self, version: Version) -> StrataResult<bool> {
        self.provider()?.remove_applied(version)
    }

    fn provider(&self) -> StrataResult<&dyn TransactionProvider> {
        self.inner.as_deref().ok_or_else(closed)
    }
}

fn closed() -> StrataError {
    StrataError::new("Transaction is already closed", ErrorKind::InvalidOperation)
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            log::debug!("Transaction {} dropped without commit, rolling back", self.id);
            if let Err(e) = inner.rollback() {
                log::error!("Failed to roll back transaction {}: {}", self.id, e);
            }
        }
    }
}

impl StoreOperations for Transaction {
    fn find_collection_by_name_or_id(&self, name_or_id: &str) -> StrataResult<Collection> {
        self.provider()?.find_collection_by_name_or_id(name_or_id)
    }

    fn collection_names(&self) -> StrataResult<Vec<String>> {
        self.provider()?.collection_names()
    }

    fn save_collection(&self, collection: &mut Collection) -> StrataResult<()> {
        self.provider()?.save_collection(collection)
    }

    fn delete_collection(&self, collection: &Collection) -> StrataResult<()> {
        self.provider()?.delete_collection(collection)
    }

    fn save_record(&self, record: &mut Record) -> StrataResult<()> {
        self.provider()?.save_record(record)
    }

    fn delete_record(&self, record: &Record) -> StrataResult<()> {
        self.provider()?.delete_record(record)
    }

    fn find_record_by_id(&self, collection: &str, id: &str) -> StrataResult<Record> {
        self.provider()?.find_record_by_id(collection, id)
    }

    fn find_records(&self, collection: &str) -> StrataResult<Vec<Record>> {
        self.provider()?.find_records(collection)
    }

    fn find_auth_record_by_identifier(
        &self,
        collection: &str,
        identifier: &str,
    ) -> StrataResult<Record> {
        self.provider()?
            .find_auth_record_by_identifier(collection, identifier)
    }

    fn settings(&self) -> StrataResult<Settings> {
        self.provider()?.settings()
    }

    fn save_settings(&self, settings: &Settings) -> StrataResult<()> {
        self.provider()?.save_settings(settings)
    }
}
