use parking_lot::Mutex;
use std::sync::Arc;

use super::state::StoreState;
use super::store::InMemoryStoreInner;
use crate::errors::StrataResult;
use crate::migration::{AppliedMigration, Version};
use crate::record::Record;
use crate::schema::Collection;
use crate::settings::Settings;
use crate::store::{StoreOperations, TransactionProvider};

/// A transaction over an [`super::InMemoryStore`].
///
/// Reads and writes go to a private working copy of the state taken at
/// begin. Each write runs against a clone of the working copy and only
/// replaces it on success, so a failed operation leaves the transaction
/// as it was before the call.
pub struct InMemoryTransaction {
    store: Arc<InMemoryStoreInner>,
    base_revision: u64,
    working: Mutex<StoreState>,
    dirty: Mutex<bool>,
}

impl InMemoryTransaction {
    pub(crate) fn new(store: Arc<InMemoryStoreInner>) -> InMemoryTransaction {
        let snapshot = store.snapshot();
        InMemoryTransaction {
            store,
            base_revision: snapshot.revision(),
            working: Mutex::new(snapshot),
            dirty: Mutex::new(false),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&StoreState) -> StrataResult<T>) -> StrataResult<T> {
        let working = self.working.lock();
        f(&working)
    }

    fn write<T>(&self, f: impl FnOnce(&mut StoreState) -> StrataResult<T>) -> StrataResult<T> {
        let mut working = self.working.lock();
        let mut candidate = working.clone();
        let value = f(&mut candidate)?;
        *working = candidate;
        *self.dirty.lock() = true;
        Ok(value)
    }
}

impl StoreOperations for InMemoryTransaction {
    fn find_collection_by_name_or_id(&self, name_or_id: &str) -> StrataResult<Collection> {
        self.read(|state| state.find_collection(name_or_id).cloned())
    }

    fn collection_names(&self) -> StrataResult<Vec<String>> {
        self.read(|state| Ok(state.collection_names()))
    }

    fn save_collection(&self, collection: &mut Collection) -> StrataResult<()> {
        self.write(|state| state.save_collection(collection))
    }

    fn delete_collection(&self, collection: &Collection) -> StrataResult<()> {
        self.write(|state| state.delete_collection(collection))
    }

    fn save_record(&self, record: &mut Record) -> StrataResult<()> {
        self.write(|state| state.save_record(record))
    }

    fn delete_record(&self, record: &Record) -> StrataResult<()> {
        self.write(|state| state.delete_record(record))
    }

    fn find_record_by_id(&self, collection: &str, id: &str) -> StrataResult<Record> {
        self.read(|state| state.find_record(collection, id))
    }

    fn find_records(&self, collection: &str) -> StrataResult<Vec<Record>> {
        self.read(|state| state.find_records(collection))
    }

    fn find_auth_record_by_identifier(
        &self,
        collection: &str,
        identifier: &str,
    ) -> StrataResult<Record> {
        self.read(|state| state.find_auth_record(collection, identifier))
    }

    fn settings(&self) -> StrataResult<Settings> {
        self.read(|state| Ok(state.settings()))
    }

    fn save_settings(&self, settings: &Settings) -> StrataResult<()> {
        self.write(|state| {
            state.save_settings(settings);
            Ok(())
        })
    }
}

impl TransactionProvider for InMemoryTransaction {
    fn applied_migrations(&self) -> StrataResult<Vec<AppliedMigration>> {
        self.read(|state| Ok(state.applied()))
    }

    fn record_applied(&self, entry: AppliedMigration) -> StrataResult<()> {
        self.write(|state| state.record_applied(entry))
    }

    fn remove_applied(&self, version: Version) -> StrataResult<bool> {
        self.write(|state| Ok(state.remove_applied(version)))
    }

    fn commit(self: Box<Self>) -> StrataResult<()> {
        if !*self.dirty.lock() {
            return Ok(());
        }
        let this = *self;
        this.store
            .publish(this.working.into_inner(), this.base_revision)
    }

    fn rollback(self: Box<Self>) -> StrataResult<()> {
        Ok(())
    }
}
