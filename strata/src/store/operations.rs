use crate::errors::StrataResult;
use crate::record::Record;
use crate::schema::Collection;
use crate::settings::Settings;

/// The storage engine surface a migration unit works against.
///
/// Implemented by [`crate::store::Transaction`], where every call joins
/// the transaction the runner opened, and by [`crate::store::Store`],
/// where every call commits on its own.
///
/// Lookups report absence as `CollectionNotFound` (collections) or
/// `NotFound` (records), never as `Ok(None)`, so `?` propagates them
/// and `StrataError::is_not_found` recognizes them.
pub trait StoreOperations {
    /// Looks a collection up by id first, then by name.
    fn find_collection_by_name_or_id(&self, name_or_id: &str) -> StrataResult<Collection>;

    /// Returns whether a collection exists, by id or name.
    fn has_collection(&self, name_or_id: &str) -> StrataResult<bool> {
        match self.find_collection_by_name_or_id(name_or_id) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Names of all collections, system collections included.
    fn collection_names(&self) -> StrataResult<Vec<String>>;

    /// Creates or updates a collection.
    ///
    /// A new collection gets its id here. Relation fields must target an
    /// existing collection (or the collection itself).
    fn save_collection(&self, collection: &mut Collection) -> StrataResult<()>;

    /// Deletes a collection together with its records.
    fn delete_collection(&self, collection: &Collection) -> StrataResult<()>;

    /// A new, unsaved record bound to `collection`.
    fn new_record(&self, collection: &Collection) -> Record {
        Record::new(collection)
    }

    /// Validates and stores a record; a new record gets its id here.
    fn save_record(&self, record: &mut Record) -> StrataResult<()>;

    /// Deletes a record, applying relation cascade rules.
    fn delete_record(&self, record: &Record) -> StrataResult<()>;

    fn find_record_by_id(&self, collection: &str, id: &str) -> StrataResult<Record>;

    /// All records of a collection, ordered by id.
    fn find_records(&self, collection: &str) -> StrataResult<Vec<Record>>;

    /// Finds an auth record by its identifier (email).
    fn find_auth_record_by_identifier(
        &self,
        collection: &str,
        identifier: &str,
    ) -> StrataResult<Record>;

    fn settings(&self) -> StrataResult<Settings>;

    fn save_settings(&self, settings: &Settings) -> StrataResult<()>;
}
