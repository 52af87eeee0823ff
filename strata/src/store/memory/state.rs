use chrono::Utc;
use im::{OrdMap, OrdSet, Vector};
use itertools::Itertools;

use crate::common::{
    hash_password, is_password_hash, new_collection_id, new_record_id, Value, AUTH_EMAIL,
    AUTH_PASSWORD, SUPERUSERS_COLLECTION, SUPERUSERS_COLLECTION_ID, USERS_COLLECTION,
    USERS_COLLECTION_ID,
};
use crate::errors::{ErrorKind, StrataError, StrataResult};
use crate::migration::{AppliedMigration, Version};
use crate::record::Record;
use crate::schema::{AccessRules, Collection, Field, FieldKind, RuleKind};
use crate::settings::Settings;

type RecordMap = OrdMap<String, Record>;

/// Complete contents of an in-memory store.
///
/// Every map is persistent, so cloning the state is O(1) and a clone
/// shares structure with the original until either side is modified.
/// Transactions work on a clone and commit by swapping it back in.
#[derive(Clone)]
pub(crate) struct StoreState {
    revision: u64,
    collections: OrdMap<String, Collection>,
    records: OrdMap<String, RecordMap>,
    applied: Vector<AppliedMigration>,
    settings: Settings,
}

impl StoreState {
    /// An empty store holding only the system auth collections.
    pub(crate) fn bootstrap() -> StrataResult<StoreState> {
        let mut state = StoreState {
            revision: 0,
            collections: OrdMap::new(),
            records: OrdMap::new(),
            applied: Vector::new(),
            settings: Settings::default(),
        };

        let mut superusers = Collection::new_auth(SUPERUSERS_COLLECTION).mark_system();
        superusers.assign_id(SUPERUSERS_COLLECTION_ID.to_string());
        superusers.add_field(Field::autodate("created").on_create().system())?;
        superusers.add_field(Field::autodate("updated").on_create().on_update().system())?;
        superusers.set_rules(AccessRules::all("@request.auth.collectionName = '_superusers'"));
        state.save_collection(&mut superusers)?;

        let mut users = Collection::new_auth(USERS_COLLECTION).mark_system();
        users.assign_id(USERS_COLLECTION_ID.to_string());
        users.add_field(Field::text("name").max(255))?;
        users.add_field(Field::autodate("created").on_create().system())?;
        users.add_field(Field::autodate("updated").on_create().on_update().system())?;
        let mut rules = AccessRules::all("id = @request.auth.id");
        rules.set(RuleKind::Create, None);
        users.set_rules(rules);
        state.save_collection(&mut users)?;

        Ok(state)
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn with_revision(mut self, revision: u64) -> StoreState {
        self.revision = revision;
        self
    }

    // ---- collections ----

    pub(crate) fn find_collection(&self, name_or_id: &str) -> StrataResult<&Collection> {
        if let Some(collection) = self.collections.get(name_or_id) {
            return Ok(collection);
        }

        self.collections
            .values()
            .find(|c| c.name().eq_ignore_ascii_case(name_or_id))
            .ok_or_else(|| {
                StrataError::new(
                    &format!("Collection '{}' not found", name_or_id),
                    ErrorKind::CollectionNotFound,
                )
            })
    }

    pub(crate) fn collection_names(&self) -> Vec<String> {
        self.collections
            .values()
            .map(|c| c.name().to_string())
            .sorted()
            .collect()
    }

    pub(crate) fn save_collection(&mut self, collection: &mut Collection) -> StrataResult<()> {
        collection.validate()?;

        if let Some(other) = self.collections.values().find(|c| {
            c.name().eq_ignore_ascii_case(collection.name()) && c.id() != collection.id()
        }) {
            log::error!("Collection name '{}' is already taken", other.name());
            return Err(StrataError::new(
                &format!("Collection name '{}' is already taken", collection.name()),
                ErrorKind::UniqueConstraintViolation,
            ));
        }

        if let Some(existing) = self.collections.get(collection.id()) {
            if existing.is_system() && existing.name() != collection.name() {
                return Err(StrataError::new(
                    &format!("System collection '{}' cannot be renamed", existing.name()),
                    ErrorKind::InvalidOperation,
                ));
            }
            if existing.collection_type() != collection.collection_type() {
                return Err(StrataError::new(
                    &format!("Collection '{}' cannot change its type", existing.name()),
                    ErrorKind::InvalidOperation,
                ));
            }
        } else if !collection.is_new() && !collection.is_system() {
            return Err(StrataError::new(
                &format!(
                    "Collection '{}' has id '{}' that is unknown to the store",
                    collection.name(),
                    collection.id()
                ),
                ErrorKind::ValidationError,
            ));
        }

        let mut candidate = collection.clone();
        if candidate.is_new() {
            candidate.assign_id(self.unused_collection_id());
        }

        for (field, target) in candidate.relation_fields() {
            if target != candidate.id() && !self.collections.contains_key(target) {
                log::error!(
                    "Relation field '{}' of '{}' references non-existent collection id '{}'",
                    field.name(),
                    candidate.name(),
                    target
                );
                return Err(StrataError::new(
                    &format!(
                        "Relation field '{}' references non-existent collection id '{}'",
                        field.name(),
                        target
                    ),
                    ErrorKind::ValidationError,
                ));
            }
        }

        candidate.touch(Utc::now());
        let id = candidate.id().to_string();
        self.collections.insert(id.clone(), candidate.clone());
        if !self.records.contains_key(&id) {
            self.records.insert(id, OrdMap::new());
        }
        *collection = candidate;
        Ok(())
    }

    pub(crate) fn delete_collection(&mut self, collection: &Collection) -> StrataResult<()> {
        let existing = self
            .collections
            .get(collection.id())
            .cloned()
            .ok_or_else(|| {
                StrataError::new(
                    &format!("Collection '{}' not found", collection.name()),
                    ErrorKind::NotFound,
                )
            })?;

        if existing.is_system() {
            return Err(StrataError::new(
                &format!("System collection '{}' cannot be deleted", existing.name()),
                ErrorKind::InvalidOperation,
            ));
        }

        let referencing = self
            .collections
            .values()
            .filter(|c| c.id() != existing.id() && c.references(existing.id()))
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>();
        if !referencing.is_empty() {
            log::error!(
                "Collection '{}' is still referenced by {:?}",
                existing.name(),
                referencing
            );
            return Err(StrataError::new(
                &format!(
                    "Collection '{}' is still referenced by: {}",
                    existing.name(),
                    referencing.join(", ")
                ),
                ErrorKind::InvalidOperation,
            ));
        }

        self.collections.remove(existing.id());
        self.records.remove(existing.id());
        Ok(())
    }

    // ---- records ----

    pub(crate) fn find_record(&self, collection: &str, id: &str) -> StrataResult<Record> {
        let collection = self.find_collection(collection)?;
        self.records
            .get(collection.id())
            .and_then(|records| records.get(id))
            .cloned()
            .ok_or_else(|| {
                StrataError::new(
                    &format!("Record '{}' not found in '{}'", id, collection.name()),
                    ErrorKind::NotFound,
                )
            })
    }

    pub(crate) fn find_records(&self, collection: &str) -> StrataResult<Vec<Record>> {
        let collection = self.find_collection(collection)?;
        Ok(self
            .records
            .get(collection.id())
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    pub(crate) fn find_auth_record(
        &self,
        collection: &str,
        identifier: &str,
    ) -> StrataResult<Record> {
        let collection = self.find_collection(collection)?;
        if !collection.is_auth() {
            return Err(StrataError::new(
                &format!("Collection '{}' is not an auth collection", collection.name()),
                ErrorKind::InvalidOperation,
            ));
        }

        let identifier = identifier.to_lowercase();
        self.records
            .get(collection.id())
            .and_then(|records| {
                records
                    .values()
                    .find(|r| r.email().as_deref() == Some(identifier.as_str()))
            })
            .cloned()
            .ok_or_else(|| {
                StrataError::new(
                    &format!("No '{}' record with identifier '{}'", collection.name(), identifier),
                    ErrorKind::NotFound,
                )
            })
    }

    pub(crate) fn save_record(&mut self, record: &mut Record) -> StrataResult<()> {
        let collection = self.find_collection(record.collection_id())?.clone();
        let stored = if record.is_new() {
            None
        } else {
            Some(self.find_record(collection.id(), record.id())?)
        };

        let mut candidate = record.clone();

        if let Some(unknown) = candidate.keys().find(|k| !collection.has_field(k)) {
            return Err(StrataError::new(
                &format!(
                    "Field '{}' is not defined on collection '{}'",
                    unknown,
                    collection.name()
                ),
                ErrorKind::ValidationError,
            ));
        }

        if let Some(plain) = candidate.take_plain_password() {
            if let Some(field) = collection.field(AUTH_PASSWORD) {
                field.validate_plain_password(&plain)?;
            }
            candidate.set_raw(AUTH_PASSWORD, Value::String(hash_password(&plain)?));
        }

        let now = Utc::now();
        for field in collection.fields() {
            let mut value = candidate.get(field.name());
            if let FieldKind::Autodate {
                on_create,
                on_update,
            } = field.kind()
            {
                let previous = stored.as_ref().map(|s| s.get(field.name()));
                value = match (previous, *on_create, *on_update) {
                    (_, _, true) => Value::DateTime(now),
                    (None, true, _) => Value::DateTime(now),
                    (Some(previous), _, _) => previous,
                    (None, false, _) => Value::Null,
                };
            }

            let normalized = field.validate_value(&value)?;
            if let (FieldKind::Password, Value::String(hash)) = (field.kind(), &normalized) {
                if !is_password_hash(hash) {
                    return Err(StrataError::new(
                        &format!("Field '{}' must hold a password hash", field.name()),
                        ErrorKind::ValidationError,
                    ));
                }
            }
            if let Some(target) = field.relation_target() {
                self.check_relation_ids(
                    &collection,
                    &candidate,
                    field.name(),
                    target,
                    &normalized,
                )?;
            }
            candidate.set_raw(field.name(), normalized);
        }

        if candidate.is_new() {
            candidate.assign_id(self.unused_record_id(collection.id()));
        }

        self.check_unique_indexes(&collection, &candidate)?;

        let mut records = self.records.get(collection.id()).cloned().unwrap_or_default();
        records.insert(candidate.id().to_string(), candidate.clone());
        self.records.insert(collection.id().to_string(), records);
        *record = candidate;
        Ok(())
    }

    pub(crate) fn delete_record(&mut self, record: &Record) -> StrataResult<()> {
        let collection = self.find_collection(record.collection_id())?.clone();
        self.find_record(collection.id(), record.id())?;

        let mut pending = vec![(collection.id().to_string(), record.id().to_string())];
        let mut deleted: OrdSet<(String, String)> = OrdSet::new();

        while let Some((collection_id, record_id)) = pending.pop() {
            if deleted.contains(&(collection_id.clone(), record_id.clone())) {
                continue;
            }
            deleted.insert((collection_id.clone(), record_id.clone()));

            let referencing = self
                .collections
                .values()
                .flat_map(|c| {
                    c.relation_fields()
                        .filter(|(_, target)| *target == collection_id)
                        .map(|(field, _)| (c.clone(), field.clone()))
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>();

            for (owner, field) in referencing {
                let owner_records = self.records.get(owner.id()).cloned().unwrap_or_default();
                for other in owner_records.values() {
                    let ids = other.get(field.name()).as_id_list().unwrap_or_default();
                    if !ids.contains(&record_id) {
                        continue;
                    }
                    let key = (owner.id().to_string(), other.id().to_string());
                    if deleted.contains(&key) {
                        continue;
                    }

                    if field.is_cascade_delete() {
                        log::debug!(
                            "Cascading delete to '{}' record {}",
                            owner.name(),
                            other.id()
                        );
                        pending.push(key);
                        continue;
                    }

                    let remaining = ids
                        .into_iter()
                        .filter(|id| *id != record_id)
                        .collect::<Vec<_>>();
                    if remaining.is_empty() && field.is_required() {
                        return Err(StrataError::new(
                            &format!(
                                "Record '{}' is required by field '{}' of '{}' record '{}'",
                                record_id,
                                field.name(),
                                owner.name(),
                                other.id()
                            ),
                            ErrorKind::ValidationError,
                        ));
                    }
                    let mut unlinked = other.clone();
                    unlinked.set_raw(field.name(), field.validate_value(&Value::from(remaining))?);
                    if let Some(records) = self.records.get_mut(owner.id()) {
                        records.insert(unlinked.id().to_string(), unlinked);
                    }
                }
            }
        }

        for (collection_id, record_id) in deleted {
            if let Some(records) = self.records.get_mut(&collection_id) {
                records.remove(&record_id);
            }
        }
        Ok(())
    }

    // ---- settings ----

    pub(crate) fn settings(&self) -> Settings {
        self.settings.clone()
    }

    pub(crate) fn save_settings(&mut self, settings: &Settings) {
        self.settings = settings.clone();
    }

    // ---- applied-version log ----

    pub(crate) fn applied(&self) -> Vec<AppliedMigration> {
        self.applied.iter().cloned().collect()
    }

    pub(crate) fn record_applied(&mut self, entry: AppliedMigration) -> StrataResult<()> {
        if self.applied.iter().any(|a| a.version == entry.version) {
            return Err(StrataError::new(
                &format!("Migration {} is already recorded as applied", entry.version),
                ErrorKind::DuplicateVersion(entry.version),
            ));
        }
        self.applied.push_back(entry);
        Ok(())
    }

    pub(crate) fn remove_applied(&mut self, version: Version) -> bool {
        match self.applied.iter().position(|a| a.version == version) {
            Some(index) => {
                self.applied.remove(index);
                true
            }
            None => false,
        }
    }

    // ---- helpers ----

    fn check_relation_ids(
        &self,
        collection: &Collection,
        record: &Record,
        field_name: &str,
        target: &str,
        value: &Value,
    ) -> StrataResult<()> {
        let ids = value.as_id_list().unwrap_or_default();
        let target_records = self.records.get(target);
        for id in ids {
            let self_reference = target == collection.id() && id == record.id();
            let exists = target_records.map_or(false, |records| records.contains_key(&id));
            if !exists && !self_reference {
                return Err(StrataError::new(
                    &format!(
                        "Field '{}' references missing record '{}' in collection '{}'",
                        field_name, id, target
                    ),
                    ErrorKind::ValidationError,
                ));
            }
        }
        Ok(())
    }

    fn check_unique_indexes(&self, collection: &Collection, record: &Record) -> StrataResult<()> {
        let Some(records) = self.records.get(collection.id()) else {
            return Ok(());
        };

        for index in collection.indexes() {
            let key = index
                .fields
                .iter()
                .map(|f| record.get(f))
                .collect::<Vec<_>>();
            if key.iter().any(Value::is_blank) {
                continue;
            }

            let clash = records.values().any(|other| {
                other.id() != record.id()
                    && index.fields.iter().zip(key.iter()).all(|(f, v)| other.get(f) == *v)
            });
            if clash {
                let message = if index.fields.len() == 1 && index.fields[0] == AUTH_EMAIL {
                    format!(
                        "Email '{}' is already registered in '{}'",
                        record.email().unwrap_or_default(),
                        collection.name()
                    )
                } else {
                    format!(
                        "Value for ({}) must be unique in '{}' (index '{}')",
                        index.fields.join(", "),
                        collection.name(),
                        index.name
                    )
                };
                log::error!("{}", message);
                return Err(StrataError::new(&message, ErrorKind::UniqueConstraintViolation));
            }
        }
        Ok(())
    }

    fn unused_collection_id(&self) -> String {
        loop {
            let id = new_collection_id();
            if !self.collections.contains_key(&id) {
                return id;
            }
        }
    }

    fn unused_record_id(&self, collection_id: &str) -> String {
        let records = self.records.get(collection_id);
        loop {
            let id = new_record_id();
            if records.map_or(true, |r| !r.contains_key(&id)) {
                return id;
            }
        }
    }
}
