use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{AccessRules, Field};
use crate::common::{AUTH_EMAIL, AUTH_PASSWORD, RECORD_ID};
use crate::errors::{ErrorKind, StrataError, StrataResult};

static COLLECTION_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^_?[A-Za-z0-9][A-Za-z0-9_]*$").expect("valid collection name regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CollectionType {
    Base,
    /// Records carry an email identifier and a hashed password.
    Auth,
}

/// A named unique constraint over one or more fields.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UniqueIndex {
    pub name: String,
    pub fields: Vec<String>,
}

/// A named entity schema: ordered typed fields plus access rules.
///
/// The id is empty until the store saves the collection for the first
/// time and never changes afterwards. Relation fields reference
/// collections by id, never by name.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Collection {
    id: String,
    name: String,
    collection_type: CollectionType,
    system: bool,
    fields: IndexMap<String, Field>,
    rules: AccessRules,
    indexes: Vec<UniqueIndex>,
    created: Option<DateTime<Utc>>,
    updated: Option<DateTime<Utc>>,
}

impl Collection {
    /// A new, unsaved collection of the given type.
    pub fn new(name: &str, collection_type: CollectionType) -> Self {
        let mut collection = Collection {
            id: String::new(),
            name: name.to_string(),
            collection_type,
            system: false,
            fields: IndexMap::new(),
            rules: AccessRules::default(),
            indexes: Vec::new(),
            created: None,
            updated: None,
        };

        if collection_type == CollectionType::Auth {
            collection.fields.insert(
                AUTH_EMAIL.to_string(),
                Field::email(AUTH_EMAIL).required().system(),
            );
            collection.fields.insert(
                AUTH_PASSWORD.to_string(),
                Field::password(AUTH_PASSWORD).required().system(),
            );
            collection.indexes.push(UniqueIndex {
                name: format!("idx_email_{}", name),
                fields: vec![AUTH_EMAIL.to_string()],
            });
        }
        collection
    }

    pub fn new_base(name: &str) -> Self {
        Collection::new(name, CollectionType::Base)
    }

    pub fn new_auth(name: &str) -> Self {
        Collection::new(name, CollectionType::Auth)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_type(&self) -> CollectionType {
        self.collection_type
    }

    pub fn is_auth(&self) -> bool {
        self.collection_type == CollectionType::Auth
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    /// True until the store assigns an id.
    pub fn is_new(&self) -> bool {
        self.id.is_empty()
    }

    /// Matches either the id or the name.
    pub fn matches(&self, name_or_id: &str) -> bool {
        self.id == name_or_id || self.name == name_or_id
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Appends a field at the end of the field sequence.
    ///
    /// # Errors
    ///
    /// `DuplicateField` if the name is taken, `ValidationError` if the
    /// definition itself is invalid or the name is reserved.
    pub fn add_field(&mut self, field: Field) -> StrataResult<()> {
        field.validate_definition()?;

        if field.name() == RECORD_ID {
            return Err(StrataError::new(
                &format!("Field name '{}' is reserved", RECORD_ID),
                ErrorKind::ValidationError,
            ));
        }

        if self.fields.contains_key(field.name()) {
            log::error!(
                "Field '{}' already exists on collection '{}'",
                field.name(),
                self.name
            );
            return Err(StrataError::new(
                &format!(
                    "Field '{}' already exists on collection '{}'",
                    field.name(),
                    self.name
                ),
                ErrorKind::DuplicateField,
            ));
        }

        self.fields.insert(field.name().to_string(), field);
        Ok(())
    }

    pub fn rules(&self) -> &AccessRules {
        &self.rules
    }

    /// Replaces the whole rule set.
    pub fn set_rules(&mut self, rules: AccessRules) {
        self.rules = rules;
    }

    pub fn indexes(&self) -> &[UniqueIndex] {
        &self.indexes
    }

    /// Adds a unique index over `fields`; replaces an index of the same name.
    pub fn add_unique_index(&mut self, name: &str, fields: &[&str]) {
        self.indexes.retain(|index| index.name != name);
        self.indexes.push(UniqueIndex {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        });
    }

    /// Relation fields, with their target collection ids.
    pub fn relation_fields(&self) -> impl Iterator<Item = (&Field, &str)> {
        self.fields
            .values()
            .filter_map(|field| field.relation_target().map(|target| (field, target)))
    }

    /// True when some relation field of this collection targets `collection_id`.
    pub fn references(&self, collection_id: &str) -> bool {
        self.relation_fields().any(|(_, target)| target == collection_id)
    }

    pub fn created(&self) -> Option<&DateTime<Utc>> {
        self.created.as_ref()
    }

    pub fn updated(&self) -> Option<&DateTime<Utc>> {
        self.updated.as_ref()
    }

    /// Structural checks that do not need the store.
    pub fn validate(&self) -> StrataResult<()> {
        if !COLLECTION_NAME.is_match(&self.name) {
            return Err(StrataError::new(
                &format!("Invalid collection name '{}'", self.name),
                ErrorKind::ValidationError,
            ));
        }

        for field in self.fields.values() {
            field.validate_definition()?;
        }

        for index in &self.indexes {
            if index.fields.is_empty() {
                return Err(StrataError::new(
                    &format!("Index '{}' has no fields", index.name),
                    ErrorKind::ValidationError,
                ));
            }
            if let Some(missing) = index.fields.iter().find(|f| !self.fields.contains_key(*f)) {
                return Err(StrataError::new(
                    &format!(
                        "Index '{}' references unknown field '{}'",
                        index.name, missing
                    ),
                    ErrorKind::ValidationError,
                ));
            }
        }

        if self.is_auth()
            && (!self.fields.contains_key(AUTH_EMAIL) || !self.fields.contains_key(AUTH_PASSWORD))
        {
            return Err(StrataError::new(
                &format!(
                    "Auth collection '{}' must keep its email and password fields",
                    self.name
                ),
                ErrorKind::ValidationError,
            ));
        }
        Ok(())
    }

    pub(crate) fn assign_id(&mut self, id: String) {
        if self.id.is_empty() {
            self.id = id;
        }
    }

    pub(crate) fn mark_system(mut self) -> Self {
        self.system = true;
        self
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        if self.created.is_none() {
            self.created = Some(now);
        }
        self.updated = Some(now);
    }
}
