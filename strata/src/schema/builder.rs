use std::collections::BTreeMap;

use super::{AccessRules, Collection, CollectionType, Field, RuleKind};
use crate::errors::{ErrorKind, StrataError, StrataResult};
use crate::store::StoreOperations;

/// Declares a collection in one step: fields, access rules and unique
/// indexes, persisted by [`CollectionBuilder::ensure`].
///
/// Every one of the five rule kinds must be declared, either with an
/// expression through [`rule`](Self::rule) or explicitly unrestricted
/// through [`open`](Self::open). A builder with an undeclared kind is
/// refused.
///
/// ```text
/// let tags = CollectionBuilder::base("tags")
///     .field(Field::text("name").max(100).required())
///     .field(Field::relation("user", USERS_COLLECTION_ID).cascade_delete().required())
///     .rules_all(OWNER_RULE)
///     .unique_index("idx_unique_tag_per_user", &["name", "user"])
///     .ensure(tx)?;
/// ```
#[derive(Debug, Clone)]
pub struct CollectionBuilder {
    name: String,
    collection_type: CollectionType,
    fields: Vec<Field>,
    rules: BTreeMap<RuleKind, Option<String>>,
    indexes: Vec<(String, Vec<String>)>,
}

impl CollectionBuilder {
    pub fn new(name: &str, collection_type: CollectionType) -> Self {
        CollectionBuilder {
            name: name.to_string(),
            collection_type,
            fields: Vec::new(),
            rules: BTreeMap::new(),
            indexes: Vec::new(),
        }
    }

    pub fn base(name: &str) -> Self {
        CollectionBuilder::new(name, CollectionType::Base)
    }

    pub fn auth(name: &str) -> Self {
        CollectionBuilder::new(name, CollectionType::Auth)
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Restricts `kind` to requests matching `expression`.
    pub fn rule(mut self, kind: RuleKind, expression: &str) -> Self {
        self.rules.insert(kind, Some(expression.to_string()));
        self
    }

    /// Same expression for all five kinds.
    pub fn rules_all(mut self, expression: &str) -> Self {
        for kind in RuleKind::ALL {
            self.rules.insert(kind, Some(expression.to_string()));
        }
        self
    }

    /// Leaves `kind` unrestricted, on purpose.
    pub fn open(mut self, kind: RuleKind) -> Self {
        self.rules.insert(kind, None);
        self
    }

    pub fn open_all(mut self) -> Self {
        for kind in RuleKind::ALL {
            self.rules.insert(kind, None);
        }
        self
    }

    pub fn unique_index(mut self, name: &str, fields: &[&str]) -> Self {
        self.indexes.push((
            name.to_string(),
            fields.iter().map(|f| f.to_string()).collect(),
        ));
        self
    }

    /// Builds the collection without touching the store.
    ///
    /// # Errors
    /// - `ValidationError` if a rule kind was not declared
    /// - `DuplicateField` if two fields share a name
    pub fn build(&self) -> StrataResult<Collection> {
        let undeclared = RuleKind::ALL
            .iter()
            .filter(|kind| !self.rules.contains_key(*kind))
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>();
        if !undeclared.is_empty() {
            log::error!(
                "Collection '{}' leaves rules undeclared: {:?}",
                self.name,
                undeclared
            );
            return Err(StrataError::new(
                &format!(
                    "Collection '{}' must declare its {} rule(s), \
                     use open() for unrestricted access",
                    self.name,
                    undeclared.join(", ")
                ),
                ErrorKind::ValidationError,
            ));
        }

        let mut collection = Collection::new(&self.name, self.collection_type);
        add_fields(&mut collection, self.fields.iter().cloned())?;

        let mut rules = AccessRules::unrestricted();
        for (kind, expression) in &self.rules {
            rules.set(*kind, expression.clone());
        }
        set_access_rules(&mut collection, rules);

        for (name, fields) in &self.indexes {
            let fields = fields.iter().map(String::as_str).collect::<Vec<_>>();
            collection.add_unique_index(name, &fields);
        }
        Ok(collection)
    }

    /// Creates the collection unless one with this name already exists.
    ///
    /// An existing collection is returned as stored; nothing declared on
    /// the builder is applied to it.
    pub fn ensure<S>(&self, ops: &S) -> StrataResult<Collection>
    where
        S: StoreOperations + ?Sized,
    {
        ensure_collection(ops, &self.name, |_| self.build())
    }
}

/// Returns the collection named `name`, creating it with `factory` when
/// it does not exist yet.
///
/// The existence check happens once, before `factory` runs, so a
/// forward migration built on this can be re-run after a partial failure.
pub fn ensure_collection<S, F>(ops: &S, name: &str, factory: F) -> StrataResult<Collection>
where
    S: StoreOperations + ?Sized,
    F: FnOnce(&S) -> StrataResult<Collection>,
{
    match ops.find_collection_by_name_or_id(name) {
        Ok(existing) => {
            log::debug!("Collection '{}' already exists, leaving it unchanged", name);
            return Ok(existing);
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e),
    }

    let mut collection = factory(ops)?;
    if collection.name() != name {
        return Err(StrataError::new(
            &format!(
                "Factory for '{}' produced collection '{}'",
                name,
                collection.name()
            ),
            ErrorKind::InvalidOperation,
        ));
    }

    ops.save_collection(&mut collection)?;
    log::info!("Created collection '{}' ({})", collection.name(), collection.id());
    Ok(collection)
}

/// Appends `fields` in order; either all are added or none is.
///
/// # Errors
/// `DuplicateField` when a name already exists on the collection or
/// repeats within `fields`.
pub fn add_fields(
    collection: &mut Collection,
    fields: impl IntoIterator<Item = Field>,
) -> StrataResult<()> {
    let mut updated = collection.clone();
    for field in fields {
        updated.add_field(field)?;
    }
    *collection = updated;
    Ok(())
}

/// Replaces the collection's whole rule set.
pub fn set_access_rules(collection: &mut Collection, rules: AccessRules) {
    collection.set_rules(rules);
}

/// Deletes the collection named `name` if it exists.
pub fn drop_collection_if_exists<S>(ops: &S, name: &str) -> StrataResult<()>
where
    S: StoreOperations + ?Sized,
{
    match ops.find_collection_by_name_or_id(name) {
        Ok(collection) => {
            ops.delete_collection(&collection)?;
            log::info!("Dropped collection '{}'", name);
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            log::debug!("Collection '{}' does not exist, nothing to drop", name);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
