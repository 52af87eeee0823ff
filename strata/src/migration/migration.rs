use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use super::Version;
use crate::errors::StrataResult;
use crate::store::Transaction;

/// Body of a migration direction.
///
/// Runs inside the transaction the runner opened; returning an error
/// rolls back everything the function did.
pub type MigrationFn = Arc<dyn Fn(&Transaction) -> StrataResult<()> + Send + Sync>;

/// A versioned pair of forward and backward schema changes.
///
/// # Usage
/// ```text
/// let migration = Migration::new(1765353000, "create_tags", |tx| {
///     CollectionBuilder::base("tags")
///         .field(Field::text("name").required())
///         .open_all()
///         .ensure(tx)?;
///     Ok(())
/// }, |tx| drop_collection_if_exists(tx, "tags"));
/// ```
#[derive(Clone)]
pub struct Migration {
    version: Version,
    name: String,
    up: MigrationFn,
    down: MigrationFn,
}

impl Migration {
    pub fn new<U, D>(version: impl Into<Version>, name: &str, up: U, down: D) -> Self
    where
        U: Fn(&Transaction) -> StrataResult<()> + Send + Sync + 'static,
        D: Fn(&Transaction) -> StrataResult<()> + Send + Sync + 'static,
    {
        Migration {
            version: version.into(),
            name: name.to_string(),
            up: Arc::new(up),
            down: Arc::new(down),
        }
    }

    /// A migration whose backward direction does nothing.
    pub fn irreversible<U>(version: impl Into<Version>, name: &str, up: U) -> Self
    where
        U: Fn(&Transaction) -> StrataResult<()> + Send + Sync + 'static,
    {
        Migration::new(version, name, up, |_| Ok(()))
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn up(&self, tx: &Transaction) -> StrataResult<()> {
        (self.up)(tx)
    }

    pub(crate) fn down(&self, tx: &Transaction) -> StrataResult<()> {
        (self.down)(tx)
    }
}

impl Debug for Migration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("name", &self.name)
            .finish()
    }
}
