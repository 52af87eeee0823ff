//! Versioned schema migrations.
//!
//! A [`Migration`] pairs a forward and a backward function under a
//! numeric [`Version`]. Migrations are collected in a
//! [`MigrationRegistry`] and applied or reverted by a [`MigrationRunner`],
//! which keeps the applied-version log in the store it migrates.

mod applied;
mod lock;
#[allow(clippy::module_inception)]
mod migration;
mod registry;
mod runner;

pub use self::applied::*;
pub use self::lock::*;
pub use self::migration::*;
pub use self::registry::*;
pub use self::runner::*;

use std::fmt::{Display, Formatter};

/// Identifier and ordering key of a migration.
///
/// Versions are ordered numerically; registrations conventionally use a
/// unix timestamp of when the migration was written.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Version(u64);

impl Version {
    pub const fn new(value: u64) -> Self {
        Version(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Version(value)
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
