//! # Strata - Versioned Schema Migrations
//!
//! Strata evolves the schema of a record-oriented collection store through
//! ordered, versioned migration units. Each unit has a forward and a
//! backward function; a runner applies pending units in version order and
//! reverts applied ones in reverse application order, recording every
//! committed unit in an applied-version log kept inside the store itself.
//!
//! ## Key Features
//!
//! - **Atomic units**: every migration direction runs in one transaction,
//!   together with its applied-version log update
//! - **Idempotent declarations**: [`schema::CollectionBuilder`] creates a
//!   collection only when it does not exist yet
//! - **Tolerant rollback**: a backward function that finds nothing to
//!   remove counts as success
//! - **Exclusive runs**: a store-wide migration lock rejects a second runner
//! - **In-memory store**: a complete snapshot-isolated store for tests and
//!   embedded use
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata::config::SeedConfig;
//! use strata::migration::{MigrationRegistry, MigrationRunner};
//! use strata::store::memory::InMemoryStore;
//!
//! # fn main() -> strata::errors::StrataResult<()> {
//! let mut registry = MigrationRegistry::new();
//! strata::migrations::register(&mut registry, &SeedConfig::from_env())?;
//!
//! let runner = MigrationRunner::new(InMemoryStore::new()?.into_store(), registry);
//! let applied = runner.migrate_up(None)?;
//! println!("applied {:?}", applied);
//!
//! runner.migrate_down(1)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`common`] - Values, ids, password hashing and constants
//! - [`config`] - Inputs of the bootstrap migrations
//! - [`errors`] - Error types and result definitions
//! - [`migration`] - Registry, runner, applied-version log and lock
//! - [`migrations`] - Bootstrap migrations of the link manager
//! - [`record`] - Records of a collection
//! - [`schema`] - Collections, fields, access rules and the builder
//! - [`settings`] - Application settings stored with the schema
//! - [`store`] - Storage engine contract and the in-memory store

pub mod common;
pub mod config;
pub mod errors;
pub mod migration;
pub mod migrations;
pub mod record;
pub mod schema;
pub mod settings;
pub mod store;

#[cfg(test)]
mod tests {
    // Setup only one time throughout the project.
    #[ctor::ctor]
    fn init() {
        colog::init();
    }
}
