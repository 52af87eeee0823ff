use std::sync::Arc;

use super::{
    AppliedMigration, AppliedVersionLog, Migration, MigrationLock, MigrationRegistry, Version,
};
use crate::errors::{ErrorKind, StrataError, StrataResult};
use crate::store::Store;

/// Snapshot of where a store stands relative to a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Applied-version log, in application order.
    pub applied: Vec<AppliedMigration>,
    /// Registered versions not yet applied, ascending.
    pub pending: Vec<Version>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Applies and reverts registered migrations against a store.
///
/// Every migration direction runs in its own transaction, and the
/// applied-version log is updated inside that same transaction, so the
/// log always matches exactly the migrations whose changes committed.
/// A run holds the store's migration lock from start to finish.
#[derive(Clone)]
pub struct MigrationRunner {
    store: Store,
    registry: Arc<MigrationRegistry>,
}

impl MigrationRunner {
    pub fn new(store: Store, registry: MigrationRegistry) -> Self {
        MigrationRunner {
            store,
            registry: Arc::new(registry),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Applies pending migrations in ascending version order.
    ///
    /// With a `target`, only versions up to and including it are applied.
    /// Stops at the first failure; migrations committed before it stay
    /// applied.
    ///
    /// # Returns
    /// The versions applied by this call, in order.
    ///
    /// # Errors
    /// - `MigrationInProgress` if another run holds the lock
    /// - `MigrationFailed(version)` with the forward error as cause
    pub fn migrate_up(&self, target: Option<Version>) -> StrataResult<Vec<Version>> {
        let _lock = MigrationLock::acquire(&self.store)?;
        let applied_log = self.applied_log()?;

        let pending = self
            .registry
            .pending(&applied_log)
            .into_iter()
            .filter(|m| target.map_or(true, |t| m.version() <= t))
            .collect::<Vec<_>>();

        if pending.is_empty() {
            log::info!("No pending migrations");
            return Ok(Vec::new());
        }

        let highest_applied = applied_log.versions().into_iter().max();
        let mut applied = Vec::with_capacity(pending.len());
        for migration in pending {
            if highest_applied.map_or(false, |h| migration.version() < h) {
                log::warn!(
                    "Applying migration {} ({}) out of order, {} is already applied",
                    migration.version(),
                    migration.name(),
                    highest_applied.map(|h| h.to_string()).unwrap_or_default()
                );
            }
            self.apply(&migration)?;
            applied.push(migration.version());
        }

        log::info!("Applied {} migration(s)", applied.len());
        Ok(applied)
    }

    /// Reverts the `steps` most recently applied migrations, newest first.
    ///
    /// A backward function that fails with a not-found error counts as
    /// success: the resource it meant to remove is already gone.
    ///
    /// # Returns
    /// The versions reverted by this call, in order.
    ///
    /// # Errors
    /// - `MigrationInProgress` if another run holds the lock
    /// - `UnknownMigration(version)` if an applied version is not registered
    /// - `RollbackFailed(version)` with the backward error as cause
    pub fn migrate_down(&self, steps: usize) -> StrataResult<Vec<Version>> {
        let _lock = MigrationLock::acquire(&self.store)?;
        let applied_log = self.applied_log()?;

        let mut reverted = Vec::new();
        for entry in applied_log.entries().iter().rev().take(steps) {
            let migration = self.registry.get(entry.version).ok_or_else(|| {
                log::error!(
                    "Applied migration {} ({}) is not registered",
                    entry.version,
                    entry.name
                );
                StrataError::new(
                    &format!(
                        "Applied migration {} ({}) is not registered",
                        entry.version, entry.name
                    ),
                    ErrorKind::UnknownMigration(entry.version),
                )
            })?;
            self.revert(&migration)?;
            reverted.push(migration.version());
        }

        log::info!("Reverted {} migration(s)", reverted.len());
        Ok(reverted)
    }

    /// Applied and pending migrations, read without taking the lock.
    pub fn status(&self) -> StrataResult<MigrationStatus> {
        let applied_log = self.applied_log()?;
        Ok(MigrationStatus {
            pending: self
                .registry
                .pending(&applied_log)
                .iter()
                .map(|m| m.version())
                .collect(),
            applied: applied_log.entries().to_vec(),
        })
    }

    fn applied_log(&self) -> StrataResult<AppliedVersionLog> {
        Ok(AppliedVersionLog::new(self.store.applied_migrations()?))
    }

    fn apply(&self, migration: &Migration) -> StrataResult<()> {
        let version = migration.version();
        log::info!("Applying migration {} ({})", version, migration.name());

        let result = self.store.run_in_transaction(|tx| {
            migration.up(tx)?;
            tx.record_applied(AppliedMigration::new(version, migration.name()))
        });

        result.map_err(|cause| {
            log::error!("Migration {} ({}) failed: {}", version, migration.name(), cause);
            StrataError::new_with_cause(
                &format!("Migration {} ({}) failed", version, migration.name()),
                ErrorKind::MigrationFailed(version),
                cause,
            )
        })
    }

    fn revert(&self, migration: &Migration) -> StrataResult<()> {
        let version = migration.version();
        log::info!("Reverting migration {} ({})", version, migration.name());

        let result = self.store.run_in_transaction(|tx| {
            match migration.down(tx) {
                Err(e) if e.is_not_found() => {
                    log::warn!(
                        "Rollback of {} ({}) found nothing to remove: {}",
                        version,
                        migration.name(),
                        e
                    );
                }
                other => other?,
            }
            tx.remove_applied(version)?;
            Ok(())
        });

        result.map_err(|cause| {
            log::error!("Rollback of {} ({}) failed: {}", version, migration.name(), cause);
            StrataError::new_with_cause(
                &format!("Rollback of migration {} ({}) failed", version, migration.name()),
                ErrorKind::RollbackFailed(version),
                cause,
            )
        })
    }
}
