use std::collections::BTreeMap;
use std::sync::Arc;

use super::{AppliedVersionLog, Migration, Version};
use crate::errors::{ErrorKind, StrataError, StrataResult};

/// Ordered set of known migrations, keyed by version.
///
/// Registration happens at startup, before any runner is built; the
/// registry is read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    migrations: BTreeMap<Version, Arc<Migration>>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        MigrationRegistry::default()
    }

    /// Adds a migration.
    ///
    /// # Errors
    ///
    /// `DuplicateVersion` when the version is already registered; the
    /// registry is left unchanged.
    pub fn register(&mut self, migration: Migration) -> StrataResult<()> {
        let version = migration.version();
        if let Some(existing) = self.migrations.get(&version) {
            log::error!(
                "Migration {} ({}) conflicts with registered migration '{}'",
                version,
                migration.name(),
                existing.name()
            );
            return Err(StrataError::new(
                &format!(
                    "Migration version {} is already registered as '{}'",
                    version,
                    existing.name()
                ),
                ErrorKind::DuplicateVersion(version),
            ));
        }

        log::debug!("Registered migration {} ({})", version, migration.name());
        self.migrations.insert(version, Arc::new(migration));
        Ok(())
    }

    pub fn get(&self, version: Version) -> Option<Arc<Migration>> {
        self.migrations.get(&version).cloned()
    }

    pub fn contains(&self, version: Version) -> bool {
        self.migrations.contains_key(&version)
    }

    /// All versions, ascending.
    pub fn versions(&self) -> Vec<Version> {
        self.migrations.keys().copied().collect()
    }

    /// Registered migrations missing from `log`, in ascending version order.
    pub fn pending(&self, log: &AppliedVersionLog) -> Vec<Arc<Migration>> {
        self.migrations
            .values()
            .filter(|m| !log.contains(m.version()))
            .cloned()
            .collect()
    }

    /// Registered migrations present in `log`, in descending version order.
    pub fn applied(&self, log: &AppliedVersionLog) -> Vec<Arc<Migration>> {
        self.migrations
            .values()
            .rev()
            .filter(|m| log.contains(m.version()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::AppliedMigration;

    fn noop(version: u64, name: &str) -> Migration {
        Migration::new(version, name, |_| Ok(()), |_| Ok(()))
    }

    #[test]
    fn test_register_and_order() -> StrataResult<()> {
        let mut registry = MigrationRegistry::new();
        registry.register(noop(300, "c"))?;
        registry.register(noop(100, "a"))?;
        registry.register(noop(200, "b"))?;

        assert_eq!(
            registry.versions(),
            vec![Version::new(100), Version::new(200), Version::new(300)]
        );
        assert_eq!(
            registry
                .get(Version::new(200))
                .map(|m| m.name().to_string())
                .as_deref(),
            Some("b")
        );
        assert!(registry.get(Version::new(400)).is_none());
        Ok(())
    }

    #[test]
    fn test_duplicate_version() -> StrataResult<()> {
        let mut registry = MigrationRegistry::new();
        registry.register(noop(100, "first"))?;
        let err = registry.register(noop(100, "second")).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::DuplicateVersion(Version::new(100)));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry
                .get(Version::new(100))
                .map(|m| m.name().to_string())
                .as_deref(),
            Some("first")
        );
        Ok(())
    }

    #[test]
    fn test_pending_and_applied() -> StrataResult<()> {
        let mut registry = MigrationRegistry::new();
        for (v, n) in [(100, "a"), (200, "b"), (300, "c")] {
            registry.register(noop(v, n))?;
        }
        let log = AppliedVersionLog::new(vec![
            AppliedMigration::new(Version::new(100), "a"),
            AppliedMigration::new(Version::new(300), "c"),
        ]);

        let pending = registry.pending(&log).iter().map(|m| m.version()).collect::<Vec<_>>();
        assert_eq!(pending, vec![Version::new(200)]);

        let applied = registry.applied(&log).iter().map(|m| m.version()).collect::<Vec<_>>();
        assert_eq!(applied, vec![Version::new(300), Version::new(100)]);
        Ok(())
    }
}
