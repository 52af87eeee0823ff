use chrono::{DateTime, Utc};

use super::Version;

/// One entry of the applied-version log.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AppliedMigration {
    pub version: Version,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

impl AppliedMigration {
    pub fn new(version: Version, name: &str) -> Self {
        AppliedMigration {
            version,
            name: name.to_string(),
            applied_at: Utc::now(),
        }
    }
}

/// Read view over the applied-version log, in application order.
///
/// The log itself lives in the store and is only changed by the runner,
/// inside the same transaction as the migration it describes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedVersionLog {
    entries: Vec<AppliedMigration>,
}

impl AppliedVersionLog {
    pub fn new(entries: Vec<AppliedMigration>) -> Self {
        AppliedVersionLog { entries }
    }

    pub fn contains(&self, version: Version) -> bool {
        self.entries.iter().any(|e| e.version == version)
    }

    pub fn entries(&self) -> &[AppliedMigration] {
        &self.entries
    }

    /// Versions in the order they were applied.
    pub fn versions(&self) -> Vec<Version> {
        self.entries.iter().map(|e| e.version).collect()
    }

    /// The most recently applied version.
    pub fn latest(&self) -> Option<Version> {
        self.entries.last().map(|e| e.version)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keeps_application_order() {
        let log = AppliedVersionLog::new(vec![
            AppliedMigration::new(Version::new(300), "c"),
            AppliedMigration::new(Version::new(100), "a"),
        ]);
        assert_eq!(log.versions(), vec![Version::new(300), Version::new(100)]);
        assert_eq!(log.latest(), Some(Version::new(100)));
        assert!(log.contains(Version::new(300)));
        assert!(!log.contains(Version::new(200)));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_empty_log() {
        let log = AppliedVersionLog::default();
        assert!(log.is_empty());
        assert_eq!(log.latest(), None);
    }
}
