//! Version ledger persistence
//!
//! The ledger is a pretty-printed JSON document mapping package name to
//! its deployed version and partition. It is rewritten wholesale on
//! every flush; the flush writes a temporary file next to the ledger and
//! renames it into place, so the on-disk document is never torn.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::package::Partition;
use crate::domain::repository::VersionRepository;
use crate::domain::version::VersionNumber;

/// One ledger row: the deployed version and partition of a package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub version: VersionNumber,
    #[serde(rename = "type")]
    pub partition: Partition,
    /// Stamped on every commit; absent in ledgers written by older tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct VersionLedger {
    path: PathBuf,
    entries: BTreeMap<String, LedgerEntry>,
}

impl VersionLedger {
    /// Load the ledger document; a missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self> {
        let entries = if path.is_file() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read ledger {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse ledger {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// All entries, ordered by package name.
    pub fn entries(&self) -> &BTreeMap<String, LedgerEntry> {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&LedgerEntry> {
        self.entries.get(name)
    }
}

impl VersionRepository for VersionLedger {
    fn current_version(&self, name: &str) -> Option<VersionNumber> {
        self.entries.get(name).map(|entry| entry.version.clone())
    }

    fn partition_of(&self, name: &str) -> Option<Partition> {
        self.entries.get(name).map(|entry| entry.partition)
    }

    fn record(&mut self, name: &str, version: &VersionNumber, partition: Partition) {
        self.entries.insert(
            name.to_string(),
            LedgerEntry {
                version: version.clone(),
                partition,
                updated_at: Some(Utc::now()),
            },
        );
        debug!("Ledger records {} = {} ({})", name, version, partition);
    }

    fn flush(&self) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let text = serde_json::to_string_pretty(&self.entries)
            .context("Failed to serialize version ledger")?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        tmp.write_all(text.as_bytes())
            .context("Failed to write version ledger")?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to replace ledger {}", self.path.display()))?;

        debug!("Ledger flushed to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_ledger_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = VersionLedger::load(&dir.path().join("versions.json")).unwrap();
        assert!(ledger.entries().is_empty());
        assert!(ledger.current_version("anything").is_none());
    }

    #[test]
    fn test_record_flush_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.json");

        let mut ledger = VersionLedger::load(&path).unwrap();
        ledger.record(
            "nuke-gizmos",
            &VersionNumber::parse_internal("1.3.0").unwrap(),
            Partition::Internal,
        );
        ledger.record(
            "ffmpeg",
            &VersionNumber::parse("2016-ext").unwrap(),
            Partition::External,
        );
        ledger.flush().unwrap();

        let reloaded = VersionLedger::load(&path).unwrap();
        assert_eq!(
            reloaded.current_version("nuke-gizmos").unwrap().as_str(),
            "1.3.0"
        );
        assert_eq!(reloaded.partition_of("ffmpeg"), Some(Partition::External));
        assert!(reloaded.get("nuke-gizmos").unwrap().updated_at.is_some());
    }

    #[test]
    fn test_flush_rewrites_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.json");

        let mut ledger = VersionLedger::load(&path).unwrap();
        ledger.record(
            "tools",
            &VersionNumber::parse_internal("1.0.0").unwrap(),
            Partition::Internal,
        );
        ledger.flush().unwrap();
        ledger.record(
            "tools",
            &VersionNumber::parse_internal("1.0.1").unwrap(),
            Partition::Internal,
        );
        ledger.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("1.0.1"));
        assert!(!text.contains("1.0.0"));
    }

    #[test]
    fn test_malformed_ledger_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(VersionLedger::load(&path).is_err());
    }
}
