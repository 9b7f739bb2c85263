//! # Depot Configuration
//!
//! One TOML document describes the whole pipeline layout:
//!
//! ```toml
//! root = "/pipeline"
//!
//! [paths]
//! # Optional overrides; anything unset defaults beneath `root`:
//! # source/, staging/, internal/, external/, versions.json
//! internal = "/mnt/production/internal"
//!
//! [repos]
//! internal = "git@git.example.com:pipeline/{name}.git"
//! external = "git@git.example.com:vendor/{name}.git"
//! ```
//!
//! The document is resolved from `--config`, the `DEPOT_CONFIG`
//! environment variable, or `./depot.toml`, in that order.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::domain::package::Partition;

pub const DEFAULT_CONFIG_FILE: &str = "depot.toml";
pub const CONFIG_ENV_VAR: &str = "DEPOT_CONFIG";

/// Git URL patterns per partition; `{name}` expands to the package name
#[derive(Debug, Clone, Deserialize)]
pub struct RepoPatterns {
    pub internal: String,
    pub external: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawPaths {
    source: Option<PathBuf>,
    staging: Option<PathBuf>,
    internal: Option<PathBuf>,
    external: Option<PathBuf>,
    ledger: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    root: Option<PathBuf>,
    #[serde(default)]
    paths: RawPaths,
    repos: RepoPatterns,
}

/// Fully resolved pipeline layout
#[derive(Debug, Clone)]
pub struct DepotConfig {
    /// Fetched package sources, one subdirectory per package
    pub source_root: PathBuf,
    /// Build output awaiting promotion, one subdirectory per package
    pub staging_root: PathBuf,
    /// Production tree for internal packages
    pub internal_root: PathBuf,
    /// Production tree for external packages
    pub external_root: PathBuf,
    /// Version ledger document
    pub ledger_path: PathBuf,
    pub repos: RepoPatterns,
}

impl DepotConfig {
    /// Load from `--config`, `$DEPOT_CONFIG`, or `./depot.toml`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV_VAR) {
                Some(value) => PathBuf::from(value),
                None => PathBuf::from(DEFAULT_CONFIG_FILE),
            },
        };
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text)?;
        Self::resolve(raw)
    }

    fn resolve(raw: RawConfig) -> Result<Self> {
        let root = raw.root;
        let resolve_path =
            |explicit: Option<PathBuf>, field: &str, default_name: &str| -> Result<PathBuf> {
                match (explicit, &root) {
                    (Some(path), _) => Ok(path),
                    (None, Some(root)) => Ok(root.join(default_name)),
                    (None, None) => {
                        bail!("Config needs either `root` or an explicit `paths.{}`", field)
                    }
                }
            };

        Ok(Self {
            source_root: resolve_path(raw.paths.source, "source", "source")?,
            staging_root: resolve_path(raw.paths.staging, "staging", "staging")?,
            internal_root: resolve_path(raw.paths.internal, "internal", "internal")?,
            external_root: resolve_path(raw.paths.external, "external", "external")?,
            ledger_path: resolve_path(raw.paths.ledger, "ledger", "versions.json")?,
            repos: raw.repos,
        })
    }

    /// Checkout directory of a fetched package.
    pub fn source_dir(&self, name: &str) -> PathBuf {
        self.source_root.join(name)
    }

    /// Staging directory of a package.
    pub fn staging_dir(&self, name: &str) -> PathBuf {
        self.staging_root.join(name)
    }

    /// Production tree root for a partition.
    pub fn production_root(&self, partition: Partition) -> &Path {
        match partition {
            Partition::Internal => &self.internal_root,
            Partition::External => &self.external_root,
        }
    }

    /// `<partition_root>/<name>` — all deployed versions of a package.
    pub fn production_dir(&self, name: &str, partition: Partition) -> PathBuf {
        self.production_root(partition).join(name)
    }

    /// `<partition_root>/<name>/<version>` — one deployed artifact tree.
    pub fn version_dir(&self, name: &str, partition: Partition, version: &str) -> PathBuf {
        self.production_dir(name, partition).join(version)
    }

    /// Clone URL for a package's source repository.
    pub fn repo_url(&self, name: &str, partition: Partition) -> String {
        let pattern = match partition {
            Partition::Internal => &self.repos.internal,
            Partition::External => &self.repos.external,
        };
        pattern.replace("{name}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_fills_in_default_paths() {
        let config = DepotConfig::from_toml(
            r#"
root = "/pipeline"

[repos]
internal = "git@host:pipeline/{name}.git"
external = "git@host:vendor/{name}.git"
"#,
        )
        .unwrap();

        assert_eq!(config.source_root, PathBuf::from("/pipeline/source"));
        assert_eq!(config.ledger_path, PathBuf::from("/pipeline/versions.json"));
        assert_eq!(
            config.version_dir("nuke-gizmos", Partition::Internal, "1.3.0"),
            PathBuf::from("/pipeline/internal/nuke-gizmos/1.3.0")
        );
    }

    #[test]
    fn test_explicit_paths_override_root() {
        let config = DepotConfig::from_toml(
            r#"
root = "/pipeline"

[paths]
internal = "/mnt/production/internal"

[repos]
internal = "a/{name}"
external = "b/{name}"
"#,
        )
        .unwrap();

        assert_eq!(
            config.production_root(Partition::Internal),
            Path::new("/mnt/production/internal")
        );
        assert_eq!(
            config.production_root(Partition::External),
            Path::new("/pipeline/external")
        );
    }

    #[test]
    fn test_missing_root_and_paths_is_an_error() {
        let result = DepotConfig::from_toml(
            r#"
[repos]
internal = "a/{name}"
external = "b/{name}"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_repo_url_substitution() {
        let config = DepotConfig::from_toml(
            r#"
root = "/p"

[repos]
internal = "git@git.example.com:pipeline/{name}.git"
external = "git@git.example.com:vendor/{name}.git"
"#,
        )
        .unwrap();

        assert_eq!(
            config.repo_url("ocio-configs", Partition::Internal),
            "git@git.example.com:pipeline/ocio-configs.git"
        );
        assert_eq!(
            config.repo_url("ffmpeg", Partition::External),
            "git@git.example.com:vendor/ffmpeg.git"
        );
    }
}
