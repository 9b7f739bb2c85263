//! Declarative package and build descriptors
//!
//! Descriptors are plain TOML documents, so loading one never touches
//! process-global state and same-named descriptors across packages
//! cannot collide.
//!
//! - `package.toml` sits in a deployed version directory and declares
//!   the ordered prerequisite list plus an optional bootstrap command.
//! - `build.toml` sits at the root of a fetched source tree and declares
//!   the build steps that populate the staging directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{ExternalProcessError, NotFoundError};

pub const PACKAGE_DESCRIPTOR: &str = "package.toml";
pub const BUILD_DESCRIPTOR: &str = "build.toml";

/// `package.toml` — prerequisites and bootstrap of a deployed package
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageDescriptor {
    /// Prerequisite package names, resolved depth-first in this order
    #[serde(default)]
    pub requirements: Vec<String>,

    /// Bootstrap argument vector, executed as soon as the package resolves
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

impl PackageDescriptor {
    /// Load the descriptor from a deployed version directory.
    pub fn load(version_dir: &Path) -> Result<Self> {
        let path = version_dir.join(PACKAGE_DESCRIPTOR);
        if !path.is_file() {
            return Err(NotFoundError::Descriptor {
                path: path.display().to_string(),
            }
            .into());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// One build step: an argument vector run from the source directory
#[derive(Debug, Clone, Deserialize)]
pub struct BuildStep {
    pub command: Vec<String>,
}

/// `build.toml` — ordered build steps for a fetched source tree
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildDescriptor {
    #[serde(default, rename = "step")]
    pub steps: Vec<BuildStep>,
}

impl BuildDescriptor {
    /// Load the descriptor from the root of a fetched source tree.
    pub fn load(source_dir: &Path) -> Result<Self> {
        let path = source_dir.join(BUILD_DESCRIPTOR);
        if !path.is_file() {
            return Err(NotFoundError::Descriptor {
                path: path.display().to_string(),
            }
            .into());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// Builder bound to one package's source and staging directories
///
/// Steps run sequentially with the source directory as working
/// directory. `{source_dir}` and `{staging_dir}` placeholders are
/// substituted in every argument, and both paths are exported as
/// `DEPOT_SOURCE_DIR` / `DEPOT_STAGING_DIR`. The first non-zero exit
/// aborts the build; there are no retries.
#[derive(Debug, Clone)]
pub struct StagingBuilder {
    pub source_dir: PathBuf,
    pub staging_dir: PathBuf,
    descriptor: BuildDescriptor,
}

impl StagingBuilder {
    pub fn new(source_dir: PathBuf, staging_dir: PathBuf, descriptor: BuildDescriptor) -> Self {
        Self {
            source_dir,
            staging_dir,
            descriptor,
        }
    }

    /// Run every build step against this builder's directories.
    pub async fn build(&self) -> Result<()> {
        std::fs::create_dir_all(&self.staging_dir).with_context(|| {
            format!(
                "Failed to create staging directory {}",
                self.staging_dir.display()
            )
        })?;

        for (index, step) in self.descriptor.steps.iter().enumerate() {
            let argv: Vec<String> = step.command.iter().map(|arg| self.substitute(arg)).collect();
            let cmdline = argv.join(" ");
            info!("Build step {}/{}: {}", index + 1, self.descriptor.steps.len(), cmdline);

            let (program, args) = match argv.split_first() {
                Some(split) => split,
                None => continue,
            };

            let status = Command::new(program)
                .args(args)
                .current_dir(&self.source_dir)
                .env("DEPOT_SOURCE_DIR", &self.source_dir)
                .env("DEPOT_STAGING_DIR", &self.staging_dir)
                .status()
                .await
                .map_err(|source| ExternalProcessError::Spawn {
                    command: cmdline.clone(),
                    source,
                })?;

            if !status.success() {
                return Err(ExternalProcessError::from_status(cmdline, status).into());
            }
            debug!("Build step {} succeeded", index + 1);
        }
        Ok(())
    }

    fn substitute(&self, arg: &str) -> String {
        arg.replace("{source_dir}", &self.source_dir.to_string_lossy())
            .replace("{staging_dir}", &self.staging_dir.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, text: &str) {
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn test_package_descriptor_parsing() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join(PACKAGE_DESCRIPTOR),
            r#"
requirements = ["core-python", "ocio-configs"]
command = ["hostenv", "--refresh"]
"#,
        );
        let descriptor = PackageDescriptor::load(dir.path()).unwrap();
        assert_eq!(descriptor.requirements, ["core-python", "ocio-configs"]);
        assert_eq!(descriptor.command.unwrap()[0], "hostenv");
    }

    #[test]
    fn test_package_descriptor_defaults_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join(PACKAGE_DESCRIPTOR), "");
        let descriptor = PackageDescriptor::load(dir.path()).unwrap();
        assert!(descriptor.requirements.is_empty());
        assert!(descriptor.command.is_none());
    }

    #[test]
    fn test_missing_descriptor_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = PackageDescriptor::load(dir.path()).unwrap_err();
        assert!(err.downcast_ref::<NotFoundError>().is_some());
    }

    #[test]
    fn test_build_descriptor_parsing() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join(BUILD_DESCRIPTOR),
            r#"
[[step]]
command = ["cp", "-r", "{source_dir}/python", "{staging_dir}/python"]

[[step]]
command = ["python", "compile_ui.py"]
"#,
        );
        let descriptor = BuildDescriptor::load(dir.path()).unwrap();
        assert_eq!(descriptor.steps.len(), 2);
        assert_eq!(descriptor.steps[1].command[0], "python");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_builder_substitutes_and_populates_staging() {
        let root = tempfile::tempdir().unwrap();
        let source_dir = root.path().join("src");
        let staging_dir = root.path().join("staging");
        std::fs::create_dir_all(&source_dir).unwrap();
        write(
            &source_dir.join(BUILD_DESCRIPTOR),
            r#"
[[step]]
command = ["sh", "-c", "echo staged > {staging_dir}/artifact.txt"]
"#,
        );

        let descriptor = BuildDescriptor::load(&source_dir).unwrap();
        let builder = StagingBuilder::new(source_dir, staging_dir.clone(), descriptor);
        builder.build().await.unwrap();

        let artifact = std::fs::read_to_string(staging_dir.join("artifact.txt")).unwrap();
        assert_eq!(artifact.trim(), "staged");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_builder_propagates_step_failure() {
        let root = tempfile::tempdir().unwrap();
        let source_dir = root.path().join("src");
        std::fs::create_dir_all(&source_dir).unwrap();

        let descriptor = BuildDescriptor {
            steps: vec![BuildStep {
                command: vec!["sh".into(), "-c".into(), "exit 3".into()],
            }],
        };
        let builder =
            StagingBuilder::new(source_dir, root.path().join("staging"), descriptor);
        let err = builder.build().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExternalProcessError>(),
            Some(ExternalProcessError::Failed { code: 3, .. })
        ));
    }
}
