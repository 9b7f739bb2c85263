//! Source tree operations
//!
//! Implementation of the code repository boundary: fetch via `git
//! clone`, staging preparation, promotion into the versioned production
//! tree, and cleanup. All paths come from the resolved `DepotConfig`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use scopeguard::ScopeGuard;
use tokio::process::Command;
use tracing::{info, warn};

use crate::config::DepotConfig;
use crate::descriptor::{BuildDescriptor, StagingBuilder};
use crate::domain::package::Partition;
use crate::domain::repository::CodeRepository;
use crate::domain::version::VersionNumber;
use crate::error::{ExternalProcessError, PreconditionError};
use crate::fsops;
use crate::tools::get_tool_path;

/// Code repository backed by git checkouts under the source root
pub struct GitCodeRepository {
    config: DepotConfig,
}

impl GitCodeRepository {
    pub fn new(config: DepotConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CodeRepository for GitCodeRepository {
    /// Clone the package's repository into `<source_root>/<name>`,
    /// replacing any previous checkout. A failed clone leaves no
    /// partial checkout behind.
    async fn fetch(&self, name: &str, partition: Partition) -> Result<()> {
        let source_dir = self.config.source_dir(name);
        fsops::remove_tree(&source_dir)?;
        std::fs::create_dir_all(&self.config.source_root).with_context(|| {
            format!(
                "Failed to create source root {}",
                self.config.source_root.display()
            )
        })?;

        let url = self.config.repo_url(name, partition);
        info!("Fetching {} from {}", name, url);

        let cleanup = scopeguard::guard(source_dir, |dir| {
            if let Err(err) = fsops::remove_tree(&dir) {
                warn!("Failed to clean up partial checkout: {err:#}");
            }
        });

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        spinner.set_message(format!("Cloning {}...", name));
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));

        let git = get_tool_path("git");
        let display = format!("{} clone {}", git, url);
        let output = Command::new(&git)
            .args(["clone", &url, name])
            .current_dir(&self.config.source_root)
            .output()
            .await
            .map_err(|source| ExternalProcessError::Spawn {
                command: display.clone(),
                source,
            })?;
        spinner.finish_and_clear();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("git clone failed: {}", stderr.trim());
            return Err(ExternalProcessError::from_status(display, output.status).into());
        }

        ScopeGuard::into_inner(cleanup);
        Ok(())
    }

    fn build_descriptor(&self, name: &str) -> Result<BuildDescriptor> {
        BuildDescriptor::load(&self.config.source_dir(name))
    }

    /// Rebuild the staging directory fresh and bind a builder to it.
    fn prepare_staging(&self, name: &str, descriptor: BuildDescriptor) -> Result<StagingBuilder> {
        let source_dir = self.config.source_dir(name);
        if !source_dir.is_dir() {
            return Err(PreconditionError::SourceMissing {
                name: name.to_string(),
            }
            .into());
        }

        let staging_dir = self.config.staging_dir(name);
        fsops::remove_tree(&staging_dir)?;
        Ok(StagingBuilder::new(source_dir, staging_dir, descriptor))
    }

    /// Promote staged contents into `<partition_root>/<name>/<version>`:
    /// a full copy for a new version directory, a hotfix merge when it
    /// already exists.
    fn promote(&self, name: &str, partition: Partition, version: &VersionNumber) -> Result<()> {
        let staging_dir = self.config.staging_dir(name);
        if !staging_dir.is_dir() {
            return Err(PreconditionError::NotBuilt {
                name: name.to_string(),
            }
            .into());
        }

        let dest = self.config.version_dir(name, partition, version.as_str());
        if dest.is_dir() {
            info!("Hotfix: merging staged files onto {}", dest.display());
            fsops::merge_tree(&staging_dir, &dest)
        } else {
            info!("Deploying fresh copy to {}", dest.display());
            fsops::copy_tree(&staging_dir, &dest)
        }
    }

    fn clear(&self, name: &str) -> Result<()> {
        fsops::remove_tree(&self.config.source_dir(name))?;
        fsops::remove_tree(&self.config.staging_dir(name))?;
        Ok(())
    }
}
