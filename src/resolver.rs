//! Recursive package resolution for launching tools
//!
//! Walks the production trees depth-first, loading each package's
//! descriptor, executing its bootstrap command, and recursing into its
//! declared requirements before the final command runs. Resolution and
//! the processes it spawns are blocking by design; nothing here is
//! cancellable once started.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::config::DepotConfig;
use crate::descriptor::PackageDescriptor;
use crate::domain::package::Partition;
use crate::error::{CycleDetectedError, ExternalProcessError, NotFoundError};

/// Depth-first resolver over the deployed package trees
pub struct Resolver<'a> {
    config: &'a DepotConfig,
    /// Deep copy of the ambient environment, taken once per invocation
    /// and handed to every bootstrap unchanged
    env: &'a HashMap<String, String>,
    resolved: HashSet<String>,
    /// Current requirement chain, for cycle reporting
    chain: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a DepotConfig, env: &'a HashMap<String, String>) -> Self {
        Self {
            config,
            env,
            resolved: HashSet::new(),
            chain: Vec::new(),
        }
    }

    /// Resolve a package and, depth-first in declared order, everything
    /// it requires. Bootstraps run as each package resolves.
    pub fn add_package(&mut self, name: &str) -> Result<()> {
        if self.chain.iter().any(|entry| entry == name) {
            let mut chain = self.chain.clone();
            chain.push(name.to_string());
            return Err(CycleDetectedError { chain }.into());
        }
        if self.resolved.contains(name) {
            debug!("Package {} already resolved, skipping", name);
            return Ok(());
        }

        let package_dir = self.locate(name)?;
        let latest = latest_version(name, &package_dir)?;
        let version_dir = package_dir.join(&latest);
        info!("Resolved {} {}", name, latest);

        let descriptor = PackageDescriptor::load(&version_dir)?;
        if let Some(argv) = &descriptor.command {
            self.bootstrap(name, &version_dir, argv)?;
        }

        self.chain.push(name.to_string());
        for requirement in &descriptor.requirements {
            self.add_package(requirement)?;
        }
        self.chain.pop();

        self.resolved.insert(name.to_string());
        Ok(())
    }

    /// Probe both partitions for the package root. Internal is checked
    /// first and external last, so a name deployed in both resolves to
    /// the external tree — legacy precedence, kept as documented.
    fn locate(&self, name: &str) -> Result<PathBuf, NotFoundError> {
        let mut found = None;
        for partition in [Partition::Internal, Partition::External] {
            let candidate = self.config.production_dir(name, partition);
            if candidate.is_dir() {
                found = Some(candidate);
            }
        }
        found.ok_or_else(|| NotFoundError::Package {
            name: name.to_string(),
        })
    }

    fn bootstrap(&self, name: &str, version_dir: &Path, argv: &[String]) -> Result<()> {
        let (program, args) = match argv.split_first() {
            Some(split) => split,
            None => return Ok(()),
        };
        let cmdline = argv.join(" ");
        debug!("Bootstrapping {}: {}", name, cmdline);

        let status = Command::new(program)
            .args(args)
            .current_dir(version_dir)
            .env_clear()
            .envs(self.env)
            .status()
            .map_err(|source| ExternalProcessError::Spawn {
                command: cmdline.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ExternalProcessError::from_status(cmdline, status).into());
        }
        Ok(())
    }
}

/// Pick the "latest" version directory by lexicographic name order.
///
/// This is a naive string sort, not a semantic-version comparison:
/// "9" sorts after "10". Kept byte-compatible with the trees existing
/// installations already resolve against.
fn latest_version(name: &str, package_dir: &Path) -> Result<String> {
    let mut versions: Vec<String> = std::fs::read_dir(package_dir)
        .with_context(|| format!("Failed to list {}", package_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    versions.sort();

    versions.pop().ok_or_else(|| {
        NotFoundError::NoVersions {
            name: name.to_string(),
        }
        .into()
    })
}

/// Run the final command against the environment snapshot, inheriting
/// stdio, and hand back its exit code.
pub fn run_final_command(argv: &[String], env: &HashMap<String, String>) -> Result<i32> {
    let (program, args) = match argv.split_first() {
        Some(split) => split,
        None => bail!("No command to run"),
    };
    let cmdline = argv.join(" ");
    info!("Running: {}", cmdline);

    let status = Command::new(program)
        .args(args)
        .env_clear()
        .envs(env)
        .status()
        .map_err(|source| ExternalProcessError::Spawn {
            command: cmdline,
            source,
        })?;

    Ok(status.code().unwrap_or(1))
}
