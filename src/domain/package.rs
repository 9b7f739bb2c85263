//! Package aggregate and partition types
//!
//! A `Package` is the aggregate root of a deployment: identity, version
//! state, the build descriptor fetched with its source, and the staging
//! builder once staging has been prepared. Instances live in the
//! in-memory registry for the duration of the process; only the version
//! they commit to the ledger outlives them.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::descriptor::{BuildDescriptor, StagingBuilder};
use crate::error::{PreconditionError, ValidationError};
use crate::domain::version::{BumpLevel, VersionNumber};

/// Internal/external classification of a package, mutually exclusive
/// per name across the whole ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Internal,
    External,
}

impl Partition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
        }
    }
}

impl FromStr for Partition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "internal" => Ok(Self::Internal),
            "external" => Ok(Self::External),
            other => Err(ValidationError::UnknownPartition {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Staging lifecycle of a package within one deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageState {
    /// Source fetched into the source area
    Fetched,
    /// Staging directory rebuilt, builder prepared
    Staged,
    /// Build steps completed, staging populated
    Built,
    /// Staged tree promoted to the production area
    Deployed,
    /// Source and staging removed (terminal, idempotent)
    Cleared,
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetched => "fetched",
            Self::Staged => "staged",
            Self::Built => "built",
            Self::Deployed => "deployed",
            Self::Cleared => "cleared",
        };
        f.write_str(name)
    }
}

/// Package aggregate root
#[derive(Debug)]
pub struct Package {
    pub name: String,
    /// Last version committed to the ledger; `None` until seeded or committed
    pub current_version: Option<VersionNumber>,
    /// Pending version, set by `upgrade_version` or an explicit request;
    /// promoted into `current_version` only after the ledger commits
    pub new_version: Option<VersionNumber>,
    /// Build descriptor fetched alongside the source
    pub descriptor: Option<BuildDescriptor>,
    /// Staging builder, prepared together with the staging directory
    pub builder: Option<StagingBuilder>,
    pub state: PackageState,
}

impl Package {
    /// A package exists once its source has been fetched.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            current_version: None,
            new_version: None,
            descriptor: None,
            builder: None,
            state: PackageState::Fetched,
        }
    }

    /// Run the prepared builder, populating the staging directory.
    pub async fn build(&mut self) -> Result<()> {
        let builder = self
            .builder
            .as_ref()
            .ok_or_else(|| PreconditionError::BuilderUnprepared {
                name: self.name.clone(),
            })?;
        builder.build().await?;
        self.state = PackageState::Built;
        Ok(())
    }

    /// Compute the pending version one bump level above the current one.
    ///
    /// The current version must be a strict triplet; `new_version` holds
    /// the result until the ledger write commits it.
    pub fn upgrade_version(&mut self, level: BumpLevel) -> Result<VersionNumber, ValidationError> {
        let current = match &self.current_version {
            Some(version) => version,
            None => {
                return Err(ValidationError::NotATriplet {
                    value: String::new(),
                })
            }
        };
        let next = current.bump(level)?;
        self.new_version = Some(next.clone());
        Ok(next)
    }

    /// Promote the pending version after the ledger has been flushed.
    pub fn commit_version(&mut self) {
        if let Some(version) = self.new_version.take() {
            self.current_version = Some(version);
        }
    }
}
