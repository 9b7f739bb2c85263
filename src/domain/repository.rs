//! Repository boundaries of the package context
//!
//! The domain services are polymorphic over this capability set; the
//! implementations in `infrastructure` are injected through the
//! application service's constructor. Nothing here is reachable through
//! globals.

use anyhow::Result;
use async_trait::async_trait;

use crate::descriptor::{BuildDescriptor, StagingBuilder};
use crate::domain::package::{Package, Partition};
use crate::domain::version::VersionNumber;

/// Boundary to the source tree: fetch, staging, promotion, cleanup
#[async_trait]
pub trait CodeRepository {
    /// Fetch the latest source of a package, replacing any previous checkout.
    async fn fetch(&self, name: &str, partition: Partition) -> Result<()>;

    /// Load the build descriptor from a fetched source tree.
    fn build_descriptor(&self, name: &str) -> Result<BuildDescriptor>;

    /// Rebuild the staging directory fresh and return a builder bound to
    /// (source_dir, staging_dir, descriptor). Fails with
    /// PreconditionError when the source was never fetched.
    fn prepare_staging(&self, name: &str, descriptor: BuildDescriptor) -> Result<StagingBuilder>;

    /// Promote staged contents into the versioned production path:
    /// full copy when the version directory is new, hotfix merge when
    /// it already exists.
    fn promote(&self, name: &str, partition: Partition, version: &VersionNumber) -> Result<()>;

    /// Remove source and staging directories; no-op when already absent.
    fn clear(&self, name: &str) -> Result<()>;
}

/// Boundary to the version ledger
pub trait VersionRepository {
    /// Current deployed version of a package, if the ledger knows it.
    fn current_version(&self, name: &str) -> Option<VersionNumber>;

    /// Partition the name is recorded under, if any.
    fn partition_of(&self, name: &str) -> Option<Partition>;

    /// Record a version in the in-memory ledger; `flush` persists it.
    fn record(&mut self, name: &str, version: &VersionNumber, partition: Partition);

    /// Rewrite the persisted ledger wholesale.
    fn flush(&self) -> Result<()>;
}

/// Boundary to the in-memory package registry
pub trait PackageRepository {
    fn get(&self, name: &str) -> Option<&Package>;

    fn get_mut(&mut self, name: &str) -> Option<&mut Package>;

    /// Insert or replace a package under its name.
    fn upsert(&mut self, package: Package);
}
