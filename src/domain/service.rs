//! Domain services of the package context
//!
//! Each service composes the aggregate with the repository boundaries:
//! validate (cross-partition uniqueness), create (fetch + register),
//! version resolution (bump or explicit), promotion, and cleanup. The
//! application pipeline in `services::deploy_service` sequences them.

use anyhow::Result;
use tracing::debug;

use crate::domain::package::{Package, PackageState, Partition};
use crate::domain::repository::{CodeRepository, PackageRepository, VersionRepository};
use crate::domain::version::{BumpLevel, VersionNumber};
use crate::error::{DuplicateNameError, PreconditionError};

/// ValidatePackageService: a name may not exist under both partitions.
pub fn validate_package(
    versions: &impl VersionRepository,
    name: &str,
    requested: Partition,
) -> Result<(), DuplicateNameError> {
    match versions.partition_of(name) {
        Some(existing) if existing != requested => Err(DuplicateNameError {
            name: name.to_string(),
            existing: existing.to_string(),
            requested: requested.to_string(),
        }),
        _ => Ok(()),
    }
}

/// GetCurrentVersionService: ledger version, or the 0.0.0 seed.
pub fn get_current_version(versions: &impl VersionRepository, name: &str) -> VersionNumber {
    versions
        .current_version(name)
        .unwrap_or_else(VersionNumber::initial)
}

/// CreatePackageService: fetch source, attach the build descriptor, and
/// register the aggregate. Internal packages are seeded with their
/// ledger version so a later bump has something to count from.
pub async fn create_package(
    code: &impl CodeRepository,
    versions: &impl VersionRepository,
    packages: &mut impl PackageRepository,
    name: &str,
    partition: Partition,
) -> Result<()> {
    let mut package = Package::new(name);
    if partition == Partition::Internal {
        package.current_version = Some(get_current_version(versions, name));
    }
    code.fetch(name, partition).await?;
    package.descriptor = Some(code.build_descriptor(name)?);
    packages.upsert(package);
    debug!("Registered package {}", name);
    Ok(())
}

/// GetDeployVersionService: resolve the version to deploy.
///
/// An explicit version always wins; `level` is ignored when both are
/// supplied. Internal packages may bump instead of naming a version and
/// are held to the strict dialect; external packages must name one and
/// are held to the lenient dialect. The resolved version is committed to
/// the registry, then recorded and flushed to the ledger as two separate
/// steps.
pub fn get_deploy_version(
    packages: &mut impl PackageRepository,
    versions: &mut impl VersionRepository,
    name: &str,
    partition: Partition,
    level: Option<BumpLevel>,
    explicit: Option<&str>,
) -> Result<VersionNumber> {
    let level = if explicit.is_some() { None } else { level };

    let package = packages
        .get_mut(name)
        .ok_or_else(|| PreconditionError::NotRegistered {
            name: name.to_string(),
        })?;

    let resolved = match partition {
        Partition::Internal => match (level, explicit) {
            (Some(level), None) => package.upgrade_version(level)?,
            (None, Some(value)) => VersionNumber::parse_internal(value)?,
            (None, None) => {
                return Err(PreconditionError::VersionUnspecified {
                    name: name.to_string(),
                }
                .into())
            }
            (Some(_), Some(_)) => unreachable!("explicit version clears the level"),
        },
        Partition::External => {
            let value = explicit.ok_or_else(|| PreconditionError::VersionUnspecified {
                name: name.to_string(),
            })?;
            VersionNumber::parse(value)?
        }
    };

    package.new_version = Some(resolved.clone());
    versions.record(name, &resolved, partition);
    versions.flush()?;
    package.commit_version();
    Ok(resolved)
}

/// DeployPackageService: resolve the version, then promote the staged
/// tree into the versioned production path. The ledger commits before
/// any file is copied; a crash between the two is operator-corrected.
pub fn deploy_package(
    code: &impl CodeRepository,
    packages: &mut impl PackageRepository,
    versions: &mut impl VersionRepository,
    name: &str,
    partition: Partition,
    level: Option<BumpLevel>,
    explicit: Option<&str>,
) -> Result<VersionNumber> {
    let built = packages
        .get(name)
        .map(|package| package.state == PackageState::Built)
        .unwrap_or(false);
    if !built {
        return Err(PreconditionError::NotBuilt {
            name: name.to_string(),
        }
        .into());
    }

    let version = get_deploy_version(packages, versions, name, partition, level, explicit)?;
    code.promote(name, partition, &version)?;
    if let Some(package) = packages.get_mut(name) {
        package.state = PackageState::Deployed;
    }
    Ok(version)
}

/// Remove source and staging for a package; safe to repeat.
pub fn clear_package(
    code: &impl CodeRepository,
    packages: &mut impl PackageRepository,
    name: &str,
) -> Result<()> {
    code.clear(name)?;
    if let Some(package) = packages.get_mut(name) {
        package.state = PackageState::Cleared;
        package.builder = None;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Minimal in-memory doubles for exercising the services without
    //! touching git or the real ledger file.

    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use anyhow::Result;
    use async_trait::async_trait;

    use crate::descriptor::{BuildDescriptor, StagingBuilder};
    use crate::domain::package::Partition;
    use crate::domain::repository::{CodeRepository, VersionRepository};
    use crate::domain::version::VersionNumber;
    use crate::error::PreconditionError;

    #[derive(Default)]
    pub struct MemoryVersions {
        pub entries: HashMap<String, (VersionNumber, Partition)>,
        pub flushes: RefCell<usize>,
    }

    impl MemoryVersions {
        pub fn with(name: &str, version: &str, partition: Partition) -> Self {
            let mut repo = Self::default();
            repo.entries.insert(
                name.to_string(),
                (VersionNumber::parse(version).unwrap(), partition),
            );
            repo
        }
    }

    impl VersionRepository for MemoryVersions {
        fn current_version(&self, name: &str) -> Option<VersionNumber> {
            self.entries.get(name).map(|(version, _)| version.clone())
        }

        fn partition_of(&self, name: &str) -> Option<Partition> {
            self.entries.get(name).map(|(_, partition)| *partition)
        }

        fn record(&mut self, name: &str, version: &VersionNumber, partition: Partition) {
            self.entries
                .insert(name.to_string(), (version.clone(), partition));
        }

        fn flush(&self) -> Result<()> {
            *self.flushes.borrow_mut() += 1;
            Ok(())
        }
    }

    /// Code repository double that only records calls.
    #[derive(Default)]
    pub struct StubCode {
        pub fetched: Mutex<Vec<String>>,
        pub promoted: Mutex<Vec<(String, String)>>,
        pub cleared: Mutex<Vec<String>>,
        pub source_present: bool,
    }

    #[async_trait]
    impl CodeRepository for StubCode {
        async fn fetch(&self, name: &str, _partition: Partition) -> Result<()> {
            self.fetched.lock().unwrap().push(name.to_string());
            Ok(())
        }

        fn build_descriptor(&self, _name: &str) -> Result<BuildDescriptor> {
            Ok(BuildDescriptor::default())
        }

        fn prepare_staging(
            &self,
            name: &str,
            descriptor: BuildDescriptor,
        ) -> Result<StagingBuilder> {
            if !self.source_present {
                return Err(PreconditionError::SourceMissing {
                    name: name.to_string(),
                }
                .into());
            }
            Ok(StagingBuilder::new(
                std::env::temp_dir().join("depot-stub-source"),
                std::env::temp_dir().join("depot-stub-staging"),
                descriptor,
            ))
        }

        fn promote(
            &self,
            name: &str,
            _partition: Partition,
            version: &VersionNumber,
        ) -> Result<()> {
            self.promoted
                .lock()
                .unwrap()
                .push((name.to_string(), version.to_string()));
            Ok(())
        }

        fn clear(&self, name: &str) -> Result<()> {
            self.cleared.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }
}
