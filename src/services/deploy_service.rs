//! Package deploy service - orchestrates the deployment pipeline
//!
//! Sequences the domain services strictly in order: validate → create →
//! build → deploy → clear. The first failure aborts the remaining
//! stages with no compensating rollback; whatever was already promoted
//! stays in production for the operator to correct.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::domain::package::{PackageState, Partition};
use crate::domain::repository::{CodeRepository, PackageRepository, VersionRepository};
use crate::domain::service;
use crate::domain::version::{BumpLevel, VersionNumber};
use crate::error::PreconditionError;

/// Stages of one deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    Validate,
    Create,
    Build,
    Deploy,
    Clear,
}

impl DeployStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Validate => "Validate",
            Self::Create => "Create",
            Self::Build => "Build",
            Self::Deploy => "Deploy",
            Self::Clear => "Clear",
        }
    }

    const ALL: [DeployStep; 5] = [
        Self::Validate,
        Self::Create,
        Self::Build,
        Self::Deploy,
        Self::Clear,
    ];
}

/// Outcome of a single pipeline stage
#[derive(Debug)]
pub struct StepResult {
    pub step: DeployStep,
    pub success: bool,
    pub duration: Duration,
}

/// Application service for the full deployment use case
///
/// The repository implementations are injected through the constructor;
/// the service owns them for the duration of one run.
pub struct PackageDeployService<C, V, P> {
    code: C,
    versions: V,
    packages: P,
}

impl<C, V, P> PackageDeployService<C, V, P>
where
    C: CodeRepository,
    V: VersionRepository,
    P: PackageRepository,
{
    pub fn new(code: C, versions: V, packages: P) -> Self {
        Self {
            code,
            versions,
            packages,
        }
    }

    /// Run the whole pipeline for one package.
    pub async fn deploy(
        &mut self,
        name: &str,
        partition: Partition,
        level: Option<BumpLevel>,
        version: Option<&str>,
    ) -> Result<VersionNumber> {
        let mut results = Vec::new();
        let mut deployed = None;

        for step in DeployStep::ALL {
            info!("Starting: {}", step.name());
            let start = Instant::now();
            let outcome = self
                .execute_step(step, name, partition, level, version, &mut deployed)
                .await;
            let duration = start.elapsed();

            match outcome {
                Ok(()) => {
                    info!(
                        "{} {} completed in {:.1}s",
                        "✅".green(),
                        step.name(),
                        duration.as_secs_f64()
                    );
                    results.push(StepResult {
                        step,
                        success: true,
                        duration,
                    });
                }
                Err(err) => {
                    info!("{} {} failed: {:#}", "❌".red(), step.name(), err);
                    results.push(StepResult {
                        step,
                        success: false,
                        duration,
                    });
                    self.print_summary(name, &results, Some(step));
                    return Err(err);
                }
            }
        }

        self.print_summary(name, &results, None);
        deployed.context("Deploy step never resolved a version")
    }

    async fn execute_step(
        &mut self,
        step: DeployStep,
        name: &str,
        partition: Partition,
        level: Option<BumpLevel>,
        version: Option<&str>,
        deployed: &mut Option<VersionNumber>,
    ) -> Result<()> {
        match step {
            DeployStep::Validate => {
                service::validate_package(&self.versions, name, partition)?;
                Ok(())
            }
            DeployStep::Create => {
                service::create_package(
                    &self.code,
                    &self.versions,
                    &mut self.packages,
                    name,
                    partition,
                )
                .await
            }
            DeployStep::Build => self.build(name).await,
            DeployStep::Deploy => {
                *deployed = Some(service::deploy_package(
                    &self.code,
                    &mut self.packages,
                    &mut self.versions,
                    name,
                    partition,
                    level,
                    version,
                )?);
                Ok(())
            }
            DeployStep::Clear => service::clear_package(&self.code, &mut self.packages, name),
        }
    }

    /// Rebuild the staging area and run the package's build steps.
    async fn build(&mut self, name: &str) -> Result<()> {
        let package =
            self.packages
                .get_mut(name)
                .ok_or_else(|| PreconditionError::NotRegistered {
                    name: name.to_string(),
                })?;
        let descriptor =
            package
                .descriptor
                .clone()
                .ok_or_else(|| PreconditionError::SourceMissing {
                    name: name.to_string(),
                })?;

        let builder = self.code.prepare_staging(name, descriptor)?;
        package.builder = Some(builder);
        package.state = PackageState::Staged;
        package.build().await
    }

    fn print_summary(&self, name: &str, results: &[StepResult], failed: Option<DeployStep>) {
        println!();
        match failed {
            None => println!(
                "{}",
                format!("✅ Deployment completed: {}", name)
                    .bright_green()
                    .bold()
            ),
            Some(step) => println!(
                "{}",
                format!("❌ Deployment failed at {}: {}", step.name(), name)
                    .bright_red()
                    .bold()
            ),
        }
        for result in results {
            let status = if result.success { "✅" } else { "❌" };
            println!(
                "   {} {} ({:.1}s)",
                status,
                result.step.name(),
                result.duration.as_secs_f64()
            );
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::test_support::{MemoryVersions, StubCode};
    use crate::infrastructure::registry::PackageRegistry;

    fn service(
        versions: MemoryVersions,
    ) -> PackageDeployService<StubCode, MemoryVersions, PackageRegistry> {
        let code = StubCode {
            source_present: true,
            ..StubCode::default()
        };
        PackageDeployService::new(code, versions, PackageRegistry::new())
    }

    #[tokio::test]
    async fn test_full_pipeline_runs_every_stage_in_order() {
        let mut deploy = service(MemoryVersions::default());

        let version = deploy
            .deploy("tools", Partition::Internal, Some(BumpLevel::Minor), None)
            .await
            .unwrap();

        assert_eq!(version.as_str(), "0.1.0");
        assert_eq!(deploy.code.fetched.lock().unwrap().as_slice(), ["tools"]);
        assert_eq!(
            deploy.code.promoted.lock().unwrap().as_slice(),
            [("tools".to_string(), "0.1.0".to_string())]
        );
        assert_eq!(deploy.code.cleared.lock().unwrap().as_slice(), ["tools"]);
        assert_eq!(*deploy.versions.flushes.borrow(), 1);
        assert_eq!(
            deploy.packages.get("tools").unwrap().state,
            PackageState::Cleared
        );
    }

    #[tokio::test]
    async fn test_duplicate_name_aborts_before_fetch() {
        let versions = MemoryVersions::with("tools", "1.0.0", Partition::External);
        let mut deploy = service(versions);

        let err = deploy
            .deploy("tools", Partition::Internal, Some(BumpLevel::Fix), None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("already exists in external"));
        assert!(deploy.code.fetched.lock().unwrap().is_empty());
        assert!(deploy.code.promoted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_version_aborts_before_promotion_but_after_build() {
        let mut deploy = service(MemoryVersions::default());

        let err = deploy
            .deploy("tools", Partition::External, None, None)
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<PreconditionError>().is_some());
        // fetch and build ran, promotion and clear never did
        assert_eq!(deploy.code.fetched.lock().unwrap().as_slice(), ["tools"]);
        assert!(deploy.code.promoted.lock().unwrap().is_empty());
        assert!(deploy.code.cleared.lock().unwrap().is_empty());
    }
}
