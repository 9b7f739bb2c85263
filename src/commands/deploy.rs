//! Deploy command: run the full pipeline for one package

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::config::DepotConfig;
use crate::domain::package::Partition;
use crate::domain::version::BumpLevel;
use crate::infrastructure::code::GitCodeRepository;
use crate::infrastructure::ledger::VersionLedger;
use crate::infrastructure::registry::PackageRegistry;
use crate::services::deploy_service::PackageDeployService;
use crate::ui;

pub async fn execute(
    config_path: Option<PathBuf>,
    name: String,
    partition: String,
    level: Option<String>,
    version: Option<String>,
) -> Result<()> {
    let partition: Partition = partition.parse()?;
    let level: Option<BumpLevel> = level.map(|value| value.parse()).transpose()?;

    ui::print_header(&format!("Deploy: {} ({})", name, partition));

    let config = DepotConfig::load(config_path.as_deref())?;
    info!("Source root: {}", config.source_root.display());
    info!(
        "Production root: {}",
        config.production_root(partition).display()
    );
    info!("Ledger: {}", config.ledger_path.display());

    let ledger = VersionLedger::load(&config.ledger_path)?;
    let mut service = PackageDeployService::new(
        GitCodeRepository::new(config.clone()),
        ledger,
        PackageRegistry::new(),
    );

    let deployed = service
        .deploy(&name, partition, level, version.as_deref())
        .await?;

    ui::print_success(&format!("Deployed {} {} to {}", name, deployed, partition));
    Ok(())
}
