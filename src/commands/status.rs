//! Status command: report deployed versions from the ledger

use std::path::PathBuf;

use anyhow::{bail, Result};
use colored::Colorize;

use crate::config::DepotConfig;
use crate::infrastructure::ledger::{LedgerEntry, VersionLedger};

pub fn execute(config_path: Option<PathBuf>, name: Option<String>) -> Result<()> {
    let config = DepotConfig::load(config_path.as_deref())?;
    let ledger = VersionLedger::load(&config.ledger_path)?;

    match name {
        Some(name) => match ledger.get(&name) {
            Some(entry) => print_entry(&name, entry),
            None => bail!("Package {} is not recorded in the ledger", name),
        },
        None => {
            if ledger.entries().is_empty() {
                println!("Ledger is empty: {}", config.ledger_path.display());
                return Ok(());
            }
            for (name, entry) in ledger.entries() {
                print_entry(name, entry);
            }
        }
    }
    Ok(())
}

fn print_entry(name: &str, entry: &LedgerEntry) {
    let updated = entry
        .updated_at
        .map(|stamp| stamp.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "   {:<24} {:<12} {:<10} {}",
        name.bold(),
        entry.version.as_str(),
        entry.partition.as_str().cyan(),
        updated.dimmed()
    );
}
