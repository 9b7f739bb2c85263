//! CLI definitions for depot
//!
//! This module contains all CLI argument parsing structures using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "depot",
    version,
    about = "Deployment orchestrator for versioned pipeline packages",
    long_about = "Moves a named package from source control through a staging build\ninto a versioned production tree, and launches tools against the\ndeployed trees with their prerequisites bootstrapped."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the depot.toml config file
    #[arg(long, global = true, env = "DEPOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy a package: fetch, build, promote, record
    Deploy {
        /// Package name (matches its source repository name)
        name: String,

        /// Target partition: internal or external
        #[arg(long = "type", value_name = "PARTITION")]
        partition: String,

        /// Bump level for internal packages: major, minor, fix
        #[arg(long)]
        level: Option<String>,

        /// Explicit version number (wins over --level)
        #[arg(long)]
        version: Option<String>,
    },

    /// Resolve deployed packages and launch a tool against them
    ///
    /// Grammar: `<pkg1> [pkg2 ...] [run <command...>]`. Without a `run`
    /// clause the first package's platform launch script is executed.
    Launch {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Show deployed versions recorded in the ledger
    Status {
        /// Limit the listing to one package
        name: Option<String>,
    },
}
