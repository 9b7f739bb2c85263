use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod descriptor;
mod domain;
mod error;
mod fsops;
mod infrastructure;
mod resolver;
mod services;
mod tools;
mod ui;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with LOGGING env var support
    // LOGGING=debug,info,warn,error or just LOGGING=debug
    let log_level = std::env::var("LOGGING")
        .or_else(|_| std::env::var("LOG_LEVEL"))
        .unwrap_or_else(|_| {
            if cli.verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false) // Disable ANSI escape codes for cleaner output
        .init();

    match cli.command {
        Commands::Deploy {
            name,
            partition,
            level,
            version,
        } => {
            if let Err(err) =
                commands::deploy::execute(cli.config, name, partition, level, version).await
            {
                ui::print_error(&format!("{:#}", err));
                std::process::exit(1);
            }
        }
        Commands::Launch { args } => match commands::launch::execute(cli.config, args) {
            Ok(code) => {
                if code != 0 {
                    std::process::exit(code);
                }
            }
            Err(err) => {
                ui::print_error(&format!("{:#}", err));
                std::process::exit(1);
            }
        },
        Commands::Status { name } => {
            if let Err(err) = commands::status::execute(cli.config, name) {
                ui::print_error(&format!("{:#}", err));
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
