//! Launch command: resolve packages, then run a tool against them
//!
//! Argument grammar is `<pkg1> [pkg2 ...] [run <command...>]`. The
//! first `run` token splits packages from the final command; without
//! one, the first package's platform launch script is the command.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::info;

use crate::config::DepotConfig;
use crate::resolver::{run_final_command, Resolver};

pub fn execute(config_path: Option<PathBuf>, args: Vec<String>) -> Result<i32> {
    let (packages, command) = split_run_clause(&args);
    if packages.is_empty() {
        bail!("No packages named before the run clause");
    }
    if command.is_empty() {
        bail!("The run clause needs a command after it");
    }

    let config = DepotConfig::load(config_path.as_deref())?;

    // One deep copy of the ambient environment for the whole invocation;
    // bootstraps and the final command all see this same snapshot.
    let env: HashMap<String, String> = std::env::vars().collect();

    let mut resolver = Resolver::new(&config, &env);
    for package in &packages {
        resolver.add_package(package)?;
    }

    info!("Resolved {} package(s)", packages.len());
    run_final_command(&command, &env)
}

fn split_run_clause(args: &[String]) -> (Vec<String>, Vec<String>) {
    match args.iter().position(|arg| arg == "run") {
        Some(index) => (args[..index].to_vec(), args[index + 1..].to_vec()),
        None => {
            let command = args.first().map(|first| vec![launch_script(first)]);
            (args.to_vec(), command.unwrap_or_default())
        }
    }
}

/// Default command when no run clause is given: the platform launch
/// script named after the first package.
fn launch_script(package: &str) -> String {
    if cfg!(windows) {
        format!("{}.bat", package)
    } else {
        format!("{}.sh", package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn test_run_clause_splits_packages_from_command() {
        let (packages, command) =
            split_run_clause(&strings(&["nuke", "ocio", "run", "python", "-V"]));
        assert_eq!(packages, ["nuke", "ocio"]);
        assert_eq!(command, ["python", "-V"]);
    }

    #[test]
    fn test_no_run_clause_defaults_to_launch_script() {
        let (packages, command) = split_run_clause(&strings(&["nuke", "ocio"]));
        assert_eq!(packages, ["nuke", "ocio"]);
        #[cfg(not(windows))]
        assert_eq!(command, ["nuke.sh"]);
        #[cfg(windows)]
        assert_eq!(command, ["nuke.bat"]);
    }

    #[test]
    fn test_run_clause_with_no_packages_is_rejected_downstream() {
        let (packages, command) = split_run_clause(&strings(&["run", "python"]));
        assert!(packages.is_empty());
        assert_eq!(command, ["python"]);
    }
}
