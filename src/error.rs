//! Centralized error types for depot
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use thiserror::Error;

/// Missing package, source, or launch artifact
#[derive(Error, Debug)]
pub enum NotFoundError {
    #[error("Package {name} doesn't exist in internal or external area")]
    Package { name: String },

    #[error("Package {name} has no deployed versions")]
    NoVersions { name: String },

    #[error("Package descriptor not found at {path}")]
    Descriptor { path: String },
}

/// Cross-partition name conflict
///
/// A package name is unique across the union of both partitions, so a
/// name already deployed as internal can never be deployed as external
/// (and vice versa).
#[derive(Error, Debug)]
#[error("Package {name} already exists in {existing}, you can not deploy in {requested}")]
pub struct DuplicateNameError {
    pub name: String,
    pub existing: String,
    pub requested: String,
}

/// Malformed version string, bump level, or partition name
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error(
        "Version number {value:?} doesn't match the public format (e.g. \"2017\", \"1.2.35\", \"2.4.5a\")"
    )]
    PublicDialect { value: String },

    #[error(
        "Version number {value:?} doesn't match the internal major.minor.fix format (e.g. \"1.2.35\")"
    )]
    InternalDialect { value: String },

    #[error("Version number {value:?} doesn't split into a major.minor.fix triplet")]
    NotATriplet { value: String },

    #[error("Unknown bump level {value:?}, expected one of: major, minor, fix")]
    UnknownLevel { value: String },

    #[error("Unknown partition {value:?}, expected one of: internal, external")]
    UnknownPartition { value: String },
}

/// An operation was attempted before the stage it depends on
#[derive(Error, Debug)]
pub enum PreconditionError {
    #[error("You should get source code of {name} first")]
    SourceMissing { name: String },

    #[error("Package {name} has no prepared builder, prepare staging first")]
    BuilderUnprepared { name: String },

    #[error("Package {name} was never built, there is nothing to deploy")]
    NotBuilt { name: String },

    #[error("You should specify the deployment level or version number for {name}")]
    VersionUnspecified { name: String },

    #[error("Package {name} is not registered")]
    NotRegistered { name: String },
}

/// Non-zero exit or spawn failure from fetch/build/bootstrap/final command
#[derive(Error, Debug)]
pub enum ExternalProcessError {
    #[error("Failed to launch {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with status {code}")]
    Failed { command: String, code: i32 },

    #[error("{command} was terminated by a signal")]
    Terminated { command: String },
}

impl ExternalProcessError {
    /// Build from an exit status, mapping a missing code to `Terminated`.
    pub fn from_status(command: impl Into<String>, status: std::process::ExitStatus) -> Self {
        let command = command.into();
        match status.code() {
            Some(code) => Self::Failed { command, code },
            None => Self::Terminated { command },
        }
    }
}

/// Cyclic prerequisite graph detected during dependency resolution
#[derive(Error, Debug)]
#[error("Cyclic package requirements: {}", chain.join(" -> "))]
pub struct CycleDetectedError {
    /// Requirement chain from the first repeated package back to itself
    pub chain: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_error_display() {
        let err = DuplicateNameError {
            name: "foo".into(),
            existing: "internal".into(),
            requested: "external".into(),
        };
        assert!(err.to_string().contains("already exists in internal"));
    }

    #[test]
    fn test_cycle_error_shows_chain() {
        let err = CycleDetectedError {
            chain: vec!["p".into(), "q".into(), "p".into()],
        };
        assert_eq!(err.to_string(), "Cyclic package requirements: p -> q -> p");
    }

    #[cfg(unix)]
    #[test]
    fn test_external_process_error_from_status() {
        use std::os::unix::process::ExitStatusExt;
        let status = std::process::ExitStatus::from_raw(0x100); // exit code 1
        let err = ExternalProcessError::from_status("git clone", status);
        assert!(matches!(err, ExternalProcessError::Failed { code: 1, .. }));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::UnknownLevel {
            value: "patch".into(),
        };
        assert!(err.to_string().contains("major, minor, fix"));
    }
}
