//! Version number value object and bump policy
//!
//! Two validation dialects exist: the public dialect accepts anything a
//! vendor might call a version ("2017", "2016-ext", "3.0.11.2",
//! "2.4.5a"), while the internal dialect only accepts a strict
//! major.minor.fix numeric triplet.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Which component of a major.minor.fix triplet gets incremented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpLevel {
    Major,
    Minor,
    Fix,
}

impl BumpLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Fix => "fix",
        }
    }
}

impl FromStr for BumpLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "fix" => Ok(Self::Fix),
            other => Err(ValidationError::UnknownLevel {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn public_dialect() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(\.\d+)*(-?[a-z]+)?$").expect("valid literal regex"))
}

fn internal_dialect() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(\.\d+){2}$").expect("valid literal regex"))
}

/// Immutable version identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionNumber(String);

impl VersionNumber {
    /// Validate against the lenient public dialect.
    pub fn validate(value: &str) -> Result<(), ValidationError> {
        if public_dialect().is_match(value) {
            Ok(())
        } else {
            Err(ValidationError::PublicDialect {
                value: value.to_string(),
            })
        }
    }

    /// Validate against the strict internal major.minor.fix dialect.
    pub fn validate_internal(value: &str) -> Result<(), ValidationError> {
        if internal_dialect().is_match(value) {
            Ok(())
        } else {
            Err(ValidationError::InternalDialect {
                value: value.to_string(),
            })
        }
    }

    /// Construct from a public-dialect string.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        Self::validate(value)?;
        Ok(Self(value.to_string()))
    }

    /// Construct from a strict internal-dialect string.
    pub fn parse_internal(value: &str) -> Result<Self, ValidationError> {
        Self::validate_internal(value)?;
        Ok(Self(value.to_string()))
    }

    /// Initial version seeded for packages the ledger doesn't know yet.
    pub fn initial() -> Self {
        Self("0.0.0".to_string())
    }

    /// Compute the next version at the given level.
    ///
    /// The component named by `level` is incremented, every component
    /// after it resets to 0, components before it are unchanged. The
    /// current value must split into exactly three base-10 components.
    pub fn bump(&self, level: BumpLevel) -> Result<VersionNumber, ValidationError> {
        let digits: Vec<u64> = self
            .0
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<Result<_, _>>()
            .map_err(|_| ValidationError::NotATriplet {
                value: self.0.clone(),
            })?;
        let [major, minor, fix]: [u64; 3] =
            digits
                .try_into()
                .map_err(|_| ValidationError::NotATriplet {
                    value: self.0.clone(),
                })?;

        let next = match level {
            BumpLevel::Major => (major + 1, 0, 0),
            BumpLevel::Minor => (major, minor + 1, 0),
            BumpLevel::Fix => (major, minor, fix + 1),
        };
        Ok(Self(format!("{}.{}.{}", next.0, next.1, next.2)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VersionNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
