//! Construction-time configuration errors.
//!
//! Everything the search needs is validated once, when a [`ProblemConfig`][crate::ProblemConfig]
//! or runner configuration is built.  The search loop itself has no error states of its own:
//! statistical degeneracies fall back to uniform output, and collaborator (setup/test)
//! failures are returned to the caller unchanged.

use thiserror::Error;

/// Invalid problem or runner configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("need at least {required} versions, got {actual}")]
    TooFewVersions { required: usize, actual: usize },

    #[error("version at position {second} duplicates position {first}")]
    DuplicateVersion { first: usize, second: usize },

    #[error("current version is not in the version list")]
    UnknownCurrentVersion,

    #[error("{name} must be a probability in [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },

    #[error("setup cost must be finite and >= 0, got {0}")]
    InvalidSetupCost(f64),

    #[error("test cost must be finite and > 0, got {0}")]
    InvalidTestCost(f64),

    #[error("inertia must be in [0, 1], got {0}")]
    InvalidInertia(f64),

    #[error("target confidence must be in (0, 1), got {0}")]
    InvalidTargetConfidence(f64),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
