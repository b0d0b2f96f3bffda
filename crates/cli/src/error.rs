//! CLI error types.

use crate::config::ConfigError;
use crate::logger::LoggerError;
use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A `-p` argument is not of the form `NAME=VALUE`.
    #[error("invalid parameter '{0}', expected NAME=VALUE")]
    InvalidParameter(String),

    /// One or more policies failed configuration-time validation.
    #[error("{count} policy(ies) failed validation")]
    InvalidPolicies { count: usize },

    /// Configuration is invalid or missing required fields.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging could not be initialised.
    #[error(transparent)]
    Logger(#[from] LoggerError),

    /// An error occurred building tasks for admission.
    #[error(transparent)]
    Admission(#[from] admission::Error),

    /// An error occurred in the policy layer.
    #[error(transparent)]
    Policy(#[from] policy::Error),

    /// An admission worker did not complete.
    #[error("admission worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
