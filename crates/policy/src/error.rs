//! Policy error types.

use thiserror::Error;

/// Policy errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The policy has no script, or only whitespace.
    #[error("script is required")]
    ScriptRequired,

    /// The script does not pass the runner's syntax check.
    #[error("invalid script: {0}")]
    InvalidScript(#[from] script::Error),

    /// Failed to parse a policy file.
    #[error("failed to parse policy: {0}")]
    Parse(String),

    /// Failed to serialize a policy.
    #[error("failed to serialize policy: {0}")]
    Serialize(String),

    /// An I/O error occurred while reading policy.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
