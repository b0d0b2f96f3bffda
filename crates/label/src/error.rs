//! Label expression error types.

use thiserror::Error;

/// Label expression errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The expression is not syntactically valid.
    #[error("invalid label expression '{expression}' at offset {position}: {message}")]
    Syntax {
        expression: String,
        position: usize,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
