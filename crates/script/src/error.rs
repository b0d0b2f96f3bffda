//! Script error types.

use thiserror::Error;

/// Errors raised while parsing or running a policy script.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// The script text does not parse.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// An identifier is neither a local nor bound in the binding.
    #[error("no such variable: {0}")]
    MissingVariable(String),

    /// A property lookup on an object failed.
    #[error("no such property: {property} for {target}")]
    MissingProperty { target: String, property: String },

    /// A property or method was accessed on `null`.
    #[error("cannot access '{0}' on null")]
    NullReference(String),

    #[error("no such function: {0}")]
    UnknownFunction(String),

    #[error("no such method: {method} for {target}")]
    UnknownMethod { target: String, method: String },

    /// An operation received a value of the wrong kind.
    #[error("type error: {0}")]
    Type(String),

    /// The operation is refused when the script runs sandboxed.
    #[error("'{0}' is not permitted in the sandbox")]
    Sandbox(String),
}

pub type Result<T> = std::result::Result<T, Error>;
