//! Admission error types.

use thiserror::Error;

/// Errors building the host snapshot or its tasks.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("duplicate template: {0}")]
    DuplicateTemplate(String),

    #[error("duplicate node: {0}")]
    DuplicateNode(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Combinations were requested for a template without axes.
    #[error("template '{0}' has no axes")]
    NotMatrix(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure of an environment contributor while a binding is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContributorError {
    /// The contributor needs a live run, and none exists before admission.
    #[error("no run is available")]
    MissingRun,

    #[error("{0}")]
    Failed(String),
}

/// Why an evaluation rejected the task.
#[derive(Debug, Error)]
pub enum Failure {
    #[error("script is not configured")]
    ScriptRequired,

    #[error("failed to run script: {0}")]
    Execution(#[from] script::Error),

    #[error(transparent)]
    InvalidLabel(#[from] label::Error),
}
