//! Script runner trait.

use crate::{Binding, Result, Value};

/// Executes policy scripts.
///
/// Implementations must not retain the binding after `run` returns; every
/// call gets a binding built for that call alone.
pub trait ScriptRunner: Send + Sync {
    /// Run `script` against `binding` and return its result.
    ///
    /// When `sandboxed` is set, operations that reach outside the binding
    /// (process environment, filesystem, network) must be refused.
    fn run<'a>(&self, script: &str, sandboxed: bool, binding: &Binding<'a>) -> Result<Value<'a>>;

    /// Check that `script` is syntactically valid without running it.
    fn validate_syntax(&self, script: &str) -> Result<()>;
}
