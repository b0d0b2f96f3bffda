//! Policy configuration and validation.

use crate::{Error, PolicyFile, Result};
use script::ScriptRunner;
use serde::{Deserialize, Serialize};

/// Script-driven label policy owned by a template.
///
/// Read-only while tasks are being admitted; replaced wholesale when the
/// owning template is reconfigured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Script text evaluated on every admission attempt.
    pub script: String,

    /// Run the script with host access refused.
    pub sandbox: bool,
}

impl Policy {
    /// Create a sandboxed policy.
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            sandbox: true,
        }
    }

    /// Create a policy whose script may reach outside its binding.
    pub fn unsandboxed(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            sandbox: false,
        }
    }

    /// True when there is no script to run.
    pub fn is_blank(&self) -> bool {
        self.script.trim().is_empty()
    }

    /// Configuration-time check: the script must be present and parse.
    ///
    /// Does not run the script; unbound variables are only detected when a
    /// task is admitted.
    pub fn validate(&self, runner: &dyn ScriptRunner) -> Result<()> {
        if self.is_blank() {
            return Err(Error::ScriptRequired);
        }
        runner.validate_syntax(&self.script)?;
        Ok(())
    }

    /// Serialize as a policy file in the current record shape.
    pub fn to_toml(&self) -> Result<String> {
        let file = PolicyFile {
            policy: self.clone().into(),
        };
        toml::to_string(&file).map_err(|e| Error::Serialize(e.to_string()))
    }
}
