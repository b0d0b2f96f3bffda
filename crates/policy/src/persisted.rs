//! On-disk policy shapes and their migration.

use crate::{Error, Policy, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A policy as found on disk.
///
/// The legacy shape is a bare script string. It predates the sandbox flag,
/// and scripts stored that way always ran unsandboxed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedPolicy {
    Legacy(String),
    Current(Policy),
}

/// Result of upgrading a persisted policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migrated {
    pub policy: Policy,
    /// True when the stored shape was the legacy one.
    pub migrated: bool,
}

impl PersistedPolicy {
    pub fn is_legacy(&self) -> bool {
        matches!(self, PersistedPolicy::Legacy(_))
    }

    /// Upgrade to the current record shape.
    pub fn migrate(self) -> Migrated {
        match self {
            PersistedPolicy::Legacy(script) => Migrated {
                policy: Policy::unsandboxed(script),
                migrated: true,
            },
            PersistedPolicy::Current(policy) => Migrated {
                policy,
                migrated: false,
            },
        }
    }
}

impl From<Policy> for PersistedPolicy {
    fn from(policy: Policy) -> Self {
        PersistedPolicy::Current(policy)
    }
}

/// A standalone policy file: a single `policy` key.
///
/// ```toml
/// [policy]
/// script = 'return "linux";'
/// sandbox = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyFile {
    pub policy: PersistedPolicy,
}

impl PolicyFile {
    /// Load a policy file, upgrading a legacy policy.
    pub fn load(path: impl AsRef<Path>) -> Result<Migrated> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a policy file from a TOML string, upgrading a legacy policy.
    pub fn parse(toml: &str) -> Result<Migrated> {
        let file: PolicyFile = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(file.policy.migrate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_current_shape() {
        let toml = r#"
[policy]
script = 'return "nodeA";'
sandbox = true
"#;
        let migrated = PolicyFile::parse(toml).unwrap();
        assert!(!migrated.migrated);
        assert_eq!(migrated.policy, Policy::new("return \"nodeA\";"));
    }

    #[test]
    fn test_parse_legacy_shape_migrates() {
        let toml = r#"policy = 'return "nodeA";'"#;
        let migrated = PolicyFile::parse(toml).unwrap();
        assert!(migrated.migrated);
        assert_eq!(migrated.policy.script, "return \"nodeA\";");
        assert!(!migrated.policy.sandbox);
    }

    #[test]
    fn test_record_requires_sandbox_flag() {
        let toml = r#"
[policy]
script = "return 'a';"
"#;
        assert!(matches!(PolicyFile::parse(toml), Err(Error::Parse(_))));
    }

    #[test]
    fn test_migration_is_one_directional() {
        let legacy: PersistedPolicy = serde_json::from_str("\"return 'a';\"").unwrap();
        assert!(legacy.is_legacy());

        let upgraded = PersistedPolicy::from(legacy.migrate().policy);
        let json = serde_json::to_value(&upgraded).unwrap();
        assert_eq!(json, serde_json::json!({ "script": "return 'a';", "sandbox": false }));

        let reloaded: PersistedPolicy = serde_json::from_value(json).unwrap();
        assert!(!reloaded.is_legacy());
    }

    #[test]
    fn test_load_missing_file() {
        let err = PolicyFile::load("/nonexistent/labelgate/policy.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
