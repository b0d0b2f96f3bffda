//! Queue snapshot loading from labelgate.toml.

use crate::logger::{LoggerConfig, LoggerFormat};
use admission::{Axis, Node, Snapshot, Template};
use label::Label;
use policy::PersistedPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Top-level configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Execution nodes.
    #[serde(default, rename = "node")]
    pub nodes: Vec<Node>,

    /// Templates, with their label policies.
    #[serde(default, rename = "template")]
    pub templates: Vec<TemplateConfig>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<LoggerFormat>,

    #[serde(default)]
    pub with_targets: bool,
}

impl LoggingConfig {
    pub fn logger(&self) -> LoggerConfig {
        let defaults = LoggerConfig::default();
        LoggerConfig {
            format: self.format.unwrap_or(defaults.format),
            level: self.level.clone().unwrap_or(defaults.level),
            with_targets: self.with_targets,
        }
    }
}

/// A template as written in the file. The policy may still be in its
/// legacy shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub axes: Vec<Axis>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PersistedPolicy>,
}

impl TemplateConfig {
    fn to_template(&self) -> Template {
        let policy = self.policy.clone().map(|persisted| {
            let migrated = persisted.migrate();
            if migrated.migrated {
                info!(template = %self.name, "upgraded legacy policy on load");
            }
            migrated.policy
        });
        Template {
            name: self.name.clone(),
            label: self.label.clone(),
            parameters: self.parameters.clone(),
            axes: self.axes.clone(),
            policy,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Build the in-memory host state.
    pub fn snapshot(&self) -> Result<Snapshot, ConfigError> {
        let mut snapshot = Snapshot::new();
        for node in &self.nodes {
            snapshot.add_node(node.clone())?;
        }
        for template in &self.templates {
            snapshot.add_template(template.to_template())?;
        }
        Ok(snapshot)
    }

    /// Upgrade every legacy policy in place. Returns the names of the
    /// templates that changed.
    pub fn migrate(&mut self) -> Vec<String> {
        let mut upgraded = Vec::new();
        for template in &mut self.templates {
            let Some(persisted) = template.policy.take() else {
                continue;
            };
            let migrated = persisted.migrate();
            if migrated.migrated {
                upgraded.push(template.name.clone());
            }
            template.policy = Some(migrated.policy.into());
        }
        upgraded
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("failed to write config: {0}")]
    Serialize(String),

    #[error("invalid config: {0}")]
    Invalid(#[from] admission::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use admission::{AxisKind, Host};

    const SAMPLE: &str = r#"
[logging]
level = "info"
format = "json"

[[node]]
name = "slave1"
labels = ["test1"]

[[node]]
name = "slave3"
labels = ["test3", "common1", "common2"]

[[template]]
name = "build"
label = "test1"
parameters = { PLATFORM = "linux" }
policy = 'return "test3";'

[[template]]
name = "matrix"
axes = [
    { name = "axisParam", values = ["axis1", "axis2"] },
    { name = "axisLabel", kind = "label", values = ["test1", "test3"] },
]

[template.policy]
script = 'return axisLabel;'
sandbox = true
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.nodes.len(), 2);
        assert_eq!(config.templates.len(), 2);
        assert_eq!(config.logging.format, Some(LoggerFormat::Json));
        assert_eq!(config.templates[1].axes[1].kind, AxisKind::Label);

        let logger = config.logging.logger();
        assert_eq!(logger.level, "info");
    }

    #[test]
    fn test_snapshot_upgrades_legacy_policy() {
        let snapshot = Config::parse(SAMPLE).unwrap().snapshot().unwrap();

        let build = snapshot.template("build").unwrap();
        let policy = build.policy.as_ref().unwrap();
        assert!(!policy.sandbox);
        assert_eq!(build.label.as_ref().map(ToString::to_string), Some("test1".to_string()));
        assert_eq!(build.parameters.get("PLATFORM").map(String::as_str), Some("linux"));

        let matrix = snapshot.template("matrix").unwrap();
        assert!(matrix.policy.as_ref().unwrap().sandbox);
        assert!(matrix.is_matrix());
    }

    #[test]
    fn test_duplicate_template_rejected() {
        let toml = r#"
[[template]]
name = "build"

[[template]]
name = "build"
"#;
        let err = Config::parse(toml).unwrap().snapshot().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_migrate_rewrites_legacy_only() {
        let mut config = Config::parse(SAMPLE).unwrap();
        assert_eq!(config.migrate(), vec!["build".to_string()]);
        assert!(config.migrate().is_empty());

        let reloaded = Config::parse(&config.to_toml().unwrap()).unwrap();
        let policy = reloaded.templates[0].policy.as_ref().unwrap();
        assert!(!policy.is_legacy());
        assert_eq!(reloaded.templates[1].axes.len(), 2);
    }

    #[test]
    fn test_invalid_label_rejected_on_parse() {
        let toml = r#"
[[template]]
name = "build"
label = "a && "
"#;
        assert!(matches!(Config::parse(toml), Err(ConfigError::Parse(_))));
    }
}
