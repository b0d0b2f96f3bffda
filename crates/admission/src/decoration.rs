//! Decorations attached to a task during admission.

use crate::{ContributorError, EnvVars};
use label::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata attached to a queue item.
///
/// A decoration may play one or more roles; the accessors return `None` for
/// roles it does not play.
pub trait Decoration: fmt::Debug + Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// This decoration as an environment contributor.
    fn as_contributor(&self) -> Option<&dyn EnvironmentContributor> {
        None
    }

    /// This decoration as a label override.
    fn as_label_override(&self) -> Option<&LabelOverride> {
        None
    }
}

/// A decoration that can merge variables into an environment.
pub trait EnvironmentContributor: Send + Sync {
    /// Merge variables into `env`.
    ///
    /// `run` is `None` during admission: no run exists yet. Contributors that
    /// need one should return [`ContributorError::MissingRun`], which
    /// [`RunContext::require`] does for them.
    fn contribute(
        &self,
        run: Option<&RunContext>,
        env: &mut EnvVars,
    ) -> std::result::Result<(), ContributorError>;
}

/// A live run of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub number: u64,
    pub workspace: String,
}

impl RunContext {
    pub fn require(run: Option<&RunContext>) -> std::result::Result<&RunContext, ContributorError> {
        run.ok_or(ContributorError::MissingRun)
    }
}

/// Ordered decorations of one queue item.
#[derive(Debug, Default)]
pub struct Decorations(Vec<Box<dyn Decoration>>);

impl Decorations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decoration: impl Decoration + 'static) {
        self.0.push(Box::new(decoration));
    }

    /// Insert ahead of every existing decoration.
    pub fn prepend(&mut self, decoration: impl Decoration + 'static) {
        self.0.insert(0, Box::new(decoration));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Decoration> {
        self.0.get(index).map(|d| d.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Decoration> {
        self.0.iter().map(|d| d.as_ref())
    }

    /// Environment contributors in list order.
    pub fn contributors(&self) -> impl Iterator<Item = (&str, &dyn EnvironmentContributor)> {
        self.iter()
            .filter_map(|d| d.as_contributor().map(|c| (d.name(), c)))
    }

    /// The override the node-matching step must honour: the first one in
    /// list order.
    pub fn label_override(&self) -> Option<&LabelOverride> {
        self.iter().find_map(|d| d.as_label_override())
    }

    pub fn label_overrides(&self) -> impl Iterator<Item = &LabelOverride> {
        self.iter().filter_map(|d| d.as_label_override())
    }
}

/// Build parameters chosen for a task. Usable without a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParametersDecoration {
    parameters: BTreeMap<String, String>,
}

impl ParametersDecoration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParametersDecoration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            parameters: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Decoration for ParametersDecoration {
    fn name(&self) -> &str {
        "parameters"
    }

    fn as_contributor(&self) -> Option<&dyn EnvironmentContributor> {
        Some(self)
    }
}

impl EnvironmentContributor for ParametersDecoration {
    fn contribute(
        &self,
        _run: Option<&RunContext>,
        env: &mut EnvVars,
    ) -> std::result::Result<(), ContributorError> {
        for (name, value) in &self.parameters {
            env.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}

/// Variables describing the live run (`BUILD_NUMBER`, `WORKSPACE`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunEnvironment;

impl Decoration for RunEnvironment {
    fn name(&self) -> &str {
        "run-environment"
    }

    fn as_contributor(&self) -> Option<&dyn EnvironmentContributor> {
        Some(self)
    }
}

impl EnvironmentContributor for RunEnvironment {
    fn contribute(
        &self,
        run: Option<&RunContext>,
        env: &mut EnvVars,
    ) -> std::result::Result<(), ContributorError> {
        let run = RunContext::require(run)?;
        env.insert("BUILD_NUMBER", run.number.to_string());
        env.insert("WORKSPACE", run.workspace.clone());
        Ok(())
    }
}

/// A label that replaces the task's statically configured one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOverride {
    pub label: Label,
}

impl LabelOverride {
    pub fn new(label: Label) -> Self {
        Self { label }
    }
}

impl Decoration for LabelOverride {
    fn name(&self) -> &str {
        "label-override"
    }

    fn as_label_override(&self) -> Option<&LabelOverride> {
        Some(self)
    }
}
