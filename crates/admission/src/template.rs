//! Templates, matrix axes and execution nodes.

use crate::{Combination, EnvVars};
use label::Label;
use policy::Policy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How an axis turns its stored value into a variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisKind {
    /// Values are plain strings.
    #[default]
    Text,
    /// Values are node labels, stored in label-expression syntax.
    Label,
}

/// A named matrix axis with its allowed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    #[serde(default)]
    pub kind: AxisKind,
    pub values: Vec<String>,
}

impl Axis {
    pub fn text(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            kind: AxisKind::Text,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn label(name: impl Into<String>, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            kind: AxisKind::Label,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Set this axis' variable for `value`.
    ///
    /// Label axes contribute the label name itself, so a quoted stored
    /// value such as `"linux x64"` becomes `linux x64`.
    pub fn contribute(&self, value: &str, env: &mut EnvVars) {
        let value = match self.kind {
            AxisKind::Text => value.to_string(),
            AxisKind::Label => match label::parse(value) {
                Ok(Label::Atom(name)) => name,
                _ => value.to_string(),
            },
        };
        env.insert(self.name.clone(), value);
    }
}

/// Reusable configuration that tasks are instantiated from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    /// Statically configured label, used when no override applies.
    pub label: Option<Label>,
    /// Default build parameters.
    pub parameters: BTreeMap<String, String>,
    pub axes: Vec<Axis>,
    pub policy: Option<Policy>,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axes.push(axis);
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn is_matrix(&self) -> bool {
        !self.axes.is_empty()
    }

    pub fn find_axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.name == name)
    }

    /// Every axis combination, in axis declaration order.
    pub fn combinations(&self) -> Vec<Combination> {
        self.axes.iter().fold(vec![Combination::new()], |acc, axis| {
            acc.iter()
                .flat_map(|partial| {
                    axis.values
                        .iter()
                        .map(|value| partial.clone().with(axis.name.clone(), value.clone()))
                })
                .collect()
        })
    }
}

/// An execution node and the labels it satisfies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl Node {
    pub fn new(name: impl Into<String>, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Labels including the node's own name.
    pub fn label_set(&self) -> BTreeSet<String> {
        let mut set = self.labels.clone();
        set.insert(self.name.clone());
        set
    }

    pub fn satisfies(&self, label: &Label) -> bool {
        label.matches(&self.label_set())
    }
}
