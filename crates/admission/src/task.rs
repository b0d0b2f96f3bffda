//! Tasks submitted for admission.

use crate::Decorations;
use script::{ScriptObject, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identifies one admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis name → selected value for one matrix child. Fixed when the child is
/// created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Combination(BTreeMap<String, String>);

impl Combination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, axis: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(axis.into(), value.into());
        self
    }

    pub fn get(&self, axis: &str) -> Option<&str> {
        self.0.get(axis).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

/// `axis1=value1,axis2=value2`
impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (axis, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{axis}={value}")?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Combination {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Whether a task stands alone or is one cell of a matrix template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskKind {
    Ordinary,
    /// Instance of `parent` for a single axis combination. Matrix children
    /// never carry a policy of their own; the parent's applies.
    MatrixChild {
        parent: String,
        combination: Combination,
    },
}

/// The unit of work being admitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Name of the template this task was instantiated from.
    pub template: String,
    pub kind: TaskKind,
}

impl Task {
    /// A task for an ordinary template.
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        Self {
            id: TaskId::new(),
            name: template.clone(),
            template,
            kind: TaskKind::Ordinary,
        }
    }

    /// A matrix child of `parent`, named `parent/axis=value,...`.
    pub fn matrix_child(parent: impl Into<String>, combination: Combination) -> Self {
        let parent = parent.into();
        let name = format!("{parent}/{combination}");
        Self {
            id: TaskId::new(),
            name: name.clone(),
            template: name,
            kind: TaskKind::MatrixChild {
                parent,
                combination,
            },
        }
    }

    pub fn parent(&self) -> Option<&str> {
        match &self.kind {
            TaskKind::Ordinary => None,
            TaskKind::MatrixChild { parent, .. } => Some(parent),
        }
    }

    pub fn combination(&self) -> Option<&Combination> {
        match &self.kind {
            TaskKind::Ordinary => None,
            TaskKind::MatrixChild { combination, .. } => Some(combination),
        }
    }

    /// Template whose policy governs this task.
    pub fn policy_owner(&self) -> &str {
        self.parent().unwrap_or(&self.template)
    }
}

/// Exposed to policy scripts as `currentJob`.
impl ScriptObject for Task {
    fn type_name(&self) -> &str {
        "Task"
    }

    fn property(&self, name: &str) -> Option<Value<'_>> {
        let value = match name {
            "name" => Value::from(self.name.as_str()),
            "id" => Value::Str(self.id.to_string()),
            "template" => Value::from(self.template.as_str()),
            "parent" => Value::from(self.parent()),
            "combination" => Value::Map(
                self.combination()
                    .map(|c| c.as_map().clone())
                    .unwrap_or_default(),
            ),
            "matrixChild" => Value::Bool(self.parent().is_some()),
            _ => return None,
        };
        Some(value)
    }

    fn display(&self) -> String {
        self.name.clone()
    }
}

/// One admission attempt: the task plus the decorations collected for it so
/// far.
#[derive(Debug)]
pub struct QueueItem {
    pub task: Task,
    pub decorations: Decorations,
}

impl QueueItem {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            decorations: Decorations::new(),
        }
    }

    pub fn with_decorations(task: Task, decorations: Decorations) -> Self {
        Self { task, decorations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinary_task() {
        let task = Task::new("build");
        assert_eq!(task.name, "build");
        assert_eq!(task.policy_owner(), "build");
        assert_eq!(task.parent(), None);
        assert_eq!(task.kind, TaskKind::Ordinary);
    }

    #[test]
    fn test_matrix_child_naming_and_owner() {
        let combination = Combination::new()
            .with("axisParam", "axis1")
            .with("axisLabel", "test1");
        let task = Task::matrix_child("matrix", combination.clone());

        assert_eq!(task.name, "matrix/axisLabel=test1,axisParam=axis1");
        assert_eq!(task.policy_owner(), "matrix");
        assert_eq!(task.combination(), Some(&combination));
    }

    #[test]
    fn test_ids_are_unique_per_attempt() {
        assert_ne!(Task::new("build").id, Task::new("build").id);
    }

    #[test]
    fn test_script_properties() {
        let task = Task::matrix_child("matrix", Combination::new().with("axisParam", "axis2"));
        assert_eq!(task.property("parent"), Some(Value::from("matrix")));
        assert_eq!(task.property("matrixChild"), Some(Value::Bool(true)));
        assert_eq!(task.property("nosuch"), None);

        let Some(Value::Map(map)) = task.property("combination") else {
            panic!("combination should be a map");
        };
        assert_eq!(map.get("axisParam").map(String::as_str), Some("axis2"));

        let ordinary = Task::new("build");
        assert_eq!(ordinary.property("parent"), Some(Value::Null));
        assert_eq!(ordinary.property("combination"), Some(Value::Map(BTreeMap::new())));
    }
}
