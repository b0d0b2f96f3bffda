//! Read-only view of the host scheduler.

use crate::{
    AxisKind, Error, Node, ParametersDecoration, QueueItem, Result, Task, TaskKind, Template,
};
use label::Label;
use std::collections::BTreeMap;

/// Host state consulted during admission.
///
/// Passed by reference into every admission call. Nothing in this crate keeps
/// a reference to it between calls.
pub trait Host: Send + Sync {
    /// Look up a template by name.
    fn template(&self, name: &str) -> Option<&Template>;

    /// Execution nodes known to the host.
    fn nodes(&self) -> &[Node];
}

/// In-memory host state.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    templates: BTreeMap<String, Template>,
    nodes: Vec<Node>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template: Template) -> Result<Self> {
        self.add_template(template)?;
        Ok(self)
    }

    pub fn with_node(mut self, node: Node) -> Result<Self> {
        self.add_node(node)?;
        Ok(self)
    }

    pub fn add_template(&mut self, template: Template) -> Result<()> {
        if self.templates.contains_key(&template.name) {
            return Err(Error::DuplicateTemplate(template.name));
        }
        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.iter().any(|n| n.name == node.name) {
            return Err(Error::DuplicateNode(node.name));
        }
        self.nodes.push(node);
        Ok(())
    }

    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    /// Mutable access for reconfiguration between admission attempts.
    pub fn template_mut(&mut self, name: &str) -> Option<&mut Template> {
        self.templates.get_mut(name)
    }

    /// One child task per axis combination of a matrix template.
    pub fn matrix_children(&self, name: &str) -> Result<Vec<Task>> {
        let template = self
            .template(name)
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))?;
        if !template.is_matrix() {
            return Err(Error::NotMatrix(name.to_string()));
        }
        Ok(template
            .combinations()
            .into_iter()
            .map(|combination| Task::matrix_child(name, combination))
            .collect())
    }

    /// Queue items for one submission of `name`.
    ///
    /// A matrix template yields one item per combination. Every item carries
    /// the template's default parameters overlaid with `parameters`.
    pub fn queue_items(
        &self,
        name: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<Vec<QueueItem>> {
        let template = self
            .template(name)
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))?;

        let tasks = if template.is_matrix() {
            self.matrix_children(name)?
        } else {
            vec![Task::new(name)]
        };

        let params: ParametersDecoration = template
            .parameters
            .iter()
            .chain(parameters)
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        Ok(tasks
            .into_iter()
            .map(|task| {
                let mut item = QueueItem::new(task);
                if !params.is_empty() {
                    item.decorations.push(params.clone());
                }
                item
            })
            .collect())
    }
}

impl Host for Snapshot {
    fn template(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    fn nodes(&self) -> &[Node] {
        &self.nodes
    }
}

/// The label the node-matching step applies to `item`.
///
/// The first label override wins. Without one, an ordinary task uses its
/// template's static label; a matrix child requires every label-axis value
/// of its combination, falling back to the parent's static label.
pub fn assigned_label(host: &dyn Host, item: &QueueItem) -> Option<Label> {
    if let Some(found) = item.decorations.label_override() {
        return Some(found.label.clone());
    }

    match &item.task.kind {
        TaskKind::Ordinary => host.template(&item.task.template)?.label.clone(),
        TaskKind::MatrixChild {
            parent,
            combination,
        } => {
            let parent = host.template(parent)?;
            parent
                .axes
                .iter()
                .filter(|axis| axis.kind == AxisKind::Label)
                .filter_map(|axis| combination.get(&axis.name))
                .filter_map(|value| label::parse(value).ok())
                .reduce(|acc, next| Label::And(Box::new(acc), Box::new(next)))
                .or_else(|| parent.label.clone())
        }
    }
}

/// Nodes that satisfy `label`; every node when there is no label.
pub fn eligible_nodes<'h>(host: &'h dyn Host, label: Option<&Label>) -> Vec<&'h Node> {
    host.nodes()
        .iter()
        .filter(|node| label.is_none_or(|label| node.satisfies(label)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Axis, LabelOverride};

    fn snapshot() -> Snapshot {
        Snapshot::new()
            .with_node(Node::new("slave1", ["test1"]))
            .unwrap()
            .with_node(Node::new("slave2", ["test2", "common1"]))
            .unwrap()
            .with_node(Node::new("slave3", ["test3", "common1", "common2"]))
            .unwrap()
            .with_template(
                Template::new("build")
                    .with_label(label::parse("test2").unwrap())
                    .with_parameter("PLATFORM", "linux"),
            )
            .unwrap()
            .with_template(
                Template::new("matrix")
                    .with_axis(Axis::text("axisParam", ["axis1", "axis2"]))
                    .with_axis(Axis::label("axisLabel", ["test1", "test3"])),
            )
            .unwrap()
    }

    #[test]
    fn test_duplicates_rejected() {
        let err = snapshot().with_template(Template::new("build")).unwrap_err();
        assert!(matches!(err, Error::DuplicateTemplate(name) if name == "build"));

        let err = snapshot().with_node(Node::new("slave1", ["x"])).unwrap_err();
        assert!(matches!(err, Error::DuplicateNode(name) if name == "slave1"));
    }

    #[test]
    fn test_matrix_children() {
        let host = snapshot();
        let children = host.matrix_children("matrix").unwrap();
        assert_eq!(children.len(), 4);
        assert!(children.iter().all(|c| c.policy_owner() == "matrix"));

        assert!(matches!(host.matrix_children("build"), Err(Error::NotMatrix(_))));
        assert!(matches!(host.matrix_children("nosuch"), Err(Error::TemplateNotFound(_))));
    }

    #[test]
    fn test_queue_items_overlay_parameters() {
        let host = snapshot();
        let overrides = BTreeMap::from([("EXTRA".to_string(), "1".to_string())]);
        let items = host.queue_items("build", &overrides).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].decorations.contributors().count(), 1);

        let items = host.queue_items("matrix", &BTreeMap::new()).unwrap();
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|item| item.decorations.is_empty()));
    }

    #[test]
    fn test_assigned_label_static_and_override() {
        let host = snapshot();
        let mut item = QueueItem::new(Task::new("build"));
        assert_eq!(assigned_label(&host, &item).unwrap().to_string(), "test2");

        item.decorations
            .prepend(LabelOverride::new(label::parse("test3").unwrap()));
        let label = assigned_label(&host, &item).unwrap();
        assert_eq!(label.to_string(), "test3");

        let names: Vec<_> = eligible_nodes(&host, Some(&label))
            .into_iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(names, vec!["slave3"]);
    }

    #[test]
    fn test_assigned_label_matrix_child_uses_label_axes() {
        let host = snapshot();
        let task = Task::matrix_child(
            "matrix",
            crate::Combination::new()
                .with("axisParam", "axis1")
                .with("axisLabel", "test1"),
        );
        let label = assigned_label(&host, &QueueItem::new(task)).unwrap();
        assert_eq!(label.to_string(), "test1");
    }

    #[test]
    fn test_eligible_nodes_without_label() {
        let host = snapshot();
        assert_eq!(eligible_nodes(&host, None).len(), 3);
    }
}
