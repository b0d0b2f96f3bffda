//! Label assignment at queue admission.
//!
//! Every time a task is about to enter the queue, [`DecisionHook::admit`]
//! looks up the label policy of the task's template (a matrix child uses its
//! parent's), builds an environment for the policy script from the task's
//! decorations and matrix combination, runs the script and turns its result
//! into a [`LabelOverride`] placed at the front of the task's decorations.
//!
//! A script that fails, or that returns something which is not a label
//! expression, blocks the admission attempt.
//!
//! # Example
//!
//! ```
//! use admission::{DecisionHook, Node, QueueItem, Snapshot, Task, Template};
//! use policy::Policy;
//!
//! let host = Snapshot::new()
//!     .with_node(Node::new("nodeA", ["linux"]))?
//!     .with_template(Template::new("build").with_policy(Policy::new(r#"return "nodeA";"#)))?;
//!
//! let mut item = QueueItem::new(Task::new("build"));
//! assert!(DecisionHook::default().admit(&host, &mut item));
//!
//! let label = admission::assigned_label(&host, &item).unwrap();
//! let nodes = admission::eligible_nodes(&host, Some(&label));
//! assert_eq!(nodes[0].name, "nodeA");
//! # Ok::<(), admission::Error>(())
//! ```

mod binding;
mod decoration;
mod env;
mod error;
mod evaluator;
mod hook;
mod host;
mod task;
mod template;

pub use binding::BindingBuilder;
pub use decoration::{
    Decoration, Decorations, EnvironmentContributor, LabelOverride, ParametersDecoration,
    RunContext, RunEnvironment,
};
pub use env::EnvVars;
pub use error::{ContributorError, Error, Failure, Result};
pub use evaluator::{Evaluator, LabelDecision};
pub use hook::DecisionHook;
pub use host::{Host, Snapshot, assigned_label, eligible_nodes};
pub use task::{Combination, QueueItem, Task, TaskId, TaskKind};
pub use template::{Axis, AxisKind, Node, Template};
