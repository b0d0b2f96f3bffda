//! The admission decision hook.

use crate::{BindingBuilder, Evaluator, Host, QueueItem};
use script::{Interpreter, ScriptRunner};
use tracing::trace;

/// Decides, per admission attempt, whether a task may enter the queue and
/// which label it must satisfy.
#[derive(Debug, Clone)]
pub struct DecisionHook<R = Interpreter> {
    runner: R,
}

impl<R: ScriptRunner> DecisionHook<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Run the applicable policy for `item`.
    ///
    /// Matrix children are governed by their parent template's policy. Tasks
    /// without a policy are admitted untouched. Returns `false` when this
    /// attempt must not be admitted.
    pub fn admit(&self, host: &dyn Host, item: &mut QueueItem) -> bool {
        let owner = item.task.policy_owner();
        let Some(policy) = host.template(owner).and_then(|t| t.policy.as_ref()) else {
            trace!(task = %item.task.name, template = owner, "no label policy configured");
            return true;
        };

        Evaluator::new(policy, &self.runner).evaluate(
            &BindingBuilder::new(host),
            &item.task,
            &mut item.decorations,
        )
    }
}

impl Default for DecisionHook<Interpreter> {
    fn default() -> Self {
        Self::new(Interpreter)
    }
}
