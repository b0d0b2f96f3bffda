//! Policy evaluation.

use crate::{BindingBuilder, Decorations, Failure, LabelOverride, Task};
use label::Label;
use policy::Policy;
use script::ScriptRunner;
use tracing::{error, info};

/// Outcome of evaluating a policy for one task.
#[derive(Debug)]
pub enum LabelDecision {
    /// The script produced no label; the configured label stands.
    NoChange,
    /// The script produced a valid label expression.
    Resolved(Label),
    /// The task must not be admitted.
    Failed(Failure),
}

impl LabelDecision {
    pub fn admits(&self) -> bool {
        !matches!(self, LabelDecision::Failed(_))
    }
}

/// Runs one policy against one task.
pub struct Evaluator<'p> {
    policy: &'p Policy,
    runner: &'p dyn ScriptRunner,
}

impl<'p> Evaluator<'p> {
    pub fn new(policy: &'p Policy, runner: &'p dyn ScriptRunner) -> Self {
        Self { policy, runner }
    }

    /// Evaluate the policy without touching `decorations`.
    pub fn decide(
        &self,
        builder: &BindingBuilder<'_>,
        task: &Task,
        decorations: &Decorations,
    ) -> LabelDecision {
        let template = task.policy_owner();

        if self.policy.is_blank() {
            error!(task = %task.name, template, "label policy has no script, rejecting task");
            return LabelDecision::Failed(Failure::ScriptRequired);
        }

        let binding = builder.build(task, decorations);
        let output = match self.runner.run(&self.policy.script, self.policy.sandbox, &binding) {
            Ok(value) => value.into_text(),
            Err(e) => {
                error!(task = %task.name, template, error = %e, "label policy script failed");
                return LabelDecision::Failed(e.into());
            }
        };

        if output.trim().is_empty() {
            info!(task = %task.name, template, "label policy returned no label, keeping configured label");
            return LabelDecision::NoChange;
        }

        match label::parse(&output) {
            Ok(label) => {
                info!(task = %task.name, template, label = %label, "label policy assigned label");
                LabelDecision::Resolved(label)
            }
            Err(e) => {
                error!(
                    task = %task.name,
                    template,
                    output = %output,
                    error = %e,
                    "label policy returned an invalid label expression"
                );
                LabelDecision::Failed(e.into())
            }
        }
    }

    /// Evaluate the policy and apply the decision.
    ///
    /// A resolved label is prepended to `decorations` as a [`LabelOverride`].
    /// Returns whether the task may be admitted.
    pub fn evaluate(
        &self,
        builder: &BindingBuilder<'_>,
        task: &Task,
        decorations: &mut Decorations,
    ) -> bool {
        match self.decide(builder, task, decorations) {
            LabelDecision::NoChange => true,
            LabelDecision::Resolved(label) => {
                decorations.prepend(LabelOverride::new(label));
                true
            }
            LabelDecision::Failed(_) => false,
        }
    }
}
