//! Environment binding construction.

use crate::{ContributorError, Decorations, EnvVars, Host, Task, TaskKind};
use script::Binding;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Builds the binding a policy script runs against.
///
/// Every call starts from an empty environment and owns everything it
/// produces, so one builder may serve concurrent admissions.
#[derive(Clone, Copy)]
pub struct BindingBuilder<'h> {
    host: &'h dyn Host,
}

impl<'h> BindingBuilder<'h> {
    pub fn new(host: &'h dyn Host) -> Self {
        Self { host }
    }

    /// Build the binding for `task`, with `task` itself bound as
    /// `currentJob`. Never fails: a contributor that errors is skipped.
    pub fn build<'t>(&self, task: &'t Task, decorations: &Decorations) -> Binding<'t> {
        let env = self.environment(task, decorations);
        debug!(task = %task.name, env = ?env, "built policy environment");
        Binding::new(env.into_inner(), task)
    }

    /// The string variables of the binding.
    pub fn environment(&self, task: &Task, decorations: &Decorations) -> EnvVars {
        let mut env = EnvVars::new();

        for (name, contributor) in decorations.contributors() {
            // Contributors write to a copy so a failure leaves no partial state.
            let mut scratch = env.clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                contributor.contribute(None, &mut scratch)
            }));
            match outcome {
                Ok(Ok(())) => env = scratch,
                Ok(Err(ContributorError::MissingRun)) => {
                    debug!(task = %task.name, contributor = name, "contributor needs a run, none exists yet");
                    env = scratch;
                }
                Ok(Err(ContributorError::Failed(reason))) => {
                    warn!(task = %task.name, contributor = name, %reason, "environment contributor failed");
                }
                Err(payload) => {
                    warn!(
                        task = %task.name,
                        contributor = name,
                        reason = panic_message(&*payload),
                        "environment contributor panicked"
                    );
                }
            }
        }

        env.resolve();

        if let TaskKind::MatrixChild {
            parent,
            combination,
        } = &task.kind
        {
            let parent = self.host.template(parent);
            for (axis_name, value) in combination.iter() {
                match parent.and_then(|t| t.find_axis(axis_name)) {
                    Some(axis) => axis.contribute(value, &mut env),
                    None => {
                        env.insert(axis_name, value);
                    }
                }
            }
        }

        env
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
