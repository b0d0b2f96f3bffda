//! Variable binding visible to a policy script.

use crate::{ScriptObject, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved name of the task handle in every binding.
pub const CURRENT_JOB: &str = "currentJob";

/// String variables plus the task handle, built for a single evaluation.
pub struct Binding<'a> {
    variables: BTreeMap<String, String>,
    current_job: &'a dyn ScriptObject,
}

impl<'a> Binding<'a> {
    pub fn new(variables: BTreeMap<String, String>, current_job: &'a dyn ScriptObject) -> Self {
        Self {
            variables,
            current_job,
        }
    }

    /// Resolve a name. The task handle shadows a string variable of the
    /// same name.
    pub fn lookup(&self, name: &str) -> Option<Value<'a>> {
        if name == CURRENT_JOB {
            return Some(Value::Object(self.current_job));
        }
        self.variables.get(name).map(|v| Value::Str(v.clone()))
    }
}

impl fmt::Debug for Binding<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("variables", &self.variables)
            .field(CURRENT_JOB, &self.current_job.display())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Job;

    impl ScriptObject for Job {
        fn type_name(&self) -> &str {
            "Job"
        }

        fn property(&self, name: &str) -> Option<Value<'_>> {
            (name == "name").then(|| Value::from("job"))
        }

        fn display(&self) -> String {
            "job".to_string()
        }
    }

    #[test]
    fn test_handle_shadows_variable() {
        let job = Job;
        let mut vars = BTreeMap::new();
        vars.insert(CURRENT_JOB.to_string(), "spoofed".to_string());
        vars.insert("A".to_string(), "1".to_string());
        let binding = Binding::new(vars, &job);

        assert!(matches!(binding.lookup(CURRENT_JOB), Some(Value::Object(_))));
        assert_eq!(binding.lookup("A"), Some(Value::from("1")));
        assert_eq!(binding.lookup("B"), None);
    }
}
