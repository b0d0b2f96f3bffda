//! Policy script execution.
//!
//! A policy script is evaluated against a [`Binding`]: a flat set of string
//! variables plus one object handle, `currentJob`, describing the task being
//! admitted. The [`ScriptRunner`] trait is the seam between the admission
//! pipeline and whatever engine runs the script; [`Interpreter`] is the
//! built-in engine for a small Groovy-flavoured expression language.
//!
//! # Example
//!
//! ```
//! use script::{Binding, Interpreter, ScriptObject, ScriptRunner, Value};
//! use std::collections::BTreeMap;
//!
//! struct Job;
//!
//! impl ScriptObject for Job {
//!     fn type_name(&self) -> &str {
//!         "Job"
//!     }
//!
//!     fn property(&self, name: &str) -> Option<Value<'_>> {
//!         (name == "name").then(|| Value::from("build"))
//!     }
//!
//!     fn display(&self) -> String {
//!         "build".to_string()
//!     }
//! }
//!
//! let job = Job;
//! let mut vars = BTreeMap::new();
//! vars.insert("PLATFORM".to_string(), "linux".to_string());
//! let binding = Binding::new(vars, &job);
//!
//! let script = r#"
//!     if (PLATFORM == "linux") {
//!         return "${currentJob.name}-linux";
//!     }
//!     return null;
//! "#;
//! let out = Interpreter.run(script, true, &binding)?;
//! assert_eq!(out.into_text(), "build-linux");
//! # Ok::<(), script::Error>(())
//! ```

mod binding;
mod error;
mod interpreter;
mod runner;
mod value;

pub use binding::{Binding, CURRENT_JOB};
pub use error::{Error, Result};
pub use interpreter::Interpreter;
pub use runner::ScriptRunner;
pub use value::{ScriptObject, Value};
