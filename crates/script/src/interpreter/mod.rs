//! Built-in policy-script engine.
//!
//! The language is a small Groovy-flavoured subset: `return`, `if`/`else`,
//! `def`, string literals with `${}` and `$name` interpolation, property access, a
//! handful of string and map methods, `==`, `!=`, `&&`, `||`, `!`, `+`,
//! ternaries and the elvis operator.

mod ast;
mod eval;
mod parser;

use crate::{Binding, Result, ScriptRunner, Value};

/// Parses and evaluates policy scripts in-process.
#[derive(Debug, Default, Clone, Copy)]
pub struct Interpreter;

impl ScriptRunner for Interpreter {
    fn run<'a>(&self, script: &str, sandboxed: bool, binding: &Binding<'a>) -> Result<Value<'a>> {
        let program = parser::parse_script(script)?;
        eval::run(&program, binding, sandboxed)
    }

    fn validate_syntax(&self, script: &str) -> Result<()> {
        parser::parse_script(script).map(|_| ())
    }
}
