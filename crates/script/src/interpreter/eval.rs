//! Tree-walking evaluation of parsed scripts.

use std::collections::BTreeMap;

use tracing::debug;

use super::ast::{BinOp, Expr, Part, Stmt};
use crate::{Binding, Error, Result, Value};

enum Flow<'a> {
    Next(Value<'a>),
    Return(Value<'a>),
}

/// Run a parsed program. The result is the value of the first `return`, or
/// of the last statement executed.
pub(crate) fn run<'a>(program: &[Stmt], binding: &Binding<'a>, sandboxed: bool) -> Result<Value<'a>> {
    let mut scope = Scope {
        binding,
        locals: BTreeMap::new(),
        sandboxed,
    };
    match scope.exec_block(program)? {
        Flow::Next(value) | Flow::Return(value) => Ok(value),
    }
}

struct Scope<'s, 'a> {
    binding: &'s Binding<'a>,
    locals: BTreeMap<String, Value<'a>>,
    sandboxed: bool,
}

impl<'a> Scope<'_, 'a> {
    fn exec_block(&mut self, stmts: &[Stmt]) -> Result<Flow<'a>> {
        let mut last = Value::Null;
        for stmt in stmts {
            match self.exec(stmt)? {
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Next(value) => last = value,
            }
        }
        Ok(Flow::Next(last))
    }

    fn exec(&mut self, stmt: &Stmt) -> Result<Flow<'a>> {
        match stmt {
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                if self.eval(cond)?.truthy() {
                    self.exec_block(then)
                } else if let Some(otherwise) = otherwise {
                    self.exec_block(otherwise)
                } else {
                    Ok(Flow::Next(Value::Null))
                }
            }
            Stmt::Def { name, value } => {
                let value = self.eval(value)?;
                self.locals.insert(name.clone(), value.clone());
                Ok(Flow::Next(value))
            }
            Stmt::Expr(expr) => Ok(Flow::Next(self.eval(expr)?)),
        }
    }

    fn eval(&self, expr: &Expr) -> Result<Value<'a>> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        Part::Lit(s) => out.push_str(s),
                        Part::Expr(e) => out.push_str(&self.eval(e)?.to_string()),
                    }
                }
                Ok(Value::Str(out))
            }
            Expr::Ident(name) => self.lookup(name),
            Expr::Property(target, name) => {
                let target = self.eval(target)?;
                property(target, name)
            }
            Expr::Index(target, index) => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                match index {
                    Value::Str(key) => property(target, &key),
                    other => Err(Error::Type(format!(
                        "cannot index {} with {}",
                        target.kind(),
                        other.kind()
                    ))),
                }
            }
            Expr::Call { name, args } => {
                let args = self.eval_args(args)?;
                self.call(name, args)
            }
            Expr::Method { target, name, args } => {
                let target = self.eval(target)?;
                let args = self.eval_args(args)?;
                method(target, name, args)
            }
            Expr::Not(inner) => Ok(Value::Bool(!self.eval(inner)?.truthy())),
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs),
            Expr::Ternary(cond, then, otherwise) => {
                if self.eval(cond)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Elvis(value, fallback) => {
                let value = self.eval(value)?;
                if value.truthy() {
                    Ok(value)
                } else {
                    self.eval(fallback)
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value<'a>> {
        if let Some(value) = self.locals.get(name) {
            return Ok(value.clone());
        }
        self.binding
            .lookup(name)
            .ok_or_else(|| Error::MissingVariable(name.to_string()))
    }

    fn eval_args(&self, args: &[Expr]) -> Result<Vec<Value<'a>>> {
        args.iter().map(|arg| self.eval(arg)).collect()
    }

    fn binary(&self, op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<Value<'a>> {
        match op {
            BinOp::And => Ok(Value::Bool(
                self.eval(lhs)?.truthy() && self.eval(rhs)?.truthy(),
            )),
            BinOp::Or => Ok(Value::Bool(
                self.eval(lhs)?.truthy() || self.eval(rhs)?.truthy(),
            )),
            BinOp::Eq => Ok(Value::Bool(self.eval(lhs)? == self.eval(rhs)?)),
            BinOp::Ne => Ok(Value::Bool(self.eval(lhs)? != self.eval(rhs)?)),
            BinOp::Concat => match self.eval(lhs)? {
                Value::Str(mut s) => {
                    s.push_str(&self.eval(rhs)?.to_string());
                    Ok(Value::Str(s))
                }
                other => Err(Error::Type(format!(
                    "cannot apply '+' to {}",
                    other.kind()
                ))),
            },
        }
    }

    fn call(&self, name: &str, args: Vec<Value<'a>>) -> Result<Value<'a>> {
        match name {
            "env" => {
                if self.sandboxed {
                    debug!(function = name, "refused host access in sandbox");
                    return Err(Error::Sandbox(format!("{name}()")));
                }
                let key = single_str_arg(name, args)?;
                Ok(Value::from(std::env::var(&key).ok()))
            }
            _ => Err(Error::UnknownFunction(name.to_string())),
        }
    }
}

fn property<'a>(target: Value<'a>, name: &str) -> Result<Value<'a>> {
    match target {
        Value::Null => Err(Error::NullReference(name.to_string())),
        Value::Map(map) => Ok(Value::from(map.get(name).cloned())),
        Value::Object(object) => object.property(name).ok_or_else(|| Error::MissingProperty {
            target: object.type_name().to_string(),
            property: name.to_string(),
        }),
        other => Err(Error::MissingProperty {
            target: other.kind().to_string(),
            property: name.to_string(),
        }),
    }
}

fn method<'a>(target: Value<'a>, name: &str, args: Vec<Value<'a>>) -> Result<Value<'a>> {
    if name == "toString" {
        expect_arity(name, &args, 0)?;
        return Ok(Value::Str(target.to_string()));
    }

    match (target, name) {
        (Value::Null, _) => Err(Error::NullReference(format!("{name}()"))),
        (Value::Str(s), "trim") => {
            expect_arity(name, &args, 0)?;
            Ok(Value::Str(s.trim().to_string()))
        }
        (Value::Str(s), "toLowerCase") => {
            expect_arity(name, &args, 0)?;
            Ok(Value::Str(s.to_lowercase()))
        }
        (Value::Str(s), "toUpperCase") => {
            expect_arity(name, &args, 0)?;
            Ok(Value::Str(s.to_uppercase()))
        }
        (Value::Str(s), "isEmpty") => {
            expect_arity(name, &args, 0)?;
            Ok(Value::Bool(s.is_empty()))
        }
        (Value::Str(s), "startsWith") => {
            let prefix = single_str_arg(name, args)?;
            Ok(Value::Bool(s.starts_with(&prefix)))
        }
        (Value::Str(s), "endsWith") => {
            let suffix = single_str_arg(name, args)?;
            Ok(Value::Bool(s.ends_with(&suffix)))
        }
        (Value::Str(s), "contains") => {
            let needle = single_str_arg(name, args)?;
            Ok(Value::Bool(s.contains(&needle)))
        }
        (Value::Map(map), "containsKey") => {
            let key = single_str_arg(name, args)?;
            Ok(Value::Bool(map.contains_key(&key)))
        }
        (Value::Map(map), "get") => {
            let key = single_str_arg(name, args)?;
            Ok(Value::from(map.get(&key).cloned()))
        }
        (Value::Map(map), "isEmpty") => {
            expect_arity(name, &args, 0)?;
            Ok(Value::Bool(map.is_empty()))
        }
        (target, _) => Err(Error::UnknownMethod {
            target: target.kind().to_string(),
            method: name.to_string(),
        }),
    }
}

fn expect_arity(name: &str, args: &[Value<'_>], arity: usize) -> Result<()> {
    if args.len() == arity {
        Ok(())
    } else {
        Err(Error::Type(format!(
            "{name}() takes {arity} argument(s), got {}",
            args.len()
        )))
    }
}

fn single_str_arg(name: &str, args: Vec<Value<'_>>) -> Result<String> {
    expect_arity(name, &args, 1)?;
    match args.into_iter().next() {
        Some(Value::Str(s)) => Ok(s),
        Some(other) => Err(Error::Type(format!(
            "{name}() expects a String, got {}",
            other.kind()
        ))),
        None => Err(Error::Type(format!("{name}() expects a String"))),
    }
}
