//! Values produced and consumed by policy scripts.

use std::collections::BTreeMap;
use std::fmt;

/// A host object exposed to scripts by reference.
///
/// Scripts read it through property access (`currentJob.name`); they never
/// receive a copy or a string rendering unless they ask for one.
pub trait ScriptObject: Send + Sync {
    /// Type name used in error messages.
    fn type_name(&self) -> &str;

    /// Look up a property. `None` means the property does not exist.
    fn property(&self, name: &str) -> Option<Value<'_>>;

    /// Textual form, as returned by `toString()`.
    fn display(&self) -> String;
}

/// A script value.
#[derive(Clone, Default)]
pub enum Value<'a> {
    #[default]
    Null,
    Bool(bool),
    Str(String),
    Map(BTreeMap<String, String>),
    Object(&'a dyn ScriptObject),
}

impl<'a> Value<'a> {
    /// Groovy truth: `null`, `false`, empty strings and empty maps are false.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// Textual form of a script result. `null` becomes the empty string.
    pub fn into_text(self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Str(s) => s,
            other => other.to_string(),
        }
    }

    pub(crate) fn kind(&self) -> &str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "Boolean",
            Value::Str(_) => "String",
            Value::Map(_) => "Map",
            Value::Object(o) => o.type_name(),
        }
    }
}

/// Rendering used for string concatenation and interpolation, where `null`
/// prints as `null`.
impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => f.write_str(s),
            Value::Map(m) => {
                if m.is_empty() {
                    return f.write_str("[:]");
                }
                f.write_str("[")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("]")
            }
            Value::Object(o) => f.write_str(&o.display()),
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Value::Object(o) => write!(f, "Object({}: {})", o.type_name(), o.display()),
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.type_name() == b.type_name() && a.display() == b.display()
            }
            _ => false,
        }
    }
}

impl From<&str> for Value<'_> {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<String>> From<Option<T>> for Value<'_> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, |s| Value::Str(s.into()))
    }
}
