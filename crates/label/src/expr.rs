//! Label expression tree.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Characters that cannot appear in an unquoted atom.
pub(crate) const RESERVED: &[char] = &['&', '|', '!', '(', ')', '<', '>', '"'];

/// A parsed label expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// A single label name.
    Atom(String),
    /// `!a`
    Not(Box<Label>),
    /// `a && b`
    And(Box<Label>, Box<Label>),
    /// `a || b`
    Or(Box<Label>, Box<Label>),
    /// `a -> b`
    Implies(Box<Label>, Box<Label>),
    /// `a <-> b`
    Iff(Box<Label>, Box<Label>),
}

impl Label {
    pub fn atom(name: impl Into<String>) -> Self {
        Label::Atom(name.into())
    }

    /// Evaluate the expression against the label set of a node.
    pub fn matches(&self, labels: &BTreeSet<String>) -> bool {
        match self {
            Label::Atom(name) => labels.contains(name),
            Label::Not(inner) => !inner.matches(labels),
            Label::And(a, b) => a.matches(labels) && b.matches(labels),
            Label::Or(a, b) => a.matches(labels) || b.matches(labels),
            Label::Implies(a, b) => !a.matches(labels) || b.matches(labels),
            Label::Iff(a, b) => a.matches(labels) == b.matches(labels),
        }
    }

    /// Number of nodes on the longest path from the root to an atom.
    pub(crate) fn height(&self) -> usize {
        match self {
            Label::Atom(_) => 1,
            Label::Not(inner) => 1 + inner.height(),
            Label::And(a, b) | Label::Or(a, b) | Label::Implies(a, b) | Label::Iff(a, b) => {
                1 + a.height().max(b.height())
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Label::Iff(..) => 0,
            Label::Implies(..) => 1,
            Label::Or(..) => 2,
            Label::And(..) => 3,
            Label::Not(..) => 4,
            Label::Atom(..) => 5,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    fn fmt_binary(
        f: &mut fmt::Formatter<'_>,
        op: &str,
        prec: u8,
        lhs: &Label,
        rhs: &Label,
        right_assoc: bool,
    ) -> fmt::Result {
        let (left_min, right_min) = if right_assoc {
            (prec + 1, prec)
        } else {
            (prec, prec + 1)
        };
        lhs.fmt_child(f, left_min)?;
        f.write_str(op)?;
        rhs.fmt_child(f, right_min)
    }
}

fn needs_quotes(name: &str) -> bool {
    name.is_empty()
        || name.contains("->")
        || name.chars().any(|c| c.is_whitespace() || RESERVED.contains(&c))
}

fn fmt_atom(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if !needs_quotes(name) {
        return f.write_str(name);
    }
    f.write_str("\"")?;
    for c in name.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("\"")
}

/// Canonical form: operators without surrounding whitespace and only the
/// parentheses the precedence rules require.
impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = self.precedence();
        match self {
            Label::Atom(name) => fmt_atom(f, name),
            Label::Not(inner) => {
                f.write_str("!")?;
                inner.fmt_child(f, prec)
            }
            Label::And(a, b) => Self::fmt_binary(f, "&&", prec, a, b, false),
            Label::Or(a, b) => Self::fmt_binary(f, "||", prec, a, b, false),
            Label::Implies(a, b) => Self::fmt_binary(f, "->", prec, a, b, true),
            Label::Iff(a, b) => Self::fmt_binary(f, "<->", prec, a, b, false),
        }
    }
}

impl FromStr for Label {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse(s)
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let expression = String::deserialize(deserializer)?;
        crate::parse(&expression).map_err(serde::de::Error::custom)
    }
}
