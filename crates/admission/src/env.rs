//! Environment variables gathered for a policy script.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static MACRO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("valid macro pattern")
});

/// Ordered name → value map with `${VAR}` expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars(BTreeMap<String, String>);

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expand `${NAME}` and `$NAME` in `value` using these variables.
    /// References to unknown variables are left as written.
    pub fn expand(&self, value: &str) -> String {
        expand_with(&self.0, value)
    }

    /// Expand references in every value, once.
    ///
    /// Every value is expanded against the variables as they were before
    /// this call, so the result does not depend on key order and expanded
    /// text is never expanded again.
    pub fn resolve(&mut self) {
        let snapshot = self.0.clone();
        for value in self.0.values_mut() {
            if value.contains('$') {
                *value = expand_with(&snapshot, value);
            }
        }
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

fn expand_with(vars: &BTreeMap<String, String>, value: &str) -> String {
    MACRO_RE
        .replace_all(value, |caps: &Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            match vars.get(name) {
                Some(v) => v.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_both_forms() {
        let env: EnvVars = [("HOST", "linux"), ("ARCH", "x64")].into_iter().collect();
        assert_eq!(env.expand("${HOST}&&$ARCH"), "linux&&x64");
        assert_eq!(env.expand("$HOST-${ARCH}"), "linux-x64");
    }

    #[test]
    fn test_unknown_reference_left_alone() {
        let env: EnvVars = [("A", "1")].into_iter().collect();
        assert_eq!(env.expand("${MISSING} $ALSO_MISSING $A"), "${MISSING} $ALSO_MISSING 1");
    }

    #[test]
    fn test_resolve_single_pass() {
        let mut env: EnvVars = [
            ("A", "${B}"),
            ("B", "${C}"),
            ("C", "leaf"),
            ("PLAIN", "value"),
        ]
        .into_iter()
        .collect();
        env.resolve();

        // A sees B's unexpanded value: no re-expansion.
        assert_eq!(env.get("A"), Some("${C}"));
        assert_eq!(env.get("B"), Some("leaf"));
        assert_eq!(env.get("PLAIN"), Some("value"));
    }

    #[test]
    fn test_resolve_self_reference_terminates() {
        let mut env: EnvVars = [("PATH", "/opt/bin:${PATH}")].into_iter().collect();
        env.resolve();
        assert_eq!(env.get("PATH"), Some("/opt/bin:/opt/bin:${PATH}"));
    }

    #[test]
    fn test_insert_overrides() {
        let mut env = EnvVars::new();
        assert_eq!(env.insert("A", "1"), None);
        assert_eq!(env.insert("A", "2"), Some("1".to_string()));
        assert_eq!(env.len(), 1);
    }
}
