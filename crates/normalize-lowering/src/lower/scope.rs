//! Variable scopes with versioned rebinding.
//!
//! A source name may be bound many times; each binding gets its own target
//! identifier (`x`, `x$1`, `x$2`) so closures created between rebindings
//! keep the value they captured.

use std::collections::{HashMap, HashSet};

use crate::names;

/// Which version of each source name is visible here.
///
/// Cloned when entering a clause, anonymous function or comprehension
/// body and restored when leaving it.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    current: HashMap<String, u32>,
}

impl Scope {
    pub fn version(&self, name: &str) -> Option<u32> {
        self.current.get(name).copied()
    }

    pub fn set(&mut self, name: &str, version: u32) {
        self.current.insert(name.to_string(), version);
    }
}

/// Next free version per source name.
///
/// Not restored with `Scope`: sibling blocks never reuse a target name
/// within one function body.
#[derive(Debug, Clone, Default)]
pub(crate) struct Versions {
    next: HashMap<String, u32>,
}

impl Versions {
    pub fn allocate(&mut self, name: &str) -> u32 {
        let slot = self.next.entry(name.to_string()).or_insert(0);
        let version = *slot;
        *slot += 1;
        version
    }
}

/// Escaped base identifier of a variable. Variables never take the
/// identifier of a function in `functions`.
fn base(name: &str, functions: Option<&HashSet<String>>) -> String {
    let escaped = names::escape_identifier(name);
    if functions.is_some_and(|f| f.contains(&escaped)) {
        names::shadowing_variable(&escaped)
    } else {
        escaped
    }
}

/// Bind `name` in `scope`, returning the escaped target identifier.
pub(crate) fn bind(
    scope: &mut Scope,
    versions: &mut Versions,
    name: &str,
    functions: Option<&HashSet<String>>,
) -> String {
    let version = versions.allocate(name);
    scope.set(name, version);
    names::versioned(&base(name, functions), version)
}

/// Target identifier for a read of `name`. Unbound names read version 0.
pub(crate) fn resolve(scope: &Scope, name: &str, functions: Option<&HashSet<String>>) -> String {
    names::versioned(&base(name, functions), scope.version(name).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebinding_versions() {
        let mut scope = Scope::default();
        let mut versions = Versions::default();
        assert_eq!(bind(&mut scope, &mut versions, "x", None), "x");
        assert_eq!(resolve(&scope, "x", None), "x");
        assert_eq!(bind(&mut scope, &mut versions, "x", None), "x$1");
        assert_eq!(resolve(&scope, "x", None), "x$1");
    }

    #[test]
    fn test_child_scope_does_not_leak() {
        let mut scope = Scope::default();
        let mut versions = Versions::default();
        bind(&mut scope, &mut versions, "x", None);

        let saved = scope.clone();
        assert_eq!(bind(&mut scope, &mut versions, "x", None), "x$1");
        scope = saved;

        assert_eq!(resolve(&scope, "x", None), "x");
        // The sibling binding still gets a fresh name.
        assert_eq!(bind(&mut scope, &mut versions, "x", None), "x$2");
    }

    #[test]
    fn test_escaped_names() {
        let mut scope = Scope::default();
        let mut versions = Versions::default();
        assert_eq!(bind(&mut scope, &mut versions, "new", None), "new$");
        assert_eq!(bind(&mut scope, &mut versions, "new", None), "new$$1");
        assert_eq!(scope.version("new"), Some(1));
        assert_eq!(scope.version("old"), None);
        assert_eq!(resolve(&scope, "valid?", None), "valid$q");
    }

    #[test]
    fn test_variable_named_like_a_function() {
        let functions: HashSet<String> = ["helper".to_string()].into();
        let mut scope = Scope::default();
        let mut versions = Versions::default();
        assert_eq!(
            bind(&mut scope, &mut versions, "helper", Some(&functions)),
            "helper$v"
        );
        assert_eq!(
            bind(&mut scope, &mut versions, "helper", Some(&functions)),
            "helper$v$1"
        );
        assert_eq!(resolve(&scope, "helper", Some(&functions)), "helper$v$1");
        assert_eq!(resolve(&scope, "other", Some(&functions)), "other");
    }
}
