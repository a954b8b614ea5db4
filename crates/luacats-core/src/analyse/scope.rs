// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Scope tracking for type inference.
//!
//! A simple stack of scope levels mapping local names to their inferred
//! facts. Function bodies push a level for their parameters and locals;
//! nested blocks push further levels so shadowing resolves innermost
//! first.

use std::collections::HashMap;

use ecow::EcoString;

use super::certainty::TypeFact;

/// Tracks local variable facts across nested scopes.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    levels: Vec<ScopeLevel>,
}

#[derive(Debug, Clone, Default)]
struct ScopeLevel {
    variables: HashMap<EcoString, TypeFact>,
}

impl Scope {
    /// Creates a scope with a single file-level scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            levels: vec![ScopeLevel::default()],
        }
    }

    /// Enters a nested scope.
    pub fn push(&mut self) {
        self.levels.push(ScopeLevel::default());
    }

    /// Exits the current scope. The file-level scope is never popped.
    pub fn pop(&mut self) {
        if self.levels.len() > 1 {
            self.levels.pop();
        }
    }

    /// Records a fact for a name in the current scope.
    pub fn define(&mut self, name: impl Into<EcoString>, fact: TypeFact) {
        if let Some(level) = self.levels.last_mut() {
            level.variables.insert(name.into(), fact);
        }
    }

    /// Looks a name up, innermost scope first.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&TypeFact> {
        self.levels
            .iter()
            .rev()
            .find_map(|level| level.variables.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyse::types::TypeExpr;

    #[test]
    fn lookup_resolves_innermost_first() {
        let mut scope = Scope::new();
        scope.define("x", TypeFact::certain(TypeExpr::named("number")));
        scope.push();
        scope.define("x", TypeFact::certain(TypeExpr::named("string")));

        assert_eq!(
            scope.lookup("x").map(|f| &f.type_expr),
            Some(&TypeExpr::named("string"))
        );
        scope.pop();
        assert_eq!(
            scope.lookup("x").map(|f| &f.type_expr),
            Some(&TypeExpr::named("number"))
        );
    }

    #[test]
    fn file_scope_is_never_popped() {
        let mut scope = Scope::new();
        scope.define("keep", TypeFact::unknown());
        scope.pop();
        assert!(scope.lookup("keep").is_some());
    }
}
