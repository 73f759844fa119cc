//! Lexical scope resolution.

use crate::environment::{EnvId, Environment};
use crate::heap::{Heap, HeapError};
use crate::value::ValueId;
use std::collections::HashSet;

/// Where a resolved reference lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceBase {
    Global,
    Declarative(EnvId),
}

/// The name a reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferencedName {
    String(String),
    Symbol(ValueId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Unresolvable,
    Resolved {
        base: ReferenceBase,
        name: ReferencedName,
    },
}

/// Resolves an identifier against a chain of environment records.
pub trait ScopeResolver {
    /// Resolve `name` starting from `env`.
    ///
    /// `strict` mirrors the caller's strict-mode flag; implementations may
    /// ignore it.
    fn resolve_binding(
        &self,
        heap: &Heap,
        name: &str,
        env: EnvId,
        strict: bool,
    ) -> Result<Reference, HeapError>;
}

/// Walks declarative parents until a record binds the name, ending at the
/// global record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeChain;

impl ScopeResolver for ScopeChain {
    fn resolve_binding(
        &self,
        heap: &Heap,
        name: &str,
        env: EnvId,
        _strict: bool,
    ) -> Result<Reference, HeapError> {
        let mut current = env;
        let mut seen = HashSet::new();
        // A parent cycle is malformed; stop at the first repeat.
        while seen.insert(current) {
            let record = heap.env(current)?;
            if record.has_binding(name) {
                let base = match record {
                    Environment::Global { .. } => ReferenceBase::Global,
                    Environment::Declarative { .. } => ReferenceBase::Declarative(current),
                };
                return Ok(Reference::Resolved {
                    base,
                    name: ReferencedName::String(name.to_string()),
                });
            }
            match record.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(Reference::Unresolvable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Binding;

    #[test]
    fn test_resolves_nearest_declarative() {
        let mut heap = Heap::new();
        let undefined = heap.undefined();
        let global = heap.global_env();
        let outer = heap.alloc_env(
            Environment::declarative(global).with_binding("x", Binding::initialized(undefined)),
        );
        let inner = heap.alloc_env(
            Environment::declarative(outer).with_binding("y", Binding::initialized(undefined)),
        );

        let reference = ScopeChain.resolve_binding(&heap, "x", inner, false).unwrap();
        assert_eq!(
            reference,
            Reference::Resolved {
                base: ReferenceBase::Declarative(outer),
                name: ReferencedName::String("x".to_string()),
            }
        );
    }

    #[test]
    fn test_global_and_unresolvable() {
        let mut heap = Heap::new();
        let undefined = heap.undefined();
        let global = heap.global_env();
        heap.env_mut(global)
            .unwrap()
            .define("counter", Binding::initialized(undefined));
        let env = heap.alloc_env(Environment::declarative(global));

        assert!(matches!(
            ScopeChain.resolve_binding(&heap, "counter", env, true).unwrap(),
            Reference::Resolved {
                base: ReferenceBase::Global,
                ..
            }
        ));
        assert_eq!(
            ScopeChain.resolve_binding(&heap, "missing", env, true).unwrap(),
            Reference::Unresolvable
        );
    }

    #[test]
    fn test_dangling_parent_is_an_error() {
        let mut heap = Heap::new();
        let env = heap.alloc_env(Environment::declarative(EnvId(42)));
        assert_eq!(
            ScopeChain.resolve_binding(&heap, "x", env, false).unwrap_err(),
            HeapError::DanglingEnvironment(EnvId(42))
        );
    }
}
