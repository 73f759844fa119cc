//! Environment records.

use crate::value::ValueId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Handle of an environment record in the heap arena.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EnvId(pub u32);

impl EnvId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for EnvId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "env#{}", self.0)
    }
}

/// A named slot of a declarative record or of the global let-bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Current value; absent while the binding is in its temporal dead zone
    #[serde(default)]
    pub value: Option<ValueId>,
    #[serde(default)]
    pub initialized: bool,
    /// Only `eval`-introduced bindings are deletable
    #[serde(default)]
    pub deletable: bool,
    #[serde(default)]
    pub modified: bool,
}

impl Binding {
    /// An initialized, non-deletable binding.
    pub fn initialized(value: ValueId) -> Self {
        Self {
            value: Some(value),
            initialized: true,
            deletable: false,
            modified: false,
        }
    }

    pub fn uninitialized() -> Self {
        Self {
            value: None,
            initialized: false,
            deletable: false,
            modified: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Environment {
    /// The single process-wide top-level record
    Global {
        /// `let`/`const`/`class` declarations at top level
        #[serde(default)]
        lexical: IndexMap<String, Binding>,
        /// Names that live as properties of the global object
        #[serde(default)]
        properties: BTreeSet<String>,
    },
    Declarative {
        parent: EnvId,
        #[serde(default)]
        bindings: IndexMap<String, Binding>,
    },
}

impl Environment {
    pub fn global() -> Self {
        Environment::Global {
            lexical: IndexMap::new(),
            properties: BTreeSet::new(),
        }
    }

    pub fn declarative(parent: EnvId) -> Self {
        Environment::Declarative {
            parent,
            bindings: IndexMap::new(),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Environment::Global { .. })
    }

    pub fn parent(&self) -> Option<EnvId> {
        match self {
            Environment::Global { .. } => None,
            Environment::Declarative { parent, .. } => Some(*parent),
        }
    }

    /// Whether this record itself binds `name`.
    pub fn has_binding(&self, name: &str) -> bool {
        match self {
            Environment::Global {
                lexical,
                properties,
            } => lexical.contains_key(name) || properties.contains(name),
            Environment::Declarative { bindings, .. } => bindings.contains_key(name),
        }
    }

    /// The binding a declarative record (or the global lexical scope) holds for `name`.
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        match self {
            Environment::Global { lexical, .. } => lexical.get(name),
            Environment::Declarative { bindings, .. } => bindings.get(name),
        }
    }

    /// Builder-style binding definition.
    pub fn with_binding(mut self, name: impl Into<String>, binding: Binding) -> Self {
        self.define(name, binding);
        self
    }

    pub fn define(&mut self, name: impl Into<String>, binding: Binding) {
        match self {
            Environment::Global { lexical, .. } => {
                lexical.insert(name.into(), binding);
            }
            Environment::Declarative { bindings, .. } => {
                bindings.insert(name.into(), binding);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_binds_lexical_and_properties() {
        let mut global = Environment::global();
        global.define("x", Binding::initialized(ValueId(1)));
        if let Environment::Global { properties, .. } = &mut global {
            properties.insert("Math".to_string());
        }

        assert!(global.has_binding("x"));
        assert!(global.has_binding("Math"));
        assert!(global.binding("Math").is_none());
        assert_eq!(global.parent(), None);
    }

    #[test]
    fn test_declarative_parent() {
        let env = Environment::declarative(EnvId(0)).with_binding("y", Binding::uninitialized());
        assert_eq!(env.parent(), Some(EnvId(0)));
        assert!(!env.binding("y").unwrap().initialized);
    }
}
