//! Output tables of one analysis pass.

use crate::free_vars::FunctionInfo;
use indexmap::{IndexMap, IndexSet};
use residual_heap::{CodeId, EnvId, ValueId};
use serde::Serialize;

/// Where a captured binding lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingOrigin {
    Global,
    Lexical(EnvId),
}

/// A binding some residual function captures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitedBinding {
    pub origin: BindingOrigin,
    /// Current value; a global may have none when it lives on the global object
    pub value: Option<ValueId>,
    /// Set once any capturing function assigns to it; never cleared
    pub modified: bool,
}

/// Key of a binding in [`ResidualHeap`]'s binding tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum BindingKey {
    Global { name: String },
    Lexical { environment: EnvId, name: String },
}

impl BindingKey {
    pub fn name(&self) -> &str {
        match self {
            BindingKey::Global { name } | BindingKey::Lexical { name, .. } => name,
        }
    }
}

impl std::fmt::Display for BindingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingKey::Global { name } => write!(f, "global `{}`", name),
            BindingKey::Lexical { environment, name } => write!(f, "`{}` in {}", name, environment),
        }
    }
}

/// Everything the code generator needs to know about the residual heap.
///
/// Produced once per pass and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResidualHeap {
    /// Every reachable value, in visit order
    pub values: IndexSet<ValueId>,
    /// Per object, the property keys whose descriptors are host defaults
    pub ignored_properties: IndexMap<ValueId, IndexSet<String>>,
    pub global_bindings: IndexMap<String, VisitedBinding>,
    pub declarative_bindings: IndexMap<EnvId, IndexMap<String, VisitedBinding>>,
    /// Per function body
    pub function_infos: IndexMap<CodeId, FunctionInfo>,
    /// Per plain function, the binding each free name resolved to
    pub function_bindings: IndexMap<ValueId, IndexMap<String, BindingKey>>,
}

impl ResidualHeap {
    pub fn is_visited(&self, id: ValueId) -> bool {
        self.values.contains(&id)
    }

    pub fn is_ignored(&self, object: ValueId, key: &str) -> bool {
        self.ignored_properties
            .get(&object)
            .map_or(false, |keys| keys.contains(key))
    }

    pub fn function_info(&self, code: CodeId) -> Option<&FunctionInfo> {
        self.function_infos.get(&code)
    }

    pub fn binding(&self, key: &BindingKey) -> Option<&VisitedBinding> {
        match key {
            BindingKey::Global { name } => self.global_bindings.get(name),
            BindingKey::Lexical { environment, name } => self
                .declarative_bindings
                .get(environment)
                .and_then(|bindings| bindings.get(name)),
        }
    }

    pub(crate) fn binding_mut(&mut self, key: &BindingKey) -> Option<&mut VisitedBinding> {
        match key {
            BindingKey::Global { name } => self.global_bindings.get_mut(name),
            BindingKey::Lexical { environment, name } => self
                .declarative_bindings
                .get_mut(environment)
                .and_then(|bindings| bindings.get_mut(name)),
        }
    }

    /// The capture table of a function: free name to the binding it resolved to.
    pub fn captures(&self, function: ValueId) -> Vec<(&str, &VisitedBinding)> {
        let Some(bindings) = self.function_bindings.get(&function) else {
            return Vec::new();
        };
        bindings
            .iter()
            .filter_map(|(name, key)| Some((name.as_str(), self.binding(key)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_follow_binding_keys() {
        let mut residual = ResidualHeap::default();
        residual.global_bindings.insert(
            "console".to_string(),
            VisitedBinding {
                origin: BindingOrigin::Global,
                value: None,
                modified: true,
            },
        );
        residual.declarative_bindings.entry(EnvId(2)).or_default().insert(
            "count".to_string(),
            VisitedBinding {
                origin: BindingOrigin::Lexical(EnvId(2)),
                value: Some(ValueId(9)),
                modified: false,
            },
        );
        let table = residual.function_bindings.entry(ValueId(5)).or_default();
        table.insert(
            "count".to_string(),
            BindingKey::Lexical {
                environment: EnvId(2),
                name: "count".to_string(),
            },
        );
        table.insert(
            "console".to_string(),
            BindingKey::Global {
                name: "console".to_string(),
            },
        );

        let captures = residual.captures(ValueId(5));
        assert_eq!(captures.len(), 2);
        assert_eq!(captures[0].0, "count");
        assert_eq!(captures[0].1.origin, BindingOrigin::Lexical(EnvId(2)));
        assert_eq!(captures[1].1.origin, BindingOrigin::Global);
        assert!(residual.captures(ValueId(6)).is_empty());
    }

    #[test]
    fn test_serializes_with_handle_keys() {
        let mut residual = ResidualHeap::default();
        residual.values.insert(ValueId(3));
        residual
            .ignored_properties
            .entry(ValueId(3))
            .or_default()
            .insert("length".to_string());

        let json = serde_json::to_value(&residual).unwrap();
        assert_eq!(json["values"], serde_json::json!([3]));
        assert_eq!(json["ignored_properties"]["3"], serde_json::json!(["length"]));
        assert!(residual.is_ignored(ValueId(3), "length"));
    }
}
