//! JSON heap snapshots.
//!
//! A snapshot is what the abstract interpreter hands over: the value and
//! environment arenas, the source of every function code, the intrinsics
//! table and the roots (generator and module values).

use crate::environment::{EnvId, Environment};
use crate::generator::Generator;
use crate::heap::{Heap, Intrinsics};
use crate::value::{ObjectKind, Value, ValueId};
use anyhow::{anyhow, bail, Context, Result};
use residual_diagnostics::{Diagnostics, Location};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Source text of one function code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSource {
    pub source: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicsSnapshot {
    pub undefined: ValueId,
    pub null: ValueId,
    /// Default prototype per object kind name (`"Object"`, `"Array"`, ...)
    #[serde(default)]
    pub prototypes: BTreeMap<String, ValueId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapSnapshot {
    pub values: Vec<Value>,
    pub environments: Vec<Environment>,
    #[serde(default)]
    pub global: EnvId,
    #[serde(default)]
    pub codes: Vec<CodeSource>,
    pub intrinsics: IntrinsicsSnapshot,
    #[serde(default)]
    pub generator: Generator,
    /// Values produced by program-level modules
    #[serde(default)]
    pub modules: Vec<ValueId>,
}

impl HeapSnapshot {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse heap snapshot")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid snapshot {}", path.display()))
    }
}

/// A heap loaded from a snapshot, with its roots.
#[derive(Debug)]
pub struct LoadedSnapshot {
    pub heap: Heap,
    pub generator: Generator,
    pub modules: Vec<ValueId>,
    /// Recoverable parse diagnostics from the function codes
    pub diagnostics: Diagnostics,
}

impl Heap {
    /// Build a heap from a snapshot, parsing every function code and
    /// checking that every handle points into the arenas.
    pub fn from_snapshot(snapshot: HeapSnapshot) -> Result<LoadedSnapshot> {
        let mut diagnostics = Diagnostics::new();
        let mut codes = Vec::with_capacity(snapshot.codes.len());
        for (index, code) in snapshot.codes.iter().enumerate() {
            let file = code
                .file
                .clone()
                .unwrap_or_else(|| format!("<code#{}>", index));
            let parsed =
                residual_parser::parse_function_with_diagnostics(&code.source, &file, &mut diagnostics)
                    .with_context(|| format!("Failed to parse function code #{}", index))?;
            let location = Location::new(file, code.line.unwrap_or(1), code.column.unwrap_or(1));
            codes.push(parsed.with_location(location));
        }

        let mut prototypes = BTreeMap::new();
        for (name, proto) in &snapshot.intrinsics.prototypes {
            let kind = ObjectKind::ALL
                .iter()
                .find(|k| k.as_str() == name)
                .ok_or_else(|| anyhow!("Unknown object kind `{}` in intrinsics", name))?;
            prototypes.insert(*kind, *proto);
        }
        let intrinsics = Intrinsics {
            undefined: snapshot.intrinsics.undefined,
            null: snapshot.intrinsics.null,
            prototypes,
        };

        let heap = Heap::from_parts(
            snapshot.values,
            snapshot.environments,
            codes,
            intrinsics,
            snapshot.global,
        )?;

        let mut roots = snapshot.modules.clone();
        snapshot
            .generator
            .visit(&mut |id| -> Result<()> {
                roots.push(id);
                Ok(())
            })?;
        for root in roots {
            if heap.get(root).is_err() {
                bail!("Root value {} is not in the snapshot", root);
            }
        }

        log::debug!(
            "Loaded snapshot: {} values, {} codes",
            heap.len(),
            snapshot.codes.len()
        );

        Ok(LoadedSnapshot {
            heap,
            generator: snapshot.generator,
            modules: snapshot.modules,
            diagnostics,
        })
    }

    pub fn from_json(text: &str) -> Result<LoadedSnapshot> {
        Self::from_snapshot(HeapSnapshot::from_json(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::HeapError;
    use crate::value::FunctionData;

    const SNAPSHOT: &str = r#"{
        "values": [
            {"type": "undefined"},
            {"type": "null"},
            {"type": "intrinsic", "name": "ObjectPrototype"},
            {"type": "intrinsic", "name": "FunctionPrototype"},
            {"type": "number", "value": 1},
            {"type": "object", "prototype": 3,
             "data": {"kind": "function", "function": "plain", "code": 0, "environment": 1, "residual": true}},
            {"type": "object", "prototype": 2,
             "properties": {"inc": {"descriptor": {"kind": "data", "value": 5, "writable": true, "enumerable": true, "configurable": true}}},
             "data": {"kind": "ordinary"}}
        ],
        "environments": [
            {"type": "global"},
            {"type": "declarative", "parent": 0,
             "bindings": {"count": {"value": 4, "initialized": true}}}
        ],
        "codes": [{"source": "function inc() { count += 1; }", "file": "counter.js", "line": 3}],
        "intrinsics": {"undefined": 0, "null": 1, "prototypes": {"Object": 2, "Function": 3}},
        "generator": {"entries": [{"description": "console.log", "args": [6]}]},
        "modules": [6]
    }"#;

    #[test]
    fn test_load_snapshot() {
        let loaded = Heap::from_json(SNAPSHOT).unwrap();
        let heap = &loaded.heap;

        assert_eq!(heap.len(), 7);
        assert_eq!(heap.default_prototype(ObjectKind::Object), Some(ValueId(2)));
        assert_eq!(heap.default_prototype(ObjectKind::Array), None);
        assert_eq!(loaded.modules, vec![ValueId(6)]);
        assert!(loaded.diagnostics.is_empty());

        match heap.function(ValueId(5)).unwrap() {
            FunctionData::Plain(plain) => {
                assert!(plain.residual);
                let code = heap.code(plain.code).unwrap();
                assert_eq!(code.name.as_deref(), Some("inc"));
                assert_eq!(code.location, Some(Location::new("counter.js", 3, 1)));
            }
            other => panic!("expected a plain function, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_handle_is_rejected() {
        let text = SNAPSHOT.replace(r#""value": 5"#, r#""value": 50"#);
        let err = Heap::from_json(&text).unwrap_err();
        assert_eq!(
            err.downcast_ref::<HeapError>(),
            Some(&HeapError::DanglingValue(ValueId(50)))
        );
    }

    #[test]
    fn test_unparsable_code_is_rejected() {
        let text = SNAPSHOT.replace("count += 1; }", "count += ; }");
        let err = Heap::from_json(&text).unwrap_err();
        assert!(err.to_string().contains("function code #0"));
    }

    #[test]
    fn test_non_global_root_environment() {
        let text = SNAPSHOT.replace(r#""modules": [6]"#, r#""modules": [6], "global": 1"#);
        let err = Heap::from_json(&text).unwrap_err();
        assert_eq!(
            err.downcast_ref::<HeapError>(),
            Some(&HeapError::NonGlobalRoot(EnvId(1)))
        );
    }
}
