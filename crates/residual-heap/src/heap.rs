//! The heap arena.

use crate::environment::{Binding, EnvId, Environment};
use crate::value::{
    FunctionData, ObjectData, ObjectKind, ObjectValue, PlainFunction, PropertyDescriptor, Value,
    ValueId,
};
use residual_diagnostics::Location;
use residual_parser::FunctionCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Handle of a function code in the heap arena.
///
/// Closures created from the same source share one code, so the handle is
/// also the identity of a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeId(pub u32);

impl CodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for CodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "code#{}", self.0)
    }
}

/// Errors raised when a handle does not point where it should.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HeapError {
    #[error("dangling value handle {0}")]
    DanglingValue(ValueId),

    #[error("dangling environment handle {0}")]
    DanglingEnvironment(EnvId),

    #[error("dangling code handle {0}")]
    DanglingCode(CodeId),

    #[error("value {0} is not an object")]
    NotAnObject(ValueId),

    #[error("value {0} is not a function")]
    NotAFunction(ValueId),

    #[error("environment {0} is not the global record")]
    NonGlobalRoot(EnvId),
}

/// Values owned by the engine's bootstrap.
#[derive(Debug, Clone, PartialEq)]
pub struct Intrinsics {
    pub undefined: ValueId,
    pub null: ValueId,
    /// Default prototype per object kind
    pub prototypes: BTreeMap<ObjectKind, ValueId>,
}

/// An abstracted execution heap.
///
/// Nothing in the analysis mutates a heap; the mutating methods exist for
/// whoever builds one (snapshot loading, tests).
#[derive(Debug, Clone)]
pub struct Heap {
    values: Vec<Value>,
    environments: Vec<Environment>,
    codes: Vec<FunctionCode>,
    intrinsics: Intrinsics,
    global: EnvId,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    /// A heap holding only the bootstrap: `undefined`, `null`, one intrinsic
    /// prototype per object kind and the global record.
    pub fn new() -> Self {
        let mut values = vec![Value::Undefined, Value::Null];
        let mut prototypes = BTreeMap::new();
        let mut by_name: BTreeMap<String, ValueId> = BTreeMap::new();

        for kind in ObjectKind::ALL {
            let Some(name) = kind.prototype_name() else {
                continue;
            };
            let id = *by_name.entry(name.clone()).or_insert_with(|| {
                values.push(Value::Intrinsic { name });
                ValueId(values.len() as u32 - 1)
            });
            prototypes.insert(*kind, id);
        }

        Self {
            values,
            environments: vec![Environment::global()],
            codes: Vec::new(),
            intrinsics: Intrinsics {
                undefined: ValueId(0),
                null: ValueId(1),
                prototypes,
            },
            global: EnvId(0),
        }
    }

    /// Assemble a heap from already-built arenas.
    pub fn from_parts(
        values: Vec<Value>,
        environments: Vec<Environment>,
        codes: Vec<FunctionCode>,
        intrinsics: Intrinsics,
        global: EnvId,
    ) -> Result<Self, HeapError> {
        let heap = Self {
            values,
            environments,
            codes,
            intrinsics,
            global,
        };
        if !heap.env(global)?.is_global() {
            return Err(HeapError::NonGlobalRoot(global));
        }
        heap.check_handles()?;
        Ok(heap)
    }

    pub fn intrinsics(&self) -> &Intrinsics {
        &self.intrinsics
    }

    pub fn undefined(&self) -> ValueId {
        self.intrinsics.undefined
    }

    pub fn null(&self) -> ValueId {
        self.intrinsics.null
    }

    pub fn global_env(&self) -> EnvId {
        self.global
    }

    /// The engine's built-in prototype for objects of `kind`.
    pub fn default_prototype(&self, kind: ObjectKind) -> Option<ValueId> {
        self.intrinsics.prototypes.get(&kind).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = (ValueId, &Value)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (ValueId(i as u32), v))
    }

    // --- lookups ---

    pub fn get(&self, id: ValueId) -> Result<&Value, HeapError> {
        self.values
            .get(id.index())
            .ok_or(HeapError::DanglingValue(id))
    }

    pub fn get_mut(&mut self, id: ValueId) -> Result<&mut Value, HeapError> {
        self.values
            .get_mut(id.index())
            .ok_or(HeapError::DanglingValue(id))
    }

    pub fn object(&self, id: ValueId) -> Result<&ObjectValue, HeapError> {
        self.get(id)?.as_object().ok_or(HeapError::NotAnObject(id))
    }

    pub fn object_mut(&mut self, id: ValueId) -> Result<&mut ObjectValue, HeapError> {
        self.get_mut(id)?
            .as_object_mut()
            .ok_or(HeapError::NotAnObject(id))
    }

    pub fn function(&self, id: ValueId) -> Result<&FunctionData, HeapError> {
        self.object(id)?
            .as_function()
            .ok_or(HeapError::NotAFunction(id))
    }

    pub fn env(&self, id: EnvId) -> Result<&Environment, HeapError> {
        self.environments
            .get(id.index())
            .ok_or(HeapError::DanglingEnvironment(id))
    }

    pub fn env_mut(&mut self, id: EnvId) -> Result<&mut Environment, HeapError> {
        self.environments
            .get_mut(id.index())
            .ok_or(HeapError::DanglingEnvironment(id))
    }

    pub fn code(&self, id: CodeId) -> Result<&FunctionCode, HeapError> {
        self.codes.get(id.index()).ok_or(HeapError::DanglingCode(id))
    }

    /// The global lexical (`let`/`const`) binding named `name`, if any.
    pub fn global_let_binding(&self, name: &str) -> Option<&Binding> {
        match self.environments.get(self.global.index()) {
            Some(Environment::Global { lexical, .. }) => lexical.get(name),
            _ => None,
        }
    }

    /// The `length` the host gives a fresh function object.
    pub fn expected_length(&self, id: ValueId) -> Result<u32, HeapError> {
        Ok(match self.function(id)? {
            FunctionData::Plain(plain) => self.code(plain.code)?.expected_argument_count(),
            FunctionData::Bound(bound) => bound.length,
            FunctionData::Native(native) => native.length,
        })
    }

    // --- allocation ---

    pub fn alloc(&mut self, value: Value) -> ValueId {
        self.values.push(value);
        ValueId(self.values.len() as u32 - 1)
    }

    pub fn alloc_number(&mut self, value: f64) -> ValueId {
        self.alloc(Value::number(value))
    }

    pub fn alloc_string(&mut self, value: impl Into<String>) -> ValueId {
        self.alloc(Value::string(value))
    }

    pub fn alloc_object(&mut self, object: ObjectValue) -> ValueId {
        self.alloc(Value::Object(object))
    }

    /// An empty object of the payload's kind, inheriting from its default prototype.
    pub fn new_object(&self, data: ObjectData) -> ObjectValue {
        let mut object = ObjectValue::new(data, self.null());
        if let Some(proto) = self.default_prototype(object.kind()) {
            object.prototype = proto;
        }
        object
    }

    pub fn alloc_env(&mut self, env: Environment) -> EnvId {
        self.environments.push(env);
        EnvId(self.environments.len() as u32 - 1)
    }

    pub fn add_code(&mut self, code: FunctionCode) -> CodeId {
        self.codes.push(code);
        CodeId(self.codes.len() as u32 - 1)
    }

    /// Parse a function's source and add its code.
    pub fn parse_code(&mut self, source: &str, filename: &str) -> anyhow::Result<CodeId> {
        let result = residual_parser::parse_function(source, filename)?;
        Ok(self.add_code(result.code))
    }

    /// Allocate a plain function the way the host would create it: with
    /// default `length` and `name` properties but no `prototype` object.
    pub fn alloc_plain_function(
        &mut self,
        code: CodeId,
        environment: EnvId,
    ) -> Result<ValueId, HeapError> {
        let function_code = self.code(code)?;
        let length = function_code.expected_argument_count();
        let name = function_code.name.clone().unwrap_or_default();

        let length = self.alloc_number(length as f64);
        let name = self.alloc_string(name);
        let object = self
            .new_object(ObjectData::Function(FunctionData::Plain(PlainFunction {
                code,
                environment,
                residual: false,
                unsafe_residual: false,
            })))
            .with_property(
                "length",
                PropertyDescriptor::with_attributes(length, false, false, true),
            )
            .with_property(
                "name",
                PropertyDescriptor::with_attributes(name, false, false, true),
            );
        Ok(self.alloc_object(object))
    }

    /// Give `function` the default `prototype` object the host synthesizes:
    /// an ordinary object whose only property is `constructor`.
    pub fn add_default_prototype(&mut self, function: ValueId) -> Result<ValueId, HeapError> {
        self.function(function)?;
        let mut proto = self
            .new_object(ObjectData::Ordinary)
            .with_property(
                "constructor",
                PropertyDescriptor::with_attributes(function, true, false, true),
            );
        proto.original_constructor = Some(function);
        let proto = self.alloc_object(proto);

        self.object_mut(function)?.define_property(
            "prototype",
            PropertyDescriptor::with_attributes(proto, true, false, false),
        );
        Ok(proto)
    }

    // --- description ---

    /// Short human description of a value, for diagnostics.
    pub fn describe(&self, id: ValueId) -> String {
        let Ok(value) = self.get(id) else {
            return format!("dangling value {}", id);
        };
        match value {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean { value } => value.to_string(),
            Value::Number { value } => value.to_string(),
            Value::String { value } => format!("{:?}", value),
            Value::Empty => "empty slot".to_string(),
            Value::Symbol { description } => match description {
                Some(d) => format!("Symbol({})", d),
                None => "Symbol()".to_string(),
            },
            Value::Intrinsic { name } => name.clone(),
            Value::Abstract(abs) => match &abs.name {
                Some(name) => format!("abstract value `{}`", name),
                None => format!("abstract {} value", abs.kind),
            },
            Value::Object(obj) => match &obj.data {
                ObjectData::Function(FunctionData::Plain(plain)) => {
                    match self.code(plain.code).ok().and_then(|c| c.name.clone()) {
                        Some(name) => format!("function `{}`", name),
                        None => "anonymous function".to_string(),
                    }
                }
                ObjectData::Function(FunctionData::Bound(_)) => "bound function".to_string(),
                ObjectData::Function(FunctionData::Native(native)) => {
                    format!("native function `{}`", native.name)
                }
                _ => format!("{} object", obj.kind()),
            },
        }
    }

    /// Where a value was defined, when known (plain functions only).
    pub fn location(&self, id: ValueId) -> Option<Location> {
        match self.function(id).ok()? {
            FunctionData::Plain(plain) => self.code(plain.code).ok()?.location.clone(),
            _ => None,
        }
    }

    // --- validation ---

    /// Verify that every edge of the graph points into the arenas.
    pub fn check_handles(&self) -> Result<(), HeapError> {
        let mut edges = Vec::new();
        for (_, value) in self.values() {
            edges.clear();
            value_edges(value, &mut edges);
            for edge in &edges {
                self.get(*edge)?;
            }
            if let Some(FunctionData::Plain(plain)) = value.as_object().and_then(|o| o.as_function())
            {
                self.code(plain.code)?;
                self.env(plain.environment)?;
            }
        }

        for env in &self.environments {
            let bindings = match env {
                Environment::Global { lexical, .. } => lexical,
                Environment::Declarative { parent, bindings } => {
                    self.env(*parent)?;
                    bindings
                }
            };
            for binding in bindings.values() {
                if let Some(value) = binding.value {
                    self.get(value)?;
                }
            }
        }

        self.get(self.intrinsics.undefined)?;
        self.get(self.intrinsics.null)?;
        for proto in self.intrinsics.prototypes.values() {
            self.get(*proto)?;
        }
        Ok(())
    }
}

/// Every value handle stored directly in `value`.
fn value_edges(value: &Value, out: &mut Vec<ValueId>) {
    let obj = match value {
        Value::Abstract(abs) => {
            out.extend(&abs.args);
            return;
        }
        Value::Object(obj) => obj,
        _ => return,
    };

    let descriptors = obj
        .properties
        .values()
        .chain(obj.symbols.iter().map(|s| &s.binding))
        .chain(obj.unknown_property.iter())
        .filter_map(|b| b.descriptor.as_ref());
    for desc in descriptors {
        out.extend(desc.value());
        out.extend(desc.get());
        out.extend(desc.set());
    }
    out.extend(obj.symbols.iter().map(|s| s.symbol));
    out.push(obj.prototype);
    out.extend(obj.original_constructor);

    match &obj.data {
        ObjectData::Function(FunctionData::Bound(bound)) => {
            out.push(bound.target);
            out.push(bound.bound_this);
            out.extend(&bound.bound_args);
        }
        ObjectData::Proxy { target, handler } => {
            out.push(*target);
            out.push(*handler);
        }
        ObjectData::Map { entries } | ObjectData::WeakMap { entries } => {
            for entry in entries {
                out.extend(entry.key);
                out.extend(entry.value);
            }
        }
        ObjectData::Set { entries } | ObjectData::WeakSet { entries } => {
            out.extend(entries.iter().flatten());
        }
        ObjectData::Date { value }
        | ObjectData::Boolean { value }
        | ObjectData::Number { value }
        | ObjectData::String { value } => out.push(*value),
        ObjectData::TypedArray { buffer, .. } | ObjectData::DataView { buffer } => {
            out.push(*buffer)
        }
        ObjectData::Ordinary
        | ObjectData::Array
        | ObjectData::Function(_)
        | ObjectData::RegExp
        | ObjectData::ArrayBuffer
        | ObjectData::Arguments
        | ObjectData::Error
        | ObjectData::Promise => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_prototypes() {
        let heap = Heap::new();
        let object_proto = heap.default_prototype(ObjectKind::Object).unwrap();
        let array_proto = heap.default_prototype(ObjectKind::Array).unwrap();

        assert_ne!(object_proto, array_proto);
        assert_eq!(
            heap.default_prototype(ObjectKind::Arguments),
            Some(object_proto)
        );
        assert_eq!(heap.default_prototype(ObjectKind::Proxy), None);
        assert_eq!(
            heap.get(array_proto).unwrap(),
            &Value::intrinsic("ArrayPrototype")
        );
        assert!(heap.env(heap.global_env()).unwrap().is_global());
    }

    #[test]
    fn test_new_object_uses_default_prototype() {
        let heap = Heap::new();
        let arr = heap.new_object(ObjectData::Array);
        assert_eq!(
            Some(arr.prototype),
            heap.default_prototype(ObjectKind::Array)
        );

        let proxy = heap.new_object(ObjectData::Proxy {
            target: heap.null(),
            handler: heap.null(),
        });
        assert_eq!(proxy.prototype, heap.null());
    }

    #[test]
    fn test_plain_function_defaults() {
        let mut heap = Heap::new();
        let code = heap
            .parse_code("function area(w, h = 1) { return w * h; }", "area.js")
            .unwrap();
        let global = heap.global_env();
        let func = heap.alloc_plain_function(code, global).unwrap();
        let proto = heap.add_default_prototype(func).unwrap();

        assert_eq!(heap.expected_length(func).unwrap(), 1);
        assert_eq!(heap.describe(func), "function `area`");
        assert_eq!(heap.location(func).map(|l| l.file), Some("area.js".to_string()));

        let obj = heap.object(func).unwrap();
        let length = obj.property_value("length").unwrap();
        assert_eq!(heap.get(length).unwrap().as_number(), Some(1.0));
        assert_eq!(obj.property_value("prototype"), Some(proto));
        assert_eq!(
            heap.object(proto).unwrap().original_constructor,
            Some(func)
        );
    }

    #[test]
    fn test_lookup_errors() {
        let heap = Heap::new();
        assert_eq!(
            heap.get(ValueId(999)).unwrap_err(),
            HeapError::DanglingValue(ValueId(999))
        );
        assert_eq!(
            heap.object(heap.undefined()).unwrap_err(),
            HeapError::NotAnObject(heap.undefined())
        );
        assert!(heap.code(CodeId(0)).is_err());
    }

    #[test]
    fn test_check_handles_finds_dangling_edge() {
        let mut heap = Heap::new();
        let obj = heap
            .new_object(ObjectData::Ordinary)
            .with_property("x", PropertyDescriptor::data(ValueId(500)));
        heap.alloc_object(obj);

        assert_eq!(
            heap.check_handles().unwrap_err(),
            HeapError::DanglingValue(ValueId(500))
        );
    }
}
