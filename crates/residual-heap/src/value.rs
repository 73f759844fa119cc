//! Heap values.
//!
//! Every edge of the graph (property values, prototypes, operands, bound
//! targets, ...) is a [`ValueId`] handle into the heap arena, so the logical
//! reference graph may be cyclic while ownership stays flat.

use crate::environment::EnvId;
use crate::heap::CodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Handle of a value in the heap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueId(pub u32);

impl ValueId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value of the abstracted heap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    Undefined,
    Null,
    Boolean { value: bool },
    Number { value: f64 },
    String { value: String },
    /// An uninitialized slot
    Empty,
    Symbol {
        #[serde(default)]
        description: Option<String>,
    },
    /// A value owned by the engine's bootstrap; only ever referenced by name
    Intrinsic { name: String },
    Abstract(AbstractValue),
    Object(ObjectValue),
}

impl Value {
    pub fn number(value: f64) -> Self {
        Value::Number { value }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::String {
            value: value.into(),
        }
    }

    pub fn intrinsic(name: impl Into<String>) -> Self {
        Value::Intrinsic { name: name.into() }
    }

    /// Primitive leaves are never recursed into.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Undefined
                | Value::Null
                | Value::Boolean { .. }
                | Value::Number { .. }
                | Value::String { .. }
        )
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectValue> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_abstract(&self) -> Option<&AbstractValue> {
        match self {
            Value::Abstract(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number { value } => Some(*value),
            _ => None,
        }
    }
}

/// Operation that produced a symbolic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstractKind {
    /// A value about which nothing is known
    Unknown,
    Unary,
    Binary,
    Logical,
    /// `args[0] ? args[1] : args[2]`
    Conditional,
    Call,
    Member,
    /// `o[p]` for partially known `o` and unknown `p`
    SentinelMemberExpression,
    /// Stands for "the property name is `args[0]`" inside a computed-name chain
    TemplateForPropertyNameCondition,
}

impl AbstractKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbstractKind::Unknown => "unknown",
            AbstractKind::Unary => "unary",
            AbstractKind::Binary => "binary",
            AbstractKind::Logical => "logical",
            AbstractKind::Conditional => "conditional",
            AbstractKind::Call => "call",
            AbstractKind::Member => "member",
            AbstractKind::SentinelMemberExpression => "sentinel member expression",
            AbstractKind::TemplateForPropertyNameCondition => {
                "template for property name condition"
            }
        }
    }
}

impl std::fmt::Display for AbstractKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A symbolic placeholder for a value not known at analysis time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractValue {
    pub kind: AbstractKind,
    /// Operands, in order
    #[serde(default)]
    pub args: Vec<ValueId>,
    /// Stable identifier; a named value is referenced rather than re-derived
    #[serde(default)]
    pub name: Option<String>,
    /// Operator text for unary/binary/logical values
    #[serde(default)]
    pub operator: Option<String>,
}

impl AbstractValue {
    pub fn new(kind: AbstractKind, args: Vec<ValueId>) -> Self {
        Self {
            kind,
            args,
            name: None,
            operator: None,
        }
    }

    pub fn named(kind: AbstractKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            args: Vec::new(),
            name: Some(name.into()),
            operator: None,
        }
    }
}

/// Property descriptor.
///
/// The attribute flags are only compared against the host defaults; they
/// carry no re-emission semantics of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PropertyDescriptor {
    Data {
        value: ValueId,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        #[serde(default)]
        get: Option<ValueId>,
        #[serde(default)]
        set: Option<ValueId>,
        enumerable: bool,
        configurable: bool,
    },
}

impl PropertyDescriptor {
    /// A writable, enumerable, configurable data property.
    pub fn data(value: ValueId) -> Self {
        Self::with_attributes(value, true, true, true)
    }

    pub fn with_attributes(
        value: ValueId,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        PropertyDescriptor::Data {
            value,
            writable,
            enumerable,
            configurable,
        }
    }

    pub fn accessor(get: Option<ValueId>, set: Option<ValueId>) -> Self {
        PropertyDescriptor::Accessor {
            get,
            set,
            enumerable: false,
            configurable: true,
        }
    }

    pub fn value(&self) -> Option<ValueId> {
        match self {
            PropertyDescriptor::Data { value, .. } => Some(*value),
            PropertyDescriptor::Accessor { .. } => None,
        }
    }

    pub fn get(&self) -> Option<ValueId> {
        match self {
            PropertyDescriptor::Accessor { get, .. } => *get,
            PropertyDescriptor::Data { .. } => None,
        }
    }

    pub fn set(&self) -> Option<ValueId> {
        match self {
            PropertyDescriptor::Accessor { set, .. } => *set,
            PropertyDescriptor::Data { .. } => None,
        }
    }

    /// Accessor properties are never writable.
    pub fn writable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { writable, .. } => *writable,
            PropertyDescriptor::Accessor { .. } => false,
        }
    }

    pub fn enumerable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { enumerable, .. }
            | PropertyDescriptor::Accessor { enumerable, .. } => *enumerable,
        }
    }

    pub fn configurable(&self) -> bool {
        match self {
            PropertyDescriptor::Data { configurable, .. }
            | PropertyDescriptor::Accessor { configurable, .. } => *configurable,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self, PropertyDescriptor::Accessor { .. })
    }
}

/// Slot of an own property. A missing descriptor means the property was deleted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyBinding {
    #[serde(default)]
    pub descriptor: Option<PropertyDescriptor>,
}

impl PropertyBinding {
    pub fn new(descriptor: PropertyDescriptor) -> Self {
        Self {
            descriptor: Some(descriptor),
        }
    }

    pub fn deleted() -> Self {
        Self { descriptor: None }
    }
}

/// A symbol-keyed own property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolProperty {
    pub symbol: ValueId,
    #[serde(flatten)]
    pub binding: PropertyBinding,
}

/// Entry of a map-like collection. A missing key or value is a cleared slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    #[serde(default)]
    pub key: Option<ValueId>,
    #[serde(default)]
    pub value: Option<ValueId>,
}

impl MapEntry {
    pub fn new(key: ValueId, value: ValueId) -> Self {
        Self {
            key: Some(key),
            value: Some(value),
        }
    }

    pub fn cleared() -> Self {
        Self {
            key: None,
            value: None,
        }
    }
}

/// Element type of a typed array view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypedArrayKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

/// A function created by source code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlainFunction {
    /// Immutable code shared by every closure created from the same source
    pub code: CodeId,
    /// Environment the closure was created in
    pub environment: EnvId,
    /// Whether the function is emitted standalone in the output program
    #[serde(default)]
    pub residual: bool,
    /// Suppresses the report about outer captures of a residual function
    #[serde(default)]
    pub unsafe_residual: bool,
}

/// Result of `Function.prototype.bind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundFunction {
    pub target: ValueId,
    pub bound_this: ValueId,
    #[serde(default)]
    pub bound_args: Vec<ValueId>,
    /// The `length` the host computed when binding
    pub length: u32,
}

/// A function implemented by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeFunction {
    pub name: String,
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum FunctionData {
    Plain(PlainFunction),
    Bound(BoundFunction),
    Native(NativeFunction),
}

/// Kind-specific internal slots of an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectData {
    Ordinary,
    Array,
    Function(FunctionData),
    Proxy {
        target: ValueId,
        handler: ValueId,
    },
    Map {
        #[serde(default)]
        entries: Vec<MapEntry>,
    },
    WeakMap {
        #[serde(default)]
        entries: Vec<MapEntry>,
    },
    Set {
        #[serde(default)]
        entries: Vec<Option<ValueId>>,
    },
    WeakSet {
        #[serde(default)]
        entries: Vec<Option<ValueId>>,
    },
    Date {
        value: ValueId,
    },
    RegExp,
    Boolean {
        value: ValueId,
    },
    Number {
        value: ValueId,
    },
    String {
        value: ValueId,
    },
    ArrayBuffer,
    TypedArray {
        element: TypedArrayKind,
        buffer: ValueId,
    },
    DataView {
        buffer: ValueId,
    },
    Arguments,
    Error,
    Promise,
}

/// Closed enumeration of object kinds, used to index the default-prototype table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Object,
    Array,
    Function,
    Proxy,
    Map,
    WeakMap,
    Set,
    WeakSet,
    Date,
    RegExp,
    Boolean,
    Number,
    String,
    ArrayBuffer,
    Int8Array,
    Uint8Array,
    Uint8ClampedArray,
    Int16Array,
    Uint16Array,
    Int32Array,
    Uint32Array,
    Float32Array,
    Float64Array,
    DataView,
    Arguments,
    Error,
    Promise,
}

impl ObjectKind {
    pub const ALL: &'static [ObjectKind] = &[
        ObjectKind::Object,
        ObjectKind::Array,
        ObjectKind::Function,
        ObjectKind::Proxy,
        ObjectKind::Map,
        ObjectKind::WeakMap,
        ObjectKind::Set,
        ObjectKind::WeakSet,
        ObjectKind::Date,
        ObjectKind::RegExp,
        ObjectKind::Boolean,
        ObjectKind::Number,
        ObjectKind::String,
        ObjectKind::ArrayBuffer,
        ObjectKind::Int8Array,
        ObjectKind::Uint8Array,
        ObjectKind::Uint8ClampedArray,
        ObjectKind::Int16Array,
        ObjectKind::Uint16Array,
        ObjectKind::Int32Array,
        ObjectKind::Uint32Array,
        ObjectKind::Float32Array,
        ObjectKind::Float64Array,
        ObjectKind::DataView,
        ObjectKind::Arguments,
        ObjectKind::Error,
        ObjectKind::Promise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Object => "Object",
            ObjectKind::Array => "Array",
            ObjectKind::Function => "Function",
            ObjectKind::Proxy => "Proxy",
            ObjectKind::Map => "Map",
            ObjectKind::WeakMap => "WeakMap",
            ObjectKind::Set => "Set",
            ObjectKind::WeakSet => "WeakSet",
            ObjectKind::Date => "Date",
            ObjectKind::RegExp => "RegExp",
            ObjectKind::Boolean => "Boolean",
            ObjectKind::Number => "Number",
            ObjectKind::String => "String",
            ObjectKind::ArrayBuffer => "ArrayBuffer",
            ObjectKind::Int8Array => "Int8Array",
            ObjectKind::Uint8Array => "Uint8Array",
            ObjectKind::Uint8ClampedArray => "Uint8ClampedArray",
            ObjectKind::Int16Array => "Int16Array",
            ObjectKind::Uint16Array => "Uint16Array",
            ObjectKind::Int32Array => "Int32Array",
            ObjectKind::Uint32Array => "Uint32Array",
            ObjectKind::Float32Array => "Float32Array",
            ObjectKind::Float64Array => "Float64Array",
            ObjectKind::DataView => "DataView",
            ObjectKind::Arguments => "Arguments",
            ObjectKind::Error => "Error",
            ObjectKind::Promise => "Promise",
        }
    }

    /// Name of the intrinsic default prototype for objects of this kind.
    ///
    /// Proxies have no prototype of their own.
    pub fn prototype_name(&self) -> Option<String> {
        match self {
            ObjectKind::Proxy => None,
            // Arguments objects inherit straight from Object.prototype
            ObjectKind::Arguments => Some("ObjectPrototype".to_string()),
            kind => Some(format!("{}Prototype", kind.as_str())),
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TypedArrayKind {
    pub fn object_kind(&self) -> ObjectKind {
        match self {
            TypedArrayKind::Int8 => ObjectKind::Int8Array,
            TypedArrayKind::Uint8 => ObjectKind::Uint8Array,
            TypedArrayKind::Uint8Clamped => ObjectKind::Uint8ClampedArray,
            TypedArrayKind::Int16 => ObjectKind::Int16Array,
            TypedArrayKind::Uint16 => ObjectKind::Uint16Array,
            TypedArrayKind::Int32 => ObjectKind::Int32Array,
            TypedArrayKind::Uint32 => ObjectKind::Uint32Array,
            TypedArrayKind::Float32 => ObjectKind::Float32Array,
            TypedArrayKind::Float64 => ObjectKind::Float64Array,
        }
    }
}

fn default_true() -> bool {
    true
}

/// An object and all its specializations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectValue {
    /// String-keyed own properties, in definition order
    #[serde(default)]
    pub properties: IndexMap<String, PropertyBinding>,
    /// Symbol-keyed own properties
    #[serde(default)]
    pub symbols: Vec<SymbolProperty>,
    pub prototype: ValueId,
    #[serde(default = "default_true")]
    pub extensible: bool,
    /// The function this object is the default `prototype` object of
    #[serde(default)]
    pub original_constructor: Option<ValueId>,
    /// Properties written under computed names (a chain of conditional writes)
    #[serde(default)]
    pub unknown_property: Option<PropertyBinding>,
    pub data: ObjectData,
}

impl ObjectValue {
    pub fn new(data: ObjectData, prototype: ValueId) -> Self {
        Self {
            properties: IndexMap::new(),
            symbols: Vec::new(),
            prototype,
            extensible: true,
            original_constructor: None,
            unknown_property: None,
            data,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match &self.data {
            ObjectData::Ordinary => ObjectKind::Object,
            ObjectData::Array => ObjectKind::Array,
            ObjectData::Function(_) => ObjectKind::Function,
            ObjectData::Proxy { .. } => ObjectKind::Proxy,
            ObjectData::Map { .. } => ObjectKind::Map,
            ObjectData::WeakMap { .. } => ObjectKind::WeakMap,
            ObjectData::Set { .. } => ObjectKind::Set,
            ObjectData::WeakSet { .. } => ObjectKind::WeakSet,
            ObjectData::Date { .. } => ObjectKind::Date,
            ObjectData::RegExp => ObjectKind::RegExp,
            ObjectData::Boolean { .. } => ObjectKind::Boolean,
            ObjectData::Number { .. } => ObjectKind::Number,
            ObjectData::String { .. } => ObjectKind::String,
            ObjectData::ArrayBuffer => ObjectKind::ArrayBuffer,
            ObjectData::TypedArray { element, .. } => element.object_kind(),
            ObjectData::DataView { .. } => ObjectKind::DataView,
            ObjectData::Arguments => ObjectKind::Arguments,
            ObjectData::Error => ObjectKind::Error,
            ObjectData::Promise => ObjectKind::Promise,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionData> {
        match &self.data {
            ObjectData::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Builder-style property definition.
    pub fn with_property(mut self, key: impl Into<String>, descriptor: PropertyDescriptor) -> Self {
        self.define_property(key, descriptor);
        self
    }

    pub fn define_property(&mut self, key: impl Into<String>, descriptor: PropertyDescriptor) {
        self.properties
            .insert(key.into(), PropertyBinding::new(descriptor));
    }

    /// Keeps the slot (and its position) but drops the descriptor.
    pub fn delete_property(&mut self, key: &str) {
        if let Some(binding) = self.properties.get_mut(key) {
            binding.descriptor = None;
        }
    }

    /// Live descriptor of an own string-keyed property.
    pub fn property(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.properties
            .get(key)
            .and_then(|binding| binding.descriptor.as_ref())
    }

    /// Value of an own data property.
    pub fn property_value(&self, key: &str) -> Option<ValueId> {
        self.property(key).and_then(|desc| desc.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kind_follows_data() {
        let proto = ValueId(0);
        let view = ObjectValue::new(
            ObjectData::TypedArray {
                element: TypedArrayKind::Float32,
                buffer: ValueId(3),
            },
            proto,
        );
        assert_eq!(view.kind(), ObjectKind::Float32Array);
        assert_eq!(
            view.kind().prototype_name().as_deref(),
            Some("Float32ArrayPrototype")
        );
        assert_eq!(ObjectKind::Proxy.prototype_name(), None);
    }

    #[test]
    fn test_deleted_property_keeps_slot() {
        let mut obj = ObjectValue::new(ObjectData::Ordinary, ValueId(0))
            .with_property("a", PropertyDescriptor::data(ValueId(1)))
            .with_property("b", PropertyDescriptor::data(ValueId(2)));
        obj.delete_property("a");

        assert!(obj.property("a").is_none());
        assert_eq!(obj.property_value("b"), Some(ValueId(2)));
        assert_eq!(obj.properties.len(), 2);
    }

    #[test]
    fn test_accessor_is_never_writable() {
        let desc = PropertyDescriptor::accessor(Some(ValueId(4)), None);
        assert!(!desc.writable());
        assert!(desc.is_accessor());
        assert_eq!(desc.value(), None);
        assert_eq!(desc.get(), Some(ValueId(4)));
    }

    #[test]
    fn test_value_json_shape() {
        let json = r#"{"type":"object","prototype":0,"data":{"kind":"function","function":"bound","target":1,"bound_this":2,"length":0}}"#;
        let value: Value = serde_json::from_str(json).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.kind(), ObjectKind::Function);
        assert!(obj.extensible);
        match obj.as_function() {
            Some(FunctionData::Bound(bound)) => {
                assert_eq!(bound.target, ValueId(1));
                assert!(bound.bound_args.is_empty());
            }
            other => panic!("unexpected function data: {:?}", other),
        }
    }
}
