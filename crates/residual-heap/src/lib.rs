//! Abstract heap model for the residual heap analysis.
//!
//! The heap is an arena of values, environment records and function codes
//! addressed by handle. It is built once (from a JSON snapshot or
//! programmatically) and only read by the analysis.
//!
//! # Example
//!
//! ```
//! use residual_heap::{Heap, ObjectData, PropertyDescriptor};
//!
//! let mut heap = Heap::new();
//! let one = heap.alloc_number(1.0);
//! let point = heap
//!     .new_object(ObjectData::Ordinary)
//!     .with_property("x", PropertyDescriptor::data(one));
//! let point = heap.alloc_object(point);
//! assert_eq!(heap.describe(point), "Object object");
//! ```

pub mod environment;
pub mod generator;
pub mod heap;
pub mod scope;
pub mod snapshot;
pub mod value;

pub use environment::{Binding, EnvId, Environment};
pub use generator::{Generator, GeneratorEntry};
pub use heap::{CodeId, Heap, HeapError, Intrinsics};
pub use scope::{Reference, ReferenceBase, ReferencedName, ScopeChain, ScopeResolver};
pub use snapshot::{CodeSource, HeapSnapshot, IntrinsicsSnapshot, LoadedSnapshot};
pub use value::{
    AbstractKind, AbstractValue, BoundFunction, FunctionData, MapEntry, NativeFunction,
    ObjectData, ObjectKind, ObjectValue, PlainFunction, PropertyBinding, PropertyDescriptor,
    SymbolProperty, TypedArrayKind, Value, ValueId,
};

// Function code lives in the parser crate; re-export for heap builders.
pub use residual_parser::{FunctionCode, FunctionKind};
