//! Residual heap analysis.
//!
//! Starting from the generator's recorded effects and the module values,
//! the visitor walks an abstract heap and works out which values a
//! residual program must re-create, which property descriptors are host
//! defaults that can be left implicit, and which bindings every plain
//! function captures from its enclosing scopes.

pub mod error;
pub mod free_vars;
pub mod residual;
pub mod visitor;

mod bindings;
mod computed;
mod descriptors;

#[cfg(test)]
mod fixtures;

pub use error::{AnalysisError, Result};
pub use free_vars::{analyze_function, FunctionInfo};
pub use residual::{BindingKey, BindingOrigin, ResidualHeap, VisitedBinding};
pub use visitor::{analyze, ResidualHeapVisitor};
