//! Fatal analysis errors.
//!
//! These abort the pass: they mean an upstream component handed over a heap
//! that breaks the analysis' preconditions. Survivable shapes are reported
//! through a [`residual_diagnostics::DiagnosticSink`] instead.

use residual_heap::{EnvId, HeapError, ValueId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("binding `{name}` in {environment} is deletable")]
    DeletableBinding { environment: EnvId, name: String },

    #[error("reference to `{name}` resolved to the symbol-named binding {symbol}")]
    SymbolReference { name: String, symbol: ValueId },

    #[error("binding `{name}` is not declared in {environment}")]
    MissingBinding { environment: EnvId, name: String },

    #[error("malformed computed property chain at {0}")]
    MalformedComputedNames(ValueId),

    #[error(transparent)]
    Heap(#[from] HeapError),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
