//! Diagnostic infrastructure for the residual heap analysis.
//!
//! This crate provides structured reporting with:
//! - Diagnostic codes with default severities
//! - A fire-and-continue sink trait for analysis passes
//! - Multiple output formats (terminal, JSON, simple text)
//!
//! # Example
//!
//! ```
//! use residual_diagnostics::{
//!     Diagnostic, DiagnosticCode, DiagnosticEmitter, DiagnosticSink, Diagnostics,
//!     TerminalEmitter,
//! };
//!
//! let mut diagnostics = Diagnostics::new();
//! diagnostics.report(
//!     Diagnostic::new(DiagnosticCode::UnsupportedObjectKind, "Object of kind Promise is not supported")
//!         .with_subject(42, "Promise object")
//!         .build(),
//! );
//!
//! let stderr = std::io::stderr();
//! let mut emitter = TerminalEmitter::new(stderr.lock(), false);
//! emitter.emit_all(&diagnostics).unwrap();
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod location;

// Re-export commonly used types
pub use diagnostic::{
    Diagnostic, DiagnosticBuilder, DiagnosticCode, DiagnosticSink, Diagnostics, Severity,
};
pub use emitter::{DiagnosticEmitter, JsonEmitter, SimpleEmitter, TerminalEmitter};
pub use location::{Location, Subject};
