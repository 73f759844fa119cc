//! Diagnostic types for analysis errors, warnings, and hints.

use crate::location::{Location, Subject};
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational hint
    Hint,
    /// Warning (the residual program is still faithful)
    Warning,
    /// Error (the value cannot be faithfully re-emitted)
    Error,
}

impl Severity {
    /// Get the string representation for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Parse errors (P001-P099)
    /// Syntax error in a function body
    ParseError,

    // Heap shapes (H001-H099)
    /// Function `length` defined as an accessor
    FunctionLengthAccessor,
    /// Object kind that cannot be re-emitted
    UnsupportedObjectKind,
    /// Arguments exotic object
    ArgumentsObject,
    /// `o[p]` with partially known `o` and unknown `p`
    SymbolicMemberAccess,

    // Closures (C001-C099)
    /// Residual function referring to identifiers outside its own scope
    ResidualClosureCapture,

    // Internal errors (I001-I099)
    /// Internal analysis error
    InternalError,
}

impl DiagnosticCode {
    /// Every code, in display order.
    pub const ALL: &'static [DiagnosticCode] = &[
        Self::ParseError,
        Self::FunctionLengthAccessor,
        Self::UnsupportedObjectKind,
        Self::ArgumentsObject,
        Self::SymbolicMemberAccess,
        Self::ResidualClosureCapture,
        Self::InternalError,
    ];

    /// Get the error code string (e.g., "H001").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "P001",

            Self::FunctionLengthAccessor => "H001",
            Self::UnsupportedObjectKind => "H002",
            Self::ArgumentsObject => "H003",
            Self::SymbolicMemberAccess => "H004",

            Self::ResidualClosureCapture => "C001",

            Self::InternalError => "I001",
        }
    }

    /// Look a code up by its string form (case-insensitive).
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    /// Get the default severity for this code.
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ParseError
            | Self::FunctionLengthAccessor
            | Self::UnsupportedObjectKind
            | Self::ArgumentsObject
            | Self::SymbolicMemberAccess
            | Self::ResidualClosureCapture
            | Self::InternalError => Severity::Error,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An analysis diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Unique error code
    pub code: DiagnosticCode,
    /// Severity level
    pub severity: Severity,
    /// Short message (single line)
    pub message: String,
    /// Longer explanation (optional)
    pub explanation: Option<String>,
    /// The heap value being reported on
    pub subject: Option<Subject>,
    /// Source location, when the subject has one
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Error, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Warning, message)
    }

    /// Create a new hint diagnostic.
    pub fn hint(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Hint, message)
    }

    /// Create a diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, code.default_severity(), message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn is_hint(&self) -> bool {
        self.severity == Severity::Hint
    }
}

/// Builder for constructing diagnostics fluently.
pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    /// Create a new diagnostic builder.
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity,
                message: message.into(),
                explanation: None,
                subject: None,
                location: None,
            },
        }
    }

    /// Attach the value this diagnostic is about.
    pub fn with_subject(mut self, handle: u32, description: impl Into<String>) -> Self {
        self.inner.subject = Some(Subject::new(handle, description));
        self
    }

    /// Attach a source location.
    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.inner.location = location;
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.explanation = Some(help.into());
        self
    }

    /// Build the diagnostic.
    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Receiver of diagnostics produced while analysing.
///
/// Reporting never fails and never interrupts the reporter.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Collection of diagnostics with summary statistics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// All diagnostics, in report order
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create a new empty collection.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Extend with multiple diagnostics.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.is_error())
    }

    /// Count errors.
    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    /// Count warnings.
    pub fn warning_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_warning()).count()
    }

    /// Count hints.
    pub fn hint_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_hint()).count()
    }

    /// Diagnostics carrying the given code.
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.code == code)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip_by_string() {
        for code in DiagnosticCode::ALL {
            assert_eq!(DiagnosticCode::parse(code.as_str()), Some(*code));
        }
        assert_eq!(
            DiagnosticCode::parse("h003"),
            Some(DiagnosticCode::ArgumentsObject)
        );
        assert_eq!(DiagnosticCode::parse("X999"), None);
    }

    #[test]
    fn test_builder_sets_subject_and_help() {
        let diag = Diagnostic::new(DiagnosticCode::ResidualClosureCapture, "captures `x`")
            .with_subject(4, "function `f`")
            .with_location(Some(Location::new("a.js", 1, 1)))
            .with_help("pass `x` as a parameter")
            .build();

        assert!(diag.is_error());
        assert_eq!(diag.subject.as_ref().map(|s| s.handle), Some(4));
        assert_eq!(diag.location.as_ref().map(|l| l.line), Some(1));
        assert_eq!(diag.explanation.as_deref(), Some("pass `x` as a parameter"));
    }

    #[test]
    fn test_sink_collects_in_order() {
        let mut diagnostics = Diagnostics::new();
        let sink: &mut dyn DiagnosticSink = &mut diagnostics;
        sink.report(Diagnostic::warning(DiagnosticCode::UnsupportedObjectKind, "first").build());
        sink.report(Diagnostic::error(DiagnosticCode::ArgumentsObject, "second").build());
        sink.report(Diagnostic::hint(DiagnosticCode::InternalError, "third").build());

        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.hint_count(), 1);
        assert_eq!(diagnostics.items[0].message, "first");
        assert_eq!(
            diagnostics.with_code(DiagnosticCode::ArgumentsObject).count(),
            1
        );
    }
}
