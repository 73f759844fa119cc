//! Locations and subjects that diagnostics point at.

use serde::{Deserialize, Serialize};

/// A human-readable source location (1-indexed line and column).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path
    pub file: String,
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
}

impl Location {
    /// Create a new location.
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// The heap value a diagnostic is about.
///
/// `handle` is the raw index of the value in the heap arena; `description`
/// is whatever the reporter considers a useful name for it
/// (e.g. "function `adder`").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub handle: u32,
    pub description: String,
}

impl Subject {
    pub fn new(handle: u32, description: impl Into<String>) -> Self {
        Self {
            handle,
            description: description.into(),
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (#{})", self.description, self.handle)
    }
}
