//! Diagnostic emitters for different output formats.

use crate::diagnostic::{Diagnostic, Diagnostics, Severity};
use console::Style;
use std::io::Write;

/// Trait for emitting diagnostics in various formats.
pub trait DiagnosticEmitter {
    /// Emit a single diagnostic.
    fn emit(&mut self, diagnostic: &Diagnostic) -> std::io::Result<()>;

    /// Emit multiple diagnostics.
    fn emit_all(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        for diag in diagnostics.iter() {
            self.emit(diag)?;
        }
        Ok(())
    }

    /// Emit a summary line.
    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()>;
}

/// Human-readable output for a terminal, styled with `console` when colored.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colored: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, colored: bool) -> Self {
        Self { writer, colored }
    }

    fn style(&self) -> Style {
        Style::new().force_styling(self.colored)
    }

    fn severity_style(&self, severity: Severity) -> Style {
        match severity {
            Severity::Error => self.style().red(),
            Severity::Warning => self.style().yellow(),
            Severity::Hint => self.style().blue(),
        }
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) -> std::io::Result<()> {
        let header = format!("{}[{}]", diagnostic.severity, diagnostic.code);
        let gutter = self.style().cyan();

        // error[H003]: message
        writeln!(
            self.writer,
            "{}: {}",
            self.severity_style(diagnostic.severity).bold().apply_to(header),
            diagnostic.message
        )?;
        if let Some(location) = &diagnostic.location {
            writeln!(self.writer, "  {} {}", gutter.apply_to("-->"), location)?;
        }
        if let Some(subject) = &diagnostic.subject {
            writeln!(self.writer, "  {} {}", gutter.apply_to("= value:"), subject)?;
        }
        if let Some(help) = &diagnostic.explanation {
            writeln!(self.writer, "  {} {}", gutter.apply_to("= help:"), help)?;
        }
        writeln!(self.writer)
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let errors = diagnostics.error_count();
        let warnings = diagnostics.warning_count();

        let mut parts = Vec::new();
        if errors > 0 {
            parts.push(plural(errors, "error"));
        }
        if warnings > 0 {
            parts.push(plural(warnings, "warning"));
        }
        if parts.is_empty() {
            return Ok(());
        }

        let severity = if errors > 0 {
            Severity::Error
        } else {
            Severity::Warning
        };
        let line = format!("{} reported", parts.join(" and "));
        writeln!(self.writer, "{}", self.severity_style(severity).apply_to(line))
    }
}

/// JSON lines output for tooling integration.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    /// Create a new JSON emitter.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) -> std::io::Result<()> {
        let json = serde_json::json!({
            "code": diagnostic.code.as_str(),
            "severity": diagnostic.severity.as_str(),
            "message": diagnostic.message,
            "location": diagnostic.location.as_ref().map(|l| serde_json::json!({
                "file": l.file,
                "line": l.line,
                "column": l.column,
            })),
            "value": diagnostic.subject.as_ref().map(|s| serde_json::json!({
                "handle": s.handle,
                "description": s.description,
            })),
            "help": diagnostic.explanation,
        });

        serde_json::to_writer(&mut self.writer, &json)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let summary = serde_json::json!({
            "type": "summary",
            "errors": diagnostics.error_count(),
            "warnings": diagnostics.warning_count(),
            "hints": diagnostics.hint_count(),
            "total": diagnostics.len(),
        });
        serde_json::to_writer(&mut self.writer, &summary)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

/// Simple text output (no colors, one line per diagnostic).
pub struct SimpleEmitter<W: Write> {
    writer: W,
}

impl<W: Write> SimpleEmitter<W> {
    /// Create a new simple emitter.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for SimpleEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic) -> std::io::Result<()> {
        if let Some(ref loc) = diagnostic.location {
            write!(self.writer, "{}: ", loc)?;
        }
        writeln!(
            self.writer,
            "{}: {} [{}]",
            diagnostic.severity.as_str(),
            diagnostic.message,
            diagnostic.code.as_str()
        )
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{} error(s), {} warning(s)",
            diagnostics.error_count(),
            diagnostics.warning_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::location::Location;

    fn sample() -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(
            Diagnostic::new(DiagnosticCode::ArgumentsObject, "Arguments object is not supported")
                .with_subject(7, "object")
                .with_location(Some(Location::new("main.js", 2, 5)))
                .build(),
        );
        diagnostics
    }

    #[test]
    fn test_simple_emitter() {
        let mut out = Vec::new();
        let diagnostics = sample();
        let mut emitter = SimpleEmitter::new(&mut out);
        emitter.emit_all(&diagnostics).unwrap();
        emitter.emit_summary(&diagnostics).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "main.js:2:5: error: Arguments object is not supported [H003]\n1 error(s), 0 warning(s)\n"
        );
    }

    #[test]
    fn test_json_emitter_lines() {
        let mut out = Vec::new();
        let diagnostics = sample();
        let mut emitter = JsonEmitter::new(&mut out);
        emitter.emit_all(&diagnostics).unwrap();

        let text = String::from_utf8(out).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed["code"], "H003");
        assert_eq!(parsed["value"]["handle"], 7);
        assert_eq!(parsed["location"]["line"], 2);
    }

    #[test]
    fn test_terminal_emitter_uncolored() {
        let mut out = Vec::new();
        let diagnostics = sample();
        let mut emitter = TerminalEmitter::new(&mut out, false);
        emitter.emit_all(&diagnostics).unwrap();
        emitter.emit_summary(&diagnostics).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("error[H003]: Arguments object is not supported\n"));
        assert!(text.contains("--> main.js:2:5"));
        assert!(text.contains("= value: object (#7)"));
        assert!(text.ends_with("1 error reported\n"));
    }
}
