//! Explain command - explain diagnostic codes

use anyhow::{anyhow, Result};
use clap::Args;
use console::Style;
use std::fmt::Write;
use residual_diagnostics::DiagnosticCode;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code to explain (e.g., H002, C001)
    pub code: String,
}

struct CodeExplanation {
    code: &'static str,
    title: &'static str,
    description: &'static str,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [&'static str],
}

const EXPLANATIONS: &[CodeExplanation] = &[
    CodeExplanation {
        code: "P001",
        title: "Parse Error",
        description: "The source text of a function code in the snapshot could not be parsed as a function.",
        example: Some("function inc() { count += ; }  // Missing operand"),
        suggestion: Some("Check that every code source is a single function declaration, function expression or arrow function."),
        related: &[],
    },
    CodeExplanation {
        code: "H001",
        title: "Function Length Accessor",
        description: "A function's `length` property is an accessor. Calling the getter later could have side effects the residual program cannot reproduce.",
        example: Some("Object.defineProperty(f, 'length', { get() { return 2; } });"),
        suggestion: Some("Define `length` as a plain value, or leave it at its default."),
        related: &["H002"],
    },
    CodeExplanation {
        code: "H002",
        title: "Unsupported Object Kind",
        description: "The object's kind carries internal state that cannot be re-created by a residual program (for example Error stacks or Promise reactions).",
        example: Some("const pending = new Promise(resolve => later(resolve));"),
        suggestion: Some("Create such objects at run time instead of keeping them in the heap."),
        related: &["H003"],
    },
    CodeExplanation {
        code: "H003",
        title: "Arguments Object",
        description: "An `arguments` object escaped into the heap. Its mapping to formal parameters cannot be re-created.",
        example: Some("function keep() { saved = arguments; }"),
        suggestion: Some("Copy the values out with rest parameters: function keep(...args) { saved = args; }"),
        related: &["H002"],
    },
    CodeExplanation {
        code: "H004",
        title: "Symbolic Member Access",
        description: "A value is the result of `o[p]` where `o` is only partially known and `p` is unknown. The analysis keeps going, but the read cannot be re-emitted faithfully.",
        example: Some("const v = config[userKey];"),
        suggestion: Some("Make the key known, or make the whole object abstract."),
        related: &[],
    },
    CodeExplanation {
        code: "C001",
        title: "Residual Closure Capture",
        description: r#"A function marked residual refers to identifiers defined outside of its own scope.

Residual functions are meant to be re-emitted on their own; every outer binding
they read or write has to be re-created next to them."#,
        example: Some("let count = 0;\nfunction inc() { return ++count; }  // `count` is captured"),
        suggestion: Some(r#"Either:
1. Pass the values in as parameters
2. Mark the function unsafe-residual when the captures are intended"#),
        related: &[],
    },
    CodeExplanation {
        code: "I001",
        title: "Internal Error",
        description: "The analysis hit a state it does not expect. Please report it with the snapshot that triggered it.",
        example: None,
        suggestion: None,
        related: &[],
    },
];

fn find(code: &str) -> Option<&'static CodeExplanation> {
    EXPLANATIONS.iter().find(|e| e.code == code)
}

pub fn run(args: ExplainArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    let code = args.code.to_uppercase();

    let explanation = find(&code).ok_or_else(|| anyhow!("Unknown diagnostic code: {}", code))?;

    match format {
        OutputFormat::Text => print!("{}", render(explanation, use_color)),
        OutputFormat::Json => {
            let severity = DiagnosticCode::parse(explanation.code).map(|c| c.default_severity());
            let output = serde_json::json!({
                "code": explanation.code,
                "title": explanation.title,
                "severity": severity.map(|s| s.as_str()),
                "description": explanation.description,
                "example": explanation.example,
                "suggestion": explanation.suggestion,
                "related": explanation.related,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn render(explanation: &CodeExplanation, use_color: bool) -> String {
    let style = Style::new().force_styling(use_color);
    let mut out = String::new();

    let rule = "=".repeat(explanation.code.len() + explanation.title.len() + 2);
    let _ = writeln!(
        out,
        "\n{}: {}\n{}",
        style.clone().bold().cyan().apply_to(explanation.code),
        style.clone().bold().apply_to(explanation.title),
        rule
    );
    let _ = writeln!(out, "\n{}\n", explanation.description);

    let sections = [
        ("Example", explanation.example, style.clone().bold()),
        ("Suggestion", explanation.suggestion, style.clone().bold().green()),
    ];
    for (heading, body, heading_style) in sections {
        let Some(body) = body else { continue };
        let _ = writeln!(out, "{}:", heading_style.apply_to(heading));
        for line in body.lines() {
            let _ = writeln!(out, "  {}", line);
        }
        out.push('\n');
    }

    if !explanation.related.is_empty() {
        let _ = writeln!(
            out,
            "{}: {}",
            style.dim().apply_to("Related"),
            explanation.related.join(", ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_is_explained() {
        for code in DiagnosticCode::ALL {
            assert!(find(code.as_str()).is_some(), "{} has no explanation", code);
        }
    }

    #[test]
    fn test_related_codes_exist() {
        for explanation in EXPLANATIONS {
            for related in explanation.related {
                assert!(find(related).is_some(), "{} -> {}", explanation.code, related);
            }
        }
    }

    #[test]
    fn test_render_plain_text() {
        let text = render(find("H003").unwrap(), false);
        let header = format!("\nH003: Arguments Object\n{}\n", "=".repeat(22));
        assert!(text.starts_with(&header));
        assert!(text.contains("Suggestion:\n  Copy the values out"));
        assert!(text.ends_with("Related: H002\n"));
    }
}
