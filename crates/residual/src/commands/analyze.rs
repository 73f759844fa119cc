//! Analyze command - one residual heap pass over a snapshot

use anyhow::{anyhow, Context, Result};
use clap::Args;
use residual_analysis::{analyze, BindingOrigin, ResidualHeap, VisitedBinding};
use residual_diagnostics::{DiagnosticEmitter, Diagnostics, JsonEmitter, TerminalEmitter};
use residual_heap::{Heap, HeapSnapshot, LoadedSnapshot};
use std::io::Write;
use std::path::PathBuf;

use crate::config::Config;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Heap snapshot (JSON)
    pub snapshot: PathBuf,

    /// Print the binding tables
    #[arg(long)]
    pub show_bindings: bool,

    /// Print properties left implicit as host defaults
    #[arg(long)]
    pub show_ignored: bool,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

pub fn run(
    args: AnalyzeArgs,
    config: &Config,
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
    verbose: u8,
) -> Result<()> {
    let snapshot = HeapSnapshot::load(&args.snapshot)?;
    let LoadedSnapshot {
        heap,
        generator,
        modules,
        mut diagnostics,
    } = Heap::from_snapshot(snapshot)?;

    if verbose > 0 && matches!(format, OutputFormat::Text) {
        println!(
            "Loaded {}: {} values, {} generator entries, {} module values",
            args.snapshot.display(),
            heap.len(),
            generator.entries.len(),
            modules.len()
        );
    }

    let residual = analyze(&heap, &generator, &modules, &mut diagnostics)
        .with_context(|| format!("Analysis of {} aborted", args.snapshot.display()))?;

    let show_bindings = args.show_bindings || config.output.show_bindings;
    let show_ignored = args.show_ignored || config.output.show_ignored;

    match format {
        OutputFormat::Text => {
            if !diagnostics.is_empty() {
                let stderr = std::io::stderr();
                let mut emitter = TerminalEmitter::new(stderr.lock(), use_color);
                emitter.emit_all(&diagnostics)?;
                emitter.emit_summary(&diagnostics)?;
            }
            if !quiet {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                print_summary(&mut out, &heap, &residual, use_color)?;
                print_captures(&mut out, &heap, &residual, use_color)?;
                if show_bindings {
                    print_bindings(&mut out, &residual, use_color)?;
                }
                if show_ignored {
                    print_ignored(&mut out, &heap, &residual, use_color)?;
                }
            }
        }
        OutputFormat::Json => {
            let stdout = std::io::stdout();
            let mut emitter = JsonEmitter::new(stdout.lock());
            emitter.emit_all(&diagnostics)?;
            emitter.emit_summary(&diagnostics)?;
            drop(emitter);

            let output = serde_json::json!({
                "type": "result",
                "snapshot": args.snapshot.display().to_string(),
                "heap_values": heap.len(),
                "visited": residual.values.len(),
                "residual": residual,
            });
            println!("{}", serde_json::to_string(&output)?);
        }
    }

    check_policy(&diagnostics, args.strict || config.diagnostics.deny_warnings)
}

/// Fail the run on reported errors, and on warnings when they are denied.
fn check_policy(diagnostics: &Diagnostics, deny_warnings: bool) -> Result<()> {
    let errors = diagnostics.error_count();
    let warnings = diagnostics.warning_count();
    if errors > 0 {
        return Err(anyhow!("Analysis reported {} error(s)", errors));
    }
    if deny_warnings && warnings > 0 {
        return Err(anyhow!(
            "Analysis reported {} warning(s) (warnings denied)",
            warnings
        ));
    }
    Ok(())
}

fn heading(title: &str, use_color: bool) -> String {
    if use_color {
        console::style(title).bold().to_string()
    } else {
        title.to_string()
    }
}

fn print_summary(
    out: &mut impl Write,
    heap: &Heap,
    residual: &ResidualHeap,
    use_color: bool,
) -> std::io::Result<()> {
    let reachable = format!("{} of {}", residual.values.len(), heap.len());
    let reachable = if use_color {
        console::style(reachable).cyan().to_string()
    } else {
        reachable
    };
    writeln!(
        out,
        "{} values reachable, {} function bodies analyzed",
        reachable,
        residual.function_infos.len()
    )
}

fn print_captures(
    out: &mut impl Write,
    heap: &Heap,
    residual: &ResidualHeap,
    use_color: bool,
) -> std::io::Result<()> {
    if residual.function_bindings.values().all(|table| table.is_empty()) {
        return Ok(());
    }
    writeln!(out, "\n{}:", heading("Captures", use_color))?;
    for (function, table) in &residual.function_bindings {
        if table.is_empty() {
            continue;
        }
        writeln!(out, "  {} ({})", heap.describe(*function), function)?;
        for (name, key) in table {
            let modified = residual
                .binding(key)
                .map_or(false, |binding| binding.modified);
            writeln!(
                out,
                "    {} -> {}{}",
                name,
                key,
                if modified { " (modified)" } else { "" }
            )?;
        }
    }
    Ok(())
}

fn binding_line(name: &str, binding: &VisitedBinding) -> String {
    let value = binding
        .value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "(global object)".to_string());
    let origin = match binding.origin {
        BindingOrigin::Global => "global".to_string(),
        BindingOrigin::Lexical(env) => env.to_string(),
    };
    format!(
        "{} = {} [{}{}]",
        name,
        value,
        origin,
        if binding.modified { ", modified" } else { "" }
    )
}

fn print_bindings(
    out: &mut impl Write,
    residual: &ResidualHeap,
    use_color: bool,
) -> std::io::Result<()> {
    writeln!(out, "\n{}:", heading("Bindings", use_color))?;
    for (name, binding) in &residual.global_bindings {
        writeln!(out, "  {}", binding_line(name, binding))?;
    }
    for bindings in residual.declarative_bindings.values() {
        for (name, binding) in bindings {
            writeln!(out, "  {}", binding_line(name, binding))?;
        }
    }
    Ok(())
}

fn print_ignored(
    out: &mut impl Write,
    heap: &Heap,
    residual: &ResidualHeap,
    use_color: bool,
) -> std::io::Result<()> {
    writeln!(out, "\n{}:", heading("Implicit properties", use_color))?;
    for (object, keys) in &residual.ignored_properties {
        let keys: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        writeln!(
            out,
            "  {} ({}): {}",
            heap.describe(*object),
            object,
            keys.join(", ")
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use residual_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};

    #[test]
    fn test_policy_fails_on_errors() {
        let mut diagnostics = Diagnostics::new();
        assert!(check_policy(&diagnostics, true).is_ok());

        diagnostics.report(Diagnostic::new(DiagnosticCode::ArgumentsObject, "arguments").build());
        let err = check_policy(&diagnostics, false).unwrap_err();
        assert!(err.to_string().contains("1 error(s)"));
    }

    #[test]
    fn test_policy_denies_warnings_on_request() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report(
            Diagnostic::warning(DiagnosticCode::InternalError, "odd but survivable").build(),
        );
        assert!(check_policy(&diagnostics, false).is_ok());
        assert!(check_policy(&diagnostics, true).is_err());
    }

    #[test]
    fn test_capture_listing() {
        let heap = Heap::from_json(
            r#"{
                "values": [
                    {"type": "undefined"},
                    {"type": "null"}
                ],
                "environments": [{"type": "global"}],
                "intrinsics": {"undefined": 0, "null": 1}
            }"#,
        )
        .unwrap()
        .heap;
        let residual = ResidualHeap::default();

        let mut out = Vec::new();
        print_captures(&mut out, &heap, &residual, false).unwrap();
        assert!(out.is_empty());

        print_summary(&mut out, &heap, &residual, false).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0 of 2 values reachable, 0 function bodies analyzed\n"
        );
    }
}
