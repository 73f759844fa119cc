//! JavaScript function parser wrapper using SWC
//!
//! Plain functions in the heap refer to their code by handle. This crate turns
//! the source text of one function (expression, declaration or arrow) into
//! that immutable [`FunctionCode`]: its formal parameters and its body.

use anyhow::{anyhow, Result};
use residual_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Location};
use swc_common::{sync::Lrc, BytePos, FileName, SourceMap, Spanned};
use swc_ecma_ast::{BlockStmt, BlockStmtOrExpr, Expr, Lit, Pat, Stmt};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};

// Re-export AST types for consumers that need to inspect function bodies
pub use swc_ecma_ast;

/// The flavour of a parsed function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Normal,
    Arrow,
    Generator,
    Async,
    AsyncGenerator,
}

/// A function body as written.
#[derive(Debug, Clone)]
pub enum FunctionBody {
    /// `function (..) { .. }` or `(..) => { .. }`
    Block(BlockStmt),
    /// Concise arrow body: `(..) => expr`
    Expr(Box<Expr>),
}

/// The immutable code of a plain function.
#[derive(Debug, Clone)]
pub struct FunctionCode {
    /// Name of a named function expression or declaration
    pub name: Option<String>,
    /// Formal parameter patterns, in order
    pub params: Vec<Pat>,
    pub body: FunctionBody,
    pub kind: FunctionKind,
    /// Whether the body opens with a "use strict" directive
    pub strict: bool,
    /// Where the function was defined, if known
    pub location: Option<Location>,
    /// The source the code was parsed from
    pub source: String,
}

impl FunctionCode {
    /// Number of formal parameters before the first default or rest parameter.
    ///
    /// This is the `length` the host would give a fresh function object
    /// created from this code.
    pub fn expected_argument_count(&self) -> u32 {
        self.params
            .iter()
            .take_while(|p| !matches!(p, Pat::Assign(_) | Pat::Rest(_)))
            .count() as u32
    }

    /// Replace the location, e.g. with one recorded by the producer of a snapshot.
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

/// Result of parsing one function.
#[derive(Debug)]
pub struct ParseResult {
    pub code: FunctionCode,
    /// Recoverable parse errors, reported as warnings
    pub diagnostics: Diagnostics,
}

/// Parse the source text of a single function.
///
/// The source is parsed as a parenthesized expression, so both
/// `function f(a) {..}` and `(a) => ..` forms are accepted.
pub fn parse_function(source: &str, filename: &str) -> Result<ParseResult> {
    let mut diagnostics = Diagnostics::new();
    let code = parse_function_with_diagnostics(source, filename, &mut diagnostics)?;
    Ok(ParseResult { code, diagnostics })
}

/// Like [`parse_function`], but reports into an existing collection.
///
/// A hard syntax error is reported as a `P001` error diagnostic before the
/// error is returned.
pub fn parse_function_with_diagnostics(
    source: &str,
    filename: &str,
    diagnostics: &mut Diagnostics,
) -> Result<FunctionCode> {
    let source_map: Lrc<SourceMap> = Default::default();
    let wrapped = format!("({});", source);
    let source_file = source_map.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        wrapped,
    );

    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        swc_ecma_ast::EsVersion::Es2022,
        StringInput::from(&*source_file),
        None,
    );

    let mut parser = Parser::new_from(lexer);

    let location_of = |pos: BytePos| -> Location {
        let loc = source_map.lookup_char_pos(pos);
        let mut column = loc.col.0 as u32 + 1;
        // Account for the opening parenthesis added above.
        if loc.line == 1 {
            column = column.saturating_sub(1).max(1);
        }
        Location::new(filename, loc.line as u32, column)
    };

    let script = parser.parse_script().map_err(|e| {
        let diag = Diagnostic::error(DiagnosticCode::ParseError, e.kind().msg().to_string())
            .with_location(Some(location_of(e.span().lo)))
            .build();
        diagnostics.push(diag);
        anyhow!("Parse error in {}: {}", filename, e.kind().msg())
    })?;

    // Collect recoverable errors as warnings
    for error in parser.take_errors() {
        diagnostics.push(
            Diagnostic::warning(DiagnosticCode::ParseError, error.kind().msg().to_string())
                .with_location(Some(location_of(error.span().lo)))
                .build(),
        );
    }

    let expr = match script.body.as_slice() {
        [Stmt::Expr(stmt)] => &*stmt.expr,
        _ => return Err(anyhow!("{}: expected a single function", filename)),
    };
    let expr = match expr {
        Expr::Paren(paren) => &*paren.expr,
        other => other,
    };

    let code = match expr {
        Expr::Fn(fn_expr) => {
            let function = &fn_expr.function;
            let body = function
                .body
                .clone()
                .ok_or_else(|| anyhow!("{}: function has no body", filename))?;
            let kind = match (function.is_async, function.is_generator) {
                (false, false) => FunctionKind::Normal,
                (false, true) => FunctionKind::Generator,
                (true, false) => FunctionKind::Async,
                (true, true) => FunctionKind::AsyncGenerator,
            };
            FunctionCode {
                name: fn_expr.ident.as_ref().map(|i| i.sym.to_string()),
                params: function.params.iter().map(|p| p.pat.clone()).collect(),
                strict: has_use_strict(&body.stmts),
                body: FunctionBody::Block(body),
                kind,
                location: None,
                source: source.to_string(),
            }
        }
        Expr::Arrow(arrow) => {
            let (body, strict) = match &*arrow.body {
                BlockStmtOrExpr::BlockStmt(block) => {
                    (FunctionBody::Block(block.clone()), has_use_strict(&block.stmts))
                }
                BlockStmtOrExpr::Expr(expr) => (FunctionBody::Expr(expr.clone()), false),
            };
            FunctionCode {
                name: None,
                params: arrow.params.clone(),
                body,
                kind: FunctionKind::Arrow,
                strict,
                location: None,
                source: source.to_string(),
            }
        }
        _ => return Err(anyhow!("{}: expected a function or arrow function", filename)),
    };

    Ok(code.with_location(Location::new(filename, 1, 1)))
}

/// Whether the directive prologue of a body contains "use strict".
fn has_use_strict(stmts: &[Stmt]) -> bool {
    for stmt in stmts {
        match stmt {
            Stmt::Expr(expr_stmt) => match &*expr_stmt.expr {
                Expr::Lit(Lit::Str(s)) => {
                    if s.value.as_str() == Some("use strict") {
                        return true;
                    }
                }
                _ => return false,
            },
            _ => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_function_expression() {
        let result = parse_function("function add(a, b) { return a + b + c; }", "add.js").unwrap();
        let code = result.code;

        assert_eq!(code.name.as_deref(), Some("add"));
        assert_eq!(code.params.len(), 2);
        assert_eq!(code.kind, FunctionKind::Normal);
        assert!(!code.strict);
        assert!(matches!(code.body, FunctionBody::Block(_)));
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_arrow_with_concise_body() {
        let code = parse_function("(x, y = 2, ...rest) => x * y", "arrow.js")
            .unwrap()
            .code;

        assert_eq!(code.kind, FunctionKind::Arrow);
        assert!(matches!(code.body, FunctionBody::Expr(_)));
        assert_eq!(code.params.len(), 3);
        assert_eq!(code.expected_argument_count(), 1);
    }

    #[test]
    fn test_parse_strict_generator() {
        let code = parse_function("function* gen() { 'use strict'; yield 1; }", "gen.js")
            .unwrap()
            .code;

        assert_eq!(code.kind, FunctionKind::Generator);
        assert!(code.strict);
    }

    #[test]
    fn test_directive_after_statement_is_not_strict() {
        let code = parse_function("function f() { f(); 'use strict'; }", "f.js")
            .unwrap()
            .code;
        assert!(!code.strict);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let mut diagnostics = Diagnostics::new();
        let result = parse_function_with_diagnostics("function (a { }", "bad.js", &mut diagnostics);

        assert!(result.is_err());
        assert!(diagnostics.has_errors());
        assert_eq!(diagnostics.items[0].code, DiagnosticCode::ParseError);
        assert!(diagnostics.items[0].location.is_some());
    }

    #[test]
    fn test_rejects_non_function() {
        assert!(parse_function("1 + 2", "num.js").is_err());
    }
}
