//! Free-variable analysis of function bodies.
//!
//! A pure pass over one function's parameters and body: which identifiers
//! are referenced without being bound inside the function, which of those
//! are assigned to, and whether the body uses `this` or `arguments` of the
//! function itself.

use indexmap::IndexSet;
use residual_parser::{FunctionBody, FunctionCode};
use serde::Serialize;
use std::collections::HashSet;
use swc_ecma_ast as ast;
use swc_ecma_visit::{Visit, VisitWith};

/// What a function body needs from its surroundings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FunctionInfo {
    /// Free names, in order of first reference
    pub unbound: IndexSet<String>,
    /// Free names the body assigns to
    pub modified: IndexSet<String>,
    pub uses_arguments: bool,
    pub uses_this: bool,
}

impl FunctionInfo {
    pub fn is_modified(&self, name: &str) -> bool {
        self.modified.contains(name)
    }
}

/// Analyze the code of one function.
///
/// The body is analyzed as if the function were anonymous: a recursive
/// call through the function's own name refers to the enclosing binding.
pub fn analyze_function(code: &FunctionCode) -> FunctionInfo {
    let body: &[ast::Stmt] = match &code.body {
        FunctionBody::Block(block) => &block.stmts,
        FunctionBody::Expr(_) => &[],
    };

    let names = function_scope(code.params.iter(), body);

    let mut visitor = ClosureRefVisitor::default();
    visitor.scopes.push(names.into_iter().collect());
    for param in &code.params {
        param.visit_with(&mut visitor);
    }
    match &code.body {
        FunctionBody::Block(block) => block.stmts.visit_with(&mut visitor),
        FunctionBody::Expr(expr) => expr.visit_with(&mut visitor),
    }
    visitor.info
}

#[derive(Default)]
struct ClosureRefVisitor {
    scopes: Vec<HashSet<String>>,
    /// Nesting of non-arrow functions (and class bodies) below the analyzed one
    depth: usize,
    info: FunctionInfo,
}

impl ClosureRefVisitor {
    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn reference(&mut self, name: &str) {
        if self.is_bound(name) {
            return;
        }
        if name == "arguments" {
            if self.depth == 0 {
                self.info.uses_arguments = true;
            }
            return;
        }
        self.info.unbound.insert(name.to_string());
    }

    fn assign(&mut self, name: &str) {
        if self.is_bound(name) || name == "arguments" {
            return;
        }
        self.info.unbound.insert(name.to_string());
        self.info.modified.insert(name.to_string());
    }

    fn with_scope(&mut self, names: Vec<String>, f: impl FnOnce(&mut Self)) {
        self.scopes.push(names.into_iter().collect());
        f(self);
        self.scopes.pop();
    }
}

impl Visit for ClosureRefVisitor {
    fn visit_expr(&mut self, n: &ast::Expr) {
        match n {
            ast::Expr::Ident(ident) => self.reference(&ident.sym),
            ast::Expr::This(_) => {
                if self.depth == 0 {
                    self.info.uses_this = true;
                }
            }
            _ => n.visit_children_with(self),
        }
    }

    fn visit_prop(&mut self, n: &ast::Prop) {
        match n {
            ast::Prop::Shorthand(ident) => self.reference(&ident.sym),
            _ => n.visit_children_with(self),
        }
    }

    fn visit_assign_expr(&mut self, n: &ast::AssignExpr) {
        match &n.left {
            ast::AssignTarget::Simple(target) => {
                if let Some(name) = simple_target_name(target) {
                    self.assign(name);
                }
            }
            ast::AssignTarget::Pat(pat) => {
                let mut names = Vec::new();
                assign_target_names(pat, &mut names);
                for name in names {
                    self.assign(&name);
                }
            }
        }
        n.visit_children_with(self);
    }

    fn visit_update_expr(&mut self, n: &ast::UpdateExpr) {
        if let Some(name) = expr_name(&n.arg) {
            self.assign(name);
        }
        n.visit_children_with(self);
    }

    fn visit_function(&mut self, n: &ast::Function) {
        for param in &n.params {
            param.decorators.visit_with(self);
        }
        let params: Vec<&ast::Pat> = n.params.iter().map(|p| &p.pat).collect();
        self.nested_function(&params, n.body.as_ref());
    }

    // Object-literal accessors carry a bare body rather than an `ast::Function`;
    // the key is evaluated in the enclosing scope.
    fn visit_getter_prop(&mut self, n: &ast::GetterProp) {
        n.key.visit_with(self);
        self.nested_function(&[], n.body.as_ref());
    }

    fn visit_setter_prop(&mut self, n: &ast::SetterProp) {
        n.key.visit_with(self);
        self.nested_function(&[&*n.param], n.body.as_ref());
    }

    fn visit_constructor(&mut self, n: &ast::Constructor) {
        let params: Vec<&ast::Pat> = n
            .params
            .iter()
            .filter_map(|p| match p {
                ast::ParamOrTsParamProp::Param(param) => Some(&param.pat),
                _ => None,
            })
            .collect();
        let body = n.body.as_ref().map(|b| b.stmts.as_slice()).unwrap_or(&[]);
        let names = function_scope(params.iter().copied(), body);

        self.with_scope(names, |this| {
            for param in &params {
                param.visit_with(this);
            }
            if let Some(body) = &n.body {
                body.stmts.visit_with(this);
            }
        });
    }

    fn visit_arrow_expr(&mut self, n: &ast::ArrowExpr) {
        let body: &[ast::Stmt] = match &*n.body {
            ast::BlockStmtOrExpr::BlockStmt(block) => &block.stmts,
            _ => &[],
        };
        let names = function_scope(n.params.iter(), body);

        self.with_scope(names, |this| {
            for param in &n.params {
                param.visit_with(this);
            }
            match &*n.body {
                ast::BlockStmtOrExpr::BlockStmt(block) => block.stmts.visit_with(this),
                ast::BlockStmtOrExpr::Expr(expr) => expr.visit_with(this),
            }
        });
    }

    fn visit_fn_expr(&mut self, n: &ast::FnExpr) {
        let names = n.ident.iter().map(|i| i.sym.to_string()).collect();
        self.with_scope(names, |this| n.function.visit_with(this));
    }

    fn visit_class_expr(&mut self, n: &ast::ClassExpr) {
        let names = n.ident.iter().map(|i| i.sym.to_string()).collect();
        self.with_scope(names, |this| n.class.visit_with(this));
    }

    fn visit_class(&mut self, n: &ast::Class) {
        if let Some(super_class) = &n.super_class {
            super_class.visit_with(self);
        }
        self.depth += 1;
        n.body.visit_with(self);
        self.depth -= 1;
    }

    fn visit_block_stmt(&mut self, n: &ast::BlockStmt) {
        let mut names = Vec::new();
        lexical_names(&n.stmts, &mut names);
        self.with_scope(names, |this| n.stmts.visit_with(this));
    }

    fn visit_switch_stmt(&mut self, n: &ast::SwitchStmt) {
        n.discriminant.visit_with(self);
        let mut names = Vec::new();
        for case in &n.cases {
            lexical_names(&case.cons, &mut names);
        }
        self.with_scope(names, |this| n.cases.visit_with(this));
    }

    fn visit_for_stmt(&mut self, n: &ast::ForStmt) {
        let mut names = Vec::new();
        if let Some(ast::VarDeclOrExpr::VarDecl(decl)) = &n.init {
            if decl.kind != ast::VarDeclKind::Var {
                var_decl_names(decl, &mut names);
            }
        }
        self.with_scope(names, |this| n.visit_children_with(this));
    }

    fn visit_for_in_stmt(&mut self, n: &ast::ForInStmt) {
        let names = self.for_head(&n.left);
        self.with_scope(names, |this| n.visit_children_with(this));
    }

    fn visit_for_of_stmt(&mut self, n: &ast::ForOfStmt) {
        let names = self.for_head(&n.left);
        self.with_scope(names, |this| n.visit_children_with(this));
    }

    fn visit_catch_clause(&mut self, n: &ast::CatchClause) {
        let mut names = Vec::new();
        if let Some(param) = &n.param {
            pat_names(param, &mut names);
        }
        self.with_scope(names, |this| n.visit_children_with(this));
    }
}

impl ClosureRefVisitor {
    /// A non-arrow function below the analyzed one: its own scope, and its
    /// own `this` and `arguments`.
    fn nested_function(&mut self, params: &[&ast::Pat], body: Option<&ast::BlockStmt>) {
        let stmts = body.map(|b| b.stmts.as_slice()).unwrap_or(&[]);
        let names = function_scope(params.iter().copied(), stmts);

        self.depth += 1;
        self.with_scope(names, |this| {
            for param in params {
                param.visit_with(this);
            }
            if let Some(body) = body {
                body.stmts.visit_with(this);
            }
        });
        self.depth -= 1;
    }

    /// Names a `for-in`/`for-of` head declares; assigns the ones it doesn't.
    fn for_head(&mut self, head: &ast::ForHead) -> Vec<String> {
        let mut names = Vec::new();
        match head {
            ast::ForHead::VarDecl(decl) if decl.kind != ast::VarDeclKind::Var => {
                var_decl_names(decl, &mut names);
            }
            ast::ForHead::Pat(pat) => {
                let mut assigned = Vec::new();
                pat_names(pat, &mut assigned);
                for name in assigned {
                    self.assign(&name);
                }
            }
            _ => {}
        }
        names
    }
}

/// Names bound at the top of a function: parameters, hoisted `var` and
/// function declarations, and top-level lexical declarations.
fn function_scope<'p>(params: impl Iterator<Item = &'p ast::Pat>, body: &[ast::Stmt]) -> Vec<String> {
    let mut names = Vec::new();
    for param in params {
        pat_names(param, &mut names);
    }
    let mut hoisted = VarNames::default();
    for stmt in body {
        stmt.visit_with(&mut hoisted);
    }
    names.extend(hoisted.names);
    lexical_names(body, &mut names);
    names
}

/// Collects `var` and function declarations without entering nested functions.
#[derive(Default)]
struct VarNames {
    names: Vec<String>,
}

impl Visit for VarNames {
    fn visit_var_decl(&mut self, n: &ast::VarDecl) {
        if n.kind == ast::VarDeclKind::Var {
            var_decl_names(n, &mut self.names);
        }
    }

    fn visit_fn_decl(&mut self, n: &ast::FnDecl) {
        self.names.push(n.ident.sym.to_string());
    }

    fn visit_expr(&mut self, _: &ast::Expr) {}
    fn visit_function(&mut self, _: &ast::Function) {}
    fn visit_arrow_expr(&mut self, _: &ast::ArrowExpr) {}
    fn visit_class(&mut self, _: &ast::Class) {}
}

fn lexical_names(stmts: &[ast::Stmt], out: &mut Vec<String>) {
    for stmt in stmts {
        match stmt {
            ast::Stmt::Decl(ast::Decl::Var(decl)) if decl.kind != ast::VarDeclKind::Var => {
                var_decl_names(decl, out)
            }
            ast::Stmt::Decl(ast::Decl::Class(class)) => out.push(class.ident.sym.to_string()),
            ast::Stmt::Decl(ast::Decl::Fn(func)) => out.push(func.ident.sym.to_string()),
            ast::Stmt::Decl(ast::Decl::Using(using)) => {
                for decl in &using.decls {
                    pat_names(&decl.name, out);
                }
            }
            _ => {}
        }
    }
}

fn var_decl_names(decl: &ast::VarDecl, out: &mut Vec<String>) {
    for declarator in &decl.decls {
        pat_names(&declarator.name, out);
    }
}

fn pat_names(pat: &ast::Pat, out: &mut Vec<String>) {
    match pat {
        ast::Pat::Ident(ident) => out.push(ident.id.sym.to_string()),
        ast::Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                pat_names(elem, out);
            }
        }
        ast::Pat::Rest(rest) => pat_names(&rest.arg, out),
        ast::Pat::Object(object) => object_pat_names(object, out),
        ast::Pat::Assign(assign) => pat_names(&assign.left, out),
        _ => {}
    }
}

fn object_pat_names(object: &ast::ObjectPat, out: &mut Vec<String>) {
    for prop in &object.props {
        match prop {
            ast::ObjectPatProp::KeyValue(kv) => pat_names(&kv.value, out),
            ast::ObjectPatProp::Assign(assign) => out.push(assign.key.id.sym.to_string()),
            ast::ObjectPatProp::Rest(rest) => pat_names(&rest.arg, out),
        }
    }
}

/// The variable a simple assignment target writes, seen through parentheses
/// and type wrappers.
fn simple_target_name(target: &ast::SimpleAssignTarget) -> Option<&str> {
    match target {
        ast::SimpleAssignTarget::Ident(ident) => Some(&*ident.id.sym),
        ast::SimpleAssignTarget::Paren(paren) => expr_name(&paren.expr),
        ast::SimpleAssignTarget::TsAs(e) => expr_name(&e.expr),
        ast::SimpleAssignTarget::TsSatisfies(e) => expr_name(&e.expr),
        ast::SimpleAssignTarget::TsNonNull(e) => expr_name(&e.expr),
        ast::SimpleAssignTarget::TsTypeAssertion(e) => expr_name(&e.expr),
        _ => None,
    }
}

fn expr_name(expr: &ast::Expr) -> Option<&str> {
    match expr {
        ast::Expr::Ident(ident) => Some(&*ident.sym),
        ast::Expr::Paren(paren) => expr_name(&paren.expr),
        ast::Expr::TsAs(e) => expr_name(&e.expr),
        ast::Expr::TsSatisfies(e) => expr_name(&e.expr),
        ast::Expr::TsNonNull(e) => expr_name(&e.expr),
        ast::Expr::TsTypeAssertion(e) => expr_name(&e.expr),
        _ => None,
    }
}

fn assign_target_names(pat: &ast::AssignTargetPat, out: &mut Vec<String>) {
    match pat {
        ast::AssignTargetPat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                pat_names(elem, out);
            }
        }
        ast::AssignTargetPat::Object(object) => object_pat_names(object, out),
        _ => {}
    }
}
