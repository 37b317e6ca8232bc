//! Symbol Table Builder (§4.1).
//!
//! Walks definitions to produce a lexical scope tree with entries for each
//! bound name. Grounded in `ast::types::{Scope, ScopeKind, Binding}` (the
//! teacher's scope/binding model) and `ast::operations::extract_globals`'s
//! style of a small dedicated visitor per concern, generalized here into one
//! pass that both pushes/pops scopes and records bindings.

use rustc_hash::FxHashMap;
use rustpython_parser::ast::{ExprKind, Located, StmtKind, Suite};

/// Index into `SymbolTable::scopes`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub usize);

/// Index into `SymbolTable::symbols`. Globally unique across the whole table,
/// so it doubles as a stable identity for an `Access::Scalar` that resolved
/// to a bound name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub usize);

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub scope: ScopeId,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub name: String,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Bound names visible directly in this scope.
    bindings: FxHashMap<String, SymbolId>,
}

/// The root scope is always `ScopeId(0)`, named `top` per §4.1.
pub const TOP_SCOPE: ScopeId = ScopeId(0);

#[derive(Debug, Default)]
pub struct SymbolTable {
    pub scopes: Vec<Scope>,
    pub symbols: Vec<Symbol>,
}

impl SymbolTable {
    fn new() -> Self {
        let mut table = SymbolTable::default();
        table.scopes.push(Scope {
            name: "top".to_string(),
            parent: None,
            children: Vec::new(),
            bindings: FxHashMap::default(),
        });
        table
    }

    fn push_scope(&mut self, name: String, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            name,
            parent: Some(parent),
            children: Vec::new(),
            bindings: FxHashMap::default(),
        });
        self.scopes[parent.0].children.push(id);
        id
    }

    /// Defines `name` in `scope` if it is not already visible there or in an
    /// enclosing scope (plain-assignment semantics, §4.1). Returns the symbol
    /// id, whether freshly defined or pre-existing.
    pub fn assign(&mut self, scope: ScopeId, name: &str) -> SymbolId {
        if let Some(id) = self.lookup(scope, name) {
            return id;
        }
        self.bind_here(scope, name)
    }

    /// Unconditionally binds `name` in `scope` (used for parameters, `for`
    /// targets, `with` vars, and import aliases, which always shadow any
    /// enclosing binding of the same name).
    pub fn bind_here(&mut self, scope: ScopeId, name: &str) -> SymbolId {
        if let Some(&id) = self.scopes[scope.0].bindings.get(name) {
            return id;
        }
        let id = SymbolId(self.symbols.len());
        self.symbols.push(Symbol {
            name: name.to_string(),
            scope,
        });
        self.scopes[scope.0].bindings.insert(name.to_string(), id);
        id
    }

    /// Searches `scope`, then its parents, for a binding of `name`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(&sym) = self.scopes[id.0].bindings.get(name) {
                return Some(sym);
            }
            current = self.scopes[id.0].parent;
        }
        None
    }

    pub fn symbol_name(&self, id: SymbolId) -> &str {
        &self.symbols[id.0].name
    }
}

/// Builds the scope tree for a module body.
pub fn build(body: &Suite) -> SymbolTable {
    let mut table = SymbolTable::new();
    walk_body(&mut table, TOP_SCOPE, body);
    table
}

fn walk_body(table: &mut SymbolTable, scope: ScopeId, body: &[Located<StmtKind>]) {
    for stmt in body {
        walk_stmt(table, scope, stmt);
    }
}

fn walk_stmt(table: &mut SymbolTable, scope: ScopeId, stmt: &Located<StmtKind>) {
    match &stmt.node {
        StmtKind::FunctionDef {
            name, args, body, ..
        }
        | StmtKind::AsyncFunctionDef {
            name, args, body, ..
        } => {
            table.assign(scope, name);
            let fn_scope = table.push_scope(name.clone(), scope);
            bind_arguments(table, fn_scope, args);
            walk_body(table, fn_scope, body);
        }
        StmtKind::ClassDef { name, body, .. } => {
            table.assign(scope, name);
            let class_scope = table.push_scope(name.clone(), scope);
            walk_body(table, class_scope, body);
        }
        StmtKind::Return { value } => {
            if let Some(value) = value {
                walk_expr(table, scope, value);
            }
        }
        StmtKind::Delete { targets } => {
            for target in targets {
                walk_expr(table, scope, target);
            }
        }
        StmtKind::Assign { targets, value, .. } => {
            walk_expr(table, scope, value);
            for target in targets {
                bind_target(table, scope, target, Binder::Assign);
            }
        }
        StmtKind::AugAssign { target, value, .. } => {
            walk_expr(table, scope, value);
            bind_target(table, scope, target, Binder::Assign);
        }
        StmtKind::AnnAssign {
            target,
            annotation,
            value,
            ..
        } => {
            walk_expr(table, scope, annotation);
            if let Some(value) = value {
                walk_expr(table, scope, value);
            }
            bind_target(table, scope, target, Binder::Assign);
        }
        StmtKind::For {
            target, iter, body, orelse, ..
        }
        | StmtKind::AsyncFor {
            target, iter, body, orelse, ..
        } => {
            walk_expr(table, scope, iter);
            bind_target(table, scope, target, Binder::BindHere);
            walk_body(table, scope, body);
            walk_body(table, scope, orelse);
        }
        StmtKind::While { test, body, orelse } => {
            walk_expr(table, scope, test);
            walk_body(table, scope, body);
            walk_body(table, scope, orelse);
        }
        StmtKind::If { test, body, orelse } => {
            walk_expr(table, scope, test);
            walk_body(table, scope, body);
            walk_body(table, scope, orelse);
        }
        StmtKind::With { items, body, .. } | StmtKind::AsyncWith { items, body, .. } => {
            for item in items {
                walk_expr(table, scope, &item.context_expr);
                if let Some(vars) = &item.optional_vars {
                    bind_target(table, scope, vars, Binder::BindHere);
                }
            }
            walk_body(table, scope, body);
        }
        StmtKind::Raise { exc, cause } => {
            if let Some(exc) = exc {
                walk_expr(table, scope, exc);
            }
            if let Some(cause) = cause {
                walk_expr(table, scope, cause);
            }
        }
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            walk_body(table, scope, body);
            for handler in handlers {
                let rustpython_parser::ast::ExcepthandlerKind::ExceptHandler { name, body, .. } =
                    &handler.node;
                if let Some(name) = name {
                    table.bind_here(scope, name);
                }
                walk_body(table, scope, body);
            }
            walk_body(table, scope, orelse);
            walk_body(table, scope, finalbody);
        }
        StmtKind::Assert { test, msg } => {
            walk_expr(table, scope, test);
            if let Some(msg) = msg {
                walk_expr(table, scope, msg);
            }
        }
        StmtKind::Import { names } => {
            for alias in names {
                let bound = alias.node.asname.as_ref().unwrap_or(&alias.node.name);
                let top_component = bound.split('.').next().unwrap_or(bound);
                table.bind_here(scope, top_component);
            }
        }
        StmtKind::ImportFrom { names, .. } => {
            for alias in names {
                let bound = alias.node.asname.as_ref().unwrap_or(&alias.node.name);
                table.bind_here(scope, bound);
            }
        }
        StmtKind::Global { .. } | StmtKind::Nonlocal { .. } => {}
        StmtKind::Expr { value } => walk_expr(table, scope, value),
        StmtKind::Pass | StmtKind::Break | StmtKind::Continue | StmtKind::Match { .. } => {}
    }
}

#[derive(Copy, Clone)]
enum Binder {
    /// Assignment semantics: define only if not already visible (§4.1).
    Assign,
    /// Parameter/for-target/with-var/except-name semantics: always bind in
    /// the current scope, shadowing any enclosing binding.
    BindHere,
}

fn bind_target(
    table: &mut SymbolTable,
    scope: ScopeId,
    target: &Located<ExprKind>,
    mode: Binder,
) {
    match &target.node {
        ExprKind::Name { id, .. } => {
            match mode {
                Binder::Assign => table.assign(scope, id),
                Binder::BindHere => table.bind_here(scope, id),
            };
        }
        ExprKind::Tuple { elts, .. } | ExprKind::List { elts, .. } => {
            for elt in elts {
                bind_target(table, scope, elt, mode);
            }
        }
        ExprKind::Starred { value, .. } => bind_target(table, scope, value, mode),
        ExprKind::Attribute { value, .. } | ExprKind::Subscript { value, .. } => {
            // Not a binding occurrence itself; the base may still read names.
            walk_expr(table, scope, value);
        }
        _ => {}
    }
}

fn bind_arguments(table: &mut SymbolTable, scope: ScopeId, args: &rustpython_parser::ast::Arguments) {
    for arg in args
        .posonlyargs
        .iter()
        .chain(args.args.iter())
        .chain(args.kwonlyargs.iter())
    {
        table.bind_here(scope, &arg.node.arg);
    }
    if let Some(vararg) = &args.vararg {
        table.bind_here(scope, &vararg.node.arg);
    }
    if let Some(kwarg) = &args.kwarg {
        table.bind_here(scope, &kwarg.node.arg);
    }
}

fn walk_expr(table: &mut SymbolTable, scope: ScopeId, expr: &Located<ExprKind>) {
    match &expr.node {
        ExprKind::Lambda { args, body } => {
            let lambda_scope = table.push_scope(
                format!("lambda:{}:{}", expr.location.row(), expr.location.column()),
                scope,
            );
            bind_arguments(table, lambda_scope, args);
            walk_expr(table, lambda_scope, body);
        }
        ExprKind::NamedExpr { target, value } => {
            walk_expr(table, scope, value);
            bind_target(table, scope, target, Binder::Assign);
        }
        ExprKind::BoolOp { values, .. } => values.iter().for_each(|v| walk_expr(table, scope, v)),
        ExprKind::BinOp { left, right, .. } => {
            walk_expr(table, scope, left);
            walk_expr(table, scope, right);
        }
        ExprKind::UnaryOp { operand, .. } => walk_expr(table, scope, operand),
        ExprKind::IfExp { test, body, orelse } => {
            walk_expr(table, scope, test);
            walk_expr(table, scope, body);
            walk_expr(table, scope, orelse);
        }
        ExprKind::Dict { keys, values } => {
            for key in keys.iter() {
                walk_expr(table, scope, key);
            }
            values.iter().for_each(|v| walk_expr(table, scope, v));
        }
        ExprKind::Set { elts } | ExprKind::List { elts, .. } | ExprKind::Tuple { elts, .. } => {
            elts.iter().for_each(|e| walk_expr(table, scope, e));
        }
        ExprKind::ListComp { elt, generators }
        | ExprKind::SetComp { elt, generators }
        | ExprKind::GeneratorExp { elt, generators } => {
            for generator in generators {
                walk_expr(table, scope, &generator.iter);
                bind_target(table, scope, &generator.target, Binder::BindHere);
                for cond in &generator.ifs {
                    walk_expr(table, scope, cond);
                }
            }
            walk_expr(table, scope, elt);
        }
        ExprKind::DictComp { key, value, generators } => {
            for generator in generators {
                walk_expr(table, scope, &generator.iter);
                bind_target(table, scope, &generator.target, Binder::BindHere);
                for cond in &generator.ifs {
                    walk_expr(table, scope, cond);
                }
            }
            walk_expr(table, scope, key);
            walk_expr(table, scope, value);
        }
        ExprKind::Await { value } | ExprKind::Starred { value, .. } => {
            walk_expr(table, scope, value);
        }
        ExprKind::Yield { value } => {
            if let Some(value) = value {
                walk_expr(table, scope, value);
            }
        }
        ExprKind::YieldFrom { value } => walk_expr(table, scope, value),
        ExprKind::Compare {
            left, comparators, ..
        } => {
            walk_expr(table, scope, left);
            comparators.iter().for_each(|c| walk_expr(table, scope, c));
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            walk_expr(table, scope, func);
            args.iter().for_each(|a| walk_expr(table, scope, a));
            keywords
                .iter()
                .for_each(|k| walk_expr(table, scope, &k.node.value));
        }
        ExprKind::FormattedValue { value, .. } => walk_expr(table, scope, value),
        ExprKind::JoinedStr { values } => values.iter().for_each(|v| walk_expr(table, scope, v)),
        ExprKind::Attribute { value, .. } => walk_expr(table, scope, value),
        ExprKind::Subscript { value, slice, .. } => {
            walk_expr(table, scope, value);
            walk_expr(table, scope, slice);
        }
        ExprKind::Slice { lower, upper, step } => {
            for e in [lower, upper, step].into_iter().flatten() {
                walk_expr(table, scope, e);
            }
        }
        ExprKind::Name { .. } | ExprKind::Constant { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::parser::parse_program;

    fn parse(src: &str) -> Suite {
        parse_program(src, "<test>").unwrap()
    }

    #[test]
    fn top_scope_is_named_top() {
        let table = build(&parse("x = 1"));
        assert_eq!(table.scopes[TOP_SCOPE.0].name, "top");
        assert!(table.lookup(TOP_SCOPE, "x").is_some());
    }

    #[test]
    fn function_pushes_named_scope_with_parameter() {
        let table = build(&parse("def foo(bar):\n    return bar\n"));
        let foo_scope = table.scopes[TOP_SCOPE.0].children[0];
        assert_eq!(table.scopes[foo_scope.0].name, "foo");
        assert!(table.lookup(foo_scope, "bar").is_some());
        assert!(table.lookup(TOP_SCOPE, "bar").is_none());
    }

    #[test]
    fn assignment_does_not_redefine_in_enclosing_scope() {
        let table = build(&parse("x = 1\ndef foo():\n    y = x\n"));
        let foo_scope = table.scopes[TOP_SCOPE.0].children[0];
        // `x` is read, not assigned, inside `foo`, so no local binding for it.
        assert!(table.lookup(foo_scope, "x").is_some());
        assert_ne!(
            table.lookup(foo_scope, "x"),
            table.scopes[foo_scope.0].bindings.get("x").copied()
        );
    }

    #[test]
    fn lambda_scope_name_includes_line_and_column() {
        let table = build(&parse("f = lambda x: x\n"));
        let lambda_scope = table
            .scopes
            .iter()
            .find(|s| s.name.starts_with("lambda:"))
            .unwrap();
        assert_eq!(lambda_scope.name, "lambda:1:4");
    }
}
