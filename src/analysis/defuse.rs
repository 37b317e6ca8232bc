//! Def/use extraction (§4.3): walks an expression to collect the Accesses it
//! reads (`visit_expr`) or writes (`visit_target`), grounded in the
//! teacher's `ast::operations::extract_all_names`, which likewise walks an
//! expression tree by `ExprKind` to pull out every `Name` it touches, here
//! generalized to the richer Scalar/Structural/ArrayLike algebra.

use rustpython_parser::ast::{ExprKind, Located};

use super::{Analysis, NodeRef, META_CALL, META_RET};
use crate::access::{Access, NameRef};
use crate::ids::RefEquality;

impl<'a> Analysis<'a> {
    /// Records every Access read by `expr` into the current level.
    pub(super) fn visit_expr(&mut self, expr: &'a Located<ExprKind>) {
        if let Some(access) = self.build_access(expr) {
            self.push_access(access);
            return;
        }
        self.recurse(expr);
    }

    /// Records every Access written by `target` into the current level.
    pub(super) fn visit_target(&mut self, target: &'a Located<ExprKind>) {
        match &target.node {
            ExprKind::Name { id, .. } => {
                self.push_access(self.name_access(id));
            }
            ExprKind::Tuple { elts, .. } | ExprKind::List { elts, .. } => {
                for elt in elts {
                    self.visit_target(elt);
                }
            }
            ExprKind::Starred { value, .. } => self.visit_target(value),
            ExprKind::Attribute { value, attr, .. } => {
                let base = self
                    .build_access(value)
                    .unwrap_or_else(|| Access::scalar_named("<value>"));
                self.push_access(Access::structural(base, NameRef::Free(attr.clone())));
            }
            ExprKind::Subscript { value, slice, .. } => {
                let base = self
                    .build_access(value)
                    .unwrap_or_else(|| Access::scalar_named("<value>"));
                let index = self.build_index(slice);
                self.push_access(Access::array_like(base, vec![index]));
            }
            _ => {}
        }
    }

    /// Builds the Access for a single "access root" expression (a bare name,
    /// an attribute chain, a subscript chain, or a call), or `None` if
    /// `expr` isn't itself an access (e.g. a literal or a binary op), in
    /// which case the caller should recurse into its sub-expressions
    /// instead.
    fn build_access(&mut self, expr: &'a Located<ExprKind>) -> Option<Access> {
        match &expr.node {
            ExprKind::Name { id, .. } => Some(self.name_access(id)),
            ExprKind::Attribute { value, attr, .. } => {
                let base = self
                    .build_access(value)
                    .unwrap_or_else(|| Access::scalar_named("<value>"));
                Some(Access::structural(base, NameRef::Free(attr.clone())))
            }
            ExprKind::Subscript { value, slice, .. } => {
                let base = self
                    .build_access(value)
                    .unwrap_or_else(|| Access::scalar_named("<value>"));
                let index = self.build_index(slice);
                Some(Access::array_like(base, vec![index]))
            }
            ExprKind::Call { func, args, keywords } => {
                let (line, col) = (
                    expr.location.row() as u32,
                    expr.location.column() as u32 + 1,
                );
                let callee = self.callee_name(func);
                for arg in args {
                    self.visit_expr(arg);
                }
                for keyword in keywords {
                    self.visit_expr(&keyword.node.value);
                }
                self.register_call_node(func);
                Some(Access::scalar(callee).with_call_site(line, col))
            }
            _ => None,
        }
    }

    /// A Call's node identity is keyed by its callee expression, so the
    /// Instrumenter can re-find the same call when it wraps `node.func`
    /// (§4.5 Call injection rule).
    fn register_call_node(&mut self, func: &'a Located<ExprKind>) {
        let node = NodeRef::Expr(RefEquality(func));
        let id = self.nodes.get(node);
        let context = self.context_name();
        let (sl, sc, el, ec) = super::loc(func);
        self.statements
            .entry(id)
            .or_insert_with(|| super::StatementRecord {
                id,
                context,
                start_line: sl,
                start_col: sc,
                end_line: el,
                end_col: ec,
                defs: Vec::new(),
                uses: Vec::new(),
                meta: META_CALL,
                successors: Vec::new(),
            });
    }

    /// A lambda gets its own context, scoped like a `FunctionDef`, whose
    /// single statement is its body treated as an implicit `return`
    /// (§4.3 Lambda).
    fn visit_lambda(
        &mut self,
        expr: &'a Located<ExprKind>,
        args: &'a rustpython_parser::ast::Arguments,
        body: &'a Located<ExprKind>,
    ) {
        let name = format!(
            "lambda:{}:{}",
            expr.location.row(),
            expr.location.column()
        );
        let scope = self.child_scope_by_name(&name);
        self.enter_scope(scope);
        self.enter_context(name);

        self.register_params(scope, args);

        self.new_level();
        self.visit_expr(body);
        let uses = self.collect_level();
        let node = NodeRef::Expr(RefEquality(body));
        let (sl, sc, el, ec) = super::loc(body);
        let block = self.current_block();
        let id = self.register_stmt(node, sl, sc, el, ec, Vec::new(), uses, META_RET);
        self.frame().append(block, id);

        self.exit_context();
        self.exit_scope();
    }

    fn build_index(&mut self, slice: &'a Located<ExprKind>) -> Access {
        if let Some(access) = self.build_access(slice) {
            access
        } else {
            self.recurse(slice);
            Access::scalar_named("<index>")
        }
    }

    fn callee_name(&mut self, func: &'a Located<ExprKind>) -> NameRef {
        match &func.node {
            ExprKind::Name { id, .. } => self.name_ref(id),
            ExprKind::Attribute { attr, .. } => {
                self.visit_expr(func);
                NameRef::Free(attr.clone())
            }
            _ => {
                self.visit_expr(func);
                NameRef::Free("<call>".to_string())
            }
        }
    }

    fn name_ref(&self, id: &str) -> NameRef {
        match self.symbols.lookup(self.current_scope(), id) {
            Some(symbol) => NameRef::Symbol(symbol),
            None => NameRef::Free(id.to_string()),
        }
    }

    fn name_access(&self, id: &str) -> Access {
        Access::scalar(self.name_ref(id))
    }

    /// Walks the children of a non-access expression so any accesses nested
    /// inside it (e.g. the operands of a `BinOp`) are still collected.
    fn recurse(&mut self, expr: &'a Located<ExprKind>) {
        match &expr.node {
            ExprKind::BoolOp { values, .. } => values.iter().for_each(|v| self.visit_expr(v)),
            ExprKind::NamedExpr { target, value } => {
                self.visit_expr(value);
                self.visit_target(target);
            }
            ExprKind::BinOp { left, right, .. } => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            ExprKind::UnaryOp { operand, .. } => self.visit_expr(operand),
            ExprKind::Lambda { args, body } => self.visit_lambda(expr, args, body),
            ExprKind::IfExp { test, body, orelse } => {
                self.visit_expr(test);
                self.visit_expr(body);
                self.visit_expr(orelse);
            }
            ExprKind::Dict { keys, values } => {
                for key in keys.iter() {
                    self.visit_expr(key);
                }
                values.iter().for_each(|v| self.visit_expr(v));
            }
            ExprKind::Set { elts } | ExprKind::List { elts, .. } | ExprKind::Tuple { elts, .. } => {
                elts.iter().for_each(|e| self.visit_expr(e));
            }
            ExprKind::ListComp { elt, generators }
            | ExprKind::SetComp { elt, generators }
            | ExprKind::GeneratorExp { elt, generators } => {
                for generator in generators {
                    self.visit_expr(&generator.iter);
                    for cond in &generator.ifs {
                        self.visit_expr(cond);
                    }
                }
                self.visit_expr(elt);
            }
            ExprKind::DictComp { key, value, generators } => {
                for generator in generators {
                    self.visit_expr(&generator.iter);
                    for cond in &generator.ifs {
                        self.visit_expr(cond);
                    }
                }
                self.visit_expr(key);
                self.visit_expr(value);
            }
            ExprKind::Await { value } | ExprKind::Starred { value, .. } => self.visit_expr(value),
            ExprKind::Yield { value } => {
                if let Some(value) = value {
                    self.visit_expr(value);
                }
            }
            ExprKind::YieldFrom { value } => self.visit_expr(value),
            ExprKind::Compare { left, comparators, .. } => {
                self.visit_expr(left);
                comparators.iter().for_each(|c| self.visit_expr(c));
            }
            ExprKind::FormattedValue { value, .. } => self.visit_expr(value),
            ExprKind::JoinedStr { values } => values.iter().for_each(|v| self.visit_expr(v)),
            ExprKind::Slice { lower, upper, step } => {
                for e in [lower, upper, step].into_iter().flatten() {
                    self.visit_expr(e);
                }
            }
            ExprKind::Constant { .. } => {}
            // Name/Attribute/Subscript/Call are all handled by build_access.
            ExprKind::Name { .. }
            | ExprKind::Attribute { .. }
            | ExprKind::Subscript { .. }
            | ExprKind::Call { .. } => unreachable!("access-root kinds are handled by build_access"),
        }
    }
}
