//! Instrumenter (§4.5): rewrites a normalized `Suite` into one that emits a
//! runtime trace, without changing its observable behavior.
//!
//! The node-identity map built by Analysis (`IdMap<NodeRef<'a>>`) is keyed by
//! the address of nodes inside the *original* tree, so this stage cannot
//! mutate that tree in place — `Vec::insert`/reallocation would silently
//! invalidate every `RefEquality` pointer at or after the edit. Instead it
//! borrows the original tree read-only and builds a brand-new `Suite`,
//! re-finding each node's id by the same pointer-identity lookup Analysis
//! used and splicing freshly synthesized calls around it. This mirrors the
//! teacher's synthetic-node helpers (`create_expr`/`create_stmt` in
//! `ast/helpers.rs`, used by autofixes to build replacement nodes rather than
//! edit existing ones) generalized from single-node synthesis to whole-tree
//! reconstruction.
//!
//! Every lookup asserts the node was already seen during Analysis
//! (`IdMap::get_checked` reports `inserted == false`); a `true` here means
//! the rewrite touched a node Analysis never visited, which is a fatal
//! invariant violation (§8 ID stability) rather than something to paper over.

use num_bigint::BigInt;
use rustpython_parser::ast::{
    AliasData, ArgData, Constant, ExcepthandlerKind, ExprContext, ExprKind, Located, Location,
    StmtKind, Suite,
};

use crate::analysis::NodeRef;
use crate::error::{AardError, Result};
use crate::ids::{Id, IdMap, RefEquality};

/// Rewrites `body` into an instrumented copy, prefixed with `import aardwolf`.
/// `nodes` must be the same map Analysis populated for this file; it is not
/// added to here, only consulted.
pub fn instrument<'a>(body: &'a Suite, nodes: &mut IdMap<NodeRef<'a>>, file_id: u64) -> Result<Suite> {
    let loc = body.first().map_or_else(|| Location::new(1, 0), |s| s.location);
    let mut rewriter = Instrumenter { nodes, file_id };
    let mut out = Vec::with_capacity(body.len() + 1);
    out.push(import_stmt(loc));
    out.extend(rewriter.block(body)?);
    Ok(out)
}

struct Instrumenter<'a, 'b> {
    nodes: &'b mut IdMap<NodeRef<'a>>,
    file_id: u64,
}

impl<'a, 'b> Instrumenter<'a, 'b> {
    fn stmt_id(&mut self, stmt: &'a Located<StmtKind>) -> Result<Id> {
        self.lookup(NodeRef::Stmt(RefEquality(stmt)))
    }

    fn expr_id(&mut self, expr: &'a Located<ExprKind>) -> Result<Id> {
        self.lookup(NodeRef::Expr(RefEquality(expr)))
    }

    fn arg_id(&mut self, arg: &'a Located<ArgData>) -> Result<Id> {
        self.lookup(NodeRef::Arg(RefEquality(arg)))
    }

    fn lookup(&mut self, node: NodeRef<'a>) -> Result<Id> {
        let (id, inserted) = self.nodes.get_checked(node);
        if inserted {
            return Err(AardError::IdDivergence {
                context: format!("{node:?}"),
            });
        }
        Ok(id)
    }

    fn block(&mut self, body: &'a [Located<StmtKind>]) -> Result<Vec<Located<StmtKind>>> {
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            out.extend(self.stmt(stmt)?);
        }
        Ok(out)
    }

    /// Returns one or more replacement statements for `stmt` (§4.5's
    /// injection rules are mostly 1:1, but Break/Continue/Delete/Raise
    /// prepend or append a bare tracing call alongside the original).
    fn stmt(&mut self, stmt: &'a Located<StmtKind>) -> Result<Vec<Located<StmtKind>>> {
        let loc = stmt.location;
        match &stmt.node {
            StmtKind::FunctionDef { args, body, .. }
            | StmtKind::AsyncFunctionDef { args, body, .. } => {
                let mut new_body = Vec::new();
                for arg in args
                    .posonlyargs
                    .iter()
                    .chain(args.args.iter())
                    .chain(args.kwonlyargs.iter())
                    .chain(args.vararg.iter().map(|b| b.as_ref()))
                    .chain(args.kwarg.iter().map(|b| b.as_ref()))
                {
                    let id = self.arg_id(arg)?;
                    new_body.push(write_stmt_stmt(self.file_id, id, arg.location));
                    new_body.push(write_value_stmt(&arg.node.arg, arg.location));
                }
                new_body.extend(self.block(body)?);
                let mut node = stmt.node.clone();
                if let StmtKind::FunctionDef { body, .. } | StmtKind::AsyncFunctionDef { body, .. } =
                    &mut node
                {
                    *body = new_body;
                }
                Ok(vec![rewrap_stmt(stmt, node)])
            }
            StmtKind::ClassDef { body, .. } => {
                let new_body = self.block(body)?;
                let mut node = stmt.node.clone();
                if let StmtKind::ClassDef { body, .. } = &mut node {
                    *body = new_body;
                }
                Ok(vec![rewrap_stmt(stmt, node)])
            }
            StmtKind::Return { value } => {
                let id = self.stmt_id(stmt)?;
                match value {
                    Some(v) => {
                        let wrapped = write_expr_call(self.expr(v)?, self.file_id, id, v.location);
                        let mut node = stmt.node.clone();
                        if let StmtKind::Return { value } = &mut node {
                            *value = Some(Box::new(wrapped));
                        }
                        Ok(vec![rewrap_stmt(stmt, node)])
                    }
                    None => Ok(vec![write_stmt_stmt(self.file_id, id, loc), stmt.clone()]),
                }
            }
            StmtKind::Assign { targets, value, .. } => {
                let id = self.stmt_id(stmt)?;
                let new_value = self.expr(value)?;
                let tree = targets.first().map_or_else(|| empty_list(value.location), |t| self.accessor_tree(t));
                let wrapped = write_value_call(new_value, tree, value.location);
                let mut node = stmt.node.clone();
                if let StmtKind::Assign { value, .. } = &mut node {
                    *value = Box::new(wrapped);
                }
                Ok(vec![write_stmt_stmt(self.file_id, id, loc), rewrap_stmt(stmt, node)])
            }
            StmtKind::AugAssign { target, value, .. } => {
                let id = self.stmt_id(stmt)?;
                let new_value = self.expr(value)?;
                let tree = self.accessor_tree(target);
                let wrapped = write_value_call(new_value, tree, value.location);
                let mut node = stmt.node.clone();
                if let StmtKind::AugAssign { value, .. } = &mut node {
                    *value = Box::new(wrapped);
                }
                Ok(vec![write_stmt_stmt(self.file_id, id, loc), rewrap_stmt(stmt, node)])
            }
            StmtKind::AnnAssign { target, value, .. } => {
                // Not named by the injection rules: recurse for nested Calls
                // only, no tracing call of its own (§4.5 gap).
                let new_target = self.expr(target)?;
                let new_value = match value {
                    Some(v) => Some(self.expr(v)?),
                    None => None,
                };
                let mut node = stmt.node.clone();
                if let StmtKind::AnnAssign { target, value, .. } = &mut node {
                    *target = Box::new(new_target);
                    *value = new_value.map(Box::new);
                }
                Ok(vec![rewrap_stmt(stmt, node)])
            }
            StmtKind::Delete { targets } => {
                let id = self.stmt_id(stmt)?;
                let mut new_targets = Vec::with_capacity(targets.len());
                for target in targets {
                    new_targets.push(self.expr(target)?);
                }
                let mut node = stmt.node.clone();
                if let StmtKind::Delete { targets } = &mut node {
                    *targets = new_targets;
                }
                Ok(vec![rewrap_stmt(stmt, node), write_stmt_stmt(self.file_id, id, loc)])
            }
            StmtKind::Assert { test, msg } => {
                let id = self.stmt_id(stmt)?;
                let new_test = write_expr_call(self.expr(test)?, self.file_id, id, test.location);
                let new_msg = match msg {
                    Some(m) => Some(self.expr(m)?),
                    None => None,
                };
                let mut node = stmt.node.clone();
                if let StmtKind::Assert { test, msg } = &mut node {
                    *test = Box::new(new_test);
                    *msg = new_msg.map(Box::new);
                }
                Ok(vec![rewrap_stmt(stmt, node)])
            }
            StmtKind::Expr { value } => {
                let new_value = self.expr(value)?;
                let mut node = stmt.node.clone();
                if let StmtKind::Expr { value } = &mut node {
                    *value = Box::new(new_value);
                }
                Ok(vec![rewrap_stmt(stmt, node)])
            }
            StmtKind::If { test, body, orelse } => {
                let id = self.stmt_id(stmt)?;
                let new_test = write_expr_call(self.expr(test)?, self.file_id, id, test.location);
                let new_body = self.block(body)?;
                let new_orelse = self.block(orelse)?;
                let mut node = stmt.node.clone();
                if let StmtKind::If { test, body, orelse } = &mut node {
                    *test = Box::new(new_test);
                    *body = new_body;
                    *orelse = new_orelse;
                }
                Ok(vec![rewrap_stmt(stmt, node)])
            }
            StmtKind::While { test, body, orelse } => {
                let id = self.stmt_id(stmt)?;
                let new_test = write_expr_call(self.expr(test)?, self.file_id, id, test.location);
                let new_body = self.block(body)?;
                let new_orelse = self.block(orelse)?;
                let mut node = stmt.node.clone();
                if let StmtKind::While { test, body, orelse } = &mut node {
                    *test = Box::new(new_test);
                    *body = new_body;
                    *orelse = new_orelse;
                }
                Ok(vec![rewrap_stmt(stmt, node)])
            }
            StmtKind::For { target, iter, body, orelse, .. }
            | StmtKind::AsyncFor { target, iter, body, orelse, .. } => {
                let id = self.stmt_id(stmt)?;
                let new_target = self.expr(target)?;
                let tree = self.accessor_tree(target);
                let new_iter = self.expr(iter)?;
                let wrapped_iter = aardwolf_iter_call(new_iter, self.file_id, id, tree, iter.location);
                let new_body = self.block(body)?;
                let new_orelse = self.block(orelse)?;
                let mut node = stmt.node.clone();
                if let StmtKind::For { target, iter, body, orelse, .. }
                | StmtKind::AsyncFor { target, iter, body, orelse, .. } = &mut node
                {
                    *target = Box::new(new_target);
                    *iter = Box::new(wrapped_iter);
                    *body = new_body;
                    *orelse = new_orelse;
                }
                Ok(vec![rewrap_stmt(stmt, node)])
            }
            StmtKind::With { items, body, .. } | StmtKind::AsyncWith { items, body, .. } => {
                let mut new_items = Vec::with_capacity(items.len());
                for item in items {
                    let id = self.expr_id(&item.context_expr)?;
                    let new_ctx = self.expr(&item.context_expr)?;
                    let wrapped = write_expr_call(new_ctx, self.file_id, id, item.context_expr.location);
                    let new_vars = match &item.optional_vars {
                        Some(vars) => Some(Box::new(self.expr(vars)?)),
                        None => None,
                    };
                    let mut new_item = item.clone();
                    new_item.context_expr = wrapped;
                    new_item.optional_vars = new_vars;
                    new_items.push(new_item);
                }
                let new_body = self.block(body)?;
                let mut node = stmt.node.clone();
                if let StmtKind::With { items, body, .. } | StmtKind::AsyncWith { items, body, .. } =
                    &mut node
                {
                    *items = new_items;
                    *body = new_body;
                }
                Ok(vec![rewrap_stmt(stmt, node)])
            }
            StmtKind::Break => {
                let id = self.stmt_id(stmt)?;
                Ok(vec![write_stmt_stmt(self.file_id, id, loc), stmt.clone()])
            }
            StmtKind::Continue => {
                let id = self.stmt_id(stmt)?;
                Ok(vec![write_stmt_stmt(self.file_id, id, loc), stmt.clone()])
            }
            StmtKind::Raise { exc, cause } => {
                let id = self.stmt_id(stmt)?;
                let new_exc = match exc {
                    Some(e) => Some(write_expr_call(self.expr(e)?, self.file_id, id, e.location)),
                    None => None,
                };
                let new_cause = match cause {
                    Some(c) => Some(self.expr(c)?),
                    None => None,
                };
                let mut node = stmt.node.clone();
                if let StmtKind::Raise { exc, cause } = &mut node {
                    *exc = new_exc.map(Box::new);
                    *cause = new_cause.map(Box::new);
                }
                Ok(vec![write_stmt_stmt(self.file_id, id, loc), rewrap_stmt(stmt, node)])
            }
            StmtKind::Try { body, handlers, orelse, finalbody } => {
                let new_body = self.block(body)?;
                let mut new_handlers = Vec::with_capacity(handlers.len());
                for handler in handlers {
                    let ExcepthandlerKind::ExceptHandler { body: hbody, .. } = &handler.node;
                    let new_hbody = self.block(hbody)?;
                    let mut new_handler = handler.clone();
                    let ExcepthandlerKind::ExceptHandler { body, .. } = &mut new_handler.node;
                    *body = new_hbody;
                    new_handlers.push(new_handler);
                }
                let new_orelse = self.block(orelse)?;
                let new_finalbody = self.block(finalbody)?;
                let mut node = stmt.node.clone();
                if let StmtKind::Try { body, handlers, orelse, finalbody } = &mut node {
                    *body = new_body;
                    *handlers = new_handlers;
                    *orelse = new_orelse;
                    *finalbody = new_finalbody;
                }
                Ok(vec![rewrap_stmt(stmt, node)])
            }
            // Not named by the injection rules: static ids exist for these
            // (§4.4) but no trace call is ever emitted for them.
            StmtKind::Import { .. }
            | StmtKind::ImportFrom { .. }
            | StmtKind::Global { .. }
            | StmtKind::Nonlocal { .. }
            | StmtKind::Pass
            | StmtKind::Match { .. } => Ok(vec![stmt.clone()]),
        }
    }

    /// Rebuilds `expr`, applying the Call rule (wrap the callee in
    /// `write_expr`, wrap the whole call in `write_value`) wherever a Call
    /// appears, however deeply nested; every other compound expression is
    /// walked purely to reach the Calls inside it.
    fn expr(&mut self, expr: &'a Located<ExprKind>) -> Result<Located<ExprKind>> {
        match &expr.node {
            ExprKind::Call { func, args, keywords } => {
                let id = self.expr_id(func)?;
                let new_func = self.expr(func)?;
                let wrapped_func = write_expr_call(new_func, self.file_id, id, func.location);
                let mut new_args = Vec::with_capacity(args.len());
                for arg in args {
                    new_args.push(self.expr(arg)?);
                }
                let mut new_keywords = Vec::with_capacity(keywords.len());
                for keyword in keywords {
                    let new_value = self.expr(&keyword.node.value)?;
                    let mut new_keyword = keyword.clone();
                    new_keyword.node.value = new_value;
                    new_keywords.push(new_keyword);
                }
                let mut node = expr.node.clone();
                if let ExprKind::Call { func, args, keywords } = &mut node {
                    *func = Box::new(wrapped_func);
                    *args = new_args;
                    *keywords = new_keywords;
                }
                let rebuilt = rewrap_expr(expr, node);
                Ok(write_value_call(rebuilt, empty_list(expr.location), expr.location))
            }
            ExprKind::Attribute { value, .. } => {
                let new_value = self.expr(value)?;
                let mut node = expr.node.clone();
                if let ExprKind::Attribute { value, .. } = &mut node {
                    *value = Box::new(new_value);
                }
                Ok(rewrap_expr(expr, node))
            }
            ExprKind::Subscript { value, slice, .. } => {
                let new_value = self.expr(value)?;
                let new_slice = self.expr(slice)?;
                let mut node = expr.node.clone();
                if let ExprKind::Subscript { value, slice, .. } = &mut node {
                    *value = Box::new(new_value);
                    *slice = Box::new(new_slice);
                }
                Ok(rewrap_expr(expr, node))
            }
            ExprKind::BinOp { left, right, .. } => {
                let new_left = self.expr(left)?;
                let new_right = self.expr(right)?;
                let mut node = expr.node.clone();
                if let ExprKind::BinOp { left, right, .. } = &mut node {
                    *left = Box::new(new_left);
                    *right = Box::new(new_right);
                }
                Ok(rewrap_expr(expr, node))
            }
            ExprKind::BoolOp { values, .. } => {
                let mut new_values = Vec::with_capacity(values.len());
                for value in values {
                    new_values.push(self.expr(value)?);
                }
                let mut node = expr.node.clone();
                if let ExprKind::BoolOp { values, .. } = &mut node {
                    *values = new_values;
                }
                Ok(rewrap_expr(expr, node))
            }
            ExprKind::UnaryOp { operand, .. } => {
                let new_operand = self.expr(operand)?;
                let mut node = expr.node.clone();
                if let ExprKind::UnaryOp { operand, .. } = &mut node {
                    *operand = Box::new(new_operand);
                }
                Ok(rewrap_expr(expr, node))
            }
            ExprKind::Compare { left, comparators, .. } => {
                let new_left = self.expr(left)?;
                let mut new_comparators = Vec::with_capacity(comparators.len());
                for comparator in comparators {
                    new_comparators.push(self.expr(comparator)?);
                }
                let mut node = expr.node.clone();
                if let ExprKind::Compare { left, comparators, .. } = &mut node {
                    *left = Box::new(new_left);
                    *comparators = new_comparators;
                }
                Ok(rewrap_expr(expr, node))
            }
            ExprKind::IfExp { test, body, orelse } => {
                let new_test = self.expr(test)?;
                let new_body = self.expr(body)?;
                let new_orelse = self.expr(orelse)?;
                let mut node = expr.node.clone();
                if let ExprKind::IfExp { test, body, orelse } = &mut node {
                    *test = Box::new(new_test);
                    *body = Box::new(new_body);
                    *orelse = Box::new(new_orelse);
                }
                Ok(rewrap_expr(expr, node))
            }
            ExprKind::Tuple { elts, .. } | ExprKind::List { elts, .. } | ExprKind::Set { elts } => {
                let mut new_elts = Vec::with_capacity(elts.len());
                for elt in elts {
                    new_elts.push(self.expr(elt)?);
                }
                let mut node = expr.node.clone();
                match &mut node {
                    ExprKind::Tuple { elts, .. } | ExprKind::List { elts, .. } | ExprKind::Set { elts } => {
                        *elts = new_elts;
                    }
                    _ => unreachable!(),
                }
                Ok(rewrap_expr(expr, node))
            }
            ExprKind::Starred { value, .. } => {
                let new_value = self.expr(value)?;
                let mut node = expr.node.clone();
                if let ExprKind::Starred { value, .. } = &mut node {
                    *value = Box::new(new_value);
                }
                Ok(rewrap_expr(expr, node))
            }
            ExprKind::NamedExpr { target, value } => {
                let new_target = self.expr(target)?;
                let new_value = self.expr(value)?;
                let mut node = expr.node.clone();
                if let ExprKind::NamedExpr { target, value } = &mut node {
                    *target = Box::new(new_target);
                    *value = Box::new(new_value);
                }
                Ok(rewrap_expr(expr, node))
            }
            ExprKind::Await { value } => {
                let new_value = self.expr(value)?;
                let mut node = expr.node.clone();
                if let ExprKind::Await { value } = &mut node {
                    *value = Box::new(new_value);
                }
                Ok(rewrap_expr(expr, node))
            }
            // Lambdas, comprehensions, dict/f-string literals and slices are
            // left untouched: any Call nested inside one goes uninstrumented
            // (§4.5 gap, consistent with Lambda's own untriggered static id).
            _ => Ok(expr.clone()),
        }
    }

    /// Mirrors a target's destructuring shape into an `AccTree` literal
    /// (§4.6.1): tuple-pattern targets become a `List` of subtrees,
    /// list-pattern targets a `Tuple`, so the runtime can tell `a, b = x`
    /// apart from `[a, b] = x`; anything else is a leaf.
    fn accessor_tree(&self, target: &'a Located<ExprKind>) -> Located<ExprKind> {
        let loc = target.location;
        match &target.node {
            ExprKind::Tuple { elts, .. } => {
                let subtrees = elts.iter().map(|elt| self.accessor_tree(elt)).collect();
                at(ExprKind::List { elts: subtrees, ctx: ExprContext::Load }, loc)
            }
            ExprKind::List { elts, .. } => {
                let subtrees = elts.iter().map(|elt| self.accessor_tree(elt)).collect();
                at(ExprKind::Tuple { elts: subtrees, ctx: ExprContext::Load }, loc)
            }
            ExprKind::Starred { value, .. } => {
                let inner = self.accessor_tree(value);
                let tag = at(ExprKind::Constant { value: Constant::Str("*".to_string()), kind: None }, loc);
                at(ExprKind::List { elts: vec![tag, inner], ctx: ExprContext::Load }, loc)
            }
            _ => empty_list(loc),
        }
    }
}

fn rewrap_stmt(original: &Located<StmtKind>, node: StmtKind) -> Located<StmtKind> {
    Located::new(original.location, original.end_location.unwrap_or(original.location), node)
}

fn rewrap_expr(original: &Located<ExprKind>, node: ExprKind) -> Located<ExprKind> {
    Located::new(original.location, original.end_location.unwrap_or(original.location), node)
}

fn at<T>(node: T, loc: Location) -> Located<T> {
    Located::new(loc, loc, node)
}

fn empty_list(loc: Location) -> Located<ExprKind> {
    at(ExprKind::List { elts: Vec::new(), ctx: ExprContext::Load }, loc)
}

fn name_expr(id: &str, loc: Location) -> Located<ExprKind> {
    at(ExprKind::Name { id: id.to_string(), ctx: ExprContext::Load }, loc)
}

fn attr_expr(value: Located<ExprKind>, attr: &str, loc: Location) -> Located<ExprKind> {
    at(
        ExprKind::Attribute {
            value: Box::new(value),
            attr: attr.to_string(),
            ctx: ExprContext::Load,
        },
        loc,
    )
}

fn aardwolf_attr(attr: &str, loc: Location) -> Located<ExprKind> {
    attr_expr(name_expr("aardwolf", loc), attr, loc)
}

fn call_expr(func: Located<ExprKind>, args: Vec<Located<ExprKind>>, loc: Location) -> Located<ExprKind> {
    at(
        ExprKind::Call {
            func: Box::new(func),
            args,
            keywords: Vec::new(),
        },
        loc,
    )
}

fn int_const(value: u64, loc: Location) -> Located<ExprKind> {
    at(ExprKind::Constant { value: Constant::Int(BigInt::from(value)), kind: None }, loc)
}

fn id_tuple_expr(file_id: u64, stmt_id: Id, loc: Location) -> Located<ExprKind> {
    at(
        ExprKind::Tuple {
            elts: vec![int_const(file_id, loc), int_const(stmt_id, loc)],
            ctx: ExprContext::Load,
        },
        loc,
    )
}

fn write_stmt_call_expr(file_id: u64, stmt_id: Id, loc: Location) -> Located<ExprKind> {
    call_expr(aardwolf_attr("write_stmt", loc), vec![id_tuple_expr(file_id, stmt_id, loc)], loc)
}

fn write_stmt_stmt(file_id: u64, stmt_id: Id, loc: Location) -> Located<StmtKind> {
    at(StmtKind::Expr { value: Box::new(write_stmt_call_expr(file_id, stmt_id, loc)) }, loc)
}

/// `write_value(<arg_name>)` as its own statement, a bare leaf accessor tree
/// since a parameter is never itself a destructuring target (§4.5 FunctionDef
/// injection rule, second of the two per-parameter statements).
fn write_value_stmt(arg_name: &str, loc: Location) -> Located<StmtKind> {
    let value = write_value_call(name_expr(arg_name, loc), empty_list(loc), loc);
    at(StmtKind::Expr { value: Box::new(value) }, loc)
}

fn write_expr_call(value: Located<ExprKind>, file_id: u64, stmt_id: Id, loc: Location) -> Located<ExprKind> {
    call_expr(aardwolf_attr("write_expr", loc), vec![value, id_tuple_expr(file_id, stmt_id, loc)], loc)
}

fn write_value_call(value: Located<ExprKind>, tree: Located<ExprKind>, loc: Location) -> Located<ExprKind> {
    call_expr(aardwolf_attr("write_value", loc), vec![value, tree], loc)
}

fn aardwolf_iter_call(
    iter: Located<ExprKind>,
    file_id: u64,
    stmt_id: Id,
    tree: Located<ExprKind>,
    loc: Location,
) -> Located<ExprKind> {
    call_expr(
        aardwolf_attr("aardwolf_iter", loc),
        vec![iter, id_tuple_expr(file_id, stmt_id, loc), tree],
        loc,
    )
}

fn import_stmt(loc: Location) -> Located<StmtKind> {
    at(
        StmtKind::Import {
            names: vec![at(AliasData { name: "aardwolf".to_string(), asname: None }, loc)],
        },
        loc,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analysis;
    use crate::normalize::normalize;
    use crate::symbols;
    use rustpython_parser::parser::parse_program;

    #[test]
    fn prepends_import_aardwolf() {
        let mut body = parse_program("def foo(bar):\n    return bar\n", "<test>").unwrap();
        normalize(&mut body);
        let symbols = symbols::build(&body);
        let mut output = Analysis::new(&symbols, 1).run(&body);
        let rewritten = instrument(&body, &mut output.nodes, output.file_id).unwrap();
        assert!(matches!(rewritten[0].node, StmtKind::Import { .. }));
    }

    #[test]
    fn return_value_is_wrapped_in_write_expr() {
        let mut body = parse_program("def foo(bar):\n    return bar\n", "<test>").unwrap();
        normalize(&mut body);
        let symbols = symbols::build(&body);
        let mut output = Analysis::new(&symbols, 1).run(&body);
        let rewritten = instrument(&body, &mut output.nodes, output.file_id).unwrap();
        let StmtKind::FunctionDef { body: fn_body, .. } = &rewritten[1].node else {
            panic!("expected FunctionDef after the import")
        };
        // First two statements are the parameter's write_stmt/write_value prologue.
        let StmtKind::Return { value } = &fn_body[2].node else {
            panic!("expected Return as the third statement")
        };
        let Some(value) = value else { panic!("expected Some(value)") };
        let ExprKind::Call { func, .. } = &value.node else {
            panic!("expected the return value wrapped in a call")
        };
        let ExprKind::Attribute { attr, .. } = &func.node else {
            panic!("expected aardwolf.write_expr")
        };
        assert_eq!(attr, "write_expr");
    }

    #[test]
    fn param_prologue_emits_write_stmt_then_write_value() {
        let mut body = parse_program("def foo(bar):\n    return bar\n", "<test>").unwrap();
        normalize(&mut body);
        let symbols = symbols::build(&body);
        let mut output = Analysis::new(&symbols, 1).run(&body);
        let rewritten = instrument(&body, &mut output.nodes, output.file_id).unwrap();
        let StmtKind::FunctionDef { body: fn_body, .. } = &rewritten[1].node else {
            panic!("expected FunctionDef after the import")
        };
        let StmtKind::Expr { value } = &fn_body[0].node else {
            panic!("expected the write_stmt prologue statement")
        };
        let ExprKind::Call { func, .. } = &value.node else {
            panic!("expected a call")
        };
        let ExprKind::Attribute { attr, .. } = &func.node else {
            panic!("expected aardwolf.write_stmt")
        };
        assert_eq!(attr, "write_stmt");

        let StmtKind::Expr { value } = &fn_body[1].node else {
            panic!("expected the write_value prologue statement")
        };
        let ExprKind::Call { func, args, .. } = &value.node else {
            panic!("expected a call")
        };
        let ExprKind::Attribute { attr, .. } = &func.node else {
            panic!("expected aardwolf.write_value")
        };
        assert_eq!(attr, "write_value");
        let ExprKind::Name { id, .. } = &args[0].node else {
            panic!("expected the parameter name as the traced value")
        };
        assert_eq!(id, "bar");
    }

    #[test]
    fn rewriting_an_unanalyzed_tree_is_id_divergence() {
        let mut body = parse_program("x = 1\n", "<test>").unwrap();
        normalize(&mut body);
        let mut nodes: IdMap<NodeRef> = IdMap::new();
        let err = instrument(&body, &mut nodes, 1).unwrap_err();
        assert!(matches!(err, AardError::IdDivergence { .. }));
    }
}
