//! Normalizer (§4.2).
//!
//! Appends an explicit `Return(None)` to any function whose last statement is
//! not already a return, so CFG construction always has an explicit
//! terminator to build the fall-through-at-function-end edge from.
//!
//! Grounded in the "one function per AST variant, no visitor hierarchy"
//! design (§9): this is a plain recursive function over `Suite`, the same
//! shape as `ast::operations::extract_globals`'s `GlobalVisitor` but
//! specialized (and without needing a trait) since it only has one job.

use rustpython_parser::ast::{Location, Located, StmtKind, Suite};

/// Normalizes every function body reachable from `body`, in place.
pub fn normalize(body: &mut Suite) {
    normalize_block(body);
}

fn normalize_block(body: &mut Suite) {
    for stmt in body.iter_mut() {
        normalize_stmt(stmt);
    }
}

fn normalize_stmt(stmt: &mut Located<StmtKind>) {
    match &mut stmt.node {
        StmtKind::FunctionDef { body, .. } | StmtKind::AsyncFunctionDef { body, .. } => {
            normalize_block(body);
            ensure_terminated(body);
        }
        StmtKind::ClassDef { body, .. } => normalize_block(body),
        StmtKind::If { body, orelse, .. } | StmtKind::While { body, orelse, .. } => {
            normalize_block(body);
            normalize_block(orelse);
        }
        StmtKind::For { body, orelse, .. } | StmtKind::AsyncFor { body, orelse, .. } => {
            normalize_block(body);
            normalize_block(orelse);
        }
        StmtKind::With { body, .. } | StmtKind::AsyncWith { body, .. } => normalize_block(body),
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            normalize_block(body);
            for handler in handlers {
                let rustpython_parser::ast::ExcepthandlerKind::ExceptHandler { body, .. } =
                    &mut handler.node;
                normalize_block(body);
            }
            normalize_block(orelse);
            normalize_block(finalbody);
        }
        _ => {}
    }
}

/// Appends `Return(None)` unless `body`'s last statement already terminates
/// the function (a `Return`, or a `Raise`, which always unwinds).
fn ensure_terminated(body: &mut Suite) {
    let already_terminated = matches!(
        body.last().map(|s| &s.node),
        Some(StmtKind::Return { .. }) | Some(StmtKind::Raise { .. })
    );
    if already_terminated {
        return;
    }
    let location = body
        .last()
        .map(|s| s.end_location.unwrap_or(s.location))
        .unwrap_or_else(|| Location::new(1, 0));
    body.push(Located::new(
        location,
        location,
        StmtKind::Return { value: None },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::parser::parse_program;

    #[test]
    fn appends_return_none_when_missing() {
        let mut body = parse_program("def foo(bar):\n    x = bar\n", "<test>").unwrap();
        normalize(&mut body);
        let StmtKind::FunctionDef { body: fn_body, .. } = &body[0].node else {
            panic!("expected FunctionDef")
        };
        assert_eq!(fn_body.len(), 2);
        assert!(matches!(fn_body[1].node, StmtKind::Return { value: None }));
    }

    #[test]
    fn leaves_explicit_return_untouched() {
        let mut body = parse_program("def foo():\n    return 1\n", "<test>").unwrap();
        normalize(&mut body);
        let StmtKind::FunctionDef { body: fn_body, .. } = &body[0].node else {
            panic!("expected FunctionDef")
        };
        assert_eq!(fn_body.len(), 1);
    }

    #[test]
    fn normalizes_nested_functions() {
        let mut body = parse_program(
            "def outer():\n    def inner():\n        x = 1\n    return inner\n",
            "<test>",
        )
        .unwrap();
        normalize(&mut body);
        let StmtKind::FunctionDef { body: outer_body, .. } = &body[0].node else {
            panic!("expected FunctionDef")
        };
        let StmtKind::FunctionDef { body: inner_body, .. } = &outer_body[0].node else {
            panic!("expected nested FunctionDef")
        };
        assert!(matches!(
            inner_body.last().unwrap().node,
            StmtKind::Return { value: None }
        ));
    }
}
