//! Analysis (§4.3): builds a CFG per function, per-statement def/use sets,
//! and stable integer ids for statements and values.
//!
//! Grounded in `Checker<'a>` (`checkers/ast.rs`): a single stateful struct
//! holding a scope stack, a parent-tracking map, and a growing `bindings`
//! arena, all populated by one recursive walk over the `Suite`. Here the
//! "bindings arena" is the statement table, the "scope stack" is the
//! function-context stack, and `branch_detection`'s ancestor/alternatives
//! reasoning becomes literal basic-block wiring.

mod defuse;

use rustc_hash::FxHashMap;
use rustpython_parser::ast::{Located, StmtKind, Suite};

use crate::access::Access;
use crate::ids::{Id, IdMap, RefEquality};
use crate::symbols::{ScopeId, SymbolTable, TOP_SCOPE};

pub const META_ARG: u8 = 0x01;
pub const META_RET: u8 = 0x02;
pub const META_CALL: u8 = 0x04;

/// Pointer-identity key spanning every kind of AST node that can become a
/// tracing point: most are `Stmt`, but function parameters (`arg` nodes) and
/// call expressions (however deeply nested) each get their own statement id
/// too (§3 Statement, §4.3 Call extraction, §4.5 Instrumenter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef<'a> {
    Stmt(RefEquality<'a, Located<rustpython_parser::ast::StmtKind>>),
    Arg(RefEquality<'a, Located<rustpython_parser::ast::ArgData>>),
    Expr(RefEquality<'a, Located<rustpython_parser::ast::ExprKind>>),
}

#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub id: usize,
    pub statements: Vec<Id>,
    pub successors: Vec<usize>,
    pub predecessors: Vec<usize>,
    /// Non-local escapes recorded against this block (`break` sites), drained
    /// when the enclosing loop closes (§3 Basic block, §4.3 For/While).
    pub exits: Vec<usize>,
    pub frozen: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionContext {
    pub name: String,
    pub blocks: Vec<BasicBlock>,
}

#[derive(Debug, Clone)]
pub struct StatementRecord {
    pub id: Id,
    pub context: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub defs: Vec<Access>,
    pub uses: Vec<Access>,
    pub meta: u8,
    /// Filled in by `compute_successors` once the CFG is complete.
    pub successors: Vec<Id>,
}

pub struct AnalysisOutput<'a> {
    pub file_id: u64,
    pub contexts: Vec<FunctionContext>,
    pub statements: FxHashMap<Id, StatementRecord>,
    pub nodes: IdMap<NodeRef<'a>>,
    pub values: IdMap<Access>,
}

struct LoopFrame {
    header: usize,
    exits: Vec<usize>,
}

struct ContextFrame {
    name: String,
    blocks: Vec<BasicBlock>,
    current: usize,
}

impl ContextFrame {
    fn new(name: String) -> Self {
        let entry = BasicBlock {
            id: 0,
            ..Default::default()
        };
        ContextFrame {
            name,
            blocks: vec![entry],
            current: 0,
        }
    }

    fn new_block(&mut self) -> usize {
        let id = self.blocks.len();
        self.blocks.push(BasicBlock {
            id,
            ..Default::default()
        });
        id
    }

    fn add_edge(&mut self, from: usize, to: usize, force: bool) {
        if self.blocks[from].frozen && !force {
            return;
        }
        if !self.blocks[from].successors.contains(&to) {
            self.blocks[from].successors.push(to);
        }
        if !self.blocks[to].predecessors.contains(&from) {
            self.blocks[to].predecessors.push(from);
        }
    }

    fn append(&mut self, block: usize, stmt: Id) {
        if !self.blocks[block].frozen {
            self.blocks[block].statements.push(stmt);
        }
    }

    fn freeze(&mut self, block: usize) {
        self.blocks[block].frozen = true;
    }
}

pub struct Analysis<'a> {
    symbols: &'a SymbolTable,
    scope_stack: Vec<ScopeId>,
    frames: Vec<ContextFrame>,
    completed: Vec<FunctionContext>,
    loop_stack: Vec<LoopFrame>,
    level_stack: Vec<Vec<Access>>,
    nodes: IdMap<NodeRef<'a>>,
    values: IdMap<Access>,
    statements: FxHashMap<Id, StatementRecord>,
    file_id: u64,
}

impl<'a> Analysis<'a> {
    pub fn new(symbols: &'a SymbolTable, file_id: u64) -> Self {
        Analysis {
            symbols,
            scope_stack: vec![TOP_SCOPE],
            frames: vec![ContextFrame::new("__main__".to_string())],
            completed: Vec::new(),
            loop_stack: Vec::new(),
            level_stack: Vec::new(),
            nodes: IdMap::new(),
            values: IdMap::new(),
            statements: FxHashMap::default(),
            file_id,
        }
    }

    pub fn run(mut self, body: &'a Suite) -> AnalysisOutput<'a> {
        self.visit_body(body);
        self.exit_context();
        compute_successors(&self.completed, &mut self.statements);
        AnalysisOutput {
            file_id: self.file_id,
            contexts: self.completed,
            statements: self.statements,
            nodes: self.nodes,
            values: self.values,
        }
    }

    fn current_scope(&self) -> ScopeId {
        *self.scope_stack.last().unwrap()
    }

    fn frame(&mut self) -> &mut ContextFrame {
        self.frames.last_mut().unwrap()
    }

    fn current_block(&mut self) -> usize {
        self.frame().current
    }

    fn set_current(&mut self, block: usize) {
        self.frame().current = block;
    }

    fn context_name(&self) -> String {
        self.frames.last().unwrap().name.clone()
    }

    /// Opens a fresh level for a sub-expression evaluation (§4.3 level
    /// stack), letting sibling expressions (e.g. an assignment's LHS vs RHS)
    /// collect their Accesses independently.
    fn new_level(&mut self) {
        self.level_stack.push(Vec::new());
    }

    fn push_access(&mut self, access: Access) {
        if let Some(level) = self.level_stack.last_mut() {
            level.push(access);
        }
    }

    fn collect_level(&mut self) -> Vec<Access> {
        self.level_stack.pop().unwrap_or_default()
    }

    fn register_stmt(
        &mut self,
        node: NodeRef<'a>,
        start_line: u32,
        start_col: u32,
        end_line: u32,
        end_col: u32,
        defs: Vec<Access>,
        uses: Vec<Access>,
        meta: u8,
    ) -> Id {
        let id = self.nodes.get(node);
        let context = self.context_name();
        self.statements.entry(id).or_insert_with(|| StatementRecord {
            id,
            context,
            start_line,
            start_col,
            end_line,
            end_col,
            defs,
            uses,
            meta,
            successors: Vec::new(),
        });
        id
    }

    fn visit_body(&mut self, body: &'a [Located<StmtKind>]) {
        for stmt in body {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &'a Located<StmtKind>) {
        let node = NodeRef::Stmt(RefEquality(stmt));
        let (sl, sc, el, ec) = loc(stmt);
        match &stmt.node {
            StmtKind::FunctionDef { name, args, body, decorator_list, .. }
            | StmtKind::AsyncFunctionDef { name, args, body, decorator_list, .. } => {
                self.visit_function_def(stmt, name, args, body, decorator_list);
            }
            StmtKind::ClassDef { name, body, decorator_list, .. } => {
                let scope = self.child_scope_by_name(name);
                self.enter_scope(scope);
                self.enter_context(self.qualify(name, sl));
                self.visit_decorators(decorator_list);
                self.visit_body(body);
                self.exit_context();
                self.exit_scope();
            }
            StmtKind::Return { .. } => self.visit_return(stmt),
            StmtKind::Assign { targets, value, .. } => {
                self.new_level();
                self.visit_expr(value);
                let uses = self.collect_level();
                self.new_level();
                for target in targets {
                    self.visit_target(target);
                }
                let defs = self.collect_level();
                let block = self.current_block();
                let id = self.register_stmt(node, sl, sc, el, ec, defs, uses, 0);
                self.frame().append(block, id);
            }
            StmtKind::AugAssign { target, value, .. } => {
                self.new_level();
                self.visit_expr(value);
                self.visit_expr(target);
                let mut uses = self.collect_level();
                self.new_level();
                self.visit_target(target);
                let defs = self.collect_level();
                // The augmented target is both read and written (§4.3 AugAssign).
                if uses.is_empty() {
                    uses = defs.clone();
                }
                let block = self.current_block();
                let id = self.register_stmt(node, sl, sc, el, ec, defs, uses, 0);
                self.frame().append(block, id);
            }
            StmtKind::AnnAssign { target, value, .. } => {
                self.new_level();
                if let Some(value) = value {
                    self.visit_expr(value);
                }
                let uses = self.collect_level();
                self.new_level();
                self.visit_target(target);
                let defs = self.collect_level();
                let block = self.current_block();
                let id = self.register_stmt(node, sl, sc, el, ec, defs, uses, 0);
                self.frame().append(block, id);
            }
            StmtKind::Delete { targets } => {
                self.new_level();
                for target in targets {
                    self.visit_expr(target);
                }
                let uses = self.collect_level();
                let block = self.current_block();
                let id = self.register_stmt(node, sl, sc, el, ec, Vec::new(), uses, 0);
                self.frame().append(block, id);
            }
            StmtKind::Assert { test, msg } => {
                self.new_level();
                self.visit_expr(test);
                if let Some(msg) = msg {
                    self.visit_expr(msg);
                }
                let uses = self.collect_level();
                let block = self.current_block();
                let id = self.register_stmt(node, sl, sc, el, ec, Vec::new(), uses, 0);
                self.frame().append(block, id);
            }
            StmtKind::Expr { value } => self.visit_expr_stmt(stmt, value, sl, sc, el, ec),
            StmtKind::If { test, body, orelse } => self.visit_if(stmt, test, body, orelse),
            StmtKind::While { test, body, orelse } => self.visit_while(stmt, test, body, orelse),
            StmtKind::For { target, iter, body, orelse, .. }
            | StmtKind::AsyncFor { target, iter, body, orelse, .. } => {
                self.visit_for(stmt, target, iter, body, orelse)
            }
            StmtKind::With { items, body, .. } | StmtKind::AsyncWith { items, body, .. } => {
                self.visit_with(items, body)
            }
            StmtKind::Break => {
                let block = self.current_block();
                let id = self.register_stmt(node, sl, sc, el, ec, Vec::new(), Vec::new(), 0);
                self.frame().append(block, id);
                self.frame().freeze(block);
                if let Some(loop_frame) = self.loop_stack.last_mut() {
                    loop_frame.exits.push(block);
                }
            }
            StmtKind::Continue => {
                let block = self.current_block();
                let id = self.register_stmt(node, sl, sc, el, ec, Vec::new(), Vec::new(), 0);
                self.frame().append(block, id);
                if let Some(loop_frame) = self.loop_stack.last() {
                    let header = loop_frame.header;
                    self.frame().add_edge(block, header, true);
                }
                self.frame().freeze(block);
            }
            StmtKind::Raise { exc, cause } => {
                self.new_level();
                if let Some(exc) = exc {
                    self.visit_expr(exc);
                }
                if let Some(cause) = cause {
                    self.visit_expr(cause);
                }
                let uses = self.collect_level();
                let block = self.current_block();
                let id = self.register_stmt(node, sl, sc, el, ec, Vec::new(), uses, 0);
                self.frame().append(block, id);
                self.frame().freeze(block);
            }
            StmtKind::Try { body, handlers, orelse, finalbody } => {
                self.visit_try(body, handlers, orelse, finalbody)
            }
            StmtKind::Import { .. } | StmtKind::ImportFrom { .. } => {
                let block = self.current_block();
                let id = self.register_stmt(node, sl, sc, el, ec, Vec::new(), Vec::new(), 0);
                self.frame().append(block, id);
            }
            StmtKind::Global { .. }
            | StmtKind::Nonlocal { .. }
            | StmtKind::Pass
            | StmtKind::Match { .. } => {}
        }
    }

    fn visit_return(&mut self, stmt: &'a Located<StmtKind>) {
        let StmtKind::Return { value } = &stmt.node else {
            unreachable!()
        };
        let node = NodeRef::Stmt(RefEquality(stmt));
        let (sl, sc, el, ec) = loc(stmt);
        self.new_level();
        if let Some(value) = value {
            self.visit_expr(value);
        }
        let uses = self.collect_level();
        let block = self.current_block();
        let id = self.register_stmt(node, sl, sc, el, ec, Vec::new(), uses, META_RET);
        self.frame().append(block, id);
        self.frame().freeze(block);
    }

    fn visit_expr_stmt(
        &mut self,
        stmt: &'a Located<StmtKind>,
        value: &'a Located<rustpython_parser::ast::ExprKind>,
        sl: u32,
        sc: u32,
        el: u32,
        ec: u32,
    ) {
        let node = NodeRef::Stmt(RefEquality(stmt));
        self.new_level();
        self.visit_expr(value);
        let uses = self.collect_level();
        let meta = if matches!(value.node, rustpython_parser::ast::ExprKind::Call { .. }) {
            META_CALL
        } else {
            0
        };
        let block = self.current_block();
        let id = self.register_stmt(node, sl, sc, el, ec, Vec::new(), uses, meta);
        self.frame().append(block, id);
    }

    fn visit_if(
        &mut self,
        stmt: &'a Located<StmtKind>,
        test: &'a Located<rustpython_parser::ast::ExprKind>,
        body: &'a [Located<StmtKind>],
        orelse: &'a [Located<StmtKind>],
    ) {
        let (sl, sc, el, ec) = loc(stmt);
        self.new_level();
        self.visit_expr(test);
        let uses = self.collect_level();

        let if_block = self.current_block();
        let control_id = self.register_stmt(
            NodeRef::Stmt(RefEquality(stmt)),
            sl,
            sc,
            el,
            ec,
            Vec::new(),
            uses,
            0,
        );
        self.frame().append(if_block, control_id);
        let then_block = self.frame().new_block();
        self.frame().add_edge(if_block, then_block, false);
        self.set_current(then_block);
        self.visit_body(body);
        let then_tail = self.current_block();

        let join = self.frame().new_block();
        if !self.frame().blocks[then_tail].frozen {
            self.frame().add_edge(then_tail, join, false);
        }

        if orelse.is_empty() {
            self.frame().add_edge(if_block, join, false);
        } else {
            let else_block = self.frame().new_block();
            self.frame().add_edge(if_block, else_block, false);
            self.set_current(else_block);
            self.visit_body(orelse);
            let else_tail = self.current_block();
            if !self.frame().blocks[else_tail].frozen {
                self.frame().add_edge(else_tail, join, false);
            }
        }
        self.set_current(join);
    }

    fn visit_while(
        &mut self,
        stmt: &'a Located<StmtKind>,
        test: &'a Located<rustpython_parser::ast::ExprKind>,
        body: &'a [Located<StmtKind>],
        orelse: &'a [Located<StmtKind>],
    ) {
        let (sl, sc, el, ec) = loc(stmt);
        let prev = self.current_block();
        self.new_level();
        self.visit_expr(test);
        let uses = self.collect_level();
        let control_id = self.register_stmt(
            NodeRef::Stmt(RefEquality(stmt)),
            sl,
            sc,
            el,
            ec,
            Vec::new(),
            uses,
            0,
        );
        self.frame().append(prev, control_id);

        let header = self.frame().new_block();
        self.frame().add_edge(prev, header, false);

        self.loop_stack.push(LoopFrame { header, exits: Vec::new() });

        let body_block = self.frame().new_block();
        self.frame().add_edge(header, body_block, false);
        self.set_current(body_block);
        self.visit_body(body);
        let body_tail = self.current_block();
        if !self.frame().blocks[body_tail].frozen {
            self.frame().add_edge(body_tail, header, false);
        }

        let join = self.frame().new_block();
        if !orelse.is_empty() {
            let else_block = self.frame().new_block();
            self.frame().add_edge(header, else_block, false);
            self.set_current(else_block);
            self.visit_body(orelse);
            let else_tail = self.current_block();
            if !self.frame().blocks[else_tail].frozen {
                self.frame().add_edge(else_tail, join, false);
            }
        } else {
            self.frame().add_edge(header, join, false);
        }

        let loop_frame = self.loop_stack.pop().unwrap();
        for exit in loop_frame.exits {
            self.frame().add_edge(exit, join, true);
        }
        self.set_current(join);
    }

    fn visit_for(
        &mut self,
        stmt: &'a Located<StmtKind>,
        target: &'a Located<rustpython_parser::ast::ExprKind>,
        iter: &'a Located<rustpython_parser::ast::ExprKind>,
        body: &'a [Located<StmtKind>],
        orelse: &'a [Located<StmtKind>],
    ) {
        let (sl, sc, el, ec) = loc(stmt);
        let prev = self.current_block();
        self.new_level();
        self.visit_expr(iter);
        let uses = self.collect_level();
        self.new_level();
        self.visit_target(target);
        let defs = self.collect_level();
        let control_id = self.register_stmt(
            NodeRef::Stmt(RefEquality(stmt)),
            sl,
            sc,
            el,
            ec,
            defs,
            uses,
            0,
        );
        self.frame().append(prev, control_id);

        let header = self.frame().new_block();
        self.frame().add_edge(prev, header, false);

        self.loop_stack.push(LoopFrame { header, exits: Vec::new() });

        let body_block = self.frame().new_block();
        self.frame().add_edge(header, body_block, false);
        self.set_current(body_block);
        self.visit_body(body);
        let body_tail = self.current_block();
        if !self.frame().blocks[body_tail].frozen {
            self.frame().add_edge(body_tail, header, false);
        }

        let join = self.frame().new_block();
        if !orelse.is_empty() {
            let else_block = self.frame().new_block();
            self.frame().add_edge(header, else_block, false);
            self.set_current(else_block);
            self.visit_body(orelse);
            let else_tail = self.current_block();
            if !self.frame().blocks[else_tail].frozen {
                self.frame().add_edge(else_tail, join, false);
            }
        } else {
            self.frame().add_edge(header, join, false);
        }

        let loop_frame = self.loop_stack.pop().unwrap();
        for exit in loop_frame.exits {
            self.frame().add_edge(exit, join, true);
        }
        self.set_current(join);
    }

    fn visit_with(
        &mut self,
        items: &'a [rustpython_parser::ast::Withitem],
        body: &'a [Located<StmtKind>],
    ) {
        for item in items {
            self.new_level();
            self.visit_expr(&item.context_expr);
            let uses = self.collect_level();
            let mut defs = Vec::new();
            if let Some(vars) = &item.optional_vars {
                self.new_level();
                self.visit_target(vars);
                defs = self.collect_level();
            }
            // `with`-items are sequential statements keyed by their context
            // expression node (§4.3 With).
            let node = NodeRef::Expr(RefEquality(&item.context_expr));
            let (sl, sc, el, ec) = loc(&item.context_expr);
            let block = self.current_block();
            let id = self.register_stmt(node, sl, sc, el, ec, defs, uses, 0);
            self.frame().append(block, id);
        }
        self.visit_body(body);
    }

    fn visit_try(
        &mut self,
        body: &'a [Located<StmtKind>],
        handlers: &'a [rustpython_parser::ast::Excepthandler],
        orelse: &'a [Located<StmtKind>],
        finalbody: &'a [Located<StmtKind>],
    ) {
        let try_entry = self.current_block();
        self.visit_body(body);
        let body_tail = self.current_block();

        let join = self.frame().new_block();
        if !self.frame().blocks[body_tail].frozen {
            if !orelse.is_empty() {
                self.visit_body(orelse);
                let orelse_tail = self.current_block();
                if !self.frame().blocks[orelse_tail].frozen {
                    self.frame().add_edge(orelse_tail, join, false);
                }
            } else {
                self.frame().add_edge(body_tail, join, false);
            }
        }

        for handler in handlers {
            let rustpython_parser::ast::ExcepthandlerKind::ExceptHandler { body: hbody, .. } =
                &handler.node;
            let handler_block = self.frame().new_block();
            // Any statement in the try body may raise, so conservatively wire
            // the try's entry to every handler (§4.3 Try, ADDED).
            self.frame().add_edge(try_entry, handler_block, false);
            self.set_current(handler_block);
            self.visit_body(hbody);
            let handler_tail = self.current_block();
            if !self.frame().blocks[handler_tail].frozen {
                self.frame().add_edge(handler_tail, join, false);
            }
        }

        self.set_current(join);
        if !finalbody.is_empty() {
            let final_block = self.frame().new_block();
            self.frame().add_edge(join, final_block, false);
            self.set_current(final_block);
            self.visit_body(finalbody);
        }
    }

    fn visit_function_def(
        &mut self,
        stmt: &'a Located<StmtKind>,
        name: &'a str,
        args: &'a rustpython_parser::ast::Arguments,
        body: &'a [Located<StmtKind>],
        decorator_list: &'a [Located<rustpython_parser::ast::ExprKind>],
    ) {
        let scope = self.child_scope_by_name(name);
        self.enter_scope(scope);
        let line = stmt.location.row() as u32;
        self.enter_context(self.qualify(name, line));

        self.visit_decorators(decorator_list);
        self.register_params(scope, args);
        for default in &args.defaults {
            self.new_level();
            self.visit_expr(default);
            let _ = self.collect_level();
        }
        self.visit_body(body);

        self.exit_context();
        self.exit_scope();
    }

    /// Visits each decorator expression in the callee's own context, then
    /// opens a fresh block if any decorator is itself a call, so the
    /// decorators' initialization is separated from the body's control flow
    /// (§4.3 FunctionDef/ClassDef decorator handling).
    fn visit_decorators(&mut self, decorator_list: &'a [Located<rustpython_parser::ast::ExprKind>]) {
        for decorator in decorator_list {
            self.new_level();
            self.visit_expr(decorator);
            let _ = self.collect_level();
        }
        if decorator_list
            .iter()
            .any(|decorator| matches!(decorator.node, rustpython_parser::ast::ExprKind::Call { .. }))
        {
            let current = self.current_block();
            let next = self.frame().new_block();
            self.frame().add_edge(current, next, false);
            self.set_current(next);
        }
    }

    /// Registers each formal parameter as its own tracked statement, defining
    /// the parameter's Scalar (§4.3 FunctionDef / Lambda).
    fn register_params(&mut self, scope: ScopeId, args: &'a rustpython_parser::ast::Arguments) {
        for arg in args
            .posonlyargs
            .iter()
            .chain(args.args.iter())
            .chain(args.kwonlyargs.iter())
            .chain(args.vararg.iter().map(|b| b.as_ref()))
            .chain(args.kwarg.iter().map(|b| b.as_ref()))
        {
            let symbol = self.symbols.lookup(scope, &arg.node.arg);
            let access = match symbol {
                Some(sym) => Access::scalar(crate::access::NameRef::Symbol(sym)),
                None => Access::scalar_named(arg.node.arg.clone()),
            };
            let node = NodeRef::Arg(RefEquality(arg));
            let (sl, sc, el, ec) = loc(arg);
            let block = self.current_block();
            let id = self.register_stmt(node, sl, sc, el, ec, vec![access], Vec::new(), META_ARG);
            self.frame().append(block, id);
        }
    }

    fn enter_scope(&mut self, scope: ScopeId) {
        self.scope_stack.push(scope);
    }

    fn exit_scope(&mut self) {
        self.scope_stack.pop();
    }

    fn enter_context(&mut self, name: String) {
        self.frames.push(ContextFrame::new(name));
    }

    fn exit_context(&mut self) {
        let frame = self.frames.pop().unwrap();
        self.completed.push(FunctionContext {
            name: frame.name,
            blocks: frame.blocks,
        });
    }

    fn child_scope_by_name(&self, name: &str) -> ScopeId {
        let parent = self.current_scope();
        for &child in &self.symbols.scopes[parent.0].children {
            if self.symbols.scopes[child.0].name == name {
                return child;
            }
        }
        parent
    }

    /// Disambiguates same-named nested/overloaded functions by line (§9
    /// Scope disambiguation), e.g. `outer[1]::inner[2]`.
    fn qualify(&self, name: &str, line: u32) -> String {
        let prefix = self.context_name();
        if prefix == "__main__" {
            format!("{name}[{line}]")
        } else {
            format!("{prefix}::{name}[{line}]")
        }
    }
}

fn loc(located: &Located<impl Sized>) -> (u32, u32, u32, u32) {
    let end = located.end_location.unwrap_or(located.location);
    (
        located.location.row() as u32,
        located.location.column() as u32 + 1,
        end.row() as u32,
        end.column() as u32 + 1,
    )
}

/// Projects basic-block successor edges down onto each block's *last*
/// statement; every other statement's sole successor is simply the next
/// statement in its block (§3 Statement "list of successor statement IDs").
///
/// Loop headers and some join blocks never receive statements of their own
/// (§4.4's "empty blocks are normalized away"), so a last statement's real
/// successors are found by following successor edges through any chain of
/// empty blocks until a statement-bearing block (or a dead end) is reached.
fn compute_successors(contexts: &[FunctionContext], statements: &mut FxHashMap<Id, StatementRecord>) {
    for ctx in contexts {
        for block in &ctx.blocks {
            if block.statements.is_empty() {
                continue;
            }
            for (i, &stmt_id) in block.statements.iter().enumerate() {
                let succs = if i + 1 < block.statements.len() {
                    vec![block.statements[i + 1]]
                } else {
                    let mut out = Vec::new();
                    for &succ in &block.successors {
                        let mut visited = vec![false; ctx.blocks.len()];
                        visited[succ] = true;
                        for id in effective_first_statements(ctx, succ, &mut visited) {
                            if !out.contains(&id) {
                                out.push(id);
                            }
                        }
                    }
                    out
                };
                if let Some(record) = statements.get_mut(&stmt_id) {
                    record.successors = succs;
                }
            }
        }
    }
}

fn effective_first_statements(ctx: &FunctionContext, block_idx: usize, visited: &mut [bool]) -> Vec<Id> {
    let block = &ctx.blocks[block_idx];
    if let Some(&first) = block.statements.first() {
        return vec![first];
    }
    let mut out = Vec::new();
    for &succ in &block.successors {
        if visited[succ] {
            continue;
        }
        visited[succ] = true;
        out.extend(effective_first_statements(ctx, succ, visited));
    }
    out
}
