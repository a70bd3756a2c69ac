use sp_core::ast::{
    Block, Expr, LocalId, Stmt, StmtForEach, StmtIf, StmtKind, StmtLocal, StmtTry, StmtWhile,
};
use sp_core::intrinsics::IntrinsicKind;
use sp_core::model::{SemanticModel, TypeShape};
use sp_core::span::Span;
use sp_core::{BindingTime, Stage};

use crate::analyzer::{Analyzer, LoopFrame};
use crate::annotate::StmtStage;
use crate::conflict::ConflictKind;

/// Local introduced by a construct rather than a `var` statement.
pub(super) type Binder = (LocalId, String, TypeShape, Stage);

impl<'a, 't, M> Analyzer<'a, 't, M>
where
    M: SemanticModel + ?Sized,
{
    /// Analyzes `block` in its own frame after declaring `binders`.
    pub(super) fn block_with(&mut self, block: &Block, binders: &[Binder]) {
        self.scopes.enter(block.id);
        for (id, name, shape, stage) in binders {
            self.scopes.declare(*id, name, shape.clone());
            self.scopes.determine(*id, *id, Span::null(), Some(*stage));
        }
        for stmt in &block.stmts {
            self.analyze_stmt(stmt);
        }
        if let Some((id, declared)) = self.scopes.exit() {
            self.out.scopes.insert(id, declared);
        }
    }

    fn analyze_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Local(local) => self.local_stmt(stmt, local),
            StmtKind::Expr(expr) => self.expr_stmt(stmt, &expr.expr),
            StmtKind::Block(block) => {
                self.block_with(block, &[]);
                let stage = if self.block_emits(block) {
                    StmtStage::Residual
                } else {
                    StmtStage::Meta
                };
                self.record_stmt(stmt.id, stage);
            }
            StmtKind::If(stmt_if) => self.if_stmt(stmt, stmt_if),
            StmtKind::While(stmt_while) => self.while_stmt(stmt, stmt_while),
            StmtKind::ForEach(each) => self.foreach_stmt(stmt, each),
            StmtKind::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.analyze_expr(value);
                    self.residual_operand(value);
                }
                self.record_stmt(stmt.id, StmtStage::Residual);
            }
            StmtKind::Break => self.jump(stmt, "break"),
            StmtKind::Continue => self.jump(stmt, "continue"),
            StmtKind::Try(stmt_try) => self.try_stmt(stmt, stmt_try),
        }
    }

    fn local_stmt(&mut self, stmt: &Stmt, local: &StmtLocal) {
        let (value, shape) = match &local.init {
            Some(init) => (self.analyze_expr(init), self.shape(init)),
            None => (BindingTime::Both, TypeShape::Unknown),
        };
        self.scopes.declare(stmt.id, &local.name, shape);

        let restricted = self.ctx.residual_depth > 0 || self.ctx.in_try;
        if value == BindingTime::MetaOnly && restricted {
            self.meta_side_effect(
                stmt.id,
                stmt.span,
                format!("compile-time local `{}`", local.name),
            );
            self.record_stmt(stmt.id, StmtStage::Residual);
            return;
        }

        let binding = match &local.init {
            Some(init) => self
                .determine_local(stmt.id, stmt.id, stmt.span, init, value)
                .unwrap_or(BindingTime::Ambiguous),
            None => self.scopes.binding(stmt.id),
        };
        if binding == BindingTime::MetaOnly {
            if let Some(init) = &local.init {
                self.compile_time_operand(init);
            }
            self.record_stmt(stmt.id, StmtStage::Meta);
        } else {
            if let Some(init) = &local.init {
                self.residual_operand(init);
            }
            self.record_stmt(stmt.id, StmtStage::Residual);
        }
    }

    fn expr_stmt(&mut self, stmt: &Stmt, expr: &Expr) {
        let binding = self.analyze_expr_at(expr, true);
        let stage = match self.out.intrinsic(expr.peel_parens().id) {
            Some(IntrinsicKind::Proceed) => StmtStage::Residual,
            // emits a comment; allowed in any context
            Some(IntrinsicKind::InsertComment) => {
                self.compile_time_operand(expr);
                StmtStage::Meta
            }
            _ if binding.is_meta() => {
                self.meta_side_effect(
                    stmt.id,
                    stmt.span,
                    "compile-time expression statement".to_string(),
                );
                self.compile_time_operand(expr);
                StmtStage::Meta
            }
            _ => StmtStage::Residual,
        };
        self.record_stmt(stmt.id, stage);
    }

    fn if_stmt(&mut self, stmt: &Stmt, stmt_if: &StmtIf) {
        let cond = self.analyze_expr(&stmt_if.cond);
        if cond.is_meta() {
            self.meta_construct(stmt.id, stmt.span, "compile-time `if`".to_string());
            self.compile_time_operand(&stmt_if.cond);
            self.record_stmt(stmt.id, StmtStage::Meta);
            self.block_with(&stmt_if.then, &[]);
            if let Some(elze) = &stmt_if.elze {
                self.else_branch(elze, StmtStage::Meta);
            }
        } else {
            self.record_stmt(stmt.id, StmtStage::Residual);
            self.residual(|this| {
                this.block_with(&stmt_if.then, &[]);
                if let Some(elze) = &stmt_if.elze {
                    this.else_branch(elze, StmtStage::Residual);
                }
            });
        }
    }

    fn else_branch(&mut self, elze: &Stmt, stage: StmtStage) {
        match &elze.kind {
            StmtKind::Block(block) => {
                self.record_stmt(elze.id, stage);
                self.block_with(block, &[]);
            }
            _ => self.analyze_stmt(elze),
        }
    }

    fn in_loop(&mut self, stage: Stage, body: &Block, binders: &[Binder]) {
        self.ctx.loops.push(LoopFrame {
            stage,
            residual_depth: self.ctx.residual_depth,
            in_try: self.ctx.in_try,
        });
        self.block_with(body, binders);
        self.ctx.loops.pop();
    }

    fn while_stmt(&mut self, stmt: &Stmt, stmt_while: &StmtWhile) {
        let cond = self.analyze_expr(&stmt_while.cond);
        if cond.is_meta() {
            self.meta_construct(stmt.id, stmt.span, "compile-time `while`".to_string());
            self.compile_time_operand(&stmt_while.cond);
            self.record_stmt(stmt.id, StmtStage::Meta);
            self.in_loop(Stage::Meta, &stmt_while.body, &[]);
        } else {
            self.record_stmt(stmt.id, StmtStage::Residual);
            self.residual(|this| this.in_loop(Stage::Object, &stmt_while.body, &[]));
        }
    }

    fn foreach_stmt(&mut self, stmt: &Stmt, each: &StmtForEach) {
        let iter = self.analyze_expr(&each.iter);
        let element = self.shape(&each.iter).element();
        if iter.is_meta() {
            self.meta_construct(stmt.id, stmt.span, "compile-time `foreach`".to_string());
            self.compile_time_operand(&each.iter);
            self.record_stmt(stmt.id, StmtStage::Meta);
            let binder = (stmt.id, each.binding.clone(), element, Stage::Meta);
            self.in_loop(Stage::Meta, &each.body, &[binder]);
        } else {
            self.record_stmt(stmt.id, StmtStage::Residual);
            let binder = (stmt.id, each.binding.clone(), element, Stage::Object);
            self.residual(|this| this.in_loop(Stage::Object, &each.body, &[binder]));
        }
    }

    fn jump(&mut self, stmt: &Stmt, keyword: &str) {
        let stage = match self.ctx.loops.last().copied() {
            None => {
                self.conflict_at(
                    ConflictKind::InvalidJump {
                        keyword: keyword.to_string(),
                    },
                    stmt.id,
                    stmt.span,
                );
                StmtStage::Residual
            }
            Some(frame) if frame.stage == Stage::Meta => {
                let construct = format!("`{}` of a compile-time loop", keyword);
                if self.ctx.in_try && !frame.in_try {
                    self.conflict_at(
                        ConflictKind::MetaExceptionHandling { construct },
                        stmt.id,
                        stmt.span,
                    );
                } else if self.ctx.residual_depth > frame.residual_depth {
                    self.conflict_at(
                        ConflictKind::MetaStatementInResidualContext { construct },
                        stmt.id,
                        stmt.span,
                    );
                }
                StmtStage::Meta
            }
            Some(_) => StmtStage::Residual,
        };
        self.record_stmt(stmt.id, stage);
    }

    fn try_stmt(&mut self, stmt: &Stmt, stmt_try: &StmtTry) {
        self.record_stmt(stmt.id, StmtStage::Residual);
        let saved = std::mem::replace(&mut self.ctx.in_try, true);
        self.residual(|this| {
            this.block_with(&stmt_try.body, &[]);
            for catch in &stmt_try.catches {
                this.scopes.enter(catch.id);
                if let Some(binding) = &catch.binding {
                    this.scopes.declare(catch.id, binding, TypeShape::Unknown);
                    this.scopes.determine(
                        catch.id,
                        catch.id,
                        catch.span,
                        Some(Stage::Object),
                    );
                }
                if let Some(filter) = &catch.filter {
                    if this.analyze_expr(filter).is_meta() {
                        this.conflict_at(
                            ConflictKind::MetaExceptionHandling {
                                construct: "compile-time catch filter".to_string(),
                            },
                            filter.id,
                            filter.span,
                        );
                    }
                }
                this.block_with(&catch.body, &[]);
                if let Some((id, declared)) = this.scopes.exit() {
                    this.out.scopes.insert(id, declared);
                }
            }
            if let Some(finally) = &stmt_try.finally {
                this.block_with(finally, &[]);
            }
        });
        self.ctx.in_try = saved;
    }

    /// Whether running `block` can put anything into the generated code.
    fn block_emits(&self, block: &Block) -> bool {
        block.stmts.iter().any(|stmt| self.stmt_emits(stmt))
    }

    fn stmt_emits(&self, stmt: &Stmt) -> bool {
        if self.out.stmt_stage(stmt.id) == StmtStage::Residual {
            return true;
        }
        match &stmt.kind {
            StmtKind::Block(block) => self.block_emits(block),
            StmtKind::If(stmt_if) => {
                self.block_emits(&stmt_if.then)
                    || stmt_if.elze.as_deref().is_some_and(|elze| self.stmt_emits(elze))
            }
            StmtKind::While(stmt_while) => self.block_emits(&stmt_while.body),
            StmtKind::ForEach(each) => self.block_emits(&each.body),
            _ => false,
        }
    }
}
