//! Staged expansion rewriter.
//!
//! Lowers a validated [`AnnotatedTemplate`] into a [`Generator`]. Statements
//! the analyzer marked compile-time become generator statements; emitted
//! statements become factory constructions whose compile-time operands are
//! holes.

use sp_analysis::{AnnotatedTemplate, Reference, StmtStage};
use sp_core::ast::{
    Block, CatchClause, Expr, ExprCall, ExprKind, InterpolatedPartKind, ParamStage, Stmt,
    StmtKind, SyntaxKind,
};
use sp_core::error::Error;
use sp_core::intrinsics::IntrinsicKind;
use sp_core::span::Span;
use sp_core::{BindingTime, Result};

use crate::error::corrupt_input;
use crate::factory::{FactoryAdapter, Token};
use crate::generator::{
    Construct, ConstructArg, GenParam, GenStmt, Generator, MetaExpr, MetaPart, ProceedMode,
    Residual,
};

/// Rewrites `annotated` into a generator bounded by `max_meta_iterations`.
pub fn rewrite(annotated: &AnnotatedTemplate<'_>, max_meta_iterations: usize) -> Result<Generator> {
    let rewriter = Rewriter {
        annotated,
        factory: FactoryAdapter::shared(),
    };
    let template = annotated.template;
    let params = template
        .params
        .iter()
        .filter(|param| param.stage == ParamStage::CompileTime)
        .map(|param| GenParam {
            slot: param.id,
            name: param.name.clone(),
        })
        .collect();
    let body = rewriter.block(&template.body)?;
    let generator = Generator {
        template: template.name.clone(),
        kind: template.kind,
        params,
        body,
        max_meta_iterations,
    };
    tracing::debug!(
        "rewrote `{}` into a generator with {} emitting statements",
        generator.template,
        generator.emit_count()
    );
    Ok(generator)
}

struct Rewriter<'a, 't> {
    annotated: &'a AnnotatedTemplate<'t>,
    factory: &'static FactoryAdapter,
}

impl<'a, 't> Rewriter<'a, 't> {
    fn block(&self, block: &Block) -> Result<Vec<GenStmt>> {
        block.stmts.iter().map(|stmt| self.stmt(stmt)).collect()
    }

    fn stmt(&self, stmt: &Stmt) -> Result<GenStmt> {
        match self.annotated.stmt_stage(stmt.id) {
            StmtStage::Meta => self.meta_stmt(stmt),
            StmtStage::Residual => self.residual_stmt(stmt),
        }
    }

    fn meta_stmt(&self, stmt: &Stmt) -> Result<GenStmt> {
        let lowered = match &stmt.kind {
            StmtKind::Local(local) => GenStmt::Let {
                slot: stmt.id,
                name: local.name.clone(),
                init: local.init.as_ref().map(|init| self.meta(init)).transpose()?,
            },
            StmtKind::Expr(expr) => {
                let root = expr.expr.peel_parens();
                match (&root.kind, self.annotated.intrinsic(root.id)) {
                    (ExprKind::Call(call), Some(IntrinsicKind::InsertComment)) => {
                        GenStmt::Comment(self.meta(self.only_arg(root, call)?)?)
                    }
                    _ => GenStmt::Eval(self.meta(&expr.expr)?),
                }
            }
            StmtKind::Block(block) => GenStmt::Scope(self.block(block)?),
            StmtKind::If(stmt_if) => GenStmt::If {
                cond: self.meta(&stmt_if.cond)?,
                then: self.block(&stmt_if.then)?,
                elze: match stmt_if.elze.as_deref() {
                    Some(Stmt {
                        kind: StmtKind::Block(block),
                        ..
                    }) => self.block(block)?,
                    Some(elze) => vec![self.stmt(elze)?],
                    None => Vec::new(),
                },
            },
            StmtKind::While(stmt_while) => GenStmt::While {
                cond: self.meta(&stmt_while.cond)?,
                body: self.block(&stmt_while.body)?,
            },
            StmtKind::ForEach(each) => GenStmt::ForEach {
                slot: stmt.id,
                name: each.binding.clone(),
                iter: self.meta(&each.iter)?,
                body: self.block(&each.body)?,
            },
            StmtKind::Break => GenStmt::Break,
            StmtKind::Continue => GenStmt::Continue,
            StmtKind::Return(_) | StmtKind::Try(_) => {
                return Err(corrupt_input(format!(
                    "statement {} is classified compile-time but is always emitted",
                    stmt.id
                )))
            }
        };
        Ok(lowered)
    }

    fn residual_stmt(&self, stmt: &Stmt) -> Result<GenStmt> {
        match &stmt.kind {
            StmtKind::Expr(expr) if self.is_proceed(&expr.expr) => Ok(GenStmt::Proceed {
                mode: ProceedMode::Statement,
                trivia: stmt.trivia.clone(),
                span: stmt.span,
            }),
            StmtKind::Return(ret) if ret.value.as_ref().is_some_and(|value| self.is_proceed(value)) => {
                Ok(GenStmt::Proceed {
                    mode: ProceedMode::Return,
                    trivia: stmt.trivia.clone(),
                    span: stmt.span,
                })
            }
            _ => Ok(GenStmt::Emit {
                node: self.construct_stmt(stmt)?,
                trivia: stmt.trivia.clone(),
                span: stmt.span,
            }),
        }
    }

    fn is_proceed(&self, expr: &Expr) -> bool {
        let expr = expr.peel_parens();
        matches!(expr.kind, ExprKind::Call(_))
            && self.annotated.intrinsic(expr.id) == Some(&IntrinsicKind::Proceed)
    }

    /// Factory construction for an emitted statement; its trivia is carried
    /// by the enclosing [`GenStmt`].
    fn construct_stmt(&self, stmt: &Stmt) -> Result<Residual> {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Local(local) => self.construct(
                SyntaxKind::LocalDecl,
                span,
                vec![
                    ConstructArg::Name(local.name.clone()),
                    self.opt_node(local.init.as_ref())?,
                ],
            ),
            StmtKind::Expr(expr) => self.construct(
                SyntaxKind::ExprStmt,
                span,
                vec![self.node(&expr.expr)?],
            ),
            StmtKind::Block(block) => self.construct(
                SyntaxKind::BlockStmt,
                span,
                vec![ConstructArg::Node(Box::new(self.residual_block(block)?))],
            ),
            StmtKind::If(stmt_if) => {
                let elze = match stmt_if.elze.as_deref() {
                    Some(elze) => Some(Box::new(self.else_branch(elze)?)),
                    None => None,
                };
                self.construct(
                    SyntaxKind::If,
                    span,
                    vec![
                        self.node(&stmt_if.cond)?,
                        ConstructArg::Node(Box::new(self.residual_block(&stmt_if.then)?)),
                        ConstructArg::OptNode(elze),
                    ],
                )
            }
            StmtKind::While(stmt_while) => self.construct(
                SyntaxKind::While,
                span,
                vec![
                    self.node(&stmt_while.cond)?,
                    ConstructArg::Node(Box::new(self.residual_block(&stmt_while.body)?)),
                ],
            ),
            StmtKind::ForEach(each) => self.construct(
                SyntaxKind::ForEach,
                span,
                vec![
                    ConstructArg::Name(each.binding.clone()),
                    self.node(&each.iter)?,
                    ConstructArg::Node(Box::new(self.residual_block(&each.body)?)),
                ],
            ),
            StmtKind::Return(ret) => self.construct(
                SyntaxKind::Return,
                span,
                vec![self.opt_node(ret.value.as_ref())?],
            ),
            StmtKind::Break => self.construct(SyntaxKind::Break, span, Vec::new()),
            StmtKind::Continue => self.construct(SyntaxKind::Continue, span, Vec::new()),
            StmtKind::Try(stmt_try) => {
                let catches = stmt_try
                    .catches
                    .iter()
                    .map(|catch| self.catch_clause(catch))
                    .collect::<Result<Vec<_>>>()?;
                let finally = match &stmt_try.finally {
                    Some(finally) => Some(Box::new(self.residual_block(finally)?)),
                    None => None,
                };
                self.construct(
                    SyntaxKind::Try,
                    span,
                    vec![
                        ConstructArg::Node(Box::new(self.residual_block(&stmt_try.body)?)),
                        ConstructArg::List(catches),
                        ConstructArg::OptNode(finally),
                    ],
                )
            }
        }
    }

    /// The `else` of an emitted `if`. A compile-time `else if` selects the
    /// code of the else branch, so it is emitted inside a block.
    fn else_branch(&self, elze: &Stmt) -> Result<Residual> {
        match &elze.kind {
            StmtKind::Block(block) => self.construct(
                SyntaxKind::BlockStmt,
                elze.span,
                vec![ConstructArg::Node(Box::new(self.residual_block(block)?))],
            ),
            _ if self.annotated.stmt_stage(elze.id) == StmtStage::Residual
                && elze.trivia.is_empty() =>
            {
                self.construct_stmt(elze)
            }
            _ => {
                let block = Residual::Block {
                    id: elze.id,
                    span: elze.span,
                    stmts: vec![self.stmt(elze)?],
                };
                self.construct(
                    SyntaxKind::BlockStmt,
                    elze.span,
                    vec![ConstructArg::Node(Box::new(block))],
                )
            }
        }
    }

    fn catch_clause(&self, catch: &CatchClause) -> Result<Residual> {
        self.construct(
            SyntaxKind::CatchClause,
            catch.span,
            vec![
                ConstructArg::OptName(catch.exception_type.clone()),
                ConstructArg::OptName(catch.binding.clone()),
                self.opt_node(catch.filter.as_ref())?,
                ConstructArg::Node(Box::new(self.residual_block(&catch.body)?)),
            ],
        )
    }

    fn residual_block(&self, block: &Block) -> Result<Residual> {
        self.ensure_supported(SyntaxKind::Block, block.span)?;
        Ok(Residual::Block {
            id: block.id,
            span: block.span,
            stmts: self.block(block)?,
        })
    }

    fn construct(&self, kind: SyntaxKind, span: Span, args: Vec<ConstructArg>) -> Result<Residual> {
        self.ensure_supported(kind, span)?;
        Ok(Residual::Construct(Construct { kind, span, args }))
    }

    fn ensure_supported(&self, kind: SyntaxKind, span: Span) -> Result<()> {
        if self.factory.supports(kind) {
            Ok(())
        } else {
            Err(Error::factory_gap(kind, span, "no candidate constructor"))
        }
    }

    fn node(&self, expr: &Expr) -> Result<ConstructArg> {
        Ok(ConstructArg::Node(Box::new(self.residual(expr)?)))
    }

    fn opt_node(&self, expr: Option<&Expr>) -> Result<ConstructArg> {
        let node = match expr {
            Some(expr) => Some(Box::new(self.residual(expr)?)),
            None => None,
        };
        Ok(ConstructArg::OptNode(node))
    }

    /// Lowers an expression of emitted code.
    fn residual(&self, expr: &Expr) -> Result<Residual> {
        let span = expr.span;
        if let Some(annotation) = self.annotated.expr(expr.id) {
            if annotation.coerced {
                return Ok(Residual::Hole {
                    expr: self.meta(expr)?,
                    span,
                });
            }
        }
        match (&expr.kind, self.annotated.intrinsic(expr.id)) {
            (ExprKind::Call(call), Some(IntrinsicKind::RunTime)) => {
                return self.residual(self.only_arg(expr, call)?)
            }
            (ExprKind::Call(_), Some(IntrinsicKind::Proceed)) => {
                return Ok(Residual::Proceed { span })
            }
            (_, Some(IntrinsicKind::Extension(_))) | (_, None) => {}
            (_, Some(intrinsic)) => {
                return Err(corrupt_input(format!(
                    "intrinsic {:?} at node {} reached run-time code",
                    intrinsic, expr.id
                )))
            }
        }
        sp_core::ensure_input!(
            self.annotated.binding(expr.id) != BindingTime::MetaOnly,
            "compile-time expression at node {} is not spliced",
            expr.id
        );

        match &expr.kind {
            ExprKind::Literal(literal) => self.construct(
                SyntaxKind::Literal,
                span,
                vec![ConstructArg::Token(Token::Literal(literal.clone()))],
            ),
            ExprKind::Ident(ident) => self.construct(
                SyntaxKind::Ident,
                span,
                vec![ConstructArg::Name(ident.name.clone())],
            ),
            ExprKind::Member(member) => self.construct(
                SyntaxKind::Member,
                span,
                vec![
                    self.node(&member.base)?,
                    ConstructArg::Name(member.member.clone()),
                ],
            ),
            ExprKind::Call(call) => {
                let args = call
                    .args
                    .iter()
                    .map(|arg| self.residual(arg))
                    .collect::<Result<Vec<_>>>()?;
                self.construct(
                    SyntaxKind::Call,
                    span,
                    vec![self.node(&call.callee)?, ConstructArg::List(args)],
                )
            }
            ExprKind::Index(index) => self.construct(
                SyntaxKind::Index,
                span,
                vec![self.node(&index.base)?, self.node(&index.index)?],
            ),
            ExprKind::Binary(binary) => self.construct(
                SyntaxKind::Binary,
                span,
                vec![
                    ConstructArg::Token(Token::BinOp(binary.op)),
                    self.node(&binary.lhs)?,
                    self.node(&binary.rhs)?,
                ],
            ),
            ExprKind::Unary(unary) => self.construct(
                SyntaxKind::Unary,
                span,
                vec![
                    ConstructArg::Token(Token::UnOp(unary.op)),
                    self.node(&unary.operand)?,
                ],
            ),
            ExprKind::Assign(assign) => self.construct(
                SyntaxKind::Assign,
                span,
                vec![
                    ConstructArg::Token(Token::AssignOp(assign.op)),
                    self.node(&assign.target)?,
                    self.node(&assign.value)?,
                ],
            ),
            ExprKind::Conditional(cond) => self.construct(
                SyntaxKind::Conditional,
                span,
                vec![
                    self.node(&cond.cond)?,
                    self.node(&cond.then)?,
                    self.node(&cond.elze)?,
                ],
            ),
            ExprKind::Paren(paren) => {
                self.construct(SyntaxKind::Paren, span, vec![self.node(&paren.inner)?])
            }
            ExprKind::Array(array) => {
                let elements = array
                    .elements
                    .iter()
                    .map(|element| {
                        let kind = element.syntax_kind();
                        self.construct(kind, element.span, vec![self.node(&element.value)?])
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.construct(SyntaxKind::Array, span, vec![ConstructArg::List(elements)])
            }
            ExprKind::Interpolated(interp) => {
                let parts = interp
                    .parts
                    .iter()
                    .map(|part| {
                        let args = match &part.kind {
                            InterpolatedPartKind::Text(text) => {
                                vec![ConstructArg::Token(Token::Text(text.clone()))]
                            }
                            InterpolatedPartKind::Hole(hole) => vec![self.node(hole)?],
                        };
                        self.construct(part.syntax_kind(), part.span, args)
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.construct(SyntaxKind::Interpolated, span, vec![ConstructArg::List(parts)])
            }
        }
    }

    fn only_arg<'e>(&self, expr: &Expr, call: &'e ExprCall) -> Result<&'e Expr> {
        match call.args.as_slice() {
            [arg] => Ok(arg),
            args => Err(corrupt_input(format!(
                "intrinsic call at node {} has {} arguments",
                expr.id,
                args.len()
            ))),
        }
    }

    /// Static access path of a name, e.g. `Config.retries`.
    fn path(&self, expr: &Expr) -> Option<String> {
        match self.annotated.reference(expr.id)? {
            Reference::Declaration { path, .. } => Some(path.clone()),
            Reference::Local(_) => None,
            Reference::Unresolved => match &expr.kind {
                ExprKind::Ident(ident) => Some(ident.name.clone()),
                ExprKind::Member(member) if self.annotated.is_static(member.base.peel_parens().id) => {
                    let base = self.path(member.base.peel_parens())?;
                    Some(format!("{}.{}", base, member.member))
                }
                _ => None,
            },
        }
    }

    /// Lowers an expression evaluated by the generator.
    fn meta(&self, expr: &Expr) -> Result<MetaExpr> {
        let lowered = match &expr.kind {
            ExprKind::Literal(literal) => MetaExpr::Literal(literal.clone()),
            ExprKind::Ident(_) | ExprKind::Member(_) => self.meta_name(expr)?,
            ExprKind::Call(call) => self.meta_call(expr, call)?,
            ExprKind::Index(index) => MetaExpr::Index {
                base: Box::new(self.meta(&index.base)?),
                index: Box::new(self.meta(&index.index)?),
            },
            ExprKind::Binary(binary) => MetaExpr::Binary {
                op: binary.op,
                lhs: Box::new(self.meta(&binary.lhs)?),
                rhs: Box::new(self.meta(&binary.rhs)?),
            },
            ExprKind::Unary(unary) => MetaExpr::Unary {
                op: unary.op,
                operand: Box::new(self.meta(&unary.operand)?),
            },
            ExprKind::Assign(assign) => {
                let target = assign.target.peel_parens();
                let slot = match self.annotated.reference(target.id) {
                    Some(Reference::Local(slot)) if matches!(target.kind, ExprKind::Ident(_)) => *slot,
                    _ => {
                        return Err(corrupt_input(format!(
                            "compile-time assignment at node {} does not target a local",
                            expr.id
                        )))
                    }
                };
                MetaExpr::Assign {
                    slot,
                    op: assign.op,
                    value: Box::new(self.meta(&assign.value)?),
                }
            }
            ExprKind::Conditional(cond) => MetaExpr::Conditional {
                cond: Box::new(self.meta(&cond.cond)?),
                then: Box::new(self.meta(&cond.then)?),
                elze: Box::new(self.meta(&cond.elze)?),
            },
            ExprKind::Paren(paren) => self.meta(&paren.inner)?,
            ExprKind::Array(array) => MetaExpr::Array(
                array
                    .elements
                    .iter()
                    .map(|element| Ok((element.spread, self.meta(&element.value)?)))
                    .collect::<Result<Vec<_>>>()?,
            ),
            ExprKind::Interpolated(interp) => MetaExpr::Interpolated(
                interp
                    .parts
                    .iter()
                    .map(|part| match &part.kind {
                        InterpolatedPartKind::Text(text) => Ok(MetaPart::Text(text.clone())),
                        InterpolatedPartKind::Hole(hole) => Ok(MetaPart::Hole(self.meta(hole)?)),
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
        };
        Ok(lowered)
    }

    fn meta_name(&self, expr: &Expr) -> Result<MetaExpr> {
        match self.annotated.intrinsic(expr.id) {
            Some(kind @ (IntrinsicKind::Target | IntrinsicKind::Tags)) => {
                return Ok(MetaExpr::Intrinsic(kind.clone()))
            }
            Some(IntrinsicKind::Extension(symbol)) => return Ok(MetaExpr::Global(symbol.clone())),
            Some(other) => {
                return Err(corrupt_input(format!(
                    "intrinsic {:?} at node {} is not a value",
                    other, expr.id
                )))
            }
            None => {}
        }
        if let Some(Reference::Local(slot)) = self.annotated.reference(expr.id) {
            return Ok(MetaExpr::Local(*slot));
        }
        match &expr.kind {
            ExprKind::Member(member) if !self.annotated.is_static(member.base.peel_parens().id) => {
                Ok(MetaExpr::Member {
                    base: Box::new(self.meta(&member.base)?),
                    member: member.member.clone(),
                })
            }
            _ => self.path(expr).map(MetaExpr::Global).ok_or_else(|| {
                corrupt_input(format!("name at node {} has no compile-time meaning", expr.id))
            }),
        }
    }

    fn meta_call(&self, expr: &Expr, call: &ExprCall) -> Result<MetaExpr> {
        let args = || {
            call.args
                .iter()
                .map(|arg| self.meta(arg))
                .collect::<Result<Vec<_>>>()
        };
        match self.annotated.intrinsic(expr.id) {
            Some(IntrinsicKind::CompileTime) => return self.meta(self.only_arg(expr, call)?),
            Some(IntrinsicKind::Extension(symbol)) => {
                return Ok(MetaExpr::Call {
                    function: symbol.clone(),
                    args: args()?,
                })
            }
            Some(other) => {
                return Err(corrupt_input(format!(
                    "intrinsic {:?} at node {} cannot be evaluated at compile time",
                    other, expr.id
                )))
            }
            None => {}
        }
        let callee = call.callee.peel_parens();
        match &callee.kind {
            ExprKind::Member(member) if !self.annotated.is_static(member.base.peel_parens().id) => {
                Ok(MetaExpr::MethodCall {
                    receiver: Box::new(self.meta(&member.base)?),
                    method: member.member.clone(),
                    args: args()?,
                })
            }
            ExprKind::Ident(_) | ExprKind::Member(_) => {
                let function = self.path(callee).ok_or_else(|| {
                    corrupt_input(format!("callee at node {} is not a function", callee.id))
                })?;
                Ok(MetaExpr::Call {
                    function,
                    args: args()?,
                })
            }
            _ => Err(corrupt_input(format!(
                "unsupported compile-time callee at node {}",
                callee.id
            ))),
        }
    }
}
