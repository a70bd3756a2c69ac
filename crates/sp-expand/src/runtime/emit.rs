use sp_core::ast::{Block, Expr, Stmt, StmtExpr, StmtKind, StmtReturn, SyntaxKind, Trivia};
use sp_core::span::Span;
use sp_core::Result;

use crate::context::ProceedBody;
use crate::error::expansion_error_with_span;
use crate::{expand_bail, expand_ensure};
use crate::factory::{ResidualArg, ResidualNode};
use crate::generator::{ConstructArg, GenStmt, ProceedMode, Residual};
use crate::runtime::{Flow, Machine};
use crate::value::Value;

impl<'g, 'c> Machine<'g, 'c> {
    pub(super) fn exec_block(&mut self, stmts: &[GenStmt]) -> Result<Flow> {
        for stmt in stmts {
            let flow = self.exec(stmt)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &GenStmt) -> Result<Flow> {
        match stmt {
            GenStmt::Let { slot, init, .. } => {
                let value = match init {
                    Some(init) => self.eval(init)?,
                    None => Value::Null,
                };
                self.locals.insert(*slot, value);
            }
            GenStmt::Eval(expr) => {
                self.eval(expr)?;
            }
            GenStmt::Comment(text) => {
                let text = self.eval(text)?;
                self.pending.extend(text.to_string().lines().map(str::to_string));
            }
            GenStmt::If { cond, then, elze } => {
                return if self.condition(cond)? {
                    self.exec_block(then)
                } else {
                    self.exec_block(elze)
                };
            }
            GenStmt::While { cond, body } => {
                let mut iterations = 0usize;
                while self.condition(cond)? {
                    self.count_iteration(&mut iterations)?;
                    if self.exec_block(body)? == Flow::Break {
                        break;
                    }
                }
            }
            GenStmt::ForEach {
                slot,
                name,
                iter,
                body,
            } => {
                let items = match self.eval(iter)? {
                    Value::List(items) => items,
                    Value::Map(entries) => entries.into_keys().map(Value::Str).collect(),
                    other => expand_bail!(format!(
                        "cannot iterate `{}` over a {}",
                        name,
                        other.type_name()
                    )),
                };
                let mut iterations = 0usize;
                for item in items {
                    self.count_iteration(&mut iterations)?;
                    self.locals.insert(*slot, item);
                    if self.exec_block(body)? == Flow::Break {
                        break;
                    }
                }
            }
            GenStmt::Break => return Ok(Flow::Break),
            GenStmt::Continue => return Ok(Flow::Continue),
            GenStmt::Scope(body) => return self.exec_block(body),
            GenStmt::Emit { node, trivia, span } => {
                let stmt = match self.build(node)? {
                    ResidualNode::Stmt(stmt) => stmt,
                    other => {
                        return Err(expansion_error_with_span(
                            format!("expected a statement, constructed {}", other.class()),
                            *span,
                        ))
                    }
                };
                self.push(stmt, trivia);
                if let Some(flow) = self.escaped.take() {
                    return Ok(flow);
                }
            }
            GenStmt::Proceed { mode, trivia, span } => self.proceed(*mode, trivia, *span)?,
        }
        Ok(Flow::Normal)
    }

    fn count_iteration(&self, iterations: &mut usize) -> Result<()> {
        *iterations += 1;
        expand_ensure!(
            *iterations <= self.generator.max_meta_iterations,
            format!(
                "compile-time loop exceeded {} iterations",
                self.generator.max_meta_iterations
            )
        );
        Ok(())
    }

    /// Appends a statement to the innermost buffer, attaching pending
    /// comments before its own.
    fn push(&mut self, mut stmt: Stmt, trivia: &Trivia) {
        let mut comments: Vec<String> = self.pending.drain(..).collect();
        comments.extend(trivia.comments.iter().cloned());
        comments.extend(stmt.trivia.comments.drain(..));
        stmt.trivia.comments = comments;
        match self.output.last_mut() {
            Some(buffer) => buffer.push(stmt),
            None => self.output.push(vec![stmt]),
        }
    }

    fn proceed_body(&self, span: Span) -> Result<&'c ProceedBody> {
        let site = self.site;
        site.proceed.as_ref().ok_or_else(|| {
            expansion_error_with_span(
                format!(
                    "`meta.proceed()` used but `{}` has no body to proceed to",
                    site.target.name
                ),
                span,
            )
        })
    }

    fn proceed(&mut self, mode: ProceedMode, trivia: &Trivia, span: Span) -> Result<()> {
        let body = self.proceed_body(span)?;
        match (mode, body) {
            (ProceedMode::Return, ProceedBody::Block(block)) => {
                let mut stmts = block.stmts.iter().cloned();
                match stmts.next() {
                    Some(first) => {
                        self.push(first, trivia);
                        for stmt in stmts {
                            self.push(stmt, &Trivia::default());
                        }
                    }
                    None => {
                        self.pending.extend(trivia.comments.iter().cloned());
                    }
                }
            }
            (ProceedMode::Return, ProceedBody::Expr(expr)) => {
                let stmt = Stmt::new(
                    self.ids.next(),
                    span,
                    StmtKind::Return(StmtReturn {
                        value: Some(expr.clone()),
                    }),
                );
                self.push(stmt, trivia);
            }
            (ProceedMode::Statement, ProceedBody::Block(block)) => {
                let stmt = Stmt::new(self.ids.next(), span, StmtKind::Block(block.clone()));
                self.push(stmt, trivia);
            }
            (ProceedMode::Statement, ProceedBody::Expr(expr)) => {
                let stmt = Stmt::new(
                    self.ids.next(),
                    span,
                    StmtKind::Expr(StmtExpr { expr: expr.clone() }),
                );
                self.push(stmt, trivia);
            }
        }
        Ok(())
    }

    /// The next layer as an expression: an expression body, or a block
    /// consisting of a single `return <expr>;`.
    fn proceed_expr(&self, span: Span) -> Result<Expr> {
        match self.proceed_body(span)? {
            ProceedBody::Expr(expr) => Ok(expr.clone()),
            ProceedBody::Block(Block { stmts, .. }) => match stmts.as_slice() {
                [Stmt {
                    kind:
                        StmtKind::Return(StmtReturn {
                            value: Some(value),
                        }),
                    ..
                }] => Ok(value.clone()),
                _ => Err(expansion_error_with_span(
                    "`meta.proceed()` in an expression needs a body that returns a single expression",
                    span,
                )),
            },
        }
    }

    pub(super) fn build(&mut self, residual: &Residual) -> Result<ResidualNode> {
        match residual {
            Residual::Construct(construct) => {
                let mut args = Vec::with_capacity(construct.args.len());
                for arg in &construct.args {
                    args.push(self.build_arg(arg)?);
                }
                self.factory
                    .construct(construct.kind, construct.span, args, &mut self.ids)
            }
            Residual::Hole { expr, span } => {
                let value = self.eval(expr)?;
                let lifted = value.lift(&mut self.ids, *span).ok_or_else(|| {
                    expansion_error_with_span(
                        format!(
                            "a compile-time {} cannot be embedded in generated code",
                            value.type_name()
                        ),
                        *span,
                    )
                })?;
                Ok(ResidualNode::Expr(lifted))
            }
            Residual::Proceed { span } => self.proceed_expr(*span).map(ResidualNode::Expr),
            Residual::Block { span, stmts, .. } => {
                self.output.push(Vec::new());
                let flow = self.exec_block(stmts);
                let built = self.output.pop().unwrap_or_default();
                match flow? {
                    Flow::Normal => {}
                    flow => self.escaped = Some(flow),
                }
                let built = built.into_iter().map(ResidualNode::Stmt).collect();
                self.factory.construct(
                    SyntaxKind::Block,
                    *span,
                    vec![ResidualArg::List(built)],
                    &mut self.ids,
                )
            }
        }
    }

    fn build_arg(&mut self, arg: &ConstructArg) -> Result<ResidualArg> {
        let arg = match arg {
            ConstructArg::Node(node) => ResidualArg::Node(self.build(node)?),
            ConstructArg::OptNode(node) => ResidualArg::OptNode(match node {
                Some(node) => Some(self.build(node)?),
                None => None,
            }),
            ConstructArg::List(nodes) => {
                let mut built = Vec::with_capacity(nodes.len());
                for node in nodes {
                    built.push(self.build(node)?);
                }
                ResidualArg::List(built)
            }
            ConstructArg::Token(token) => ResidualArg::Token(token.clone()),
            ConstructArg::Name(name) => ResidualArg::Name(name.clone()),
            ConstructArg::OptName(name) => ResidualArg::OptName(name.clone()),
        };
        Ok(arg)
    }
}
