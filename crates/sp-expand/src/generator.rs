//! Generator program produced by the rewriter.
//!
//! A generator is ordinary compile-time code ([`GenStmt`], [`MetaExpr`])
//! around descriptions of run-time code ([`Residual`]). Residual code is
//! data: running the generator constructs it through the factory adapter,
//! evaluating every embedded [`MetaExpr`] hole and lifting its value.

use std::fmt::{self, Formatter};

use itertools::Itertools;
use sp_core::ast::print::print_literal;
use sp_core::ast::{
    BinOpKind, LocalId, NodeId, SyntaxKind, TemplateKind, Trivia, UnOpKind,
};
use sp_core::intrinsics::IntrinsicKind;
use sp_core::pretty::{escape_string, PrettyCtx, PrettyPrintable};
use sp_core::span::Span;

use crate::factory::Token;

/// Compile-time expression evaluated by the generator.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaExpr {
    Literal(sp_core::ast::Literal),
    Local(LocalId),
    /// `meta.target` or `meta.tags`.
    Intrinsic(IntrinsicKind),
    /// Meta-only field or property provided by the weave site.
    Global(String),
    Member {
        base: Box<MetaExpr>,
        member: String,
    },
    Index {
        base: Box<MetaExpr>,
        index: Box<MetaExpr>,
    },
    /// Compile-time function provided by the weave site.
    Call {
        function: String,
        args: Vec<MetaExpr>,
    },
    /// Built-in method of a compile-time value, e.g. `name.starts_with("get")`.
    MethodCall {
        receiver: Box<MetaExpr>,
        method: String,
        args: Vec<MetaExpr>,
    },
    Binary {
        op: BinOpKind,
        lhs: Box<MetaExpr>,
        rhs: Box<MetaExpr>,
    },
    Unary {
        op: UnOpKind,
        operand: Box<MetaExpr>,
    },
    Conditional {
        cond: Box<MetaExpr>,
        then: Box<MetaExpr>,
        elze: Box<MetaExpr>,
    },
    Assign {
        slot: LocalId,
        op: Option<BinOpKind>,
        value: Box<MetaExpr>,
    },
    Array(Vec<(bool, MetaExpr)>),
    Interpolated(Vec<MetaPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetaPart {
    Text(String),
    Hole(MetaExpr),
}

/// Description of a run-time node.
#[derive(Debug, Clone, PartialEq)]
pub enum Residual {
    Construct(Construct),
    /// Compile-time value spliced as a literal.
    Hole { expr: MetaExpr, span: Span },
    /// `meta.proceed()` in expression position.
    Proceed { span: Span },
    /// Block whose statements are produced by running generator code.
    Block {
        id: NodeId,
        span: Span,
        stmts: Vec<GenStmt>,
    },
}

/// Factory call for one node kind, arguments in the kind's natural order.
#[derive(Debug, Clone, PartialEq)]
pub struct Construct {
    pub kind: SyntaxKind,
    pub span: Span,
    pub args: Vec<ConstructArg>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstructArg {
    Node(Box<Residual>),
    OptNode(Option<Box<Residual>>),
    List(Vec<Residual>),
    Token(Token),
    Name(String),
    OptName(Option<String>),
}

/// Placement of a `meta.proceed()` splice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProceedMode {
    /// `return meta.proceed();`: the next layer's statements, verbatim.
    Return,
    /// `meta.proceed();`: the next layer's body as a nested block.
    Statement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenStmt {
    Let {
        slot: LocalId,
        name: String,
        init: Option<MetaExpr>,
    },
    Eval(MetaExpr),
    If {
        cond: MetaExpr,
        then: Vec<GenStmt>,
        elze: Vec<GenStmt>,
    },
    While {
        cond: MetaExpr,
        body: Vec<GenStmt>,
    },
    ForEach {
        slot: LocalId,
        name: String,
        iter: MetaExpr,
        body: Vec<GenStmt>,
    },
    Break,
    Continue,
    Scope(Vec<GenStmt>),
    /// Construct a run-time statement and append it to the output.
    Emit {
        node: Residual,
        trivia: Trivia,
        span: Span,
    },
    /// `meta.insert_comment(text)`: attach a comment to the next emitted
    /// statement.
    Comment(MetaExpr),
    Proceed {
        mode: ProceedMode,
        trivia: Trivia,
        span: Span,
    },
}

/// Compile-time template parameter, seeded from the weave site's arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct GenParam {
    pub slot: LocalId,
    pub name: String,
}

/// The compiled form of a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    pub template: String,
    pub kind: TemplateKind,
    pub params: Vec<GenParam>,
    pub body: Vec<GenStmt>,
    pub max_meta_iterations: usize,
}

impl Generator {
    /// Number of statements that construct run-time code, nested ones
    /// included.
    pub fn emit_count(&self) -> usize {
        fn count(stmts: &[GenStmt]) -> usize {
            stmts
                .iter()
                .map(|stmt| match stmt {
                    GenStmt::Emit { node, .. } => 1 + count_residual(node),
                    GenStmt::Proceed { .. } => 1,
                    GenStmt::If { then, elze, .. } => count(then) + count(elze),
                    GenStmt::While { body, .. }
                    | GenStmt::ForEach { body, .. }
                    | GenStmt::Scope(body) => count(body),
                    _ => 0,
                })
                .sum()
        }
        fn count_residual(node: &Residual) -> usize {
            match node {
                Residual::Block { stmts, .. } => count(stmts),
                Residual::Construct(construct) => construct
                    .args
                    .iter()
                    .map(|arg| match arg {
                        ConstructArg::Node(node) => count_residual(node),
                        ConstructArg::OptNode(Some(node)) => count_residual(node),
                        ConstructArg::List(nodes) => nodes.iter().map(count_residual).sum(),
                        _ => 0,
                    })
                    .sum(),
                _ => 0,
            }
        }
        count(&self.body)
    }
}

impl fmt::Display for MetaExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MetaExpr::Literal(literal) => f.write_str(&print_literal(literal)),
            MetaExpr::Local(slot) => write!(f, "%{}", slot),
            MetaExpr::Intrinsic(kind) => write!(f, "@{:?}", kind),
            MetaExpr::Global(path) => write!(f, "@{}", path),
            MetaExpr::Member { base, member } => write!(f, "{}.{}", base, member),
            MetaExpr::Index { base, index } => write!(f, "{}[{}]", base, index),
            MetaExpr::Call { function, args } => {
                write!(f, "@{}({})", function, args.iter().join(", "))
            }
            MetaExpr::MethodCall {
                receiver,
                method,
                args,
            } => write!(f, "{}.{}({})", receiver, method, args.iter().join(", ")),
            MetaExpr::Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            MetaExpr::Unary { op, operand } => write!(f, "{}{}", op, operand),
            MetaExpr::Conditional { cond, then, elze } => {
                write!(f, "({} ? {} : {})", cond, then, elze)
            }
            MetaExpr::Assign { slot, op, value } => {
                let op = op.map(|op| op.symbol()).unwrap_or("");
                write!(f, "%{} {}= {}", slot, op, value)
            }
            MetaExpr::Array(elements) => write!(
                f,
                "[{}]",
                elements
                    .iter()
                    .map(|(spread, value)| if *spread {
                        format!("...{}", value)
                    } else {
                        value.to_string()
                    })
                    .join(", ")
            ),
            MetaExpr::Interpolated(parts) => {
                f.write_str("$\"")?;
                for part in parts {
                    match part {
                        MetaPart::Text(text) => f.write_str(&escape_string(text))?,
                        MetaPart::Hole(hole) => write!(f, "{{{}}}", hole)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

impl fmt::Display for Residual {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Residual::Construct(construct) => {
                write!(f, "{}(", construct.kind)?;
                for (index, arg) in construct.args.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    match arg {
                        ConstructArg::Node(node) => write!(f, "{}", node)?,
                        ConstructArg::OptNode(Some(node)) => write!(f, "{}", node)?,
                        ConstructArg::OptNode(None) | ConstructArg::OptName(None) => {
                            f.write_str("_")?
                        }
                        ConstructArg::List(nodes) => write!(f, "[{}]", nodes.iter().join(", "))?,
                        ConstructArg::Token(token) => write!(f, "{}", token)?,
                        ConstructArg::Name(name) | ConstructArg::OptName(Some(name)) => {
                            write!(f, "{:?}", name)?
                        }
                    }
                }
                f.write_str(")")
            }
            Residual::Hole { expr, .. } => write!(f, "lift({})", expr),
            Residual::Proceed { .. } => f.write_str("proceed()"),
            Residual::Block { stmts, .. } => write!(f, "Block(<{} generator statements>)", stmts.len()),
        }
    }
}

fn fmt_stmts(stmts: &[GenStmt], f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
    stmts.iter().try_for_each(|stmt| stmt.fmt_pretty(f, ctx))
}

impl PrettyPrintable for GenStmt {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        match self {
            GenStmt::Let { slot, name, init } => match init {
                Some(init) => ctx.writeln(f, format!("let %{} ({}) = {}", slot, name, init)),
                None => ctx.writeln(f, format!("let %{} ({})", slot, name)),
            },
            GenStmt::Eval(expr) => ctx.writeln(f, format!("eval {}", expr)),
            GenStmt::If { cond, then, elze } if elze.is_empty() => {
                ctx.block(f, format!("if {}", cond), |ctx, f| fmt_stmts(then, f, ctx))
            }
            GenStmt::If { cond, then, elze } => {
                ctx.writeln(f, format!("if {} {{", cond))?;
                ctx.with_indent(|ctx| fmt_stmts(then, f, ctx))?;
                ctx.block(f, "} else", |ctx, f| fmt_stmts(elze, f, ctx))
            }
            GenStmt::While { cond, body } => {
                ctx.block(f, format!("while {}", cond), |ctx, f| fmt_stmts(body, f, ctx))
            }
            GenStmt::ForEach {
                slot,
                name,
                iter,
                body,
            } => ctx.block(
                f,
                format!("foreach %{} ({}) in {}", slot, name, iter),
                |ctx, f| fmt_stmts(body, f, ctx),
            ),
            GenStmt::Break => ctx.writeln(f, "break"),
            GenStmt::Continue => ctx.writeln(f, "continue"),
            GenStmt::Scope(body) => ctx.block(f, "scope", |ctx, f| fmt_stmts(body, f, ctx)),
            GenStmt::Emit { node, span, .. } => {
                if ctx.options.show_spans {
                    ctx.writeln(f, format!("emit {} @ {}", node, span))?;
                } else {
                    ctx.writeln(f, format!("emit {}", node))?;
                }
                let Residual::Construct(construct) = node else {
                    return Ok(());
                };
                for arg in &construct.args {
                    if let ConstructArg::Node(block) | ConstructArg::OptNode(Some(block)) = arg {
                        if let Residual::Block { stmts, .. } = block.as_ref() {
                            ctx.with_indent(|ctx| fmt_stmts(stmts, f, ctx))?;
                        }
                    }
                }
                Ok(())
            }
            GenStmt::Comment(text) => ctx.writeln(f, format!("comment {}", text)),
            GenStmt::Proceed { mode, .. } => ctx.writeln(f, format!("proceed {:?}", mode)),
        }
    }
}

impl PrettyPrintable for Generator {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(|param| format!("%{} ({})", param.slot, param.name))
            .join(", ");
        ctx.block(
            f,
            format!("generator {} {}({})", self.kind.as_str(), self.template, params),
            |ctx, f| fmt_stmts(&self.body, f, ctx),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_core::ast::Literal;
    use sp_core::pretty::{pretty, PrettyOptions};

    #[test]
    fn dump_nests_meta_control_flow() {
        let generator = Generator {
            template: "count".to_string(),
            kind: TemplateKind::Method,
            params: vec![GenParam {
                slot: 1,
                name: "limit".to_string(),
            }],
            body: vec![
                GenStmt::Let {
                    slot: 2,
                    name: "n".to_string(),
                    init: Some(MetaExpr::Literal(Literal::Int(0))),
                },
                GenStmt::If {
                    cond: MetaExpr::Local(1),
                    then: vec![GenStmt::Break],
                    elze: vec![GenStmt::Continue],
                },
            ],
            max_meta_iterations: 10,
        };
        let options = PrettyOptions {
            indent_size: 2,
            show_spans: false,
        };
        assert_eq!(
            pretty(&generator, options).to_string(),
            "generator method count(%1 (limit)) {\n  let %2 (n) = 0\n  if %1 {\n    break\n  } else {\n    continue\n  }\n}\n"
        );
        assert_eq!(generator.emit_count(), 0);
    }
}
