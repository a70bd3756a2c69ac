//! Source printer for residual code.

use crate::ast::{
    ArrayElement, Block, CatchClause, Expr, ExprKind, InterpolatedPartKind, Literal,
    Stmt, StmtKind, UnOpKind,
};
use crate::pretty::{escape_string, PrettyOptions};

common_enum! {
    #[derive(Copy, Eq, Hash, Default)]
    pub enum LineBreak {
        #[default]
        Lf,
        CrLf,
    }
}

impl LineBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineBreak::Lf => "\n",
            LineBreak::CrLf => "\r\n",
        }
    }
}

common_struct! {
    /// Layout of the code surrounding a weave site.
    #[derive(Eq)]
    pub struct Formatting {
        /// Columns of indentation applied to every emitted line
        #[serde(default)]
        pub base_indent: usize,
        #[serde(default = "default_indent_size")]
        pub indent_size: usize,
        #[serde(default)]
        pub line_break: LineBreak,
    }
}

fn default_indent_size() -> usize {
    PrettyOptions::default().indent_size
}

impl Default for Formatting {
    fn default() -> Self {
        Self {
            base_indent: 0,
            indent_size: default_indent_size(),
            line_break: LineBreak::Lf,
        }
    }
}

impl Formatting {
    pub fn from_options(options: &PrettyOptions) -> Self {
        Self {
            indent_size: options.indent_size,
            ..Self::default()
        }
    }
}

struct SourceWriter<'a> {
    formatting: &'a Formatting,
    lines: Vec<String>,
}

impl<'a> SourceWriter<'a> {
    fn line(&mut self, level: usize, text: impl AsRef<str>) {
        let width = self.formatting.base_indent + level * self.formatting.indent_size;
        self.lines
            .push(format!("{:width$}{}", "", text.as_ref(), width = width));
    }

    /// Appends to the last line, used for `} else {` style joins.
    fn append(&mut self, text: &str) {
        match self.lines.last_mut() {
            Some(last) => last.push_str(text),
            None => self.lines.push(text.to_string()),
        }
    }

    fn finish(self) -> String {
        self.lines.join(self.formatting.line_break.as_str())
    }

    fn stmt(&mut self, stmt: &Stmt, level: usize) {
        for comment in &stmt.trivia.comments {
            if comment.is_empty() {
                self.line(level, "//");
            } else {
                self.line(level, format!("// {}", comment));
            }
        }
        match &stmt.kind {
            StmtKind::Local(local) => match &local.init {
                Some(init) => self.line(level, format!("var {} = {};", local.name, expr(init))),
                None => self.line(level, format!("var {};", local.name)),
            },
            StmtKind::Expr(stmt) => self.line(level, format!("{};", expr(&stmt.expr))),
            StmtKind::Block(block) => {
                self.line(level, "");
                self.block_tail(block, level);
            }
            StmtKind::If(stmt_if) => {
                self.line(level, format!("if ({}) ", expr(&stmt_if.cond)));
                self.block_tail(&stmt_if.then, level);
                let mut elze = stmt_if.elze.as_deref();
                while let Some(next) = elze {
                    match &next.kind {
                        StmtKind::If(nested) if next.trivia.is_empty() => {
                            self.append(&format!(" else if ({}) ", expr(&nested.cond)));
                            self.block_tail(&nested.then, level);
                            elze = nested.elze.as_deref();
                        }
                        StmtKind::Block(block) if next.trivia.is_empty() => {
                            self.append(" else ");
                            self.block_tail(block, level);
                            elze = None;
                        }
                        _ => {
                            self.append(" else {");
                            self.stmt(next, level + 1);
                            self.line(level, "}");
                            elze = None;
                        }
                    }
                }
            }
            StmtKind::While(stmt_while) => {
                self.line(level, format!("while ({}) ", expr(&stmt_while.cond)));
                self.block_tail(&stmt_while.body, level);
            }
            StmtKind::ForEach(each) => {
                self.line(
                    level,
                    format!("foreach ({} in {}) ", each.binding, expr(&each.iter)),
                );
                self.block_tail(&each.body, level);
            }
            StmtKind::Return(ret) => match &ret.value {
                Some(value) => self.line(level, format!("return {};", expr(value))),
                None => self.line(level, "return;"),
            },
            StmtKind::Break => self.line(level, "break;"),
            StmtKind::Continue => self.line(level, "continue;"),
            StmtKind::Try(stmt_try) => {
                self.line(level, "try ");
                self.block_tail(&stmt_try.body, level);
                for catch in &stmt_try.catches {
                    self.append(&format!(" {}", catch_header(catch)));
                    self.block_tail(&catch.body, level);
                }
                if let Some(finally) = &stmt_try.finally {
                    self.append(" finally ");
                    self.block_tail(finally, level);
                }
            }
        }
    }

    /// Prints `{ ... }` starting on the current last line.
    fn block_tail(&mut self, block: &Block, level: usize) {
        if block.stmts.is_empty() {
            self.append("{}");
            return;
        }
        self.append("{");
        for stmt in &block.stmts {
            self.stmt(stmt, level + 1);
        }
        self.line(level, "}");
    }
}

fn catch_header(catch: &CatchClause) -> String {
    let mut header = String::from("catch ");
    match (&catch.exception_type, &catch.binding) {
        (Some(ty), Some(binding)) => header.push_str(&format!("({} {}) ", ty, binding)),
        (Some(ty), None) => header.push_str(&format!("({}) ", ty)),
        (None, Some(binding)) => header.push_str(&format!("({}) ", binding)),
        (None, None) => {}
    }
    if let Some(filter) = &catch.filter {
        header.push_str(&format!("when ({}) ", expr(filter)));
    }
    header
}

pub fn print_stmts(stmts: &[Stmt], formatting: &Formatting) -> String {
    let mut writer = SourceWriter {
        formatting,
        lines: Vec::new(),
    };
    for stmt in stmts {
        writer.stmt(stmt, 0);
    }
    writer.finish()
}

pub fn print_stmt(stmt: &Stmt, formatting: &Formatting) -> String {
    print_stmts(std::slice::from_ref(stmt), formatting)
}

pub fn print_block(block: &Block, formatting: &Formatting) -> String {
    let mut writer = SourceWriter {
        formatting,
        lines: vec![format!("{:width$}", "", width = formatting.base_indent)],
    };
    writer.block_tail(block, 0);
    writer.finish()
}

pub fn print_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "null".to_string(),
        Literal::Bool(value) => value.to_string(),
        Literal::Int(value) => value.to_string(),
        Literal::Str(value) => format!("\"{}\"", escape_string(value)),
    }
}

/// Renders an expression on a single line.
pub fn expr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(literal) => print_literal(literal),
        ExprKind::Ident(ident) => ident.name.clone(),
        ExprKind::Member(member) => format!("{}.{}", postfix_operand(&member.base), member.member),
        ExprKind::Call(call) => format!(
            "{}({})",
            postfix_operand(&call.callee),
            call.args.iter().map(self::expr).collect::<Vec<_>>().join(", ")
        ),
        ExprKind::Index(index) => format!(
            "{}[{}]",
            postfix_operand(&index.base),
            self::expr(&index.index)
        ),
        ExprKind::Binary(binary) => {
            let prec = binary.op.precedence();
            let lhs = binary_operand(&binary.lhs, prec, false);
            let rhs = binary_operand(&binary.rhs, prec, true);
            format!("{} {} {}", lhs, binary.op, rhs)
        }
        ExprKind::Unary(unary) => {
            let operand = self::expr(&unary.operand);
            let needs_parens = match &unary.operand.kind {
                ExprKind::Binary(_) | ExprKind::Assign(_) | ExprKind::Conditional(_) => true,
                ExprKind::Unary(inner) => unary.op == UnOpKind::Neg && inner.op == UnOpKind::Neg,
                ExprKind::Literal(Literal::Int(value)) => unary.op == UnOpKind::Neg && *value < 0,
                _ => false,
            };
            if needs_parens {
                format!("{}({})", unary.op, operand)
            } else {
                format!("{}{}", unary.op, operand)
            }
        }
        ExprKind::Assign(assign) => {
            let op = assign.op.map(|op| op.symbol()).unwrap_or("");
            format!(
                "{} {}= {}",
                self::expr(&assign.target),
                op,
                self::expr(&assign.value)
            )
        }
        ExprKind::Conditional(cond) => {
            let head = match &cond.cond.kind {
                ExprKind::Conditional(_) | ExprKind::Assign(_) => {
                    format!("({})", self::expr(&cond.cond))
                }
                _ => self::expr(&cond.cond),
            };
            format!(
                "{} ? {} : {}",
                head,
                self::expr(&cond.then),
                self::expr(&cond.elze)
            )
        }
        ExprKind::Paren(paren) => format!("({})", self::expr(&paren.inner)),
        ExprKind::Array(array) => format!(
            "[{}]",
            array
                .elements
                .iter()
                .map(array_element)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        ExprKind::Interpolated(interp) => {
            let mut out = String::from("$\"");
            for part in &interp.parts {
                match &part.kind {
                    InterpolatedPartKind::Text(text) => {
                        out.push_str(&escape_string(text).replace('{', "{{").replace('}', "}}"))
                    }
                    InterpolatedPartKind::Hole(hole) => {
                        out.push('{');
                        out.push_str(&self::expr(hole));
                        out.push('}');
                    }
                }
            }
            out.push('"');
            out
        }
    }
}

fn array_element(element: &ArrayElement) -> String {
    if element.spread {
        format!("...{}", expr(&element.value))
    } else {
        expr(&element.value)
    }
}

fn postfix_operand(base: &Expr) -> String {
    match &base.kind {
        ExprKind::Binary(_)
        | ExprKind::Unary(_)
        | ExprKind::Assign(_)
        | ExprKind::Conditional(_) => format!("({})", expr(base)),
        ExprKind::Literal(Literal::Int(value)) if *value < 0 => format!("({})", value),
        _ => expr(base),
    }
}

fn binary_operand(operand: &Expr, parent: u8, right: bool) -> String {
    match &operand.kind {
        ExprKind::Binary(inner) => {
            let prec = inner.op.precedence();
            if prec < parent || (right && prec == parent) {
                format!("({})", expr(operand))
            } else {
                expr(operand)
            }
        }
        ExprKind::Assign(_) | ExprKind::Conditional(_) => format!("({})", expr(operand)),
        _ => expr(operand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOpKind, ExprBinary, ExprUnary, StmtIf, StmtReturn};
    use crate::span::Span;
    use pretty_assertions::assert_eq;

    fn int(value: i64) -> Expr {
        Expr::literal(0, Literal::Int(value))
    }

    fn binary(op: BinOpKind, lhs: Expr, rhs: Expr) -> Expr {
        Expr::new(
            0,
            Span::null(),
            ExprKind::Binary(ExprBinary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }),
        )
    }

    #[test]
    fn binary_parenthesizes_by_precedence() {
        let sum = binary(BinOpKind::Add, int(1), int(2));
        let product = binary(BinOpKind::Mul, sum.clone(), int(3));
        assert_eq!(expr(&product), "(1 + 2) * 3");
        let right = binary(BinOpKind::Sub, int(1), binary(BinOpKind::Sub, int(2), int(3)));
        assert_eq!(expr(&right), "1 - (2 - 3)");
    }

    #[test]
    fn negation_of_negative_keeps_parens() {
        let negated = Expr::new(
            0,
            Span::null(),
            ExprKind::Unary(ExprUnary {
                op: UnOpKind::Neg,
                operand: Box::new(int(-1)),
            }),
        );
        assert_eq!(expr(&negated), "-(-1)");
    }

    #[test]
    fn statements_honor_formatting() {
        let ret = Stmt::new(
            1,
            Span::null(),
            StmtKind::Return(StmtReturn {
                value: Some(Expr::ident(2, "a")),
            }),
        );
        let stmt = Stmt::new(
            3,
            Span::null(),
            StmtKind::If(StmtIf {
                cond: Expr::ident(4, "ok"),
                then: Block::new(5, vec![ret]),
                elze: None,
            }),
        )
        .with_trivia(crate::ast::Trivia::default().with_comment("guard"));
        let formatting = Formatting {
            base_indent: 2,
            indent_size: 2,
            line_break: LineBreak::CrLf,
        };
        assert_eq!(
            print_stmt(&stmt, &formatting),
            "  // guard\r\n  if (ok) {\r\n    return a;\r\n  }"
        );
    }
}
