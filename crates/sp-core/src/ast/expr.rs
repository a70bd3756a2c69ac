use crate::ast::{BinOpKind, NodeId, UnOpKind};
use crate::span::Span;

pub type BExpr = Box<Expr>;

common_enum! {
    pub enum Literal {
        Null,
        Bool(bool),
        Int(i64),
        Str(String),
    }
}

common_struct! {
    pub struct Expr {
        pub id: NodeId,
        #[serde(default)]
        pub span: Span,
        pub kind: ExprKind,
    }
}

common_enum! {
    pub enum ExprKind {
        Literal(Literal),
        Ident(ExprIdent),
        Member(ExprMember),
        Call(ExprCall),
        Index(ExprIndex),
        Binary(ExprBinary),
        Unary(ExprUnary),
        Assign(ExprAssign),
        Conditional(ExprConditional),
        Paren(ExprParen),
        Array(ExprArray),
        Interpolated(ExprInterpolated),
    }
}

common_struct! {
    pub struct ExprIdent {
        pub name: String,
    }
}

common_struct! {
    pub struct ExprMember {
        pub base: BExpr,
        pub member: String,
    }
}

common_struct! {
    pub struct ExprCall {
        pub callee: BExpr,
        pub args: Vec<Expr>,
    }
}

common_struct! {
    pub struct ExprIndex {
        pub base: BExpr,
        pub index: BExpr,
    }
}

common_struct! {
    pub struct ExprBinary {
        pub op: BinOpKind,
        pub lhs: BExpr,
        pub rhs: BExpr,
    }
}

common_struct! {
    pub struct ExprUnary {
        pub op: UnOpKind,
        pub operand: BExpr,
    }
}

common_struct! {
    pub struct ExprAssign {
        /// `Some` for compound assignments such as `+=`
        pub op: Option<BinOpKind>,
        pub target: BExpr,
        pub value: BExpr,
    }
}

common_struct! {
    pub struct ExprConditional {
        pub cond: BExpr,
        pub then: BExpr,
        pub elze: BExpr,
    }
}

common_struct! {
    pub struct ExprParen {
        pub inner: BExpr,
    }
}

common_struct! {
    pub struct ExprArray {
        pub elements: Vec<ArrayElement>,
    }
}

common_struct! {
    pub struct ArrayElement {
        pub id: NodeId,
        #[serde(default)]
        pub span: Span,
        /// `...expr` spreads a sequence into the enclosing array
        #[serde(default)]
        pub spread: bool,
        pub value: Expr,
    }
}

common_struct! {
    pub struct ExprInterpolated {
        pub parts: Vec<InterpolatedPart>,
    }
}

common_struct! {
    pub struct InterpolatedPart {
        pub id: NodeId,
        #[serde(default)]
        pub span: Span,
        pub kind: InterpolatedPartKind,
    }
}

common_enum! {
    pub enum InterpolatedPartKind {
        Text(String),
        Hole(Expr),
    }
}

impl Expr {
    pub fn new(id: NodeId, span: Span, kind: ExprKind) -> Self {
        Self { id, span, kind }
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn literal(id: NodeId, literal: Literal) -> Self {
        Self::new(id, Span::null(), ExprKind::Literal(literal))
    }

    pub fn ident(id: NodeId, name: impl Into<String>) -> Self {
        Self::new(
            id,
            Span::null(),
            ExprKind::Ident(ExprIdent { name: name.into() }),
        )
    }

    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(ident) => Some(ident.name.as_str()),
            _ => None,
        }
    }

    /// Strips any number of parentheses.
    pub fn peel_parens(&self) -> &Expr {
        let mut current = self;
        while let ExprKind::Paren(paren) = &current.kind {
            current = &paren.inner;
        }
        current
    }

    /// Visit every direct sub-expression in source order.
    pub fn for_each_child<'a>(&'a self, mut f: impl FnMut(&'a Expr)) {
        match &self.kind {
            ExprKind::Literal(_) | ExprKind::Ident(_) => {}
            ExprKind::Member(member) => f(&member.base),
            ExprKind::Call(call) => {
                f(&call.callee);
                call.args.iter().for_each(f);
            }
            ExprKind::Index(index) => {
                f(&index.base);
                f(&index.index);
            }
            ExprKind::Binary(binary) => {
                f(&binary.lhs);
                f(&binary.rhs);
            }
            ExprKind::Unary(unary) => f(&unary.operand),
            ExprKind::Assign(assign) => {
                f(&assign.target);
                f(&assign.value);
            }
            ExprKind::Conditional(cond) => {
                f(&cond.cond);
                f(&cond.then);
                f(&cond.elze);
            }
            ExprKind::Paren(paren) => f(&paren.inner),
            ExprKind::Array(array) => array.elements.iter().for_each(|el| f(&el.value)),
            ExprKind::Interpolated(interp) => {
                for part in &interp.parts {
                    if let InterpolatedPartKind::Hole(expr) = &part.kind {
                        f(expr);
                    }
                }
            }
        }
    }
}

impl Literal {
    pub fn describe(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::Str(_) => "string",
        }
    }
}
