use strum::{Display, EnumCount, EnumIter, IntoStaticStr};

use crate::ast::{ExprKind, Expr, InterpolatedPart, InterpolatedPartKind, ArrayElement, Stmt, StmtKind};

/// Every visitable node kind of the template AST.
///
/// The factory adapter keeps one construction mapping per variant; the
/// completeness test walks `SyntaxKind::iter()`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumCount,
    EnumIter,
    IntoStaticStr,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum SyntaxKind {
    // expressions
    Literal,
    Ident,
    Member,
    Call,
    Index,
    Binary,
    Unary,
    Assign,
    Conditional,
    Paren,
    Array,
    Interpolated,
    // statements
    LocalDecl,
    ExprStmt,
    BlockStmt,
    If,
    While,
    ForEach,
    Return,
    Break,
    Continue,
    Try,
    // auxiliary nodes
    Block,
    CatchClause,
    ArrayItem,
    ArraySpread,
    InterpolationText,
    InterpolationHole,
}

/// Shape class of a constructed node, used to type factory parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum NodeClass {
    Expr,
    Stmt,
    Block,
    Catch,
    Element,
    Part,
}

impl SyntaxKind {
    pub fn class(&self) -> NodeClass {
        match self {
            SyntaxKind::Literal
            | SyntaxKind::Ident
            | SyntaxKind::Member
            | SyntaxKind::Call
            | SyntaxKind::Index
            | SyntaxKind::Binary
            | SyntaxKind::Unary
            | SyntaxKind::Assign
            | SyntaxKind::Conditional
            | SyntaxKind::Paren
            | SyntaxKind::Array
            | SyntaxKind::Interpolated => NodeClass::Expr,
            SyntaxKind::LocalDecl
            | SyntaxKind::ExprStmt
            | SyntaxKind::BlockStmt
            | SyntaxKind::If
            | SyntaxKind::While
            | SyntaxKind::ForEach
            | SyntaxKind::Return
            | SyntaxKind::Break
            | SyntaxKind::Continue
            | SyntaxKind::Try => NodeClass::Stmt,
            SyntaxKind::Block => NodeClass::Block,
            SyntaxKind::CatchClause => NodeClass::Catch,
            SyntaxKind::ArrayItem | SyntaxKind::ArraySpread => NodeClass::Element,
            SyntaxKind::InterpolationText | SyntaxKind::InterpolationHole => NodeClass::Part,
        }
    }

    pub fn name(&self) -> &'static str {
        self.into()
    }
}

impl Expr {
    pub fn syntax_kind(&self) -> SyntaxKind {
        match &self.kind {
            ExprKind::Literal(_) => SyntaxKind::Literal,
            ExprKind::Ident(_) => SyntaxKind::Ident,
            ExprKind::Member(_) => SyntaxKind::Member,
            ExprKind::Call(_) => SyntaxKind::Call,
            ExprKind::Index(_) => SyntaxKind::Index,
            ExprKind::Binary(_) => SyntaxKind::Binary,
            ExprKind::Unary(_) => SyntaxKind::Unary,
            ExprKind::Assign(_) => SyntaxKind::Assign,
            ExprKind::Conditional(_) => SyntaxKind::Conditional,
            ExprKind::Paren(_) => SyntaxKind::Paren,
            ExprKind::Array(_) => SyntaxKind::Array,
            ExprKind::Interpolated(_) => SyntaxKind::Interpolated,
        }
    }
}

impl Stmt {
    pub fn syntax_kind(&self) -> SyntaxKind {
        match &self.kind {
            StmtKind::Local(_) => SyntaxKind::LocalDecl,
            StmtKind::Expr(_) => SyntaxKind::ExprStmt,
            StmtKind::Block(_) => SyntaxKind::BlockStmt,
            StmtKind::If(_) => SyntaxKind::If,
            StmtKind::While(_) => SyntaxKind::While,
            StmtKind::ForEach(_) => SyntaxKind::ForEach,
            StmtKind::Return(_) => SyntaxKind::Return,
            StmtKind::Break => SyntaxKind::Break,
            StmtKind::Continue => SyntaxKind::Continue,
            StmtKind::Try(_) => SyntaxKind::Try,
        }
    }
}

impl ArrayElement {
    pub fn syntax_kind(&self) -> SyntaxKind {
        if self.spread {
            SyntaxKind::ArraySpread
        } else {
            SyntaxKind::ArrayItem
        }
    }
}

impl InterpolatedPart {
    pub fn syntax_kind(&self) -> SyntaxKind {
        match &self.kind {
            InterpolatedPartKind::Text(_) => SyntaxKind::InterpolationText,
            InterpolatedPartKind::Hole(_) => SyntaxKind::InterpolationHole,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_kind_has_a_class() {
        let exprs = SyntaxKind::iter()
            .filter(|kind| kind.class() == NodeClass::Expr)
            .count();
        let stmts = SyntaxKind::iter()
            .filter(|kind| kind.class() == NodeClass::Stmt)
            .count();
        assert_eq!(exprs, 12);
        assert_eq!(stmts, 10);
        assert_eq!(SyntaxKind::iter().count(), SyntaxKind::COUNT);
        assert_eq!(SyntaxKind::ForEach.name(), "ForEach");
    }
}
