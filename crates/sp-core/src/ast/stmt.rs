use crate::ast::{Expr, NodeId};
use crate::span::Span;

common_struct! {
    /// Formatting side channel attached to a statement.
    #[derive(Default)]
    pub struct Trivia {
        /// Line comments printed before the statement, without the `//` marker
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub comments: Vec<String>,
    }
}

impl Trivia {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }
}

common_struct! {
    pub struct Block {
        pub id: NodeId,
        #[serde(default)]
        pub span: Span,
        pub stmts: Vec<Stmt>,
    }
}

impl Block {
    pub fn new(id: NodeId, stmts: Vec<Stmt>) -> Self {
        Self {
            id,
            span: Span::null(),
            stmts,
        }
    }
}

common_struct! {
    pub struct Stmt {
        pub id: NodeId,
        #[serde(default)]
        pub span: Span,
        #[serde(default, skip_serializing_if = "Trivia::is_empty")]
        pub trivia: Trivia,
        pub kind: StmtKind,
    }
}

common_enum! {
    pub enum StmtKind {
        Local(StmtLocal),
        Expr(StmtExpr),
        Block(Block),
        If(StmtIf),
        While(StmtWhile),
        ForEach(StmtForEach),
        Return(StmtReturn),
        Break,
        Continue,
        Try(StmtTry),
    }
}

common_struct! {
    pub struct StmtLocal {
        pub name: String,
        pub init: Option<Expr>,
    }
}

common_struct! {
    pub struct StmtExpr {
        pub expr: Expr,
    }
}

common_struct! {
    pub struct StmtIf {
        pub cond: Expr,
        pub then: Block,
        /// Either a block statement or a nested `if` for `else if` chains
        pub elze: Option<Box<Stmt>>,
    }
}

common_struct! {
    pub struct StmtWhile {
        pub cond: Expr,
        pub body: Block,
    }
}

common_struct! {
    /// `foreach (binding in iter) body`; the statement's id identifies the binding
    pub struct StmtForEach {
        pub binding: String,
        pub iter: Expr,
        pub body: Block,
    }
}

common_struct! {
    pub struct StmtReturn {
        pub value: Option<Expr>,
    }
}

common_struct! {
    pub struct StmtTry {
        pub body: Block,
        #[serde(default)]
        pub catches: Vec<CatchClause>,
        pub finally: Option<Block>,
    }
}

common_struct! {
    /// The clause id identifies the bound exception local, if any
    pub struct CatchClause {
        pub id: NodeId,
        #[serde(default)]
        pub span: Span,
        pub exception_type: Option<String>,
        pub binding: Option<String>,
        pub filter: Option<Expr>,
        pub body: Block,
    }
}

impl Stmt {
    pub fn new(id: NodeId, span: Span, kind: StmtKind) -> Self {
        Self {
            id,
            span,
            trivia: Trivia::default(),
            kind,
        }
    }

    pub fn with_trivia(mut self, trivia: Trivia) -> Self {
        self.trivia = trivia;
        self
    }

    pub fn expr(id: NodeId, expr: Expr) -> Self {
        let span = expr.span;
        Self::new(id, span, StmtKind::Expr(StmtExpr { expr }))
    }

    pub fn kind(&self) -> &StmtKind {
        &self.kind
    }
}
