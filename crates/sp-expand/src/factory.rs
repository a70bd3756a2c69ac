//! AST factory adapter.
//!
//! Residual code is built by calling one construction function per
//! [`SyntaxKind`]. Several candidate constructors may exist for a kind; the
//! adapter picks the most specific one once, when it is built, and every
//! later construction goes through that choice. Arguments always arrive in
//! the kind's natural order (see [`natural_params`]) and are adapted to the
//! selected candidate's parameter list.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::LazyLock;

use itertools::Itertools;
use sp_core::ast::print::print_literal;
use sp_core::ast::{
    ArrayElement, BinOpKind, Block, CatchClause, Expr, ExprArray, ExprAssign, ExprBinary,
    ExprCall, ExprConditional, ExprIdent, ExprIndex, ExprInterpolated, ExprKind, ExprMember,
    ExprParen, ExprUnary, InterpolatedPart, InterpolatedPartKind, Literal, NodeClass, Stmt,
    StmtExpr, StmtForEach, StmtIf, StmtKind, StmtLocal, StmtReturn, StmtTry, StmtWhile,
    SyntaxKind, UnOpKind,
};
use sp_core::error::Error;
use sp_core::span::Span;
use sp_core::Result;
use strum::IntoEnumIterator;

use crate::runtime::IdGen;

/// Leaf argument of a construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Literal(Literal),
    BinOp(BinOpKind),
    UnOp(UnOpKind),
    /// `=` or a compound assignment such as `+=`
    AssignOp(Option<BinOpKind>),
    Text(String),
}

impl Token {
    pub fn class(&self) -> TokenClass {
        match self {
            Token::Literal(_) => TokenClass::Literal,
            Token::BinOp(_) => TokenClass::BinOp,
            Token::UnOp(_) => TokenClass::UnOp,
            Token::AssignOp(_) => TokenClass::AssignOp,
            Token::Text(_) => TokenClass::Text,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(literal) => f.write_str(&print_literal(literal)),
            Token::BinOp(op) => write!(f, "{}", op),
            Token::UnOp(op) => write!(f, "{}", op),
            Token::AssignOp(op) => write!(f, "{}=", op.map(|op| op.symbol()).unwrap_or("")),
            Token::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Literal,
    BinOp,
    UnOp,
    AssignOp,
    Text,
}

/// Parameter of a candidate constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Node(NodeClass),
    OptNode(NodeClass),
    List(NodeClass),
    Token(TokenClass),
    Name,
    OptName,
    /// Untyped source text.
    RawString,
    /// Untyped node list.
    RawArray,
}

impl ParamKind {
    pub fn is_typed(&self) -> bool {
        !matches!(self, ParamKind::RawString | ParamKind::RawArray)
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, ParamKind::OptNode(_) | ParamKind::OptName)
    }

    /// Whether an argument meant for `natural` can be passed here.
    fn accepts(&self, natural: &ParamKind) -> bool {
        match (self, natural) {
            (ParamKind::RawString, ParamKind::Token(_) | ParamKind::Name) => true,
            (ParamKind::RawArray, ParamKind::List(_)) => true,
            (param, natural) => param == natural,
        }
    }
}

/// Constructed residual node.
#[derive(Debug, Clone, PartialEq)]
pub enum ResidualNode {
    Expr(Expr),
    Stmt(Stmt),
    Block(Block),
    Catch(CatchClause),
    Element(ArrayElement),
    Part(InterpolatedPart),
}

impl ResidualNode {
    pub fn class(&self) -> NodeClass {
        match self {
            ResidualNode::Expr(_) => NodeClass::Expr,
            ResidualNode::Stmt(_) => NodeClass::Stmt,
            ResidualNode::Block(_) => NodeClass::Block,
            ResidualNode::Catch(_) => NodeClass::Catch,
            ResidualNode::Element(_) => NodeClass::Element,
            ResidualNode::Part(_) => NodeClass::Part,
        }
    }
}

/// Argument passed to a constructor.
#[derive(Debug, Clone, PartialEq)]
pub enum ResidualArg {
    Node(ResidualNode),
    OptNode(Option<ResidualNode>),
    List(Vec<ResidualNode>),
    Token(Token),
    Name(String),
    OptName(Option<String>),
    Raw(String),
}

pub type BuildFn = fn(&mut Args<'_>) -> Result<ResidualNode>;

/// Overrides the generic construction of one kind. Receives the already
/// constructed children and the selected candidate's build function.
pub type Hook = fn(BuildFn, &mut Args<'_>) -> Result<ResidualNode>;

/// A construction function offered for one kind.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub kind: SyntaxKind,
    pub name: &'static str,
    pub params: Vec<ParamKind>,
    pub build: BuildFn,
}

impl Candidate {
    pub fn new(kind: SyntaxKind, name: &'static str, params: Vec<ParamKind>, build: BuildFn) -> Self {
        Self {
            kind,
            name,
            params,
            build,
        }
    }

    /// Candidate taking exactly the kind's natural parameters.
    pub fn natural(kind: SyntaxKind, name: &'static str, build: BuildFn) -> Self {
        Self::new(kind, name, natural_params(kind), build)
    }

    fn accepts(&self, natural: &[ParamKind]) -> bool {
        self.params.len() >= natural.len()
            && self.params.iter().zip(natural).all(|(param, natural)| param.accepts(natural))
            && self.params[natural.len()..].iter().all(ParamKind::is_optional)
    }

    fn typed_count(&self) -> usize {
        self.params.iter().filter(|param| param.is_typed()).count()
    }
}

/// Arguments of every kind, in the order the rewriter produces them.
pub fn natural_params(kind: SyntaxKind) -> Vec<ParamKind> {
    use NodeClass as C;
    use ParamKind as P;
    match kind {
        SyntaxKind::Literal => vec![P::Token(TokenClass::Literal)],
        SyntaxKind::Ident => vec![P::Name],
        SyntaxKind::Member => vec![P::Node(C::Expr), P::Name],
        SyntaxKind::Call => vec![P::Node(C::Expr), P::List(C::Expr)],
        SyntaxKind::Index => vec![P::Node(C::Expr), P::Node(C::Expr)],
        SyntaxKind::Binary => vec![P::Token(TokenClass::BinOp), P::Node(C::Expr), P::Node(C::Expr)],
        SyntaxKind::Unary => vec![P::Token(TokenClass::UnOp), P::Node(C::Expr)],
        SyntaxKind::Assign => vec![
            P::Token(TokenClass::AssignOp),
            P::Node(C::Expr),
            P::Node(C::Expr),
        ],
        SyntaxKind::Conditional => vec![P::Node(C::Expr), P::Node(C::Expr), P::Node(C::Expr)],
        SyntaxKind::Paren => vec![P::Node(C::Expr)],
        SyntaxKind::Array => vec![P::List(C::Element)],
        SyntaxKind::Interpolated => vec![P::List(C::Part)],
        SyntaxKind::LocalDecl => vec![P::Name, P::OptNode(C::Expr)],
        SyntaxKind::ExprStmt => vec![P::Node(C::Expr)],
        SyntaxKind::BlockStmt => vec![P::Node(C::Block)],
        SyntaxKind::If => vec![P::Node(C::Expr), P::Node(C::Block), P::OptNode(C::Stmt)],
        SyntaxKind::While => vec![P::Node(C::Expr), P::Node(C::Block)],
        SyntaxKind::ForEach => vec![P::Name, P::Node(C::Expr), P::Node(C::Block)],
        SyntaxKind::Return => vec![P::OptNode(C::Expr)],
        SyntaxKind::Break | SyntaxKind::Continue => vec![],
        SyntaxKind::Try => vec![P::Node(C::Block), P::List(C::Catch), P::OptNode(C::Block)],
        SyntaxKind::Block => vec![P::List(C::Stmt)],
        SyntaxKind::CatchClause => vec![
            P::OptName,
            P::OptName,
            P::OptNode(C::Expr),
            P::Node(C::Block),
        ],
        SyntaxKind::ArrayItem | SyntaxKind::ArraySpread => vec![P::Node(C::Expr)],
        SyntaxKind::InterpolationText => vec![P::Token(TokenClass::Text)],
        SyntaxKind::InterpolationHole => vec![P::Node(C::Expr)],
    }
}

/// Cursor over the adapted arguments of one construction.
pub struct Args<'a> {
    pub kind: SyntaxKind,
    pub span: Span,
    pub ids: &'a mut IdGen,
    args: std::vec::IntoIter<ResidualArg>,
}

impl<'a> Args<'a> {
    pub fn new(kind: SyntaxKind, span: Span, ids: &'a mut IdGen, args: Vec<ResidualArg>) -> Self {
        Self {
            kind,
            span,
            ids,
            args: args.into_iter(),
        }
    }

    fn gap(&self, detail: impl Into<String>) -> Error {
        Error::factory_gap(self.kind, self.span, detail)
    }

    fn take(&mut self, expected: &str) -> Result<ResidualArg> {
        self.args
            .next()
            .ok_or_else(|| self.gap(format!("missing {} argument", expected)))
    }

    fn expr_of(&self, node: ResidualNode) -> Result<Expr> {
        match node {
            ResidualNode::Expr(expr) => Ok(expr),
            other => Err(self.gap(format!("expected expression, found {}", other.class()))),
        }
    }

    pub fn expr(&mut self) -> Result<Expr> {
        match self.take("expression")? {
            ResidualArg::Node(node) => self.expr_of(node),
            other => Err(self.gap(format!("expected expression, found {:?}", other))),
        }
    }

    pub fn boxed(&mut self) -> Result<Box<Expr>> {
        self.expr().map(Box::new)
    }

    pub fn opt_expr(&mut self) -> Result<Option<Expr>> {
        match self.take("optional expression")? {
            ResidualArg::OptNode(node) => node.map(|node| self.expr_of(node)).transpose(),
            other => Err(self.gap(format!("expected optional expression, found {:?}", other))),
        }
    }

    pub fn block(&mut self) -> Result<Block> {
        match self.take("block")? {
            ResidualArg::Node(ResidualNode::Block(block)) => Ok(block),
            other => Err(self.gap(format!("expected block, found {:?}", other))),
        }
    }

    pub fn opt_block(&mut self) -> Result<Option<Block>> {
        match self.take("optional block")? {
            ResidualArg::OptNode(None) => Ok(None),
            ResidualArg::OptNode(Some(ResidualNode::Block(block))) => Ok(Some(block)),
            other => Err(self.gap(format!("expected optional block, found {:?}", other))),
        }
    }

    pub fn opt_stmt(&mut self) -> Result<Option<Stmt>> {
        match self.take("optional statement")? {
            ResidualArg::OptNode(None) => Ok(None),
            ResidualArg::OptNode(Some(ResidualNode::Stmt(stmt))) => Ok(Some(stmt)),
            other => Err(self.gap(format!("expected optional statement, found {:?}", other))),
        }
    }

    fn list(&mut self) -> Result<Vec<ResidualNode>> {
        match self.take("list")? {
            ResidualArg::List(nodes) => Ok(nodes),
            other => Err(self.gap(format!("expected list, found {:?}", other))),
        }
    }

    pub fn exprs(&mut self) -> Result<Vec<Expr>> {
        self.list()?
            .into_iter()
            .map(|node| self.expr_of(node))
            .collect()
    }

    pub fn stmts(&mut self) -> Result<Vec<Stmt>> {
        self.list()?
            .into_iter()
            .map(|node| match node {
                ResidualNode::Stmt(stmt) => Ok(stmt),
                other => Err(self.gap(format!("expected statement, found {}", other.class()))),
            })
            .collect()
    }

    pub fn catches(&mut self) -> Result<Vec<CatchClause>> {
        self.list()?
            .into_iter()
            .map(|node| match node {
                ResidualNode::Catch(catch) => Ok(catch),
                other => Err(self.gap(format!("expected catch clause, found {}", other.class()))),
            })
            .collect()
    }

    pub fn elements(&mut self) -> Result<Vec<ArrayElement>> {
        self.list()?
            .into_iter()
            .map(|node| match node {
                ResidualNode::Element(element) => Ok(element),
                other => Err(self.gap(format!("expected array element, found {}", other.class()))),
            })
            .collect()
    }

    pub fn parts(&mut self) -> Result<Vec<InterpolatedPart>> {
        self.list()?
            .into_iter()
            .map(|node| match node {
                ResidualNode::Part(part) => Ok(part),
                other => Err(self.gap(format!(
                    "expected interpolation part, found {}",
                    other.class()
                ))),
            })
            .collect()
    }

    fn token(&mut self) -> Result<Token> {
        match self.take("token")? {
            ResidualArg::Token(token) => Ok(token),
            other => Err(self.gap(format!("expected token, found {:?}", other))),
        }
    }

    pub fn literal(&mut self) -> Result<Literal> {
        match self.token()? {
            Token::Literal(literal) => Ok(literal),
            other => Err(self.gap(format!("expected literal, found `{}`", other))),
        }
    }

    pub fn bin_op(&mut self) -> Result<BinOpKind> {
        match self.token()? {
            Token::BinOp(op) => Ok(op),
            other => Err(self.gap(format!("expected binary operator, found `{}`", other))),
        }
    }

    pub fn un_op(&mut self) -> Result<UnOpKind> {
        match self.token()? {
            Token::UnOp(op) => Ok(op),
            other => Err(self.gap(format!("expected unary operator, found `{}`", other))),
        }
    }

    pub fn assign_op(&mut self) -> Result<Option<BinOpKind>> {
        match self.token()? {
            Token::AssignOp(op) => Ok(op),
            other => Err(self.gap(format!("expected assignment operator, found `{}`", other))),
        }
    }

    pub fn text(&mut self) -> Result<String> {
        match self.token()? {
            Token::Text(text) => Ok(text),
            other => Err(self.gap(format!("expected text, found `{}`", other))),
        }
    }

    pub fn name(&mut self) -> Result<String> {
        match self.take("name")? {
            ResidualArg::Name(name) => Ok(name),
            other => Err(self.gap(format!("expected name, found {:?}", other))),
        }
    }

    pub fn opt_name(&mut self) -> Result<Option<String>> {
        match self.take("optional name")? {
            ResidualArg::OptName(name) => Ok(name),
            other => Err(self.gap(format!("expected optional name, found {:?}", other))),
        }
    }

    pub fn raw(&mut self) -> Result<String> {
        match self.take("source text")? {
            ResidualArg::Raw(text) => Ok(text),
            other => Err(self.gap(format!("expected source text, found {:?}", other))),
        }
    }

    fn node_id(&mut self) -> sp_core::ast::NodeId {
        self.ids.next()
    }

    pub fn expr_node(&mut self, kind: ExprKind) -> ResidualNode {
        let id = self.node_id();
        ResidualNode::Expr(Expr::new(id, self.span, kind))
    }

    pub fn stmt_node(&mut self, kind: StmtKind) -> ResidualNode {
        let id = self.node_id();
        ResidualNode::Stmt(Stmt::new(id, self.span, kind))
    }

    fn into_vec(self) -> Vec<ResidualArg> {
        self.args.collect()
    }
}

fn build_literal(args: &mut Args<'_>) -> Result<ResidualNode> {
    let literal = args.literal()?;
    Ok(args.expr_node(ExprKind::Literal(literal)))
}

fn build_ident(args: &mut Args<'_>) -> Result<ResidualNode> {
    let name = args.name()?;
    Ok(args.expr_node(ExprKind::Ident(ExprIdent { name })))
}

fn build_member(args: &mut Args<'_>) -> Result<ResidualNode> {
    let base = args.boxed()?;
    let member = args.name()?;
    Ok(args.expr_node(ExprKind::Member(ExprMember { base, member })))
}

fn build_call(args: &mut Args<'_>) -> Result<ResidualNode> {
    let callee = args.boxed()?;
    let call_args = args.exprs()?;
    Ok(args.expr_node(ExprKind::Call(ExprCall {
        callee,
        args: call_args,
    })))
}

fn build_index(args: &mut Args<'_>) -> Result<ResidualNode> {
    let base = args.boxed()?;
    let index = args.boxed()?;
    Ok(args.expr_node(ExprKind::Index(ExprIndex { base, index })))
}

fn build_binary(args: &mut Args<'_>) -> Result<ResidualNode> {
    let op = args.bin_op()?;
    let lhs = args.boxed()?;
    let rhs = args.boxed()?;
    Ok(args.expr_node(ExprKind::Binary(ExprBinary { op, lhs, rhs })))
}

fn build_unary(args: &mut Args<'_>) -> Result<ResidualNode> {
    let op = args.un_op()?;
    let operand = args.boxed()?;
    Ok(args.expr_node(ExprKind::Unary(ExprUnary { op, operand })))
}

fn build_assign(args: &mut Args<'_>) -> Result<ResidualNode> {
    let op = args.assign_op()?;
    let target = args.boxed()?;
    let value = args.boxed()?;
    Ok(args.expr_node(ExprKind::Assign(ExprAssign { op, target, value })))
}

fn build_conditional(args: &mut Args<'_>) -> Result<ResidualNode> {
    let cond = args.boxed()?;
    let then = args.boxed()?;
    let elze = args.boxed()?;
    Ok(args.expr_node(ExprKind::Conditional(ExprConditional { cond, then, elze })))
}

fn build_paren(args: &mut Args<'_>) -> Result<ResidualNode> {
    let inner = args.boxed()?;
    Ok(args.expr_node(ExprKind::Paren(ExprParen { inner })))
}

fn build_array(args: &mut Args<'_>) -> Result<ResidualNode> {
    let elements = args.elements()?;
    Ok(args.expr_node(ExprKind::Array(ExprArray { elements })))
}

fn build_interpolated(args: &mut Args<'_>) -> Result<ResidualNode> {
    let parts = args.parts()?;
    Ok(args.expr_node(ExprKind::Interpolated(ExprInterpolated { parts })))
}

fn build_local(args: &mut Args<'_>) -> Result<ResidualNode> {
    let name = args.name()?;
    let init = args.opt_expr()?;
    Ok(args.stmt_node(StmtKind::Local(StmtLocal { name, init })))
}

fn build_expr_stmt(args: &mut Args<'_>) -> Result<ResidualNode> {
    let expr = args.expr()?;
    Ok(args.stmt_node(StmtKind::Expr(StmtExpr { expr })))
}

fn build_block_stmt(args: &mut Args<'_>) -> Result<ResidualNode> {
    let block = args.block()?;
    Ok(args.stmt_node(StmtKind::Block(block)))
}

fn build_if(args: &mut Args<'_>) -> Result<ResidualNode> {
    let cond = args.expr()?;
    let then = args.block()?;
    let elze = args.opt_stmt()?.map(Box::new);
    Ok(args.stmt_node(StmtKind::If(StmtIf { cond, then, elze })))
}

fn build_while(args: &mut Args<'_>) -> Result<ResidualNode> {
    let cond = args.expr()?;
    let body = args.block()?;
    Ok(args.stmt_node(StmtKind::While(StmtWhile { cond, body })))
}

fn build_foreach(args: &mut Args<'_>) -> Result<ResidualNode> {
    let binding = args.name()?;
    let iter = args.expr()?;
    let body = args.block()?;
    Ok(args.stmt_node(StmtKind::ForEach(StmtForEach {
        binding,
        iter,
        body,
    })))
}

fn build_return(args: &mut Args<'_>) -> Result<ResidualNode> {
    let value = args.opt_expr()?;
    Ok(args.stmt_node(StmtKind::Return(StmtReturn { value })))
}

fn build_break(args: &mut Args<'_>) -> Result<ResidualNode> {
    Ok(args.stmt_node(StmtKind::Break))
}

fn build_continue(args: &mut Args<'_>) -> Result<ResidualNode> {
    Ok(args.stmt_node(StmtKind::Continue))
}

fn build_try(args: &mut Args<'_>) -> Result<ResidualNode> {
    let body = args.block()?;
    let catches = args.catches()?;
    let finally = args.opt_block()?;
    Ok(args.stmt_node(StmtKind::Try(StmtTry {
        body,
        catches,
        finally,
    })))
}

fn build_block(args: &mut Args<'_>) -> Result<ResidualNode> {
    let stmts = args.stmts()?;
    let mut block = Block::new(args.node_id(), stmts);
    block.span = args.span;
    Ok(ResidualNode::Block(block))
}

fn build_catch(args: &mut Args<'_>) -> Result<ResidualNode> {
    let exception_type = args.opt_name()?;
    let binding = args.opt_name()?;
    let filter = args.opt_expr()?;
    let body = args.block()?;
    Ok(ResidualNode::Catch(CatchClause {
        id: args.node_id(),
        span: args.span,
        exception_type,
        binding,
        filter,
        body,
    }))
}

fn element(args: &mut Args<'_>, spread: bool) -> Result<ResidualNode> {
    let value = args.expr()?;
    Ok(ResidualNode::Element(ArrayElement {
        id: args.node_id(),
        span: args.span,
        spread,
        value,
    }))
}

fn build_array_item(args: &mut Args<'_>) -> Result<ResidualNode> {
    element(args, false)
}

fn build_array_spread(args: &mut Args<'_>) -> Result<ResidualNode> {
    element(args, true)
}

fn part(args: &mut Args<'_>, kind: InterpolatedPartKind) -> ResidualNode {
    ResidualNode::Part(InterpolatedPart {
        id: args.node_id(),
        span: args.span,
        kind,
    })
}

fn build_interpolation_text(args: &mut Args<'_>) -> Result<ResidualNode> {
    let text = args.text()?;
    Ok(part(args, InterpolatedPartKind::Text(text)))
}

fn build_interpolation_hole(args: &mut Args<'_>) -> Result<ResidualNode> {
    let hole = args.expr()?;
    Ok(part(args, InterpolatedPartKind::Hole(hole)))
}

/// Literal from its source text.
fn literal_from_source(args: &mut Args<'_>) -> Result<ResidualNode> {
    let text = args.raw()?;
    let literal = match text.as_str() {
        "null" => Literal::Null,
        "true" => Literal::Bool(true),
        "false" => Literal::Bool(false),
        quoted if quoted.len() >= 2 && quoted.starts_with('"') && quoted.ends_with('"') => {
            Literal::Str(quoted[1..quoted.len() - 1].to_string())
        }
        number => Literal::Int(
            number
                .parse()
                .map_err(|_| args.gap(format!("`{}` is not a literal", number)))?,
        ),
    };
    Ok(args.expr_node(ExprKind::Literal(literal)))
}

fn binary_from_symbol(args: &mut Args<'_>) -> Result<ResidualNode> {
    let symbol = args.raw()?;
    let op = BinOpKind::from_symbol(&symbol)
        .ok_or_else(|| args.gap(format!("`{}` is not a binary operator", symbol)))?;
    let lhs = args.boxed()?;
    let rhs = args.boxed()?;
    Ok(args.expr_node(ExprKind::Binary(ExprBinary { op, lhs, rhs })))
}

fn unary_from_symbol(args: &mut Args<'_>) -> Result<ResidualNode> {
    let symbol = args.raw()?;
    let op = match symbol.as_str() {
        "!" => UnOpKind::Not,
        "-" => UnOpKind::Neg,
        other => return Err(args.gap(format!("`{}` is not a unary operator", other))),
    };
    let operand = args.boxed()?;
    Ok(args.expr_node(ExprKind::Unary(ExprUnary { op, operand })))
}

fn if_without_else(args: &mut Args<'_>) -> Result<ResidualNode> {
    let cond = args.expr()?;
    let then = args.block()?;
    Ok(args.stmt_node(StmtKind::If(StmtIf {
        cond,
        then,
        elze: None,
    })))
}

/// Constructors of the residual syntax tree.
pub fn standard_candidates() -> Vec<Candidate> {
    use NodeClass as C;
    use ParamKind as P;
    vec![
        Candidate::new(SyntaxKind::Literal, "literal_from_source", vec![P::RawString], literal_from_source),
        Candidate::natural(SyntaxKind::Literal, "literal", build_literal),
        Candidate::natural(SyntaxKind::Ident, "ident", build_ident),
        Candidate::natural(SyntaxKind::Member, "member", build_member),
        Candidate::new(
            SyntaxKind::Call,
            "call_with_array",
            vec![P::Node(C::Expr), P::RawArray],
            build_call,
        ),
        Candidate::natural(SyntaxKind::Call, "call", build_call),
        Candidate::natural(SyntaxKind::Index, "index", build_index),
        Candidate::new(
            SyntaxKind::Binary,
            "binary_from_symbol",
            vec![P::RawString, P::Node(C::Expr), P::Node(C::Expr)],
            binary_from_symbol,
        ),
        Candidate::natural(SyntaxKind::Binary, "binary", build_binary),
        Candidate::new(
            SyntaxKind::Unary,
            "unary_from_symbol",
            vec![P::RawString, P::Node(C::Expr)],
            unary_from_symbol,
        ),
        Candidate::natural(SyntaxKind::Unary, "unary", build_unary),
        Candidate::natural(SyntaxKind::Assign, "assign", build_assign),
        Candidate::natural(SyntaxKind::Conditional, "conditional", build_conditional),
        Candidate::natural(SyntaxKind::Paren, "paren", build_paren),
        Candidate::natural(SyntaxKind::Array, "array", build_array),
        Candidate::natural(SyntaxKind::Interpolated, "interpolated", build_interpolated),
        Candidate::natural(SyntaxKind::LocalDecl, "local", build_local),
        Candidate::natural(SyntaxKind::ExprStmt, "expr_stmt", build_expr_stmt),
        Candidate::natural(SyntaxKind::BlockStmt, "block_stmt", build_block_stmt),
        Candidate::new(
            SyntaxKind::If,
            "if_without_else",
            vec![P::Node(C::Expr), P::Node(C::Block)],
            if_without_else,
        ),
        Candidate::natural(SyntaxKind::If, "if", build_if),
        Candidate::natural(SyntaxKind::While, "while", build_while),
        Candidate::natural(SyntaxKind::ForEach, "foreach", build_foreach),
        Candidate::natural(SyntaxKind::Return, "return", build_return),
        Candidate::natural(SyntaxKind::Break, "break", build_break),
        Candidate::natural(SyntaxKind::Continue, "continue", build_continue),
        Candidate::natural(SyntaxKind::Try, "try", build_try),
        Candidate::natural(SyntaxKind::Block, "block", build_block),
        Candidate::natural(SyntaxKind::CatchClause, "catch", build_catch),
        Candidate::natural(SyntaxKind::ArrayItem, "array_item", build_array_item),
        Candidate::natural(SyntaxKind::ArraySpread, "array_spread", build_array_spread),
        Candidate::natural(SyntaxKind::InterpolationText, "interpolation_text", build_interpolation_text),
        Candidate::natural(SyntaxKind::InterpolationHole, "interpolation_hole", build_interpolation_hole),
    ]
}

/// Folds literal holes into the surrounding text.
fn fold_interpolation(build: BuildFn, args: &mut Args<'_>) -> Result<ResidualNode> {
    let parts = args.parts()?;
    let mut folded: Vec<InterpolatedPart> = Vec::with_capacity(parts.len());
    for part in parts {
        let text = match &part.kind {
            InterpolatedPartKind::Text(text) => Some(text.clone()),
            InterpolatedPartKind::Hole(hole) => match &hole.kind {
                ExprKind::Literal(Literal::Str(text)) => Some(text.clone()),
                ExprKind::Literal(Literal::Int(value)) => Some(value.to_string()),
                _ => None,
            },
        };
        let Some(text) = text else {
            folded.push(part);
            continue;
        };
        if let Some(InterpolatedPart {
            kind: InterpolatedPartKind::Text(previous),
            ..
        }) = folded.last_mut()
        {
            previous.push_str(&text);
            continue;
        }
        folded.push(InterpolatedPart {
            kind: InterpolatedPartKind::Text(text),
            ..part
        });
    }
    let folded = folded.into_iter().map(ResidualNode::Part).collect();
    let mut rebuilt = Args::new(args.kind, args.span, &mut *args.ids, vec![ResidualArg::List(folded)]);
    build(&mut rebuilt)
}

/// Replaces spreads of array literals by their elements.
fn flatten_spreads(build: BuildFn, args: &mut Args<'_>) -> Result<ResidualNode> {
    let elements = args.elements()?;
    let mut flat = Vec::with_capacity(elements.len());
    for element in elements {
        match element.value.kind {
            ExprKind::Array(array) if element.spread => flat.extend(array.elements),
            kind => flat.push(ArrayElement {
                value: Expr { kind, ..element.value },
                ..element
            }),
        }
    }
    let flat = flat.into_iter().map(ResidualNode::Element).collect();
    let mut rebuilt = Args::new(args.kind, args.span, &mut *args.ids, vec![ResidualArg::List(flat)]);
    build(&mut rebuilt)
}

fn hook(kind: SyntaxKind) -> Option<Hook> {
    match kind {
        SyntaxKind::Interpolated => Some(fold_interpolation),
        SyntaxKind::Array => Some(flatten_spreads),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct Mapping {
    candidate: &'static str,
    params: Vec<ParamKind>,
    build: BuildFn,
    hook: Option<Hook>,
}

/// Construction mapping for every [`SyntaxKind`].
#[derive(Debug, Clone)]
pub struct FactoryAdapter {
    mappings: HashMap<SyntaxKind, Mapping>,
}

static SHARED: LazyLock<FactoryAdapter> =
    LazyLock::new(|| FactoryAdapter::build(&standard_candidates()));

impl FactoryAdapter {
    /// Selects, for every kind, the candidate accepting the kind's natural
    /// arguments with exact arity first, then the most typed parameters, then
    /// declaration order.
    pub fn build(candidates: &[Candidate]) -> Self {
        let mut mappings = HashMap::new();
        for kind in SyntaxKind::iter() {
            let natural = natural_params(kind);
            let selected = candidates
                .iter()
                .enumerate()
                .filter(|(_, candidate)| candidate.kind == kind && candidate.accepts(&natural))
                .min_by_key(|(index, candidate)| {
                    (
                        candidate.params.len() != natural.len(),
                        std::cmp::Reverse(candidate.typed_count()),
                        *index,
                    )
                })
                .map(|(_, candidate)| candidate);
            match selected {
                Some(candidate) => {
                    tracing::trace!("{} is constructed by `{}`", kind, candidate.name);
                    mappings.insert(
                        kind,
                        Mapping {
                            candidate: candidate.name,
                            params: candidate.params.clone(),
                            build: candidate.build,
                            hook: hook(kind),
                        },
                    );
                }
                None => tracing::warn!("no factory candidate constructs {}", kind),
            }
        }
        Self { mappings }
    }

    /// The adapter over [`standard_candidates`], built on first use.
    pub fn shared() -> &'static FactoryAdapter {
        &SHARED
    }

    pub fn supports(&self, kind: SyntaxKind) -> bool {
        self.mappings.contains_key(&kind)
    }

    /// Name of the candidate selected for `kind`.
    pub fn candidate(&self, kind: SyntaxKind) -> Option<&'static str> {
        self.mappings.get(&kind).map(|mapping| mapping.candidate)
    }

    pub fn missing(&self) -> Vec<SyntaxKind> {
        SyntaxKind::iter()
            .filter(|kind| !self.supports(*kind))
            .collect_vec()
    }

    pub fn construct(
        &self,
        kind: SyntaxKind,
        span: Span,
        args: Vec<ResidualArg>,
        ids: &mut IdGen,
    ) -> Result<ResidualNode> {
        let mapping = self
            .mappings
            .get(&kind)
            .ok_or_else(|| Error::factory_gap(kind, span, "no candidate constructor"))?;
        let natural = natural_params(kind);
        if args.len() != natural.len() {
            return Err(Error::factory_gap(
                kind,
                span,
                format!("expected {} arguments, found {}", natural.len(), args.len()),
            ));
        }
        let mut adapted = Vec::with_capacity(mapping.params.len());
        for (param, arg) in mapping.params.iter().zip(args) {
            adapted.push(adapt(kind, span, param, arg)?);
        }
        for param in &mapping.params[adapted.len()..] {
            adapted.push(match param {
                ParamKind::OptName => ResidualArg::OptName(None),
                _ => ResidualArg::OptNode(None),
            });
        }
        let mut cursor = Args::new(kind, span, ids, adapted);
        let node = match mapping.hook {
            Some(hook) => hook(mapping.build, &mut cursor)?,
            None => (mapping.build)(&mut cursor)?,
        };
        let rest = cursor.into_vec();
        if !rest.is_empty() {
            return Err(Error::factory_gap(
                kind,
                span,
                format!("`{}` left {} arguments unused", mapping.candidate, rest.len()),
            ));
        }
        Ok(node)
    }
}

fn adapt(kind: SyntaxKind, span: Span, param: &ParamKind, arg: ResidualArg) -> Result<ResidualArg> {
    let adapted = match (param, arg) {
        (ParamKind::RawString, ResidualArg::Token(token)) => ResidualArg::Raw(token.to_string()),
        (ParamKind::RawString, ResidualArg::Name(name)) => ResidualArg::Raw(name),
        (ParamKind::RawArray, ResidualArg::List(nodes)) => ResidualArg::List(nodes),
        (ParamKind::RawString | ParamKind::RawArray, other) => {
            return Err(Error::factory_gap(
                kind,
                span,
                format!("cannot pass {:?} as untyped argument", other),
            ))
        }
        (_, arg) => arg,
    };
    Ok(adapted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_core::ast::print;

    fn lit(value: i64) -> ResidualArg {
        ResidualArg::Token(Token::Literal(Literal::Int(value)))
    }

    fn node(adapter: &FactoryAdapter, ids: &mut IdGen, kind: SyntaxKind, args: Vec<ResidualArg>) -> ResidualNode {
        adapter
            .construct(kind, Span::null(), args, ids)
            .expect("construct")
    }

    fn expr_of(node: ResidualNode) -> Expr {
        match node {
            ResidualNode::Expr(expr) => expr,
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn typed_candidates_win_over_raw_ones() {
        let adapter = FactoryAdapter::shared();
        assert_eq!(adapter.candidate(SyntaxKind::Literal), Some("literal"));
        assert_eq!(adapter.candidate(SyntaxKind::Binary), Some("binary"));
        assert_eq!(adapter.candidate(SyntaxKind::Call), Some("call"));
        assert_eq!(adapter.candidate(SyntaxKind::If), Some("if"));
        assert!(adapter.missing().is_empty());
    }

    #[test]
    fn raw_candidate_used_when_alone() {
        let candidates: Vec<Candidate> = standard_candidates()
            .into_iter()
            .filter(|candidate| {
                !matches!(candidate.name, "literal" | "binary")
            })
            .collect();
        let adapter = FactoryAdapter::build(&candidates);
        assert_eq!(adapter.candidate(SyntaxKind::Literal), Some("literal_from_source"));
        let mut ids = IdGen::default();
        let one = node(&adapter, &mut ids, SyntaxKind::Literal, vec![lit(1)]);
        let two = node(&adapter, &mut ids, SyntaxKind::Literal, vec![lit(2)]);
        let sum = node(
            &adapter,
            &mut ids,
            SyntaxKind::Binary,
            vec![
                ResidualArg::Token(Token::BinOp(BinOpKind::Add)),
                ResidualArg::Node(one),
                ResidualArg::Node(two),
            ],
        );
        assert_eq!(print::expr(&expr_of(sum)), "1 + 2");
    }

    #[test]
    fn shorter_candidates_are_never_selected() {
        let candidates: Vec<Candidate> = standard_candidates()
            .into_iter()
            .filter(|candidate| candidate.name != "if")
            .collect();
        let adapter = FactoryAdapter::build(&candidates);
        assert!(!adapter.supports(SyntaxKind::If));
        assert_eq!(adapter.missing(), vec![SyntaxKind::If]);
        let err = adapter
            .construct(SyntaxKind::If, Span::new(0, 1, 2), Vec::new(), &mut IdGen::default())
            .unwrap_err();
        assert!(matches!(err, Error::FactoryGap { kind: SyntaxKind::If, .. }));
    }

    #[test]
    fn interpolation_folds_literal_holes() {
        let adapter = FactoryAdapter::shared();
        let mut ids = IdGen::default();
        let text = node(
            adapter,
            &mut ids,
            SyntaxKind::InterpolationText,
            vec![ResidualArg::Token(Token::Text("n=".to_string()))],
        );
        let hole = |ids: &mut IdGen, arg: ResidualArg| {
            let value = node(adapter, ids, SyntaxKind::Literal, vec![arg]);
            node(
                adapter,
                ids,
                SyntaxKind::InterpolationHole,
                vec![ResidualArg::Node(value)],
            )
        };
        let spliced = hole(&mut ids, lit(3));
        let ident = node(
            adapter,
            &mut ids,
            SyntaxKind::Ident,
            vec![ResidualArg::Name("x".to_string())],
        );
        let runtime = node(
            adapter,
            &mut ids,
            SyntaxKind::InterpolationHole,
            vec![ResidualArg::Node(ident)],
        );
        let interpolated = node(
            adapter,
            &mut ids,
            SyntaxKind::Interpolated,
            vec![ResidualArg::List(vec![text, spliced, runtime])],
        );
        assert_eq!(print::expr(&expr_of(interpolated)), r#"$"n=3{x}""#);
    }

    #[test]
    fn spread_of_array_literal_is_flattened() {
        let adapter = FactoryAdapter::shared();
        let mut ids = IdGen::default();
        let item = |ids: &mut IdGen, kind: SyntaxKind, value: ResidualNode| {
            node(adapter, ids, kind, vec![ResidualArg::Node(value)])
        };
        let one = node(adapter, &mut ids, SyntaxKind::Literal, vec![lit(1)]);
        let two = node(adapter, &mut ids, SyntaxKind::Literal, vec![lit(2)]);
        let inner_items = vec![
            item(&mut ids, SyntaxKind::ArrayItem, one),
            item(&mut ids, SyntaxKind::ArrayItem, two),
        ];
        let inner = node(
            adapter,
            &mut ids,
            SyntaxKind::Array,
            vec![ResidualArg::List(inner_items)],
        );
        let rest = node(
            adapter,
            &mut ids,
            SyntaxKind::Ident,
            vec![ResidualArg::Name("rest".to_string())],
        );
        let outer_items = vec![
            item(&mut ids, SyntaxKind::ArraySpread, inner),
            item(&mut ids, SyntaxKind::ArraySpread, rest),
        ];
        let outer = node(
            adapter,
            &mut ids,
            SyntaxKind::Array,
            vec![ResidualArg::List(outer_items)],
        );
        assert_eq!(print::expr(&expr_of(outer)), "[1, 2, ...rest]");
    }

    #[test]
    fn mismatched_arguments_are_factory_gaps() {
        let err = FactoryAdapter::shared()
            .construct(
                SyntaxKind::Member,
                Span::null(),
                vec![lit(1), ResidualArg::Name("x".to_string())],
                &mut IdGen::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::FactoryGap { kind: SyntaxKind::Member, .. }));
    }
}
