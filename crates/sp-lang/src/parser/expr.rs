use sp_core::ast::{
    ArrayElement, BinOpKind, Expr, ExprArray, ExprAssign, ExprBinary, ExprCall, ExprConditional, ExprIdent,
    ExprIndex, ExprInterpolated, ExprKind, ExprMember, ExprParen, ExprUnary, InterpolatedPart,
    InterpolatedPartKind, Literal, UnOpKind,
};
use sp_core::span::Span;
use sp_core::{Error, Result};

use crate::lexer::winnow::{scan_string_end, unescape};
use crate::lexer::{Keyword, Token, TokenKind};
use crate::parser::TemplateParser;

const COMPOUND_ASSIGN: &[(&str, BinOpKind)] = &[
    ("+=", BinOpKind::Add),
    ("-=", BinOpKind::Sub),
    ("*=", BinOpKind::Mul),
    ("/=", BinOpKind::Div),
    ("%=", BinOpKind::Mod),
];

/// Piece of an interpolated string literal before hole parsing.
enum Piece {
    Text(String, usize, usize),
    Hole(String, usize),
}

impl TemplateParser {
    pub fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        let target = self.parse_conditional()?;
        let op = match self.peek() {
            Some(token) if token.kind == TokenKind::Symbol && token.lexeme == "=" => Some(None),
            Some(token) if token.kind == TokenKind::Symbol => COMPOUND_ASSIGN
                .iter()
                .find(|(symbol, _)| *symbol == token.lexeme)
                .map(|(_, op)| Some(*op)),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(target);
        };
        self.bump();
        let value = self.parse_assignment()?;
        let span = target.span.to(value.span);
        Ok(Expr::new(
            self.fresh_id(),
            span,
            ExprKind::Assign(ExprAssign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            }),
        ))
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let cond = self.parse_binary(1)?;
        if !self.match_symbol("?") {
            return Ok(cond);
        }
        let then = self.parse_assignment()?;
        self.expect_symbol(":")?;
        let elze = self.parse_conditional()?;
        let span = Span::union([cond.span, elze.span]);
        Ok(Expr::new(
            self.fresh_id(),
            span,
            ExprKind::Conditional(ExprConditional {
                cond: Box::new(cond),
                then: Box::new(then),
                elze: Box::new(elze),
            }),
        ))
    }

    fn peek_binop(&self) -> Option<BinOpKind> {
        let token = self.peek()?;
        if token.kind != TokenKind::Symbol {
            return None;
        }
        BinOpKind::from_symbol(&token.lexeme)
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.peek_binop() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(
                self.fresh_id(),
                span,
                ExprKind::Binary(ExprBinary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }),
            );
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = if self.peek_symbol("!") {
            Some(UnOpKind::Not)
        } else if self.peek_symbol("-") {
            Some(UnOpKind::Neg)
        } else {
            None
        };
        let Some(op) = op else {
            let primary = self.parse_primary()?;
            return self.parse_postfix(primary);
        };
        let start = self.peek_span();
        self.bump();
        let operand = self.parse_unary()?;
        let span = start.to(operand.span);
        Ok(Expr::new(
            self.fresh_id(),
            span,
            ExprKind::Unary(ExprUnary {
                op,
                operand: Box::new(operand),
            }),
        ))
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            if self.match_symbol(".") {
                let (member, member_span) = self.expect_ident()?;
                let span = expr.span.to(member_span);
                expr = Expr::new(
                    self.fresh_id(),
                    span,
                    ExprKind::Member(ExprMember {
                        base: Box::new(expr),
                        member,
                    }),
                );
            } else if self.match_symbol("(") {
                let args = self.parse_comma_list(")", Self::parse_expr)?;
                let close = self.expect_symbol(")")?;
                let span = expr.span.to(close);
                expr = Expr::new(
                    self.fresh_id(),
                    span,
                    ExprKind::Call(ExprCall {
                        callee: Box::new(expr),
                        args,
                    }),
                );
            } else if self.match_symbol("[") {
                let index = self.parse_expr()?;
                let close = self.expect_symbol("]")?;
                let span = expr.span.to(close);
                expr = Expr::new(
                    self.fresh_id(),
                    span,
                    ExprKind::Index(ExprIndex {
                        base: Box::new(expr),
                        index: Box::new(index),
                    }),
                );
            } else {
                return Ok(expr);
            }
        }
    }

    /// Items separated by `,` up to (not including) `close`; a trailing comma is accepted.
    pub(crate) fn parse_comma_list<T>(
        &mut self,
        close: &str,
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        while !self.peek_symbol(close) {
            items.push(item(self)?);
            if !self.match_symbol(",") {
                break;
            }
        }
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected("expression"));
        };
        let span = self.token_span(&token);
        match &token.kind {
            TokenKind::Number => {
                self.bump();
                let digits = token.lexeme.replace('_', "");
                let value = digits.parse::<i64>().map_err(|_| {
                    Error::parse(format!("integer literal `{}` out of range", token.lexeme), span)
                })?;
                Ok(self.literal(span, Literal::Int(value)))
            }
            TokenKind::StringLiteral => {
                self.bump();
                let body = &token.lexeme[1..token.lexeme.len() - 1];
                let value = unescape(body).map_err(|message| Error::parse(message, span))?;
                Ok(self.literal(span, Literal::Str(value)))
            }
            TokenKind::InterpolatedString => {
                self.bump();
                self.parse_interpolated(&token)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.bump();
                Ok(self.literal(span, Literal::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.bump();
                Ok(self.literal(span, Literal::Bool(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.bump();
                Ok(self.literal(span, Literal::Null))
            }
            TokenKind::Ident => {
                self.bump();
                Ok(Expr::new(
                    self.fresh_id(),
                    span,
                    ExprKind::Ident(ExprIdent {
                        name: token.lexeme.clone(),
                    }),
                ))
            }
            TokenKind::Symbol if token.lexeme == "(" => {
                self.bump();
                let inner = self.parse_expr()?;
                let close = self.expect_symbol(")")?;
                Ok(Expr::new(
                    self.fresh_id(),
                    span.to(close),
                    ExprKind::Paren(ExprParen {
                        inner: Box::new(inner),
                    }),
                ))
            }
            TokenKind::Symbol if token.lexeme == "[" => {
                self.bump();
                let elements = self.parse_comma_list("]", Self::parse_array_element)?;
                let close = self.expect_symbol("]")?;
                Ok(Expr::new(
                    self.fresh_id(),
                    span.to(close),
                    ExprKind::Array(ExprArray { elements }),
                ))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn literal(&mut self, span: Span, literal: Literal) -> Expr {
        Expr::new(self.fresh_id(), span, ExprKind::Literal(literal))
    }

    fn parse_array_element(&mut self) -> Result<ArrayElement> {
        let start = self.peek_span();
        let spread = self.match_symbol("...");
        let value = self.parse_expr()?;
        Ok(ArrayElement {
            id: self.fresh_id(),
            span: start.to(value.span),
            spread,
            value,
        })
    }

    fn parse_interpolated(&mut self, token: &Token) -> Result<Expr> {
        let span = self.token_span(token);
        let base = self.offset + token.span.start;
        let mut parts = Vec::new();
        for piece in split_interpolation(&token.lexeme).map_err(|message| Error::parse(message, span))? {
            let part = match piece {
                Piece::Text(text, lo, hi) => InterpolatedPart {
                    id: self.fresh_id(),
                    span: Span::new(self.file, (base + lo) as u32, (base + hi) as u32),
                    kind: InterpolatedPartKind::Text(text),
                },
                Piece::Hole(source, lo) => {
                    let hole = self.parse_fragment(&source, base + lo, Self::parse_expr)?;
                    InterpolatedPart {
                        id: self.fresh_id(),
                        span: hole.span,
                        kind: InterpolatedPartKind::Hole(hole),
                    }
                }
            };
            parts.push(part);
        }
        Ok(Expr::new(
            self.fresh_id(),
            span,
            ExprKind::Interpolated(ExprInterpolated { parts }),
        ))
    }
}

/// Splits `$"..."` into unescaped text runs and hole sources with their
/// byte offsets inside the lexeme.
fn split_interpolation(lexeme: &str) -> std::result::Result<Vec<Piece>, String> {
    let bytes = lexeme.as_bytes();
    let end = lexeme.len() - 1;
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut text_start = 2;
    let mut idx = 2;
    let flush = |text: &mut String, lo: usize, hi: usize, pieces: &mut Vec<Piece>| {
        if !text.is_empty() {
            pieces.push(Piece::Text(std::mem::take(text), lo, hi));
        }
    };
    let mut raw_start = idx;
    while idx < end {
        match bytes[idx] {
            b'{' if bytes.get(idx + 1) == Some(&b'{') => {
                text.push_str(&unescape(&lexeme[raw_start..idx])?);
                text.push('{');
                idx += 2;
                raw_start = idx;
            }
            b'}' if bytes.get(idx + 1) == Some(&b'}') => {
                text.push_str(&unescape(&lexeme[raw_start..idx])?);
                text.push('}');
                idx += 2;
                raw_start = idx;
            }
            b'\\' => idx += 2,
            b'{' => {
                text.push_str(&unescape(&lexeme[raw_start..idx])?);
                flush(&mut text, text_start, idx, &mut pieces);
                let hole_start = idx + 1;
                let mut depth = 1usize;
                idx += 1;
                while idx < end && depth > 0 {
                    match bytes[idx] {
                        b'{' => depth += 1,
                        b'}' => depth -= 1,
                        b'"' => {
                            idx = scan_string_end(lexeme, idx + 1)
                                .ok_or_else(|| "unterminated string in interpolation".to_string())?;
                            continue;
                        }
                        _ => {}
                    }
                    idx += 1;
                }
                if depth > 0 {
                    return Err("unterminated interpolation hole".to_string());
                }
                let source = &lexeme[hole_start..idx - 1];
                if source.trim().is_empty() {
                    return Err("empty interpolation hole".to_string());
                }
                pieces.push(Piece::Hole(source.to_string(), hole_start));
                raw_start = idx;
                text_start = idx;
            }
            b'}' => return Err("unmatched `}` in interpolated string".to_string()),
            _ => idx += 1,
        }
    }
    text.push_str(&unescape(&lexeme[raw_start..end])?);
    flush(&mut text, text_start, end, &mut pieces);
    Ok(pieces)
}
