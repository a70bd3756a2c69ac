//! Recursive-descent parser for template sources.
//!
//! Tokens come from the winnow lexer; the parser walks the token vector and
//! allocates a unique [`NodeId`] for every node it builds. Line comments in
//! front of a statement become that statement's trivia; comments anywhere
//! else are dropped.

use sp_core::ast::{Block, Expr, NodeId, Template};
use sp_core::span::{FileId, Span};
use sp_core::{Error, Result};

use crate::lexer::{self, Keyword, LexerError, Token, TokenKind};

mod expr;
mod stmt;

const EOF_DESCRIPTION: &str = "end of input";

pub fn parse_template(source: &str) -> Result<Template> {
    TemplateParser::new(source, 0)?.finish_with(TemplateParser::parse_template)
}

pub fn parse_block(source: &str) -> Result<Block> {
    TemplateParser::new(source, 0)?.finish_with(TemplateParser::parse_block)
}

pub fn parse_expr(source: &str) -> Result<Expr> {
    TemplateParser::new(source, 0)?.finish_with(TemplateParser::parse_expr)
}

pub struct TemplateParser {
    tokens: Vec<Token>,
    pos: usize,
    file: FileId,
    /// Byte offset of the token stream inside the original file
    offset: usize,
    next_id: NodeId,
    source_len: usize,
}

impl TemplateParser {
    pub fn new(source: &str, file: FileId) -> Result<Self> {
        Self::with_offset(source, file, 0, 1)
    }

    fn with_offset(source: &str, file: FileId, offset: usize, next_id: NodeId) -> Result<Self> {
        let tokens = lexer::lex(source).map_err(|err| lex_error(err, file, offset))?;
        tracing::trace!("lexed {} tokens", tokens.len());
        Ok(Self {
            tokens,
            pos: 0,
            file,
            offset,
            next_id,
            source_len: source.len(),
        })
    }

    /// Runs `parse` and requires every token to be consumed.
    pub fn finish_with<T>(mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let value = parse(&mut self)?;
        self.skip_comments();
        if let Some(token) = self.tokens.get(self.pos) {
            return Err(Error::parse(
                format!("unexpected trailing token `{}`", token.lexeme),
                self.token_span(token),
            ));
        }
        Ok(value)
    }

    pub(crate) fn fresh_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Parses an embedded source fragment, e.g. an interpolation hole,
    /// continuing this parser's id sequence.
    pub(crate) fn parse_fragment<T>(
        &mut self,
        source: &str,
        offset: usize,
        parse: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let mut fragment = Self::with_offset(source, self.file, offset, self.next_id)?;
        let parsed = parse(&mut fragment);
        self.next_id = fragment.next_id;
        let value = parsed?;
        fragment.skip_comments();
        if let Some(token) = fragment.tokens.get(fragment.pos) {
            return Err(Error::parse(
                format!("unexpected token `{}` in interpolation", token.lexeme),
                fragment.token_span(token),
            ));
        }
        Ok(value)
    }

    pub(crate) fn skip_comments(&mut self) {
        while matches!(
            self.tokens.get(self.pos).map(|token| &token.kind),
            Some(TokenKind::Comment)
        ) {
            self.pos += 1;
        }
    }

    /// Collects the comment tokens in front of the next statement.
    pub(crate) fn take_comments(&mut self) -> Vec<String> {
        let mut comments = Vec::new();
        while let Some(token) = self.tokens.get(self.pos) {
            if token.kind != TokenKind::Comment {
                break;
            }
            comments.push(token.lexeme.clone());
            self.pos += 1;
        }
        comments
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .find(|token| token.kind != TokenKind::Comment)
    }

    pub(crate) fn bump(&mut self) -> Option<Token> {
        self.skip_comments();
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }

    pub(crate) fn peek_symbol(&self, symbol: &str) -> bool {
        matches!(self.peek(), Some(token) if token.kind == TokenKind::Symbol && token.lexeme == symbol)
    }

    pub(crate) fn peek_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.peek(), Some(Token { kind: TokenKind::Keyword(k), .. }) if *k == keyword)
    }

    pub(crate) fn match_symbol(&mut self, symbol: &str) -> bool {
        if self.peek_symbol(symbol) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn match_keyword(&mut self, keyword: Keyword) -> bool {
        if self.peek_keyword(keyword) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_symbol(&mut self, symbol: &str) -> Result<Span> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Symbol && token.lexeme == symbol => {
                let span = self.token_span(token);
                self.bump();
                Ok(span)
            }
            _ => Err(self.unexpected(&format!("`{}`", symbol))),
        }
    }

    pub(crate) fn expect_keyword(&mut self, keyword: Keyword) -> Result<Span> {
        if self.peek_keyword(keyword) {
            let span = self.peek_span();
            self.bump();
            Ok(span)
        } else {
            Err(self.unexpected(&format!("{:?}", keyword).to_lowercase()))
        }
    }

    pub(crate) fn expect_ident(&mut self) -> Result<(String, Span)> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::Ident => {
                let name = token.lexeme.clone();
                let span = self.token_span(token);
                self.bump();
                Ok((name, span))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    pub(crate) fn token_span(&self, token: &Token) -> Span {
        Span::new(
            self.file,
            (self.offset + token.span.start) as u32,
            (self.offset + token.span.end) as u32,
        )
    }

    /// Span of the next token, or an empty span at the end of input.
    pub(crate) fn peek_span(&self) -> Span {
        match self.peek() {
            Some(token) => self.token_span(token),
            None => {
                let end = (self.offset + self.source_len) as u32;
                Span::new(self.file, end, end)
            }
        }
    }

    /// Span of the most recently consumed token.
    pub(crate) fn prev_span(&self) -> Span {
        self.tokens[..self.pos.min(self.tokens.len())]
            .iter()
            .rev()
            .find(|token| token.kind != TokenKind::Comment)
            .map(|token| self.token_span(token))
            .unwrap_or_else(|| self.peek_span())
    }

    pub(crate) fn unexpected(&self, expected: &str) -> Error {
        let found = self
            .peek()
            .map(|token| format!("`{}`", token.lexeme))
            .unwrap_or_else(|| EOF_DESCRIPTION.to_string());
        Error::parse(
            format!("expected {}, found {}", expected, found),
            self.peek_span(),
        )
    }
}

fn lex_error(err: LexerError, file: FileId, offset: usize) -> Error {
    let at = (offset + err.offset().unwrap_or(0)) as u32;
    Error::parse(err.to_string(), Span::new(file, at, at + 1))
}

#[cfg(test)]
mod tests;
