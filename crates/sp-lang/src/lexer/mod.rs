//! Lexer for template sources.

pub mod tokenizer;
pub(crate) mod winnow;

pub use tokenizer::{lex, Keyword, LexerError, Span, Token, TokenKind};
