use super::winnow::{
    backtrack_err, is_ident_continue, is_ident_start, parse_cooked_string_literal,
    parse_interpolated_literal, ws, MULTI_PUNCT, SINGLE_PUNCT,
};
use thiserror::Error;
use winnow::combinator::alt;
use winnow::error::{ContextError, ErrMode};
use winnow::token::{literal, take_till, take_while};
use winnow::{ModalResult, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Template,
    Method,
    Getter,
    Setter,
    Compile,
    Var,
    If,
    Else,
    While,
    Foreach,
    In,
    Return,
    Break,
    Continue,
    Try,
    Catch,
    When,
    Finally,
    True,
    False,
    Null,
}

impl Keyword {
    fn from_lexeme(lexeme: &str) -> Option<Self> {
        match lexeme {
            "template" => Some(Self::Template),
            "method" => Some(Self::Method),
            "getter" => Some(Self::Getter),
            "setter" => Some(Self::Setter),
            "compile" => Some(Self::Compile),
            "var" => Some(Self::Var),
            "if" => Some(Self::If),
            "else" => Some(Self::Else),
            "while" => Some(Self::While),
            "foreach" => Some(Self::Foreach),
            "in" => Some(Self::In),
            "return" => Some(Self::Return),
            "break" => Some(Self::Break),
            "continue" => Some(Self::Continue),
            "try" => Some(Self::Try),
            "catch" => Some(Self::Catch),
            "when" => Some(Self::When),
            "finally" => Some(Self::Finally),
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "null" => Some(Self::Null),
            _ => None,
        }
    }
}

/// Byte range of a token relative to the lexed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    StringLiteral,
    InterpolatedString,
    Symbol,
    Keyword(Keyword),
    /// `// text`; the lexeme holds the text without the marker
    Comment,
}

#[derive(Debug, Error)]
pub enum LexerError {
    #[error("lexer error: {0}")]
    Message(String),
    #[error("unrecognized input at byte {offset}")]
    Unrecognized { offset: usize },
}

impl From<ContextError> for LexerError {
    fn from(err: ContextError) -> Self {
        LexerError::Message(err.to_string())
    }
}

impl From<ErrMode<ContextError>> for LexerError {
    fn from(err: ErrMode<ContextError>) -> Self {
        match err {
            ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => LexerError::from(ctx),
            ErrMode::Incomplete(_) => LexerError::Message("incomplete input".to_string()),
        }
    }
}

impl LexerError {
    pub fn offset(&self) -> Option<usize> {
        match self {
            LexerError::Unrecognized { offset } => Some(*offset),
            LexerError::Message(_) => None,
        }
    }
}

pub fn lex(source: &str) -> Result<Vec<Token>, LexerError> {
    let mut input = source;
    let mut tokens = Vec::new();
    while !input.is_empty() {
        ws.parse_next(&mut input).map_err(LexerError::from)?;
        if input.is_empty() {
            break;
        }
        let start = source.len() - input.len();
        let kind = match token.parse_next(&mut input) {
            Ok(kind) => kind,
            Err(_) => return Err(LexerError::Unrecognized { offset: start }),
        };
        let end = source.len() - input.len();
        let raw = &source[start..end];
        let (kind, lexeme) = match kind {
            TokenKind::Ident => match Keyword::from_lexeme(raw) {
                Some(keyword) => (TokenKind::Keyword(keyword), raw.to_string()),
                None => (TokenKind::Ident, raw.to_string()),
            },
            TokenKind::Comment => (
                TokenKind::Comment,
                raw.trim_start_matches('/').trim().to_string(),
            ),
            other => (other, raw.to_string()),
        };
        tokens.push(Token {
            kind,
            lexeme,
            span: Span { start, end },
        });
    }
    Ok(tokens)
}

fn token(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        line_comment_token,
        interpolated_token,
        string_token,
        number_token,
        ident_token,
        symbol_token,
    ))
    .parse_next(input)
}

fn line_comment_token(input: &mut &str) -> ModalResult<TokenKind> {
    literal("//").parse_next(input)?;
    take_till(0.., |c: char| c == '\n' || c == '\r').parse_next(input)?;
    Ok(TokenKind::Comment)
}

fn interpolated_token(input: &mut &str) -> ModalResult<TokenKind> {
    parse_interpolated_literal(input).map(|_| TokenKind::InterpolatedString)
}

fn string_token(input: &mut &str) -> ModalResult<TokenKind> {
    parse_cooked_string_literal(input).map(|_| TokenKind::StringLiteral)
}

fn number_token(input: &mut &str) -> ModalResult<TokenKind> {
    (
        take_while(1.., |c: char| c.is_ascii_digit()),
        take_while(0.., |c: char| c.is_ascii_digit() || c == '_'),
    )
        .map(|_| TokenKind::Number)
        .parse_next(input)
}

fn ident_token(input: &mut &str) -> ModalResult<TokenKind> {
    (
        take_while(1.., is_ident_start),
        take_while(0.., is_ident_continue),
    )
        .parse_next(input)
        .map(|_| TokenKind::Ident)
}

fn symbol_token(input: &mut &str) -> ModalResult<TokenKind> {
    alt((
        multi_punct_token.map(|_| TokenKind::Symbol),
        single_punct_token.map(|_| TokenKind::Symbol),
    ))
    .parse_next(input)
}

fn multi_punct_token(input: &mut &str) -> ModalResult<&'static str> {
    for sym in MULTI_PUNCT {
        if let Some(rest) = input.strip_prefix(sym) {
            *input = rest;
            return Ok(*sym);
        }
    }
    Err(backtrack_err())
}

fn single_punct_token<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1..=1, |c: char| SINGLE_PUNCT.contains(c)).parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        lex(source)
            .expect("lex")
            .into_iter()
            .map(|token| (token.kind, token.lexeme))
            .collect()
    }

    #[test]
    fn comments_are_tokens_and_block_comments_are_skipped() {
        let tokens = kinds("// hello\nvar /* skip */ x += 1;");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Comment, "hello".to_string()),
                (TokenKind::Keyword(Keyword::Var), "var".to_string()),
                (TokenKind::Ident, "x".to_string()),
                (TokenKind::Symbol, "+=".to_string()),
                (TokenKind::Number, "1".to_string()),
                (TokenKind::Symbol, ";".to_string()),
            ]
        );
    }

    #[test]
    fn spread_and_interpolation() {
        let tokens = kinds(r#"[...xs] $"n={n}""#);
        assert_eq!(tokens[1], (TokenKind::Symbol, "...".to_string()));
        assert_eq!(
            tokens.last().cloned(),
            Some((TokenKind::InterpolatedString, r#"$"n={n}""#.to_string()))
        );
    }

    #[test]
    fn reports_offset_of_unknown_character() {
        let err = lex("var x = #;").unwrap_err();
        assert_eq!(err.offset(), Some(8));
    }
}
