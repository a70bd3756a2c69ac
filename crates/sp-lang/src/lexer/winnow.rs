use winnow::combinator::{alt, cut_err, repeat};
use winnow::error::{ContextError, ErrMode};
use winnow::token::{literal, take_until, take_while};
use winnow::{ModalResult, Parser};

pub(crate) const MULTI_PUNCT: &[&str] = &[
    "...", "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=", "%=",
];
pub(crate) const SINGLE_PUNCT: &str = "=+-*/%!<>?:;,.()[]{}";

/// Skips whitespace and block comments. Line comments are tokens.
pub(crate) fn ws(input: &mut &str) -> ModalResult<()> {
    repeat::<_, _, (), _, _>(0.., alt((whitespace, block_comment))).parse_next(input)?;
    Ok(())
}

pub(crate) fn whitespace(input: &mut &str) -> ModalResult<()> {
    take_while(1.., char::is_whitespace)
        .map(|_| ())
        .parse_next(input)
}

pub(crate) fn block_comment(input: &mut &str) -> ModalResult<()> {
    literal("/*").parse_next(input)?;
    cut_err(take_until(0.., "*/")).parse_next(input)?;
    literal("*/").parse_next(input)?;
    Ok(())
}

/// `"..."` with backslash escapes; returns the raw lexeme.
pub(crate) fn parse_cooked_string_literal<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let slice = *input;
    if !slice.starts_with('"') {
        return Err(backtrack_err());
    }
    let end = scan_string_end(slice, 1).ok_or_else(cut_error)?;
    *input = &slice[end..];
    Ok(&slice[..end])
}

/// `$"..."` where `{expr}` holes may themselves contain string literals.
pub(crate) fn parse_interpolated_literal<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    let slice = *input;
    if !slice.starts_with("$\"") {
        return Err(backtrack_err());
    }
    let bytes = slice.as_bytes();
    let mut idx = 2;
    let mut depth = 0usize;
    while idx < bytes.len() {
        match (depth, bytes[idx]) {
            (0, b'\\') => idx += 2,
            (0, b'"') => {
                *input = &slice[idx + 1..];
                return Ok(&slice[..idx + 1]);
            }
            (0, b'{') if bytes.get(idx + 1) == Some(&b'{') => idx += 2,
            (0, b'}') if bytes.get(idx + 1) == Some(&b'}') => idx += 2,
            (_, b'{') => {
                depth += 1;
                idx += 1;
            }
            (0, _) => idx += 1,
            (_, b'}') => {
                depth -= 1;
                idx += 1;
            }
            (_, b'"') => idx = scan_string_end(slice, idx + 1).ok_or_else(cut_error)?,
            _ => idx += 1,
        }
    }
    Err(cut_error())
}

/// Byte index just past the closing quote of a string whose body starts at
/// `start`.
pub(crate) fn scan_string_end(slice: &str, start: usize) -> Option<usize> {
    let bytes = slice.as_bytes();
    let mut idx = start;
    let mut escape = false;
    while idx < bytes.len() {
        let b = bytes[idx];
        idx += 1;
        if b == b'\\' && !escape {
            escape = true;
            continue;
        }
        if b == b'"' && !escape {
            return Some(idx);
        }
        escape = false;
    }
    None
}

pub(crate) fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphabetic()
}

pub(crate) fn is_ident_continue(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphanumeric()
}

pub(crate) fn backtrack_err() -> ErrMode<ContextError> {
    ErrMode::Backtrack(ContextError::new())
}

fn cut_error() -> ErrMode<ContextError> {
    ErrMode::Cut(ContextError::new())
}

/// Resolves backslash escapes of a string body.
pub(crate) fn unescape(body: &str) -> Result<String, String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('u') => {
                if chars.next() != Some('{') {
                    return Err("expected `{` after \\u".to_string());
                }
                let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| format!("invalid unicode escape `{}`", hex))?;
                out.push(
                    char::from_u32(code)
                        .ok_or_else(|| format!("invalid unicode scalar {:x}", code))?,
                );
            }
            Some(other) => return Err(format!("unknown escape `\\{}`", other)),
            None => return Err("dangling backslash".to_string()),
        }
    }
    Ok(out)
}
