//! Indented text dumps of generators and shared string escaping.

use std::fmt::{self, Formatter, Write as _};

/// Layout of generator dumps and of residual code printed without a
/// weave-site `Formatting`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PrettyOptions {
    pub indent_size: usize,
    /// Append the template span to every `emit` line of a generator dump.
    pub show_spans: bool,
}

impl Default for PrettyOptions {
    fn default() -> Self {
        Self {
            indent_size: 4,
            show_spans: false,
        }
    }
}

pub struct PrettyCtx<'a> {
    pub options: &'a PrettyOptions,
    depth: usize,
}

impl<'a> PrettyCtx<'a> {
    pub fn new(options: &'a PrettyOptions) -> Self {
        Self { options, depth: 0 }
    }

    pub fn writeln(&self, f: &mut Formatter<'_>, line: impl AsRef<str>) -> fmt::Result {
        let width = self.depth * self.options.indent_size;
        writeln!(f, "{:width$}{}", "", line.as_ref(), width = width)
    }

    /// Runs `body` one level deeper.
    pub fn with_indent<F>(&mut self, mut body: F) -> fmt::Result
    where
        F: FnMut(&mut Self) -> fmt::Result,
    {
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

    /// `header {`, the nested `body`, then `}`.
    pub fn block<F>(&mut self, f: &mut Formatter<'_>, header: impl AsRef<str>, mut body: F) -> fmt::Result
    where
        F: FnMut(&mut Self, &mut Formatter<'_>) -> fmt::Result,
    {
        self.writeln(f, format!("{} {{", header.as_ref()))?;
        self.depth += 1;
        let result = body(self, f);
        self.depth -= 1;
        result?;
        self.writeln(f, "}")
    }
}

pub trait PrettyPrintable {
    fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result;
}

pub struct PrettyDisplay<'a, T> {
    value: &'a T,
    options: PrettyOptions,
}

impl<T: PrettyPrintable> fmt::Display for PrettyDisplay<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.value.fmt_pretty(f, &mut PrettyCtx::new(&self.options))
    }
}

pub fn pretty<T: PrettyPrintable>(value: &T, options: PrettyOptions) -> PrettyDisplay<'_, T> {
    PrettyDisplay { value, options }
}

/// Escapes `input` for a double-quoted string literal of the residual
/// language.
pub fn escape_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch.is_control() => {
                let _ = write!(out, "\\u{{{:x}}}", ch as u32);
            }
            ch => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nested;

    impl PrettyPrintable for Nested {
        fn fmt_pretty(&self, f: &mut Formatter<'_>, ctx: &mut PrettyCtx<'_>) -> fmt::Result {
            ctx.block(f, "outer", |ctx, f| {
                ctx.writeln(f, "inner")?;
                ctx.with_indent(|ctx| ctx.writeln(f, "deeper"))
            })
        }
    }

    #[test]
    fn blocks_nest_by_indent_size() {
        let options = PrettyOptions {
            indent_size: 2,
            show_spans: false,
        };
        assert_eq!(
            pretty(&Nested, options).to_string(),
            "outer {\n  inner\n    deeper\n}\n"
        );
    }

    #[test]
    fn escapes_quotes_and_controls() {
        assert_eq!(escape_string("a\"b\n\u{1}\\"), "a\\\"b\\n\\u{1}\\\\");
    }
}
