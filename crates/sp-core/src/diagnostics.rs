//! Diagnostics produced while classifying and compiling templates.
//!
//! Conflicts are reported as [`Diagnostic`]s carrying a stable `SPxxxx`
//! code. A template is rejected when any error-level diagnostic is present;
//! how diagnostics are shown is up to a [`DiagnosticTemplate`].

use std::fmt::{self, Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

use crate::span::Span;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum DiagnosticLevel {
    /// Recorded for tooling, never shown by default.
    Hidden,
    Info,
    Warning,
    Error,
}

impl DiagnosticLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticLevel::Hidden => "hidden",
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Error => "error",
        }
    }

    fn is_quiet(self) -> bool {
        self < DiagnosticLevel::Warning
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RelatedSpan {
    pub span: Span,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic<T = String>
where
    T: Clone + Display,
{
    pub level: DiagnosticLevel,
    pub message: T,
    pub code: Option<String>,
    pub span: Option<Span>,
    pub related: Vec<RelatedSpan>,
    pub suggestions: Vec<String>,
    /// Name of the template the diagnostic belongs to.
    pub template: Option<String>,
}

impl<T> Diagnostic<T>
where
    T: Clone + Display,
{
    pub fn new(level: DiagnosticLevel, message: T) -> Self {
        Self {
            level,
            message,
            code: None,
            span: None,
            related: Vec::new(),
            suggestions: Vec::new(),
            template: None,
        }
    }

    pub fn error(message: T) -> Self {
        Self::new(DiagnosticLevel::Error, message)
    }

    pub fn warning(message: T) -> Self {
        Self::new(DiagnosticLevel::Warning, message)
    }

    pub fn hidden(message: T) -> Self {
        Self::new(DiagnosticLevel::Hidden, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Points at a second location, e.g. where a local got its binding time.
    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push(RelatedSpan {
            span,
            message: message.into(),
        });
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    fn view<'a>(&'a self, fallback: &'a str) -> DiagnosticView<'a> {
        DiagnosticView {
            level: self.level,
            code: self.code.as_deref(),
            message: self.message.to_string(),
            span: self.span,
            related: &self.related,
            suggestions: &self.suggestions,
            template: self.template.as_deref().unwrap_or(fallback),
        }
    }
}

/// `error[SP0100]: message`
impl<T> Display for Diagnostic<T>
where
    T: Clone + Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.level.as_str())?;
        if let Some(code) = &self.code {
            write!(f, "[{}]", code)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// True when any diagnostic is an error; such a template gets no generator.
pub fn has_errors<M>(diagnostics: &[Diagnostic<M>]) -> bool
where
    M: Clone + Display,
{
    diagnostics.iter().any(Diagnostic::is_error)
}

/// A value, if one could be produced, plus the diagnostics found on the way.
#[derive(Debug, Clone)]
pub struct DiagnosticReport<T, M = String>
where
    M: Clone + Display,
{
    pub value: Option<T>,
    pub diagnostics: Vec<Diagnostic<M>>,
}

impl<T, M> DiagnosticReport<T, M>
where
    M: Clone + Display,
{
    pub fn success_with_diagnostics(value: T, diagnostics: Vec<Diagnostic<M>>) -> Self {
        Self {
            value: Some(value),
            diagnostics,
        }
    }

    pub fn failure(diagnostics: Vec<Diagnostic<M>>) -> Self {
        Self {
            value: None,
            diagnostics,
        }
    }

    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }

    pub fn into_result(self) -> Result<(T, Vec<Diagnostic<M>>), Vec<Diagnostic<M>>> {
        match self.value {
            Some(value) => Ok((value, self.diagnostics)),
            None => Err(self.diagnostics),
        }
    }
}

/// What a renderer sees of one diagnostic.
pub struct DiagnosticView<'a> {
    pub level: DiagnosticLevel,
    pub code: Option<&'a str>,
    pub message: String,
    pub span: Option<Span>,
    pub related: &'a [RelatedSpan],
    pub suggestions: &'a [String],
    /// The diagnostic's template, or the caller's fallback name.
    pub template: &'a str,
}

pub trait DiagnosticRenderer: Send + Sync {
    fn render(&self, view: &DiagnosticView<'_>) -> Vec<String>;
}

#[derive(Clone)]
pub enum DiagnosticTemplate {
    /// `error[SP0110]: ...` headers with `-->` locations.
    Pretty,
    /// One `[template] LEVEL: message (code)` header per diagnostic.
    Plain,
    Custom(Arc<dyn DiagnosticRenderer>),
}

impl DiagnosticTemplate {
    fn render(&self, view: &DiagnosticView<'_>) -> Vec<String> {
        match self {
            DiagnosticTemplate::Pretty => render_pretty(view),
            DiagnosticTemplate::Plain => render_plain(view),
            DiagnosticTemplate::Custom(renderer) => renderer.render(view),
        }
    }
}

#[derive(Clone)]
pub struct DiagnosticDisplayOptions {
    pub template: DiagnosticTemplate,
    /// Also print info and hidden diagnostics.
    pub verbose_info: bool,
}

impl DiagnosticDisplayOptions {
    pub fn pretty(verbose_info: bool) -> Self {
        Self {
            template: DiagnosticTemplate::Pretty,
            verbose_info,
        }
    }

    pub fn plain(verbose_info: bool) -> Self {
        Self {
            template: DiagnosticTemplate::Plain,
            verbose_info,
        }
    }
}

impl Default for DiagnosticDisplayOptions {
    fn default() -> Self {
        Self::pretty(false)
    }
}

/// Collects the diagnostics of templates compiled independently, possibly
/// on different threads.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticManager {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the diagnostics of `template`, naming it on entries that do not
    /// name a template yet.
    pub fn merge(&self, template: &str, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.extend(diagnostics.into_iter().map(|mut diagnostic| {
            diagnostic.template.get_or_insert_with(|| template.to_string());
            diagnostic
        }));
    }

    /// All diagnostics, grouped by template and ordered by position.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        entries.sort_by(|a, b| {
            a.template
                .cmp(&b.template)
                .then_with(|| a.span.map(|s| s.lo).cmp(&b.span.map(|s| s.lo)))
        });
        entries
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|diagnostic| diagnostic.is_error())
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Renders `diagnostics`; `fallback` names the template of diagnostics
    /// that carry none. Info and hidden entries are skipped unless
    /// `verbose_info` is set.
    pub fn render<M>(
        diagnostics: &[Diagnostic<M>],
        fallback: Option<&str>,
        options: &DiagnosticDisplayOptions,
    ) -> Vec<String>
    where
        M: Clone + Display,
    {
        let fallback = fallback.unwrap_or("stagephase");
        diagnostics
            .iter()
            .filter(|diagnostic| options.verbose_info || !diagnostic.level.is_quiet())
            .flat_map(|diagnostic| options.template.render(&diagnostic.view(fallback)))
            .collect()
    }

    pub fn emit<M>(
        diagnostics: &[Diagnostic<M>],
        fallback: Option<&str>,
        options: &DiagnosticDisplayOptions,
    ) where
        M: Clone + Display,
    {
        for line in Self::render(diagnostics, fallback, options) {
            eprintln!("{}", line);
        }
    }
}

fn render_pretty(view: &DiagnosticView<'_>) -> Vec<String> {
    let mut header = view.level.as_str().to_string();
    if let Some(code) = view.code {
        header.push_str(&format!("[{}]", code));
    }
    let mut lines = vec![format!("{}: {}", header, view.message)];
    match view.span {
        Some(span) => lines.push(format!("  --> {} at {}", view.template, span)),
        None => lines.push(format!("  --> {}", view.template)),
    }
    for related in view.related {
        lines.push(format!("   = note: {} at {}", related.message, related.span));
    }
    for suggestion in view.suggestions {
        lines.push(format!("   = help: {}", suggestion));
    }
    lines
}

fn render_plain(view: &DiagnosticView<'_>) -> Vec<String> {
    let level = view.level.as_str().to_uppercase();
    let mut lines = vec![match view.code {
        Some(code) => format!("[{}] {}: {} ({})", view.template, level, view.message, code),
        None => format!("[{}] {}: {}", view.template, level, view.message),
    }];
    if let Some(span) = view.span {
        lines.push(format!("   at {}", span));
    }
    lines.extend(
        view.related
            .iter()
            .map(|related| format!("   note: {} at {}", related.message, related.span)),
    );
    lines.extend(
        view.suggestions
            .iter()
            .map(|suggestion| format!("   suggestion: {}", suggestion)),
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Diagnostic> {
        vec![
            Diagnostic::error("bad stage".to_string())
                .with_code("SP0100")
                .with_span(Span::new(0, 3, 7)),
            Diagnostic::hidden("defaulted".to_string()),
        ]
    }

    #[test]
    fn plain_renderer_skips_hidden_unless_verbose() {
        let quiet = DiagnosticManager::render(
            &sample(),
            Some("tmpl"),
            &DiagnosticDisplayOptions::plain(false),
        );
        assert_eq!(
            quiet,
            vec![
                "[tmpl] ERROR: bad stage (SP0100)".to_string(),
                "   at Span(0:3-7)".to_string(),
            ]
        );
        let verbose = DiagnosticManager::render(
            &sample(),
            Some("tmpl"),
            &DiagnosticDisplayOptions::plain(true),
        );
        assert_eq!(verbose.len(), 3);
    }

    #[test]
    fn pretty_renderer_prints_code_and_location() {
        let diagnostic = Diagnostic::error("local `x` is used at both stages".to_string())
            .with_code("SP0110")
            .with_span(Span::new(0, 10, 11))
            .with_related(Span::new(0, 2, 3), "first determined here")
            .with_suggestion("wrap the value in meta.run_time(...)")
            .with_template("bad");
        let lines = DiagnosticManager::render(
            &[diagnostic],
            None,
            &DiagnosticDisplayOptions::pretty(false),
        );
        assert_eq!(lines[0], "error[SP0110]: local `x` is used at both stages");
        assert_eq!(lines[1], "  --> bad at Span(0:10-11)");
        assert!(lines[2].starts_with("   = note: first determined here"));
        assert_eq!(lines[3], "   = help: wrap the value in meta.run_time(...)");
    }

    #[test]
    fn custom_renderer_receives_fallback_template() {
        struct Codes;
        impl DiagnosticRenderer for Codes {
            fn render(&self, view: &DiagnosticView<'_>) -> Vec<String> {
                vec![format!("{}:{}", view.template, view.code.unwrap_or("-"))]
            }
        }
        let lines = DiagnosticManager::render(
            &sample(),
            Some("tmpl"),
            &DiagnosticDisplayOptions {
                template: DiagnosticTemplate::Custom(Arc::new(Codes)),
                verbose_info: true,
            },
        );
        assert_eq!(lines, vec!["tmpl:SP0100".to_string(), "tmpl:-".to_string()]);
    }

    #[test]
    fn manager_merges_templates_and_counts_errors() {
        let manager = DiagnosticManager::new();
        manager.merge("b", vec![Diagnostic::warning("w".to_string())]);
        assert!(!manager.has_errors());
        manager.merge(
            "a",
            vec![Diagnostic::error("e".to_string()).with_template("inner")],
        );
        assert_eq!(manager.error_count(), 1);

        let merged = manager.snapshot();
        assert_eq!(merged[0].template.as_deref(), Some("b"));
        assert_eq!(merged[1].template.as_deref(), Some("inner"));
    }

    #[test]
    fn display_uses_level_and_code() {
        let diagnostic = Diagnostic::error("stage conflict".to_string()).with_code("SP0100");
        assert_eq!(diagnostic.to_string(), "error[SP0100]: stage conflict");
    }
}
