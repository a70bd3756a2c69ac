use crate::ast::SyntaxKind;
use crate::span::Span;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The intrinsic catalog or engine configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// No factory mapping accepts the requested construction.
    #[error("No factory mapping for {kind} at {span}: {detail}")]
    FactoryGap {
        kind: SyntaxKind,
        span: Span,
        detail: String,
    },
    /// The generator failed while evaluating meta code for a weave site.
    #[error("Expansion error: {message}")]
    Expansion { message: String, span: Option<Span> },
    #[error("Corrupt input: {0}")]
    CorruptInput(String),
    #[error("Parse error at {span}: {message}")]
    Parse { message: String, span: Span },
    #[error("Generic error: {0}")]
    Generic(eyre::Report),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(message.into())
    }

    pub fn factory_gap(kind: SyntaxKind, span: Span, detail: impl Into<String>) -> Self {
        Error::FactoryGap {
            kind,
            span,
            detail: detail.into(),
        }
    }

    pub fn parse(message: impl Into<String>, span: Span) -> Self {
        Error::Parse {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Error::FactoryGap { span, .. } | Error::Parse { span, .. } => Some(*span),
            Error::Expansion { span, .. } => *span,
            _ => None,
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Generic(eyre::Report::new(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::CorruptInput(e.to_string())
    }
}
