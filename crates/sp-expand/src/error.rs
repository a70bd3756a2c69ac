use sp_core::error::Error;
use sp_core::span::Span;

/// Create an expansion error without location
pub fn expansion_error(message: impl Into<String>) -> Error {
    Error::Expansion {
        message: message.into(),
        span: None,
    }
}

/// Create an expansion error pointing at the template node being evaluated
pub fn expansion_error_with_span(message: impl Into<String>, span: Span) -> Error {
    Error::Expansion {
        message: message.into(),
        span: if span.is_null() { None } else { Some(span) },
    }
}

/// Create an error for an annotated template the rewriter cannot lower.
pub fn corrupt_input(message: impl Into<String>) -> Error {
    Error::CorruptInput(message.into())
}

/// Macro to return early with an expansion error
#[macro_export]
macro_rules! expand_bail {
    ($message:expr) => {
        return Err($crate::error::expansion_error($message))
    };
    ($message:expr, $span:expr) => {
        return Err($crate::error::expansion_error_with_span($message, $span))
    };
}

/// Macro to ensure a condition is true, or return an expansion error
#[macro_export]
macro_rules! expand_ensure {
    ($cond:expr, $message:expr) => {
        if !($cond) {
            $crate::expand_bail!($message);
        }
    };
    ($cond:expr, $message:expr, $span:expr) => {
        if !($cond) {
            $crate::expand_bail!($message, $span);
        }
    };
}
