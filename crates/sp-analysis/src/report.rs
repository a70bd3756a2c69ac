//! Conflict to diagnostic conversion.
//!
//! Every conflict kind has a stable code. Callers decide fatality by counting
//! error-level diagnostics.

use sp_core::diagnostics::{Diagnostic, DiagnosticLevel};

use crate::conflict::{Conflict, ConflictKind};

pub const STAGE_CONFLICT: &str = "SP0100";
pub const FORCED_STAGE_MISMATCH: &str = "SP0101";
pub const META_STATEMENT_IN_RESIDUAL_CONTEXT: &str = "SP0102";
pub const LOCAL_VARIABLE_AMBIGUOUS_COERCION: &str = "SP0110";
pub const INTRINSIC_MISUSE: &str = "SP0120";
pub const META_EXCEPTION_HANDLING: &str = "SP0130";
pub const INVALID_JUMP: &str = "SP0140";
pub const UNSUPPORTED_META_ASSIGNMENT: &str = "SP0150";
pub const UNRESOLVED_SYMBOL_DEFAULTED: &str = "SP0200";

pub fn code(kind: &ConflictKind) -> &'static str {
    match kind {
        ConflictKind::StageConflict { .. } => STAGE_CONFLICT,
        ConflictKind::ForcedStageMismatch { .. } => FORCED_STAGE_MISMATCH,
        ConflictKind::MetaStatementInResidualContext { .. } => META_STATEMENT_IN_RESIDUAL_CONTEXT,
        ConflictKind::LocalVariableAmbiguousCoercion { .. } => LOCAL_VARIABLE_AMBIGUOUS_COERCION,
        ConflictKind::IntrinsicMisuse { .. } => INTRINSIC_MISUSE,
        ConflictKind::MetaExceptionHandling { .. } => META_EXCEPTION_HANDLING,
        ConflictKind::InvalidJump { .. } => INVALID_JUMP,
        ConflictKind::UnsupportedMetaAssignment { .. } => UNSUPPORTED_META_ASSIGNMENT,
        ConflictKind::UnresolvedSymbolDefaulted { .. } => UNRESOLVED_SYMBOL_DEFAULTED,
    }
}

pub fn level(kind: &ConflictKind) -> DiagnosticLevel {
    match kind {
        ConflictKind::UnresolvedSymbolDefaulted { .. } => DiagnosticLevel::Hidden,
        _ => DiagnosticLevel::Error,
    }
}

fn message(kind: &ConflictKind) -> String {
    match kind {
        ConflictKind::StageConflict { meta, object } => format!(
            "compile-time {} cannot be combined with run-time {}",
            meta, object
        ),
        ConflictKind::ForcedStageMismatch { found, stage } => format!(
            "a {} expression cannot be forced to {}",
            found, stage
        ),
        ConflictKind::MetaStatementInResidualContext { construct } => format!(
            "{} executes at compile time but is inside run-time control flow",
            construct
        ),
        ConflictKind::LocalVariableAmbiguousCoercion {
            local,
            fixed,
            attempted,
        } => format!(
            "local variable `{}` is {} and cannot receive a {} value",
            local, fixed, attempted
        ),
        ConflictKind::IntrinsicMisuse { intrinsic, reason } => {
            format!("`{}` {}", intrinsic, reason)
        }
        ConflictKind::MetaExceptionHandling { construct } => format!(
            "{} is compile-time code inside exception handling, which is not supported",
            construct
        ),
        ConflictKind::InvalidJump { keyword } => {
            format!("`{}` outside of a loop", keyword)
        }
        ConflictKind::UnsupportedMetaAssignment { target } => format!(
            "compile-time assignment to {} is not supported; only locals can be assigned",
            target
        ),
        ConflictKind::UnresolvedSymbolDefaulted { name, default } => {
            format!("`{}` is not resolved and is treated as {}", name, default)
        }
    }
}

fn suggestion(kind: &ConflictKind) -> Option<&'static str> {
    match kind {
        ConflictKind::StageConflict { .. } => {
            Some("extract the compile-time part into a local or wrap it with `meta.run_time`")
        }
        ConflictKind::LocalVariableAmbiguousCoercion { .. } => {
            Some("use a separate local variable for each stage")
        }
        ConflictKind::MetaExceptionHandling { .. } => {
            Some("move the compile-time code out of the `try` statement")
        }
        _ => None,
    }
}

pub fn report(conflict: &Conflict) -> Diagnostic {
    let mut diagnostic = Diagnostic::new(level(&conflict.kind), message(&conflict.kind))
        .with_code(code(&conflict.kind))
        .with_span(conflict.span);
    for (span, note) in &conflict.related {
        diagnostic = diagnostic.with_related(*span, note.clone());
    }
    if let Some(suggestion) = suggestion(&conflict.kind) {
        diagnostic = diagnostic.with_suggestion(suggestion);
    }
    diagnostic
}

/// Reports every conflict; hidden diagnostics are dropped unless
/// `keep_hidden` is set.
pub fn report_all(conflicts: &[Conflict], keep_hidden: bool) -> Vec<Diagnostic> {
    conflicts
        .iter()
        .map(report)
        .filter(|diagnostic| keep_hidden || diagnostic.level != DiagnosticLevel::Hidden)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_core::span::Span;
    use sp_core::BindingTime;

    #[test]
    fn codes_and_levels() {
        let conflict = Conflict::new(
            ConflictKind::LocalVariableAmbiguousCoercion {
                local: "n".to_string(),
                fixed: BindingTime::MetaOnly,
                attempted: BindingTime::ObjectOnly,
            },
            3,
            Span::new(0, 10, 15),
        )
        .with_related(Span::new(0, 1, 4), "`n` became compile-time here");
        let diagnostic = report(&conflict);
        assert_eq!(diagnostic.code.as_deref(), Some(LOCAL_VARIABLE_AMBIGUOUS_COERCION));
        assert_eq!(diagnostic.level, DiagnosticLevel::Error);
        assert_eq!(diagnostic.related.len(), 1);
        assert!(diagnostic.message.contains("`n`"));
        assert!(!diagnostic.suggestions.is_empty());
    }

    #[test]
    fn hidden_diagnostics_are_filtered_by_default() {
        let conflicts = vec![
            Conflict::new(
                ConflictKind::UnresolvedSymbolDefaulted {
                    name: "log".to_string(),
                    default: BindingTime::Both,
                },
                1,
                Span::null(),
            ),
            Conflict::new(
                ConflictKind::InvalidJump {
                    keyword: "break".to_string(),
                },
                2,
                Span::null(),
            ),
        ];
        assert_eq!(report_all(&conflicts, false).len(), 1);
        let all = report_all(&conflicts, true);
        assert_eq!(all[0].level, DiagnosticLevel::Hidden);
        assert_eq!(all[0].code.as_deref(), Some(UNRESOLVED_SYMBOL_DEFAULTED));
    }
}
