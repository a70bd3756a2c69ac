//! Binding-time analysis of templates.
//!
//! [`annotate`] classifies a template against a frozen symbol table and
//! returns the side tables the rewriter consumes together with every
//! conflict found; [`analyze`] turns the conflicts into diagnostics.

pub mod analyzer;
pub mod annotate;
pub mod conflict;
pub mod report;

pub use analyzer::annotate;
pub use annotate::{AnnotatedTemplate, NodeAnnotation, Reference, StmtStage};
pub use conflict::{Conflict, ConflictKind};

use sp_core::ast::Template;
use sp_core::diagnostics::{has_errors, DiagnosticReport};
use sp_core::model::SemanticModel;
use sp_core::SymbolTable;

/// Classifies `template`; the report carries a value only when no error
/// was found.
pub fn analyze<'t, M>(
    template: &'t Template,
    model: &M,
    table: &SymbolTable,
    keep_hidden: bool,
) -> DiagnosticReport<AnnotatedTemplate<'t>>
where
    M: SemanticModel + ?Sized,
{
    let (annotated, conflicts) = annotate(template, model, table);
    let diagnostics = report::report_all(&conflicts, keep_hidden);
    if has_errors(&diagnostics) {
        tracing::debug!(
            "template `{}` rejected with {} diagnostics",
            template.name,
            diagnostics.len()
        );
        DiagnosticReport::failure(diagnostics)
    } else {
        DiagnosticReport::success_with_diagnostics(annotated, diagnostics)
    }
}
