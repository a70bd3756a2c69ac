use std::sync::Arc;

use sp_core::ast::Template;
use sp_core::config::EngineConfig;
use sp_core::diagnostics::{Diagnostic, DiagnosticReport};
use sp_core::model::{DeclarationCatalog, SemanticModel};
use sp_core::{Result, SymbolTable};

use crate::generator::Generator;
use crate::rewrite::rewrite;

/// Diagnostic code of an engine failure reported through
/// [`TemplateCompiler::analyze_template`].
pub const ENGINE_FAILURE: &str = "SP0900";

/// Classifies templates and lowers the accepted ones into generators.
///
/// One compiler serves any number of templates; the symbol table is frozen
/// and shared.
#[derive(Debug, Clone)]
pub struct TemplateCompiler {
    config: EngineConfig,
    table: Arc<SymbolTable>,
}

impl TemplateCompiler {
    pub fn new(config: EngineConfig, table: Arc<SymbolTable>) -> Self {
        Self { config, table }
    }

    /// Builds and freezes a symbol table holding every catalog declaration.
    pub fn from_catalog(config: EngineConfig, catalog: &DeclarationCatalog) -> Result<Self> {
        let table = SymbolTable::from_config(&config)
            .declare_all(catalog.iter())
            .freeze()?;
        Ok(Self::new(config, Arc::new(table)))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn table(&self) -> &Arc<SymbolTable> {
        &self.table
    }

    /// Compiles one template.
    ///
    /// Rejected templates produce a report without a value. `Err` is reserved
    /// for failures of the engine itself: a missing factory mapping or
    /// annotations the rewriter cannot lower.
    pub fn compile<M>(&self, template: &Template, model: &M) -> Result<DiagnosticReport<Generator>>
    where
        M: SemanticModel + ?Sized,
    {
        let _span = tracing::debug_span!("compile", template = %template.name).entered();
        let report = sp_analysis::analyze(template, model, &self.table, self.config.report_hidden);
        match report.value {
            Some(annotated) => {
                let generator = rewrite(&annotated, self.config.max_meta_iterations)?;
                Ok(DiagnosticReport::success_with_diagnostics(
                    generator,
                    report.diagnostics,
                ))
            }
            None => {
                tracing::info!(
                    "template `{}` not compiled: {} diagnostics",
                    template.name,
                    report.diagnostics.len()
                );
                Ok(DiagnosticReport::failure(report.diagnostics))
            }
        }
    }

    /// Like [`compile`](Self::compile), folding the report into a `Result`:
    /// a rejected template or an engine failure yields the diagnostics.
    pub fn analyze_template<M>(
        &self,
        template: &Template,
        model: &M,
    ) -> std::result::Result<Generator, Vec<Diagnostic>>
    where
        M: SemanticModel + ?Sized,
    {
        match self.compile(template, model) {
            Ok(report) => report.into_result().map(|(generator, _)| generator),
            Err(err) => Err(vec![Diagnostic::error(err.to_string())
                .with_code(ENGINE_FAILURE)
                .with_template(template.name.clone())]),
        }
    }

    /// Classification only; returns the diagnostics of `template`.
    pub fn check<M>(&self, template: &Template, model: &M) -> Vec<Diagnostic>
    where
        M: SemanticModel + ?Sized,
    {
        sp_analysis::analyze(template, model, &self.table, self.config.report_hidden).diagnostics
    }
}
