//! Command implementations for the StagePhase CLI

pub mod check;
pub mod expand;

pub use check::check_command;
pub use expand::expand_command;

use std::path::Path;

use clap::ValueEnum;
use sp_core::ast::Template;
use sp_core::config::EngineConfig;
use sp_core::diagnostics::{DiagnosticDisplayOptions, DiagnosticLevel, DiagnosticManager};
use sp_expand::{Generator, TemplateCompiler};
use sp_lang::NameBinder;

use crate::inputs::{display_name, load_catalog, load_template};
use crate::{CliError, Result};

/// Diagnostic renderer selected with `--diagnostics`.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum DiagnosticStyle {
    #[default]
    Pretty,
    Plain,
}

impl DiagnosticStyle {
    pub fn options(self, verbose_info: bool) -> DiagnosticDisplayOptions {
        match self {
            DiagnosticStyle::Pretty => DiagnosticDisplayOptions::pretty(verbose_info),
            DiagnosticStyle::Plain => DiagnosticDisplayOptions::plain(verbose_info),
        }
    }
}

/// Outcome of compiling one template file.
pub struct Compiled {
    pub template: Template,
    pub generator: Option<Generator>,
    pub errors: usize,
    pub warnings: usize,
}

/// Parses, binds and compiles `path`, printing its diagnostics to stderr.
pub(crate) fn compile_file(
    path: &Path,
    decls: Option<&Path>,
    config: &EngineConfig,
    style: DiagnosticStyle,
) -> Result<Compiled> {
    let template = load_template(path)?;
    let catalog = load_catalog(decls)?;
    let compiler = TemplateCompiler::from_catalog(config.clone(), &catalog)
        .map_err(|err| CliError::Config(err.to_string()))?;
    let model = NameBinder::new(&catalog).bind(&template);
    let report = compiler.compile(&template, &model)?;

    let count = |level: DiagnosticLevel| {
        report
            .diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.level == level)
            .count()
    };
    let errors = count(DiagnosticLevel::Error);
    let warnings = count(DiagnosticLevel::Warning);

    let context = display_name(path);
    DiagnosticManager::emit(
        &report.diagnostics,
        Some(&context),
        &style.options(config.report_hidden),
    );
    Ok(Compiled {
        template,
        generator: report.value,
        errors,
        warnings,
    })
}
