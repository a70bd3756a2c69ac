//! Binding-time check command implementation

use std::path::PathBuf;

use clap::Args;
use console::style;
use sp_core::config::EngineConfig;
use sp_core::pretty::pretty;

use crate::commands::{compile_file, DiagnosticStyle};
use crate::{CliError, Result};

/// Arguments for the check command
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Template source file
    pub template: PathBuf,
    /// JSON declaration catalog the template refers to
    #[arg(long)]
    pub decls: Option<PathBuf>,
    /// Diagnostic renderer
    #[arg(long, value_enum, default_value = "pretty")]
    pub diagnostics: DiagnosticStyle,
    /// Print the compiled generator
    #[arg(long)]
    pub generator: bool,
}

/// Execute the check command
pub fn check_command(args: CheckArgs, config: &EngineConfig) -> Result<()> {
    let compiled = compile_file(
        &args.template,
        args.decls.as_deref(),
        config,
        args.diagnostics,
    )?;
    let name = compiled.template.name.clone();
    let Some(generator) = compiled.generator else {
        return Err(CliError::Rejected {
            template: name,
            errors: compiled.errors,
        });
    };

    println!(
        "{} `{}`: {} emitting statement(s), {} warning(s)",
        style("ok").green().bold(),
        name,
        generator.emit_count(),
        compiled.warnings
    );
    if args.generator {
        print!("{}", pretty(&generator, config.pretty.clone()));
    }
    Ok(())
}
