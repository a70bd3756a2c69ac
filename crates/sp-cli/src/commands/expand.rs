//! Expansion command implementation

use std::path::PathBuf;

use clap::Args;
use console::style;
use sp_core::ast::print::Formatting;
use sp_core::config::EngineConfig;

use crate::commands::{compile_file, DiagnosticStyle};
use crate::inputs::SiteFile;
use crate::{CliError, Result};

/// Arguments for the expand command
#[derive(Debug, Clone, Args)]
pub struct ExpandArgs {
    /// Template source file
    pub template: PathBuf,
    /// JSON weave-site description
    #[arg(long)]
    pub site: PathBuf,
    /// JSON declaration catalog the template refers to
    #[arg(long)]
    pub decls: Option<PathBuf>,
    /// Diagnostic renderer
    #[arg(long, value_enum, default_value = "pretty")]
    pub diagnostics: DiagnosticStyle,
    /// Print the residual tree as JSON instead of source text
    #[arg(long)]
    pub json: bool,
    /// Write the output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the expand command
pub fn expand_command(args: ExpandArgs, config: &EngineConfig) -> Result<()> {
    let site = SiteFile::load(&args.site)?;
    let compiled = compile_file(
        &args.template,
        args.decls.as_deref(),
        config,
        args.diagnostics,
    )?;
    let Some(generator) = compiled.generator else {
        return Err(CliError::Rejected {
            template: compiled.template.name,
            errors: compiled.errors,
        });
    };

    let site = site.into_context(&args.site, Formatting::from_options(&config.pretty))?;
    let residual = generator.expand(&site)?;
    let rendered = if args.json {
        serde_json::to_string_pretty(&residual).map_err(sp_core::Error::from)?
    } else {
        residual.to_source()
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", rendered)).map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?;
            eprintln!(
                "{} wrote {} statement(s) to {}",
                style("ok").green().bold(),
                residual.stmts.len(),
                path.display()
            );
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
