//! StagePhase CLI Binary
//!
//! # Usage
//!
//! ```bash
//! # Classify a template and report binding-time conflicts
//! sp check log_calls.sp --decls decls.json
//!
//! # Generate the code for one weave site
//! sp expand log_calls.sp --decls decls.json --site transfer.json
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sp_cli::commands::{self, check::CheckArgs, expand::ExpandArgs};
use sp_cli::config::load_engine_config;
use sp_cli::CliError;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "sp",
    version = env!("CARGO_PKG_VERSION"),
    about = "StagePhase: binding-time analysis and staged expansion of code templates",
    long_about = r#"
StagePhase splits a template into the code that runs while weaving and the
code that is emitted at every weave site.

EXAMPLES:
    sp check log_calls.sp --decls decls.json
    sp expand log_calls.sp --site transfer.json
    "#
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level (overrides --verbose/--quiet)
    #[arg(long, global = true, value_enum)]
    log: Option<LogLevel>,

    /// Set log output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Classify unknown external symbols as run-time only
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a template and report binding-time conflicts
    Check(CheckArgs),

    /// Expand a template for one weave site
    Expand(ExpandArgs),
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet, cli.log, cli.log_format);

    let result = load_engine_config(cli.config.as_deref(), cli.strict).and_then(|config| {
        match cli.command {
            Commands::Check(args) => commands::check_command(args, &config),
            Commands::Expand(args) => commands::expand_command(args, &config),
        }
    });

    match result {
        Ok(()) => {
            if cli.verbose > 0 {
                info!("Command completed successfully");
            }
        }
        Err(e) => {
            report_error(&e);
            if cli.verbose > 0 {
                tracing::error!(?e, "detailed error context");
            }
            std::process::exit(exit_code(&e));
        }
    }
}

fn report_error(error: &CliError) {
    eprintln!("{} {}", console::style("error:").red().bold(), error);
}

/// 1 for rejected templates, 2 for everything else.
fn exit_code(error: &CliError) -> i32 {
    match error {
        CliError::Rejected { .. } => 1,
        _ => 2,
    }
}

fn setup_logging(verbose: u8, quiet: bool, log_level: Option<LogLevel>, log_format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if let Some(level) = log_level {
        EnvFilter::new(match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        })
    } else if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true);

    match log_format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(formatter)
                .with(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(formatter.json())
                .with(filter)
                .init();
        }
    }
}
