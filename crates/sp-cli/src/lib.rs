//! StagePhase CLI Library
//!
//! Loads templates, declaration catalogs and weave-site descriptions from
//! disk and drives the classifier and the generator over them.

pub mod commands;
pub mod config;
pub mod inputs;

// CLI-specific error handling
pub mod error {
    use std::path::PathBuf;

    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum CliError {
        #[error("IO error on {path}: {source}")]
        Io {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Invalid input in {path}: {message}")]
        InvalidInput { path: PathBuf, message: String },

        #[error("{0}")]
        Engine(#[from] sp_core::Error),

        /// The template was rejected; diagnostics were already printed.
        #[error("template `{template}` has {errors} error(s)")]
        Rejected { template: String, errors: usize },
    }

    pub type Result<T> = std::result::Result<T, CliError>;
}

pub use error::{CliError, Result};
