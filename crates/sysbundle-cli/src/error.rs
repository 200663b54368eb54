//! CLI error type and its conversion into miette reports.

use std::path::PathBuf;

use miette::Report;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] sysbundle_config::ConfigError),

    #[error(transparent)]
    Bundle(#[from] sysbundle_bundler::Error),

    #[error("Invalid root directory {}: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Bundler errors keep their diagnostic code and help text.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Bundle(e) => Report::new(e),
        CliError::Config(e) => match e.hint() {
            Some(hint) => miette::miette!(code = "INVALID_CONFIG", help = hint.to_string(), "{e}"),
            None => miette::miette!(code = "INVALID_CONFIG", "{e}"),
        },
        other => miette::miette!("{other}"),
    }
}
