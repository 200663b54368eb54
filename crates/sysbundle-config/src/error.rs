//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid config value for '{field}'{}", format_hint(.hint))]
    InvalidValue {
        field: String,
        hint: Option<String>,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
        hint: Option<String>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_hint(hint: &Option<String>) -> String {
    hint.as_ref().map(|h| format!(": {h}")).unwrap_or_default()
}

impl ConfigError {
    /// Help text attached to the error, if any.
    pub fn hint(&self) -> Option<&str> {
        match self {
            ConfigError::InvalidValue { hint, .. } | ConfigError::Validation { hint, .. } => {
                hint.as_deref()
            }
            ConfigError::UnsupportedFormat(_) => {
                Some("Use a .toml or .json configuration file")
            }
            _ => None,
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        let field = err
            .path
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(".");
        ConfigError::InvalidValue {
            field: if field.is_empty() {
                "configuration".to_string()
            } else {
                field
            },
            hint: Some(err.kind.to_string()),
        }
    }
}
