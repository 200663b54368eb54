//! sysbundle CLI - bundles the third-party dependencies of a compiler
//! toolchain into self-contained CommonJS files.
//!
//! - [`cli`] - clap argument definitions
//! - [`commands`] - `build`, `classify` and `clean-cache`
//! - [`error`] - CLI error type and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - terminal output helpers

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
