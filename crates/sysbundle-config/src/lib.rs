//! Build options for sysbundle.
//!
//! `BuildOptions` is resolved once per build invocation and only read by the
//! bundler afterwards. Values come from, in increasing priority:
//!
//! 1. Built-in defaults laid out under a root directory
//! 2. `sysbundle.toml` or `sysbundle.json` in that root (or an explicit file)
//! 3. `SYSBUNDLE_*` environment variables (`__` separates nested keys)
//! 4. Explicit overrides merged by the caller (the CLI)
//!
//! # Example
//!
//! ```no_run
//! use sysbundle_config::ConfigLoader;
//!
//! let options = ConfigLoader::new(".").load().unwrap();
//! assert!(options.max_parallel.unwrap_or(1) > 0);
//! ```

pub mod error;
pub mod loading;
pub mod options;
pub mod validation;

pub use error::{ConfigError, Result};
pub use loading::{CONFIG_FILE_NAMES, ConfigLoader, discover};
pub use options::{
    BuildOptions, ClassifierConfig, FailurePolicy, OutputDirs, Platform, TargetJobs,
    default_aliases,
};
