//! Command implementations. Each module exposes an `execute` function
//! taking its parsed arguments.

pub mod build;
pub mod classify;
pub mod clean_cache;

use figment::providers::Serialized;
use sysbundle_config::{BuildOptions, ConfigLoader};

use crate::cli::ProjectArgs;
use crate::error::{CliError, Result};

pub use build::execute as build_execute;
pub use classify::execute as classify_execute;
pub use clean_cache::execute as clean_cache_execute;

/// A single `key = value` override above every configuration source.
pub(crate) type Override = Serialized<serde_json::Value>;

/// Resolve the root, then load options with `overrides` on top.
pub(crate) fn load_options(project: &ProjectArgs, overrides: Vec<Override>) -> Result<BuildOptions> {
    let root = std::path::absolute(&project.root).map_err(|source| CliError::Root {
        path: project.root.clone(),
        source,
    })?;

    let mut loader = ConfigLoader::new(&root);
    if let Some(config) = &project.config {
        loader = loader.config_file(root.join(config));
    }
    for provider in overrides {
        loader = loader.override_with(provider);
    }

    let options = loader.load()?;
    tracing::debug!(root = %options.root_dir.display(), "loaded options");
    Ok(options)
}
