//! Layered configuration loading with figment.

use std::path::{Path, PathBuf};

use figment::{
    Figment, Provider,
    providers::{Env, Format as _, Json, Serialized, Toml},
};

use path_clean::PathClean;

use crate::error::{ConfigError, Result};
use crate::options::BuildOptions;

/// File names searched for in the root directory, in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["sysbundle.toml", "sysbundle.json"];

/// Find a configuration file in `root`.
pub fn discover(root: impl AsRef<Path>) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| root.as_ref().join(name))
        .find(|path| path.is_file())
}

/// Builder that merges configuration sources into `BuildOptions`.
///
/// Priority: overrides > environment variables > config file > defaults.
///
/// # Example
///
/// ```no_run
/// use figment::providers::Serialized;
/// use sysbundle_config::ConfigLoader;
///
/// let options = ConfigLoader::new("/path/to/repo")
///     .override_with(Serialized::default("is_prod", true))
///     .load()
///     .unwrap();
/// assert!(options.is_prod);
/// ```
pub struct ConfigLoader {
    root: PathBuf,
    config_file: Option<PathBuf>,
    use_env: bool,
    overrides: Vec<Figment>,
}

impl ConfigLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config_file: None,
            use_env: true,
            overrides: Vec::new(),
        }
    }

    /// Use an explicit config file instead of discovering one in the root.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Skip `SYSBUNDLE_*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Merge a provider above every other source.
    pub fn override_with(mut self, provider: impl Provider) -> Self {
        self.overrides.push(Figment::from(provider));
        self
    }

    /// Assemble the figment without extracting it.
    pub fn figment(&self) -> Result<Figment> {
        self.layered(&self.root)
    }

    /// Every source merged over defaults laid out under `root`.
    fn layered(&self, root: &Path) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(BuildOptions::with_root(root)));

        let config_file = match &self.config_file {
            Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.clone())),
            Some(path) => Some(path.clone()),
            None => discover(&self.root),
        };

        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file(&path)),
                Some("json") => figment.merge(Json::file(&path)),
                other => {
                    return Err(ConfigError::UnsupportedFormat(
                        other.unwrap_or("<none>").to_string(),
                    ));
                }
            };
        }

        if self.use_env {
            figment = figment.merge(Env::prefixed("SYSBUNDLE_").split("__"));
        }

        for provider in &self.overrides {
            figment = figment.merge(provider.clone());
        }

        Ok(figment)
    }

    /// Extract, anchor and validate the options.
    ///
    /// A `root_dir` set by the config file, the environment or an override
    /// moves every defaulted directory along with it.
    pub fn load(self) -> Result<BuildOptions> {
        let mut figment = self.figment()?;

        let merged: PathBuf = figment.extract_inner("root_dir")?;
        if merged != self.root {
            let root = if merged.is_absolute() {
                merged.clean()
            } else {
                self.root.join(merged).clean()
            };
            tracing::debug!(root = %root.display(), "re-deriving defaults from configured root");
            figment = self
                .layered(&root)?
                .merge(Serialized::default("root_dir", &root));
        }

        let options: BuildOptions = figment.extract()?;
        let options = options.anchored();
        options.validate()?;
        Ok(options)
    }
}
