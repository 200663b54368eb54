//! Artifact compilation: one entry in, one CommonJS file out.

mod backend;
mod plugin;

pub use backend::{BundleBackend, BundleRequest, RolldownBackend};
pub use plugin::ExternalsPlugin;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use sysbundle_config::BuildOptions;

use crate::classify::ModuleClassifier;
use crate::job::BundleJob;
use crate::{Error, Result};

/// Named imports rewritten to absolute files inside the build tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: IndexMap<String, PathBuf>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults plus user entries from the options.
    pub fn from_options(options: &BuildOptions) -> Self {
        Self {
            entries: options.resolved_aliases(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        self.entries.insert(name.into(), target.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Alias list in the shape Rolldown's resolver expects.
    pub fn to_rolldown(&self) -> Vec<(String, Vec<Option<String>>)> {
        self.entries
            .iter()
            .map(|(name, target)| {
                (
                    name.clone(),
                    vec![Some(target.to_string_lossy().into_owned())],
                )
            })
            .collect()
    }
}

/// A freshly compiled, not yet finalized artifact on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Entry file name; doubles as the cache key.
    pub entry: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Runs the backend for one entry and writes its output file.
#[derive(Debug, Clone)]
pub struct ArtifactCompiler {
    backend: Arc<dyn BundleBackend>,
    classifier: Arc<ModuleClassifier>,
    aliases: Arc<AliasTable>,
}

impl ArtifactCompiler {
    pub fn new(
        backend: Arc<dyn BundleBackend>,
        classifier: ModuleClassifier,
        aliases: AliasTable,
    ) -> Self {
        Self {
            backend,
            classifier: Arc::new(classifier),
            aliases: Arc::new(aliases),
        }
    }

    /// Same backend and aliases, different classifier.
    pub fn with_classifier(&self, classifier: ModuleClassifier) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            classifier: Arc::new(classifier),
            aliases: Arc::clone(&self.aliases),
        }
    }

    pub fn classifier(&self) -> &ModuleClassifier {
        &self.classifier
    }

    pub async fn compile_job(&self, job: &BundleJob) -> Result<CompiledArtifact> {
        self.compile(&job.entry_file_name, &job.entry_path(), &job.output_path())
            .await
    }

    /// Bundle `entry_path` into `output_path`.
    pub async fn compile(
        &self,
        name: &str,
        entry_path: &Path,
        output_path: &Path,
    ) -> Result<CompiledArtifact> {
        let request = BundleRequest {
            entry: entry_path.to_path_buf(),
            cwd: entry_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            classifier: Arc::clone(&self.classifier),
            aliases: Arc::clone(&self.aliases),
        };

        tracing::debug!(entry = name, path = %entry_path.display(), "compiling");
        let code = self.backend.bundle(&request).await?;

        if let Some(dir) = output_path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                Error::io(format!("failed to create {}", dir.display()), e)
            })?;
        }
        tokio::fs::write(output_path, code.as_bytes())
            .await
            .map_err(|e| Error::io(format!("failed to write {}", output_path.display()), e))?;

        Ok(CompiledArtifact {
            entry: name.to_string(),
            path: output_path.to_path_buf(),
            bytes: code.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_table_from_options() {
        let table = AliasTable::from_options(&BuildOptions::with_root("/repo"));
        assert_eq!(
            table.get("chalk"),
            Some(Path::new("/repo/scripts/helpers/empty.js"))
        );
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_to_rolldown_shape() {
        let table = AliasTable::new().with("@utils", "/repo/build/utils/index.js");
        assert_eq!(
            table.to_rolldown(),
            vec![(
                "@utils".to_string(),
                vec![Some("/repo/build/utils/index.js".to_string())]
            )]
        );
    }
}
