//! Bundle jobs and their reports.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sysbundle_config::{BuildOptions, Platform};

/// One third-party entry to bundle: `source_dir/entry` -> `output_dir/entry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleJob {
    pub entry_file_name: String,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
}

impl BundleJob {
    pub fn new(
        entry_file_name: impl Into<String>,
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            entry_file_name: entry_file_name.into(),
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Jobs for every configured entry of `platform`, in configuration order.
    pub fn for_platform(options: &BuildOptions, platform: Platform) -> Vec<BundleJob> {
        let source_dir = options.bundles_dir(platform);
        let output_dir = options.output_dir(platform);
        let cache_dir = options.bundle_cache_dir(platform);

        options
            .targets
            .for_platform(platform)
            .iter()
            .map(|entry| BundleJob::new(entry, &source_dir, output_dir, &cache_dir))
            .collect()
    }

    pub fn entry_path(&self) -> PathBuf {
        self.source_dir.join(&self.entry_file_name)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.entry_file_name)
    }

    /// Cache key; entries of one cache directory never share a name.
    pub fn cache_key(&self) -> &str {
        &self.entry_file_name
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

/// Where a job's output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactSource {
    Cache,
    Compiled,
}

/// Result of one successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub entry: String,
    pub output: PathBuf,
    pub source: ArtifactSource,
    pub minified: bool,
    pub bytes: u64,
}

impl JobReport {
    pub fn cache_hit(&self) -> bool {
        self.source == ArtifactSource::Cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let job = BundleJob::new("glob.js", "/repo/src/sys/node/bundles", "/repo/sys/node", "/c");
        assert_eq!(job.entry_path(), PathBuf::from("/repo/src/sys/node/bundles/glob.js"));
        assert_eq!(job.output_path(), PathBuf::from("/repo/sys/node/glob.js"));
        assert_eq!(job.cache_key(), "glob.js");
    }

    #[test]
    fn test_for_platform_uses_configured_entries() {
        let options = BuildOptions::with_root("/repo");
        let jobs = BundleJob::for_platform(&options, Platform::Browser);

        let names: Vec<_> = jobs.iter().map(|j| j.entry_file_name.as_str()).collect();
        assert_eq!(names, ["open-in-editor-api.js", "ws.js"]);
        assert_eq!(jobs[0].source_dir, PathBuf::from("/repo/src/sys/browser/bundles"));
        assert_eq!(jobs[0].output_dir, PathBuf::from("/repo/dev-server"));
        assert_eq!(
            jobs[0].cache_dir,
            PathBuf::from("/repo/scripts/build/dev-server-bundle-cache")
        );
    }
}
