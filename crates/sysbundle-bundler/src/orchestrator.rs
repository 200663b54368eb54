//! Concurrent execution of bundle jobs with fail-fast error propagation.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use sysbundle_config::FailurePolicy;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::{CacheStats, CacheStore};
use crate::compiler::ArtifactCompiler;
use crate::finalize::ReleaseFinalizer;
use crate::job::{ArtifactSource, BundleJob, JobReport};
use crate::{Error, Result};

/// Runs independent [`BundleJob`]s concurrently.
///
/// The batch fails with the first job error observed. What happens to the
/// jobs still in flight at that point is decided by [`FailurePolicy`].
#[derive(Debug, Clone)]
pub struct Orchestrator {
    runner: JobRunner,
    max_parallel: usize,
    limit: Option<Arc<Semaphore>>,
    on_failure: FailurePolicy,
}

#[derive(Debug, Clone)]
struct JobRunner {
    compiler: ArtifactCompiler,
    finalizer: ReleaseFinalizer,
    is_prod: bool,
    stats: Arc<CacheStats>,
}

impl Orchestrator {
    pub fn new(compiler: ArtifactCompiler, finalizer: ReleaseFinalizer) -> Self {
        Self {
            runner: JobRunner {
                compiler,
                finalizer,
                is_prod: false,
                stats: Arc::new(CacheStats::default()),
            },
            max_parallel: num_cpus::get().clamp(1, 8),
            limit: None,
            on_failure: FailurePolicy::default(),
        }
    }

    /// Production runs minify and never read or write the cache.
    pub fn production(mut self, is_prod: bool) -> Self {
        self.runner.is_prod = is_prod;
        self
    }

    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    /// Draw job permits from a semaphore shared with other work of the same
    /// build instead of one sized by `max_parallel`.
    pub fn with_limit(mut self, limit: Arc<Semaphore>) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    /// Share cache counters with other orchestrators of the same build.
    pub fn with_cache_stats(mut self, stats: Arc<CacheStats>) -> Self {
        self.runner.stats = stats;
        self
    }

    pub fn cache_stats(&self) -> &Arc<CacheStats> {
        &self.runner.stats
    }

    /// Run every job; reports come back in job order.
    pub async fn run(&self, jobs: Vec<BundleJob>) -> Result<Vec<JobReport>> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        if !self.runner.is_prod {
            let mut seen = FxHashSet::default();
            for job in &jobs {
                if seen.insert(job.cache_dir.as_path()) {
                    CacheStore::new(&job.cache_dir).ensure_dir().await?;
                }
            }
        }

        let total = jobs.len();
        let semaphore = match &self.limit {
            Some(limit) => Arc::clone(limit),
            None => Arc::new(Semaphore::new(self.max_parallel)),
        };
        let mut join_set = JoinSet::new();
        let mut entries = FxHashMap::default();

        for (index, job) in jobs.into_iter().enumerate() {
            let runner = self.runner.clone();
            let permit = Arc::clone(&semaphore);
            let entry = job.entry_file_name.clone();

            let handle = join_set.spawn(async move {
                let result = match permit.acquire().await {
                    Ok(_permit) => runner.run(&job).await,
                    Err(_) => Err(Error::Compile("job scheduler shut down".to_string())),
                };
                (index, result.map_err(|e| e.in_job(&job.entry_file_name)))
            });
            entries.insert(handle.id(), entry);
        }

        let mut reports: Vec<Option<JobReport>> = vec![None; total];
        while let Some(joined) = join_set.join_next().await {
            let error = match joined {
                Ok((index, Ok(report))) => {
                    reports[index] = Some(report);
                    continue;
                }
                Ok((_, Err(err))) => err,
                Err(join_err) => {
                    let entry = entries
                        .get(&join_err.id())
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string());
                    Error::Compile(format!("bundle task failed: {join_err}")).in_job(entry)
                }
            };

            self.settle_siblings(join_set).await;
            return Err(error);
        }

        Ok(reports.into_iter().flatten().collect())
    }

    async fn settle_siblings(&self, mut join_set: JoinSet<(usize, Result<JobReport>)>) {
        if join_set.is_empty() {
            return;
        }
        match self.on_failure {
            FailurePolicy::Cancel => {
                tracing::debug!(outstanding = join_set.len(), "cancelling sibling jobs");
                join_set.abort_all();
                while join_set.join_next().await.is_some() {}
            }
            FailurePolicy::Detach => {
                tracing::warn!(
                    outstanding = join_set.len(),
                    "batch failed; sibling jobs keep running in the background"
                );
                join_set.detach_all();
            }
        }
    }
}

impl JobRunner {
    async fn run(&self, job: &BundleJob) -> Result<JobReport> {
        let report = if self.is_prod {
            self.compile_and_finalize(job, None).await?
        } else {
            let cache = CacheStore::with_stats(&job.cache_dir, Arc::clone(&self.stats));
            match cache.try_read(job.cache_key()).await? {
                Some(bytes) => self.restore(job, &bytes).await?,
                None => self.compile_and_finalize(job, Some(&cache)).await?,
            }
        };

        tracing::info!(
            entry = %report.entry,
            cache_hit = report.cache_hit(),
            minified = report.minified,
            bytes = report.bytes,
            "bundled"
        );
        Ok(report)
    }

    async fn compile_and_finalize(
        &self,
        job: &BundleJob,
        cache: Option<&CacheStore>,
    ) -> Result<JobReport> {
        let artifact = self.compiler.compile_job(job).await?;
        let outcome = self
            .finalizer
            .finalize(&artifact, self.is_prod, cache)
            .await?;

        Ok(JobReport {
            entry: job.entry_file_name.clone(),
            output: artifact.path,
            source: ArtifactSource::Compiled,
            minified: outcome.minified,
            bytes: outcome.bytes,
        })
    }

    /// Copy a cached artifact to the job's output path.
    async fn restore(&self, job: &BundleJob, bytes: &[u8]) -> Result<JobReport> {
        let output = job.output_path();
        ensure_parent(&output).await?;
        tokio::fs::write(&output, bytes)
            .await
            .map_err(|e| Error::io(format!("failed to write {}", output.display()), e))?;

        Ok(JobReport {
            entry: job.entry_file_name.clone(),
            output,
            source: ArtifactSource::Cache,
            minified: false,
            bytes: bytes.len() as u64,
        })
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::io(format!("failed to create {}", dir.display()), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ClassifierPolicy, ModuleClassifier, NodeModulesProbe};
    use crate::compiler::{AliasTable, BundleBackend, BundleRequest};
    use crate::finalize::OxcMinifier;
    use async_trait::async_trait;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct EchoBackend;

    #[async_trait]
    impl BundleBackend for EchoBackend {
        async fn bundle(&self, request: &BundleRequest) -> Result<String> {
            let name = request.entry.file_name().unwrap().to_string_lossy();
            Ok(format!("module.exports = {name:?};\n"))
        }
    }

    fn orchestrator(root: &Path) -> Orchestrator {
        let classifier =
            ModuleClassifier::new(ClassifierPolicy::new(), Arc::new(NodeModulesProbe::new(root)));
        Orchestrator::new(
            ArtifactCompiler::new(Arc::new(EchoBackend), classifier, AliasTable::new()),
            ReleaseFinalizer::new(Arc::new(OxcMinifier)),
        )
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let temp = TempDir::new().unwrap();
        let reports = orchestrator(temp.path()).run(Vec::new()).await.unwrap();
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn test_reports_keep_job_order() {
        let temp = TempDir::new().unwrap();
        let names = ["e.js", "d.js", "c.js", "b.js", "a.js"];
        let jobs = names
            .iter()
            .map(|n| BundleJob::new(*n, temp.path().join("src"), temp.path().join("out"), temp.path().join("cache")))
            .collect();

        let reports = orchestrator(temp.path())
            .max_parallel(2)
            .run(jobs)
            .await
            .unwrap();

        let got: Vec<_> = reports.iter().map(|r| r.entry.as_str()).collect();
        assert_eq!(got, names);
        assert!(reports.iter().all(|r| r.source == ArtifactSource::Compiled));
    }

    #[tokio::test]
    async fn test_cache_dir_created_before_jobs() {
        let temp = TempDir::new().unwrap();
        let cache_dir = temp.path().join("nested/cache");
        let job = BundleJob::new("a.js", temp.path(), temp.path().join("out"), &cache_dir);

        orchestrator(temp.path()).run(vec![job]).await.unwrap();
        assert!(cache_dir.join("a.js").is_file());
    }

    #[tokio::test]
    async fn test_unusable_cache_dir_fails_batch() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("cache");
        std::fs::write(&blocker, "file").unwrap();
        let job = BundleJob::new("a.js", temp.path(), temp.path().join("out"), &blocker);

        let err = orchestrator(temp.path()).run(vec![job]).await.unwrap_err();
        assert!(matches!(err, Error::Cache(_)));
        assert!(!temp.path().join("out/a.js").exists());
    }
}
