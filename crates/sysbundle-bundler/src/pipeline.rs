//! End-to-end build: external dependency jobs, platform modules, side files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use sysbundle_config::{BuildOptions, FailurePolicy, Platform};
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle};

use crate::cache::{CacheStats, CacheStatsSnapshot, CacheStore};
use crate::classify::{ClassifierPolicy, ModuleClassifier, ModuleProbe, NodeModulesProbe};
use crate::compiler::{AliasTable, ArtifactCompiler, BundleBackend, RolldownBackend};
use crate::finalize::{CodeMinifier, OxcMinifier, ReleaseFinalizer};
use crate::job::{BundleJob, JobReport};
use crate::orchestrator::Orchestrator;
use crate::platform::{PlatformBundle, PlatformBundler, PlatformOutput};
use crate::{Error, Result};

/// A non-code file copied verbatim into an output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideFile {
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// Helper files shipped next to the bundles of `platform`.
pub fn side_files(options: &BuildOptions, platform: Platform) -> Vec<SideFile> {
    match platform {
        Platform::Node => {
            let node_modules = &options.node_modules_dir;
            let out = &options.output.sys_node_dir;
            vec![
                SideFile {
                    source: node_modules
                        .join("open-in-editor")
                        .join("lib")
                        .join("editors")
                        .join("visualstudio.vbs"),
                    dest: out.join("visualstudio.vbs"),
                },
                SideFile {
                    source: node_modules.join("open").join("xdg-open"),
                    dest: out.join("xdg-open"),
                },
            ]
        }
        Platform::Browser => Vec::new(),
    }
}

/// Copy every side file; returns the destinations written.
pub async fn copy_side_files(files: &[SideFile]) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::with_capacity(files.len());
    for file in files {
        if let Some(dir) = file.dest.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::io(format!("failed to create {}", dir.display()), e))?;
        }
        tokio::fs::copy(&file.source, &file.dest)
            .await
            .map_err(|e| Error::io(format!("failed to copy {}", file.source.display()), e))?;
        copied.push(file.dest.clone());
    }
    Ok(copied)
}

/// Remove the bundle caches of every platform; returns the directories.
pub async fn clean_cache(options: &BuildOptions) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for platform in Platform::all() {
        let store = CacheStore::new(options.bundle_cache_dir(platform));
        store.clear().await?;
        removed.push(store.dir().to_path_buf());
    }
    Ok(removed)
}

/// Everything one build produced.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub jobs: Vec<JobReport>,
    pub platforms: Vec<PlatformOutput>,
    pub side_files: Vec<PathBuf>,
    pub elapsed: Duration,
    pub cache: CacheStatsSnapshot,
}

/// Build driver with swappable backend, minifier and module probe.
#[derive(Debug, Clone)]
pub struct Pipeline {
    options: BuildOptions,
    backend: Arc<dyn BundleBackend>,
    minifier: Arc<dyn CodeMinifier>,
    probe: Arc<dyn ModuleProbe>,
}

impl Pipeline {
    pub fn new(options: BuildOptions) -> Self {
        let probe = Arc::new(NodeModulesProbe::from_options(&options));
        Self {
            options,
            backend: Arc::new(RolldownBackend),
            minifier: Arc::new(OxcMinifier),
            probe,
        }
    }

    pub fn backend(mut self, backend: Arc<dyn BundleBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn minifier(mut self, minifier: Arc<dyn CodeMinifier>) -> Self {
        self.minifier = minifier;
        self
    }

    pub fn probe(mut self, probe: Arc<dyn ModuleProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub async fn run(&self) -> Result<BuildSummary> {
        let options = &self.options;
        options.validate()?;

        let start = Instant::now();
        let stats = Arc::new(CacheStats::default());

        let classifier = ModuleClassifier::new(
            ClassifierPolicy::from_config(&options.classifier),
            Arc::clone(&self.probe),
        );
        let compiler = ArtifactCompiler::new(
            Arc::clone(&self.backend),
            classifier,
            AliasTable::from_options(options),
        );
        let finalizer = ReleaseFinalizer::new(Arc::clone(&self.minifier));

        let max_parallel = options.effective_max_parallel(num_cpus::get());
        let limit = Arc::new(Semaphore::new(max_parallel));
        let orchestrator = Orchestrator::new(compiler.clone(), finalizer.clone())
            .production(options.is_prod)
            .max_parallel(max_parallel)
            .with_limit(Arc::clone(&limit))
            .on_failure(options.on_failure)
            .with_cache_stats(Arc::clone(&stats));
        let platform_bundler =
            PlatformBundler::new(compiler, finalizer, options.is_prod).with_limit(limit);

        let jobs: Vec<BundleJob> = Platform::all()
            .into_iter()
            .flat_map(|platform| BundleJob::for_platform(options, platform))
            .collect();
        let host = PlatformBundle::host(options);
        let browser = PlatformBundle::browser(options);

        tracing::info!(
            jobs = jobs.len(),
            production = options.is_prod,
            "starting build"
        );

        // Each stage runs as its own task so a failure in one only reaches
        // the other through the failure policy.
        let batch = tokio::spawn(async move { orchestrator.run(jobs).await });
        let modules =
            tokio::spawn(async move { platform_bundler.bundle_platforms(&host, &browser).await });
        let stages = [batch.abort_handle(), modules.abort_handle()];

        let joined = tokio::try_join!(
            join_stage("bundle batch", batch),
            join_stage("platform modules", modules),
        );
        let (job_reports, platforms) = match joined {
            Ok(outputs) => outputs,
            Err(err) => {
                match options.on_failure {
                    FailurePolicy::Cancel => stages.iter().for_each(AbortHandle::abort),
                    FailurePolicy::Detach => tracing::warn!(
                        "build failed; remaining stages keep running in the background"
                    ),
                }
                return Err(err);
            }
        };

        let side_files = copy_side_files(&side_files(options, Platform::Node)).await?;

        let summary = BuildSummary {
            jobs: job_reports,
            platforms,
            side_files,
            elapsed: start.elapsed(),
            cache: stats.snapshot(),
        };
        tracing::info!(
            elapsed_ms = summary.elapsed.as_millis() as u64,
            cache_hits = summary.cache.hits,
            "build finished"
        );
        Ok(summary)
    }
}

async fn join_stage<T>(stage: &str, handle: JoinHandle<Result<T>>) -> Result<T> {
    match handle.await {
        Ok(result) => result,
        Err(err) => Err(Error::Compile(format!("{stage} task failed: {err}"))),
    }
}

/// Run a full build with the default Rolldown backend and OXC minifier.
pub async fn build(options: &BuildOptions) -> Result<BuildSummary> {
    Pipeline::new(options.clone()).run().await
}
