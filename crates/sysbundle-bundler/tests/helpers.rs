//! Shared test utilities for sysbundle-bundler tests
//!
//! A fake backend stands in for Rolldown so cache and orchestration behaviour
//! can be observed by counting backend invocations.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sysbundle_bundler::{
    AliasTable, ArtifactCompiler, BuildOptions, BundleBackend, BundleJob, BundleRequest,
    ClassificationResult, ClassifierPolicy, DiagnosticKind, Error, ExtractedDiagnostic,
    ModuleClassifier, ModuleProbe, Orchestrator, OxcMinifier, Platform, ReleaseFinalizer, Result,
};
use tempfile::TempDir;

/// Entry source used by fixtures; long identifiers so minification is visible.
pub const ENTRY_SOURCE: &str = r#"
function computeSomething(firstArgument, secondArgument) {
    // explanatory comment
    const intermediateResult = firstArgument * secondArgument;
    return intermediateResult + 1;
}
module.exports = { computeSomething: computeSomething };
"#;

/// Backend that concatenates a header, classified imports and the entry source.
#[derive(Debug, Default)]
pub struct FakeBackend {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    imports: Vec<String>,
    fail_on: Option<String>,
    delay: Option<Duration>,
    slow_entry: Option<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Module ids every entry "imports".
    pub fn with_imports(mut self, ids: &[&str]) -> Self {
        self.imports = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Report a diagnostic for the entry with this file name.
    pub fn failing_on(mut self, entry: &str) -> Self {
        self.fail_on = Some(entry.to_string());
        self
    }

    /// Delay only the named entry.
    pub fn slow_on(mut self, entry: &str, delay: Duration) -> Self {
        self.slow_entry = Some(entry.to_string());
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of bundles observed running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn produce(&self, request: &BundleRequest) -> Result<String> {
        let name = request
            .entry
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let (Some(slow), Some(delay)) = (&self.slow_entry, self.delay) {
            if *slow == name {
                tokio::time::sleep(delay).await;
            }
        }

        if self.fail_on.as_deref() == Some(name.as_str()) {
            return Err(Error::BundleDiagnostic(vec![ExtractedDiagnostic::message(
                DiagnosticKind::UnresolvedImport,
                format!("Could not resolve 'left-pad' in {name}"),
            )]));
        }

        let source = tokio::fs::read_to_string(&request.entry).await?;
        let mut code = String::from("'use strict';\n");
        for id in &self.imports {
            match request.classifier.classify(id)? {
                ClassificationResult::Internal => {
                    code.push_str(&format!("const inlined_{} = {{}};\n", sanitize(id)));
                }
                other => {
                    let target = other.external_id().unwrap_or_default();
                    code.push_str(&format!("require({target:?});\n"));
                }
            }
        }
        code.push_str(&source);
        Ok(code)
    }
}

#[async_trait]
impl BundleBackend for FakeBackend {
    async fn bundle(&self, request: &BundleRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        let result = self.produce(request).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Probe that reports every module as installed.
#[derive(Debug)]
pub struct AlwaysResolves;

impl ModuleProbe for AlwaysResolves {
    fn is_resolvable(&self, _module_id: &str) -> bool {
        true
    }
}

/// Probe that reports nothing as installed.
#[derive(Debug)]
pub struct NeverResolves;

impl ModuleProbe for NeverResolves {
    fn is_resolvable(&self, _module_id: &str) -> bool {
        false
    }
}

/// A temporary repository with third-party entry files for the node target.
pub struct Fixture {
    pub temp: TempDir,
    pub options: BuildOptions,
}

impl Fixture {
    pub fn new(entries: &[&str]) -> Self {
        let temp = TempDir::new().expect("temp dir");
        let mut options = BuildOptions::with_root(temp.path());
        options.targets.node = entries.iter().map(|e| e.to_string()).collect();
        options.targets.browser = Vec::new();

        let bundles = options.bundles_dir(Platform::Node);
        std::fs::create_dir_all(&bundles).expect("create bundles dir");
        for entry in entries {
            std::fs::write(bundles.join(entry), ENTRY_SOURCE).expect("write entry");
        }

        Self { temp, options }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn jobs(&self) -> Vec<BundleJob> {
        BundleJob::for_platform(&self.options, Platform::Node)
    }

    pub fn job(&self, entry: &str) -> BundleJob {
        self.jobs()
            .into_iter()
            .find(|j| j.entry_file_name == entry)
            .expect("job for entry")
    }

    pub fn output(&self, entry: &str) -> PathBuf {
        self.options.output.sys_node_dir.join(entry)
    }

    pub fn cache_entry(&self, entry: &str) -> PathBuf {
        self.options.bundle_cache_dir(Platform::Node).join(entry)
    }

    pub fn read_output(&self, entry: &str) -> Vec<u8> {
        std::fs::read(self.output(entry)).expect("output file")
    }
}

/// Orchestrator over `backend` with the default classifier policy.
pub fn orchestrator(backend: Arc<FakeBackend>, probe: Arc<dyn ModuleProbe>) -> Orchestrator {
    let classifier = ModuleClassifier::new(
        ClassifierPolicy::from_config(&BuildOptions::default().classifier),
        probe,
    );
    Orchestrator::new(
        ArtifactCompiler::new(backend, classifier, AliasTable::new()),
        ReleaseFinalizer::new(Arc::new(OxcMinifier)),
    )
}
