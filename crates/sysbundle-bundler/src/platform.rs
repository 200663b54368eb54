//! Platform entry descriptors: the primary and worker module of each target.
//!
//! Unlike third-party jobs, descriptors bundle first-party code with a fixed
//! list of runtime built-ins left external. They are never cached.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use sysbundle_config::{BuildOptions, Platform};
use tokio::sync::Semaphore;

use crate::classify::ClassifierPolicy;
use crate::compiler::ArtifactCompiler;
use crate::finalize::ReleaseFinalizer;
use crate::{Error, Result};

const HOST_PRIMARY_EXTERNALS: &[&str] = &[
    "assert",
    "buffer",
    "child_process",
    "constants",
    "crypto",
    "events",
    "fs",
    "os",
    "path",
    "stream",
    "url",
    "util",
    "zlib",
];

const HOST_WORKER_EXTERNALS: &[&str] = &["child_process", "fs", "os", "path", "typescript"];

const BROWSER_PRIMARY_EXTERNALS: &[&str] = &["assert", "child_process", "fs", "os", "path", "util"];

const BROWSER_WORKER_EXTERNALS: &[&str] = &[
    "assert",
    "buffer",
    "child_process",
    "crypto",
    "events",
    "fs",
    "http",
    "https",
    "net",
    "os",
    "path",
    "stream",
    "url",
    "util",
    "zlib",
];

/// Fixed (input, output, externals) triple for one platform module.
#[derive(Debug, Clone)]
pub struct EntryDescriptor {
    /// Display name, e.g. `node/worker.js`.
    pub name: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub policy: ClassifierPolicy,
}

impl EntryDescriptor {
    fn new(platform: Platform, input: PathBuf, output: PathBuf, externals: &[&str]) -> Self {
        let file_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name: format!("{platform}/{file_name}"),
            input,
            output,
            policy: ClassifierPolicy::new()
                .with_externals(externals.iter().copied())
                .without_probe(),
        }
    }
}

/// The two descriptors of one platform target.
#[derive(Debug, Clone)]
pub struct PlatformBundle {
    pub platform: Platform,
    pub primary: EntryDescriptor,
    pub worker: EntryDescriptor,
}

impl PlatformBundle {
    /// Host runtime: `sys/node/index.js` and `sys/node/worker.js`.
    pub fn host(options: &BuildOptions) -> Self {
        let input_dir = options.build_dir.join("sys").join("node");
        let output_dir = &options.output.sys_node_dir;

        let mut worker = EntryDescriptor::new(
            Platform::Node,
            input_dir.join("worker.js"),
            output_dir.join("worker.js"),
            HOST_WORKER_EXTERNALS,
        );
        worker.policy = worker
            .policy
            .with_redirect("@stencil/core/compiler", "../../compiler/stencil.js");

        Self {
            platform: Platform::Node,
            primary: EntryDescriptor::new(
                Platform::Node,
                input_dir.join("index.js"),
                output_dir.join("index.js"),
                HOST_PRIMARY_EXTERNALS,
            ),
            worker,
        }
    }

    /// Dev server: `dev-server/index.js` and `dev-server/server-worker.js`.
    pub fn browser(options: &BuildOptions) -> Self {
        let input_dir = options.build_dir.join("dev-server");
        let output_dir = &options.output.dev_server_dir;

        Self {
            platform: Platform::Browser,
            primary: EntryDescriptor::new(
                Platform::Browser,
                input_dir.join("index.js"),
                output_dir.join("index.js"),
                BROWSER_PRIMARY_EXTERNALS,
            ),
            worker: EntryDescriptor::new(
                Platform::Browser,
                input_dir.join("server-worker.js"),
                output_dir.join("server-worker.js"),
                BROWSER_WORKER_EXTERNALS,
            ),
        }
    }

    pub fn for_platform(options: &BuildOptions, platform: Platform) -> Self {
        match platform {
            Platform::Node => Self::host(options),
            Platform::Browser => Self::browser(options),
        }
    }
}

/// A finished descriptor output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformOutput {
    pub name: String,
    pub output: PathBuf,
    pub minified: bool,
    pub bytes: u64,
}

/// Compiles and finalizes platform descriptors.
#[derive(Debug, Clone)]
pub struct PlatformBundler {
    compiler: ArtifactCompiler,
    finalizer: ReleaseFinalizer,
    is_prod: bool,
    limit: Option<Arc<Semaphore>>,
}

impl PlatformBundler {
    /// `compiler` supplies the backend, aliases and module probe; each
    /// descriptor brings its own classifier policy.
    pub fn new(compiler: ArtifactCompiler, finalizer: ReleaseFinalizer, is_prod: bool) -> Self {
        Self {
            compiler,
            finalizer,
            is_prod,
            limit: None,
        }
    }

    /// Take a permit from `limit` for every descriptor compile.
    pub fn with_limit(mut self, limit: Arc<Semaphore>) -> Self {
        self.limit = Some(limit);
        self
    }

    pub async fn bundle_descriptor(&self, descriptor: &EntryDescriptor) -> Result<PlatformOutput> {
        self.compile_descriptor(descriptor)
            .await
            .map_err(|e| e.in_job(&descriptor.name))
    }

    async fn compile_descriptor(&self, descriptor: &EntryDescriptor) -> Result<PlatformOutput> {
        let _permit = match &self.limit {
            Some(limit) => Some(
                limit
                    .acquire()
                    .await
                    .map_err(|_| Error::Compile("job scheduler shut down".to_string()))?,
            ),
            None => None,
        };

        let compiler = self
            .compiler
            .with_classifier(self.compiler.classifier().with_policy(descriptor.policy.clone()));

        let artifact = compiler
            .compile(&descriptor.name, &descriptor.input, &descriptor.output)
            .await?;
        let outcome = self.finalizer.finalize(&artifact, self.is_prod, None).await?;

        Ok(PlatformOutput {
            name: descriptor.name.clone(),
            output: artifact.path,
            minified: outcome.minified,
            bytes: outcome.bytes,
        })
    }

    /// Primary and worker in parallel; the first failure wins.
    pub async fn bundle_platform(&self, bundle: &PlatformBundle) -> Result<[PlatformOutput; 2]> {
        let (primary, worker) = tokio::try_join!(
            self.bundle_descriptor(&bundle.primary),
            self.bundle_descriptor(&bundle.worker),
        )?;
        tracing::info!(platform = %bundle.platform, "platform modules bundled");
        Ok([primary, worker])
    }

    /// Host and browser targets in parallel.
    pub async fn bundle_platforms(
        &self,
        host: &PlatformBundle,
        browser: &PlatformBundle,
    ) -> Result<Vec<PlatformOutput>> {
        let (host, browser) =
            tokio::try_join!(self.bundle_platform(host), self.bundle_platform(browser))?;
        Ok(host.into_iter().chain(browser).collect())
    }
}
