//! # sysbundle-bundler
//!
//! Bundles third-party dependencies of a compiler toolchain into single-file
//! CommonJS artifacts on top of Rolldown.
//!
//! For every job the bundler decides per imported module id whether it is
//! inlined, redirected to a fixed external id, or left external for the host
//! runtime. Non-production builds reuse previously compiled artifacts from a
//! directory-backed cache; production builds always recompile and minify.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sysbundle_bundler::build;
//! use sysbundle_config::ConfigLoader;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ConfigLoader::new(".").load()?;
//! let summary = build(&options).await?;
//! for report in &summary.jobs {
//!     println!("{} ({} bytes)", report.entry, report.bytes);
//! }
//! # Ok(()) }
//! ```
//!
//! ### Running a batch by hand
//!
//! ```no_run
//! use std::sync::Arc;
//! use sysbundle_bundler::{
//!     AliasTable, ArtifactCompiler, BundleJob, ClassifierPolicy, ModuleClassifier,
//!     NodeModulesProbe, Orchestrator, OxcMinifier, ReleaseFinalizer, RolldownBackend,
//! };
//!
//! # async fn example() -> sysbundle_bundler::Result<()> {
//! let classifier = ModuleClassifier::new(
//!     ClassifierPolicy::new().with_external("os"),
//!     Arc::new(NodeModulesProbe::new("/repo")),
//! );
//! let compiler = ArtifactCompiler::new(Arc::new(RolldownBackend), classifier, AliasTable::new());
//! let finalizer = ReleaseFinalizer::new(Arc::new(OxcMinifier));
//!
//! let jobs = vec![BundleJob::new("glob.js", "/repo/src/sys/node/bundles", "/repo/sys/node", "/tmp/cache")];
//! let reports = Orchestrator::new(compiler, finalizer).run(jobs).await?;
//! assert!(!reports[0].cache_hit());
//! # Ok(()) }
//! ```

pub mod cache;
pub mod classify;
pub mod compiler;
pub mod diagnostics;
pub mod finalize;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod platform;

pub use cache::{CacheError, CacheStats, CacheStatsSnapshot, CacheStore};
pub use classify::{
    ClassificationResult, ClassifierPolicy, ModuleClassifier, ModuleProbe, NodeModulesProbe,
    ResolutionError, is_path_like,
};
pub use compiler::{
    AliasTable, ArtifactCompiler, BundleBackend, BundleRequest, CompiledArtifact,
    ExternalsPlugin, RolldownBackend,
};
pub use diagnostics::{DiagnosticKind, ExtractedDiagnostic};
pub use finalize::{CodeMinifier, FinalizeOutcome, MinifyError, OxcMinifier, ReleaseFinalizer};
pub use job::{ArtifactSource, BundleJob, JobReport};
pub use orchestrator::Orchestrator;
pub use pipeline::{
    BuildSummary, Pipeline, SideFile, build, clean_cache, copy_side_files, side_files,
};
pub use platform::{EntryDescriptor, PlatformBundle, PlatformBundler, PlatformOutput};

pub use sysbundle_config::{BuildOptions, FailurePolicy, Platform};

/// Error types for sysbundle-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An externalized module id cannot be resolved in the current environment.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The bundling backend itself failed (tooling error).
    #[error("Compile error: {0}")]
    Compile(String),

    /// The backend ran but reported diagnostic errors.
    #[error("Bundler reported {}", diagnostics::render(.0))]
    BundleDiagnostic(Vec<ExtractedDiagnostic>),

    /// Production minification failed.
    #[error(transparent)]
    Minify(#[from] MinifyError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] sysbundle_config::ConfigError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with context message.
    #[error("{message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// A job failed; names the entry that failed.
    #[error("{entry}: {source}")]
    Job {
        entry: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type alias for sysbundle-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attach the failing entry name, unless one is already attached.
    pub fn in_job(self, entry: impl Into<String>) -> Self {
        match self {
            Error::Job { .. } => self,
            other => Error::Job {
                entry: entry.into(),
                source: Box::new(other),
            },
        }
    }

    /// Entry name of the failing job, if known.
    pub fn entry(&self) -> Option<&str> {
        match self {
            Error::Job { entry, .. } => Some(entry),
            _ => None,
        }
    }

    /// The underlying error with any job wrapper removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Job { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Error::IoError {
            message: message.into(),
            source,
        }
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self.root() {
            Error::Resolution(_) => "RESOLUTION_ERROR",
            Error::Compile(_) => "COMPILE_ERROR",
            Error::BundleDiagnostic(_) => "BUNDLE_DIAGNOSTIC_ERROR",
            Error::Minify(_) => "MINIFY_ERROR",
            Error::Cache(_) => "CACHE_ERROR",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Io(_) | Error::IoError { .. } => "IO_ERROR",
            Error::Job { .. } => "JOB_FAILED",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self.root() {
            Error::Resolution(err) => Some(Box::new(format!(
                "'{}' is configured as an external but is not installed.\nInstall it or remove it from the classifier externals.",
                err.module_id
            ))),
            Error::BundleDiagnostic(diagnostics) => {
                if diagnostics.len() == 1 {
                    diagnostics[0]
                        .help
                        .as_ref()
                        .map(|h| Box::new(h.clone()) as Box<dyn std::fmt::Display>)
                } else {
                    Some(Box::new(
                        "Multiple bundler errors occurred. See details above.".to_string(),
                    ))
                }
            }
            Error::Minify(_) => Some(Box::new(
                "The compiled artifact could not be minified; nothing was shipped unminified.",
            )),
            Error::Cache(_) => Some(Box::new(
                "Check permissions of the cache directory, or run `sysbundle clean-cache`.",
            )),
            Error::InvalidConfig(err) => err
                .hint()
                .map(|h| Box::new(h.to_string()) as Box<dyn std::fmt::Display>),
            _ => None,
        }
    }
}
