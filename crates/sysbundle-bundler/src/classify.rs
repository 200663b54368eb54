//! Module classification: inline, redirect or leave external.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. Path-shaped ids (`./`, `../`, `/`) are always [`ClassificationResult::Internal`].
//! 2. Ids in the redirect table become [`ClassificationResult::Redirect`].
//! 3. Ids in the externals list become [`ClassificationResult::External`],
//!    after checking that the host environment can resolve them.
//! 4. Everything else is inlined.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use sysbundle_config::{BuildOptions, ClassifierConfig};

/// Outcome of classifying one requested module id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationResult {
    /// Inline the module into the bundle.
    Internal,
    /// Leave external under the replacement id.
    Redirect(String),
    /// Leave external under its own id.
    External(String),
}

impl ClassificationResult {
    pub fn is_external(&self) -> bool {
        !matches!(self, ClassificationResult::Internal)
    }

    /// The id written into the bundle for external results.
    pub fn external_id(&self) -> Option<&str> {
        match self {
            ClassificationResult::Internal => None,
            ClassificationResult::Redirect(id) | ClassificationResult::External(id) => Some(id),
        }
    }
}

/// An id configured as external cannot be resolved by the host runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot resolve external module '{module_id}'")]
pub struct ResolutionError {
    pub module_id: String,
}

/// Whether `id` is a relative or absolute path rather than a package name.
pub fn is_path_like(id: &str) -> bool {
    id.starts_with("./") || id.starts_with("../") || id.starts_with('/') || Path::new(id).is_absolute()
}

/// Redirect table and externals list driving [`ModuleClassifier`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifierPolicy {
    redirects: IndexMap<String, String>,
    externals: IndexSet<String>,
    probe_externals: bool,
}

impl ClassifierPolicy {
    /// Empty policy: everything non-path is inlined. Externals are probed.
    pub fn new() -> Self {
        Self {
            probe_externals: true,
            ..Default::default()
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            redirects: config.redirects.clone(),
            externals: config.externals.iter().cloned().collect(),
            probe_externals: config.probe_externals,
        }
    }

    pub fn with_external(mut self, id: impl Into<String>) -> Self {
        self.externals.insert(id.into());
        self
    }

    pub fn with_externals<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.externals.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_redirect(mut self, id: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.redirects.insert(id.into(), replacement.into());
        self
    }

    /// Trust the externals list without checking the environment.
    pub fn without_probe(mut self) -> Self {
        self.probe_externals = false;
        self
    }

    pub fn redirects(&self) -> &IndexMap<String, String> {
        &self.redirects
    }

    pub fn externals(&self) -> &IndexSet<String> {
        &self.externals
    }

    pub fn probes_externals(&self) -> bool {
        self.probe_externals
    }
}

/// Answers whether a bare module id resolves in the host environment.
pub trait ModuleProbe: Send + Sync + fmt::Debug {
    fn is_resolvable(&self, module_id: &str) -> bool;
}

/// Node's built-in modules, resolvable without any installed package.
const NODE_BUILTINS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

/// Resolves ids the way Node does for bare specifiers: built-ins first, then
/// the configured node-modules directory, then a `node_modules/<package>`
/// directory in the root or any ancestor.
#[derive(Debug, Clone)]
pub struct NodeModulesProbe {
    root: PathBuf,
    node_modules: Option<PathBuf>,
}

impl NodeModulesProbe {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            node_modules: None,
        }
    }

    /// Probe rooted at `root_dir` that checks `node_modules_dir` first.
    pub fn from_options(options: &BuildOptions) -> Self {
        Self::new(&options.root_dir).with_node_modules(&options.node_modules_dir)
    }

    pub fn with_node_modules(mut self, dir: impl Into<PathBuf>) -> Self {
        self.node_modules = Some(dir.into());
        self
    }

    pub fn is_builtin(module_id: &str) -> bool {
        let id = module_id.strip_prefix("node:").unwrap_or(module_id);
        NODE_BUILTINS.contains(&id)
    }

    /// `lodash/fp` -> `lodash`, `@scope/pkg/sub` -> `@scope/pkg`.
    fn package_name(module_id: &str) -> &str {
        let mut slashes = module_id.match_indices('/');
        let cut = if module_id.starts_with('@') {
            slashes.nth(1)
        } else {
            slashes.next()
        };
        match cut {
            Some((idx, _)) => &module_id[..idx],
            None => module_id,
        }
    }
}

impl ModuleProbe for NodeModulesProbe {
    fn is_resolvable(&self, module_id: &str) -> bool {
        if Self::is_builtin(module_id) {
            return true;
        }
        let package = Self::package_name(module_id);
        if let Some(dir) = &self.node_modules {
            if dir.join(package).exists() {
                return true;
            }
        }
        self.root
            .ancestors()
            .any(|dir| dir.join("node_modules").join(package).exists())
    }
}

/// Maps requested module ids to a [`ClassificationResult`].
#[derive(Debug, Clone)]
pub struct ModuleClassifier {
    policy: ClassifierPolicy,
    probe: Arc<dyn ModuleProbe>,
}

impl ModuleClassifier {
    pub fn new(policy: ClassifierPolicy, probe: Arc<dyn ModuleProbe>) -> Self {
        Self { policy, probe }
    }

    pub fn policy(&self) -> &ClassifierPolicy {
        &self.policy
    }

    /// Same probe, different policy.
    pub fn with_policy(&self, policy: ClassifierPolicy) -> Self {
        Self {
            policy,
            probe: Arc::clone(&self.probe),
        }
    }

    pub fn classify(&self, module_id: &str) -> Result<ClassificationResult, ResolutionError> {
        let result = if is_path_like(module_id) {
            ClassificationResult::Internal
        } else if let Some(replacement) = self.policy.redirects.get(module_id) {
            ClassificationResult::Redirect(replacement.clone())
        } else if self.policy.externals.contains(module_id) {
            if self.policy.probe_externals && !self.probe.is_resolvable(module_id) {
                tracing::debug!(module_id, "external module is not resolvable");
                return Err(ResolutionError {
                    module_id: module_id.to_string(),
                });
            }
            ClassificationResult::External(module_id.to_string())
        } else {
            ClassificationResult::Internal
        };

        tracing::debug!(module_id, classification = ?result, "classified module");
        Ok(result)
    }
}
