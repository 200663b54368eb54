//! The `BuildOptions` structure and its derived paths.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};

/// Runtime environment a set of bundles is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Host runtime (Node.js): the compiler's `sys/node` output.
    Node,
    /// Browser-facing dev-server output.
    Browser,
}

impl Platform {
    /// Directory segment used under `sys/` for this platform.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Platform::Node => "node",
            Platform::Browser => "browser",
        }
    }

    pub fn all() -> [Platform; 2] {
        [Platform::Node, Platform::Browser]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// What happens to sibling jobs once one job in a batch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort outstanding sibling jobs as soon as the first failure is seen.
    #[default]
    Cancel,
    /// Leave siblings running in the background; their results are dropped.
    Detach,
}

/// Per-target output directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDirs {
    /// Host-runtime output (`sys/node`).
    pub sys_node_dir: PathBuf,
    /// Dev-server (browser) output.
    pub dev_server_dir: PathBuf,
}

impl Default for OutputDirs {
    fn default() -> Self {
        Self {
            sys_node_dir: PathBuf::from("sys").join("node"),
            dev_server_dir: PathBuf::from("dev-server"),
        }
    }
}

/// Module classification policy for external dependency jobs.
///
/// Order of evaluation is fixed by the bundler: path-shaped ids, then
/// `redirects`, then `externals`, then inline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Module ids left external, resolved by the host runtime.
    pub externals: Vec<String>,
    /// Module ids rewritten to a fixed replacement id and left external.
    pub redirects: IndexMap<String, String>,
    /// Verify that every external id resolves in the current environment.
    pub probe_externals: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let mut redirects = IndexMap::new();
        redirects.insert(
            "@stencil/core/mock-doc".to_string(),
            "../../mock-doc".to_string(),
        );
        Self {
            externals: vec![
                "child_process".to_string(),
                "os".to_string(),
                "typescript".to_string(),
            ],
            redirects,
            probe_externals: true,
        }
    }
}

/// Third-party entry files bundled per platform, relative to
/// `src/sys/<platform>/bundles/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetJobs {
    pub node: Vec<String>,
    pub browser: Vec<String>,
}

impl TargetJobs {
    pub fn for_platform(&self, platform: Platform) -> &[String] {
        match platform {
            Platform::Node => &self.node,
            Platform::Browser => &self.browser,
        }
    }
}

impl Default for TargetJobs {
    fn default() -> Self {
        Self {
            node: [
                "autoprefixer.js",
                "glob.js",
                "graceful-fs.js",
                "node-fetch.js",
                "prompts.js",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            browser: ["open-in-editor-api.js", "ws.js"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Configuration for one build invocation.
///
/// Relative directories are anchored to `root_dir` by [`BuildOptions::anchored`],
/// which the loader applies after merging all sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Repository root every relative path is resolved against.
    pub root_dir: PathBuf,

    /// Untranspiled source root (holds `sys/<platform>/bundles`).
    pub src_dir: PathBuf,

    /// Transpiled-output root.
    pub build_dir: PathBuf,

    pub node_modules_dir: PathBuf,

    /// Helper sources referenced by the alias table (e.g. `empty.js`).
    pub bundle_helpers_dir: PathBuf,

    /// Scratch directory of the build scripts; holds the bundle caches.
    pub scripts_build_dir: PathBuf,

    pub output: OutputDirs,

    /// Production release: minify artifacts and never touch the cache.
    pub is_prod: bool,

    /// Upper bound on concurrently running jobs (default: `min(cpus, 8)`).
    pub max_parallel: Option<usize>,

    pub on_failure: FailurePolicy,

    pub classifier: ClassifierConfig,

    /// Extra alias entries, merged over [`default_aliases`].
    pub aliases: IndexMap<String, PathBuf>,

    pub targets: TargetJobs,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::with_root(".")
    }
}

impl BuildOptions {
    /// Default layout rooted at `root`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            src_dir: root.join("src"),
            build_dir: root.join("build"),
            node_modules_dir: root.join("node_modules"),
            bundle_helpers_dir: root.join("scripts").join("helpers"),
            scripts_build_dir: root.join("scripts").join("build"),
            output: OutputDirs {
                sys_node_dir: root.join("sys").join("node"),
                dev_server_dir: root.join("dev-server"),
            },
            is_prod: false,
            max_parallel: None,
            on_failure: FailurePolicy::default(),
            classifier: ClassifierConfig::default(),
            aliases: IndexMap::new(),
            targets: TargetJobs::default(),
            root_dir: root,
        }
    }

    /// Anchor every relative directory to `root_dir` and clean the result.
    pub fn anchored(mut self) -> Self {
        let root = self.root_dir.clone();
        let anchor = |p: &mut PathBuf| {
            *p = if p.is_absolute() {
                p.clean()
            } else {
                root.join(&*p).clean()
            };
        };

        anchor(&mut self.src_dir);
        anchor(&mut self.build_dir);
        anchor(&mut self.node_modules_dir);
        anchor(&mut self.bundle_helpers_dir);
        anchor(&mut self.scripts_build_dir);
        anchor(&mut self.output.sys_node_dir);
        anchor(&mut self.output.dev_server_dir);
        for target in self.aliases.values_mut() {
            anchor(target);
        }
        self
    }

    /// Cache directory shared by the external dependency jobs of `platform`.
    pub fn bundle_cache_dir(&self, platform: Platform) -> PathBuf {
        let name = match platform {
            Platform::Node => "sys-node-bundle-cache",
            Platform::Browser => "dev-server-bundle-cache",
        };
        self.scripts_build_dir.join(name)
    }

    /// Directory holding the third-party entry files for `platform`.
    pub fn bundles_dir(&self, platform: Platform) -> PathBuf {
        self.src_dir
            .join("sys")
            .join(platform.dir_name())
            .join("bundles")
    }

    /// Output directory of `platform`.
    pub fn output_dir(&self, platform: Platform) -> &Path {
        match platform {
            Platform::Node => &self.output.sys_node_dir,
            Platform::Browser => &self.output.dev_server_dir,
        }
    }

    /// Effective alias table: defaults first, user entries override.
    pub fn resolved_aliases(&self) -> IndexMap<String, PathBuf> {
        let mut table = default_aliases(self);
        for (name, target) in &self.aliases {
            table.insert(name.clone(), target.clone());
        }
        table
    }

    pub fn effective_max_parallel(&self, available: usize) -> usize {
        self.max_parallel.unwrap_or_else(|| available.clamp(1, 8))
    }
}

/// Imports redirected to files inside the build tree instead of node's
/// package resolution.
pub fn default_aliases(options: &BuildOptions) -> IndexMap<String, PathBuf> {
    let mut table = IndexMap::new();
    table.insert(
        "@utils".to_string(),
        options.build_dir.join("utils").join("index.js"),
    );
    table.insert(
        "postcss".to_string(),
        options.node_modules_dir.join("postcss"),
    );
    table.insert(
        "source-map".to_string(),
        options.node_modules_dir.join("source-map"),
    );
    table.insert(
        "chalk".to_string(),
        options.bundle_helpers_dir.join("empty.js"),
    );
    table
}
