//! Command-line interface definition.
//!
//! - `sysbundle build` - bundle every external dependency and platform module
//! - `sysbundle classify` - show how module ids are treated by the bundler
//! - `sysbundle clean-cache` - remove the development bundle caches

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// sysbundle - externalizing, caching dependency bundler
#[derive(Parser, Debug)]
#[command(
    name = "sysbundle",
    version,
    about = "Bundle third-party dependencies into self-contained CommonJS files",
    long_about = "sysbundle bundles the third-party dependencies of a compiler toolchain into\n\
                  single-file CommonJS artifacts for the host runtime and the dev server.\n\
                  Development builds reuse cached artifacts; production builds minify."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bundle external dependencies and platform modules
    ///
    /// Development builds copy cached artifacts when present and write new
    /// ones back. Production builds always recompile and minify.
    Build(BuildArgs),

    /// Print the classification of module ids
    ///
    /// Uses the classifier policy of the external dependency jobs.
    Classify(ClassifyArgs),

    /// Remove the bundle caches
    CleanCache(CleanCacheArgs),
}

/// Where to find the repository and its configuration.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Repository root
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub root: PathBuf,

    /// Configuration file (default: sysbundle.toml or sysbundle.json in the root)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Production build: minify and bypass the cache
    #[arg(long)]
    pub prod: bool,

    /// Maximum number of jobs bundled at once
    #[arg(long, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Keep sibling jobs running after the first failure instead of cancelling them
    #[arg(long)]
    pub detach_on_failure: bool,

    /// Print the build summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Module ids to classify
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,

    #[command(flatten)]
    pub project: ProjectArgs,

    /// Print results as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CleanCacheArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        let cli = Cli::try_parse_from([
            "sysbundle",
            "build",
            "--prod",
            "--max-parallel",
            "4",
            "--root",
            "/repo",
        ])
        .unwrap();

        let Command::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert!(args.prod);
        assert_eq!(args.max_parallel, Some(4));
        assert_eq!(args.project.root, PathBuf::from("/repo"));
        assert!(!args.detach_on_failure);
    }

    #[test]
    fn test_classify_requires_ids() {
        assert!(Cli::try_parse_from(["sysbundle", "classify"]).is_err());
        let cli = Cli::try_parse_from(["sysbundle", "classify", "os", "./a"]).unwrap();
        let Command::Classify(args) = cli.command else {
            panic!("expected classify");
        };
        assert_eq!(args.ids, ["os", "./a"]);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["sysbundle", "-v", "-q", "clean-cache"]).is_err());
    }
}
