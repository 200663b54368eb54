//! Bundling backends.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use rolldown::{
    BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform,
    RawMinifyOptions, ResolveOptions,
};
use rolldown_common::Output;
use rolldown_plugin::__inner::SharedPluginable;

use super::{AliasTable, ExternalsPlugin};
use crate::classify::ModuleClassifier;
use crate::diagnostics;
use crate::{Error, Result};

/// Everything a backend needs to bundle one entry.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    /// Absolute path of the entry module.
    pub entry: PathBuf,
    /// Working directory for module resolution.
    pub cwd: PathBuf,
    pub classifier: Arc<ModuleClassifier>,
    pub aliases: Arc<AliasTable>,
}

/// Turns one entry into one CommonJS module.
///
/// Implementations never minify; that is left to the release finalizer.
#[async_trait]
pub trait BundleBackend: Send + Sync + fmt::Debug {
    /// Bundle the request and return the code of the entry chunk.
    async fn bundle(&self, request: &BundleRequest) -> Result<String>;
}

/// Rolldown-backed implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolldownBackend;

impl RolldownBackend {
    fn options(request: &BundleRequest) -> BundlerOptions {
        let alias = (!request.aliases.is_empty()).then(|| request.aliases.to_rolldown());

        BundlerOptions {
            input: Some(vec![InputItem {
                name: None,
                import: request.entry.to_string_lossy().into_owned(),
            }]),
            cwd: Some(request.cwd.clone()),
            format: Some(OutputFormat::Cjs),
            platform: Some(Platform::Node),
            minify: Some(RawMinifyOptions::from(false)),
            resolve: Some(ResolveOptions {
                alias,
                main_fields: Some(vec!["module".to_string(), "main".to_string()]),
                condition_names: Some(vec![
                    "node".to_string(),
                    "import".to_string(),
                    "require".to_string(),
                    "default".to_string(),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[async_trait]
impl BundleBackend for RolldownBackend {
    async fn bundle(&self, request: &BundleRequest) -> Result<String> {
        let externals = Arc::new(ExternalsPlugin::new(Arc::clone(&request.classifier)));
        let plugins: Vec<SharedPluginable> = vec![Arc::clone(&externals) as SharedPluginable];

        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(Self::options(request))
            .with_plugins(plugins)
            .build()
            .map_err(|e| Error::Compile(format!("{e:?}")))?;

        let output = match bundler.generate().await {
            Ok(output) => output,
            Err(batch) => {
                if let Some(failure) = externals.take_failure() {
                    return Err(failure.into());
                }
                return Err(Error::BundleDiagnostic(
                    diagnostics::extract_from_rolldown_error(&batch),
                ));
            }
        };

        output
            .assets
            .iter()
            .find_map(|asset| match asset {
                Output::Chunk(chunk) if chunk.is_entry => Some(chunk.code.clone()),
                _ => None,
            })
            .ok_or_else(|| {
                Error::Compile(format!(
                    "no entry chunk produced for {}",
                    request.entry.display()
                ))
            })
    }
}
