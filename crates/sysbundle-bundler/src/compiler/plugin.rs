//! Rolldown plugin that applies the module classifier at `resolve_id`.

use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::Mutex;
use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};

use crate::classify::{ClassificationResult, ModuleClassifier, ResolutionError};

/// Marks redirected and external ids as external; leaves everything else to
/// Rolldown's resolver so it gets inlined.
///
/// A [`ResolutionError`] raised by the classifier aborts the build. Rolldown
/// only carries it as text, so the first one is also kept here for the
/// backend to surface with its proper type.
#[derive(Debug)]
pub struct ExternalsPlugin {
    classifier: Arc<ModuleClassifier>,
    failure: Mutex<Option<ResolutionError>>,
}

impl ExternalsPlugin {
    pub fn new(classifier: Arc<ModuleClassifier>) -> Self {
        Self {
            classifier,
            failure: Mutex::new(None),
        }
    }

    /// First resolution failure seen during the build, if any.
    pub fn take_failure(&self) -> Option<ResolutionError> {
        self.failure.lock().take()
    }

    fn resolve(&self, specifier: &str) -> HookResolveIdReturn {
        match self.classifier.classify(specifier) {
            Ok(ClassificationResult::Internal) => Ok(None),
            Ok(ClassificationResult::Redirect(id) | ClassificationResult::External(id)) => {
                Ok(Some(HookResolveIdOutput {
                    id: id.into(),
                    external: Some(ResolvedExternal::Bool(true)),
                    ..Default::default()
                }))
            }
            Err(err) => {
                let message = err.to_string();
                self.failure.lock().get_or_insert(err);
                Err(anyhow::anyhow!(message))
            }
        }
    }
}

impl Plugin for ExternalsPlugin {
    fn name(&self) -> Cow<'static, str> {
        "sysbundle-externals".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let result = self.resolve(args.specifier);
        async move { result }
    }
}
