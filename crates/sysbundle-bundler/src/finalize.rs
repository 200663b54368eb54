//! Release finalization: minify for production, cache otherwise.

use std::fmt;
use std::sync::Arc;

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;

use crate::cache::CacheStore;
use crate::compiler::CompiledArtifact;
use crate::{Error, Result};

/// Minification of a compiled artifact failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to minify {file}: {message}")]
pub struct MinifyError {
    pub file: String,
    pub message: String,
}

impl MinifyError {
    pub fn new(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// Turns CommonJS source into minified CommonJS source.
pub trait CodeMinifier: Send + Sync + fmt::Debug {
    fn minify(&self, code: &str, file_name: &str) -> std::result::Result<String, MinifyError>;
}

/// OXC parser + minifier + codegen.
#[derive(Debug, Clone, Copy, Default)]
pub struct OxcMinifier;

impl CodeMinifier for OxcMinifier {
    fn minify(&self, code: &str, file_name: &str) -> std::result::Result<String, MinifyError> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, SourceType::cjs()).parse();

        if ret.panicked || !ret.errors.is_empty() {
            let message = ret
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(MinifyError::new(
                file_name,
                if message.is_empty() {
                    "parser aborted".to_string()
                } else {
                    message
                },
            ));
        }

        let mut program = ret.program;
        let minified = Minifier::new(MinifierOptions::default()).minify(&allocator, &mut program);

        Ok(Codegen::new()
            .with_options(CodegenOptions::minify())
            .with_scoping(minified.scoping)
            .build(&program)
            .code)
    }
}

/// What finalization did to an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub minified: bool,
    /// Size of the final output file.
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ReleaseFinalizer {
    minifier: Arc<dyn CodeMinifier>,
}

impl ReleaseFinalizer {
    pub fn new(minifier: Arc<dyn CodeMinifier>) -> Self {
        Self { minifier }
    }

    /// Production: minify and overwrite the output in place, never touching
    /// the cache. Otherwise: copy the output bytes into `cache` when given.
    pub async fn finalize(
        &self,
        artifact: &CompiledArtifact,
        is_prod: bool,
        cache: Option<&CacheStore>,
    ) -> Result<FinalizeOutcome> {
        let bytes = tokio::fs::read(&artifact.path).await.map_err(|e| {
            Error::io(format!("failed to read {}", artifact.path.display()), e)
        })?;

        if !is_prod {
            if let Some(cache) = cache {
                cache.write(&artifact.entry, &bytes).await?;
            }
            return Ok(FinalizeOutcome {
                minified: false,
                bytes: bytes.len() as u64,
            });
        }

        let code = String::from_utf8(bytes)
            .map_err(|e| MinifyError::new(&artifact.entry, format!("output is not UTF-8: {e}")))?;

        let minifier = Arc::clone(&self.minifier);
        let file_name = artifact.entry.clone();
        let minified = tokio::task::spawn_blocking(move || minifier.minify(&code, &file_name))
            .await
            .map_err(|e| Error::Compile(format!("minifier task failed: {e}")))??;

        tokio::fs::write(&artifact.path, minified.as_bytes())
            .await
            .map_err(|e| Error::io(format!("failed to write {}", artifact.path.display()), e))?;

        tracing::debug!(
            entry = %artifact.entry,
            before = artifact.bytes,
            after = minified.len(),
            "minified artifact"
        );

        Ok(FinalizeOutcome {
            minified: true,
            bytes: minified.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SOURCE: &str = r#"
'use strict';
function addNumbers(firstValue, secondValue) {
    // comment that goes away
    const result = firstValue + secondValue;
    return result;
}
module.exports = { addNumbers: addNumbers };
"#;

    #[derive(Debug)]
    struct Failing;

    impl CodeMinifier for Failing {
        fn minify(&self, _code: &str, file_name: &str) -> std::result::Result<String, MinifyError> {
            Err(MinifyError::new(file_name, "unexpected token"))
        }
    }

    fn artifact(dir: &TempDir, code: &str) -> CompiledArtifact {
        let path = dir.path().join("autoprefixer.js");
        std::fs::write(&path, code).unwrap();
        CompiledArtifact {
            entry: "autoprefixer.js".to_string(),
            path,
            bytes: code.len() as u64,
        }
    }

    #[test]
    fn test_oxc_minifier_shrinks_code() {
        let out = OxcMinifier.minify(SOURCE, "a.js").unwrap();
        assert!(out.len() < SOURCE.len());
        assert!(!out.contains("comment that goes away"));
        assert!(out.contains("module.exports"));
    }

    #[test]
    fn test_oxc_minifier_reports_parse_errors() {
        let err = OxcMinifier.minify("function (", "broken.js").unwrap_err();
        assert_eq!(err.file, "broken.js");
        assert!(!err.message.is_empty());
    }

    #[tokio::test]
    async fn test_production_minifies_in_place_without_cache() {
        let temp = TempDir::new().unwrap();
        let artifact = artifact(&temp, SOURCE);
        let cache = CacheStore::new(temp.path().join("cache"));

        let outcome = ReleaseFinalizer::new(Arc::new(OxcMinifier))
            .finalize(&artifact, true, Some(&cache))
            .await
            .unwrap();

        assert!(outcome.minified);
        let written = std::fs::read_to_string(&artifact.path).unwrap();
        assert_eq!(written.len() as u64, outcome.bytes);
        assert!(written.len() < SOURCE.len());
        assert!(!cache.entry_path("autoprefixer.js").exists());
    }

    #[tokio::test]
    async fn test_production_minify_failure_is_fatal() {
        let temp = TempDir::new().unwrap();
        let artifact = artifact(&temp, SOURCE);

        let err = ReleaseFinalizer::new(Arc::new(Failing))
            .finalize(&artifact, true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Minify(_)));
    }

    #[tokio::test]
    async fn test_development_writes_cache_and_keeps_output() {
        let temp = TempDir::new().unwrap();
        let artifact = artifact(&temp, SOURCE);
        let cache = CacheStore::new(temp.path().join("cache"));
        cache.ensure_dir().await.unwrap();

        let outcome = ReleaseFinalizer::new(Arc::new(Failing))
            .finalize(&artifact, false, Some(&cache))
            .await
            .unwrap();

        assert!(!outcome.minified);
        assert_eq!(std::fs::read_to_string(&artifact.path).unwrap(), SOURCE);
        assert_eq!(
            std::fs::read_to_string(cache.entry_path("autoprefixer.js")).unwrap(),
            SOURCE
        );
    }
}
