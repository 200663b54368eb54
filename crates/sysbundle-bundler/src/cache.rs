//! Directory-backed artifact cache.
//!
//! One file per entry name under the cache directory. Presence of the file is
//! the only hit signal; there is no content hash and no expiry.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Cache failures, always naming the path involved.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to create cache directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cache I/O failed for {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Counters shared by every store of one build.
#[derive(Debug, Default)]
pub struct CacheStats {
    lookups: AtomicU64,
    hits: AtomicU64,
    writes: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub lookups: u64,
    pub hits: u64,
    pub writes: u64,
}

impl CacheStats {
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }
}

impl CacheStatsSnapshot {
    pub fn misses(&self) -> u64 {
        // counters are loaded one at a time while jobs may still be running
        self.lookups.saturating_sub(self.hits)
    }
}

/// Key/value store mapping an entry name to `dir/<entry name>`.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
    stats: Arc<CacheStats>,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_stats(dir, Arc::new(CacheStats::default()))
    }

    pub fn with_stats(dir: impl Into<PathBuf>, stats: Arc<CacheStats>) -> Self {
        Self {
            dir: dir.into(),
            stats,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stats(&self) -> &Arc<CacheStats> {
        &self.stats
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Create the cache directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::CreateDir {
                path: self.dir.clone(),
                source,
            })
    }

    /// Bytes of a previously written entry, or `None` on a miss.
    pub async fn try_read(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.stats.lookups.fetch_add(1, Ordering::Relaxed);
        let path = self.entry_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(bytes))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    /// Store `bytes` under `key`.
    ///
    /// Written to a sibling temp file and renamed into place, so a reader
    /// never observes a half-written entry.
    pub async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let tmp = self.dir.join(format!(".{key}.tmp"));

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|source| CacheError::Io {
                path: tmp.clone(),
                source,
            })?;
        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::Io { path, source });
        }

        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "cache entry written");
        Ok(())
    }

    /// Remove the whole cache directory. Missing directories are fine.
    pub async fn clear(&self) -> Result<(), CacheError> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Io {
                path: self.dir.clone(),
                source,
            }),
        }
    }
}
