//! File-per-key disk cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::trim::{plan_evictions, CacheEntryInfo, TrimPolicy, TrimReport};
use super::CacheError;
use crate::config::CacheConfig;
use crate::metrics;

struct DiskCacheInner {
    dir: PathBuf,
    policy: TrimPolicy,
    /// Serializes trim passes.
    trim_lock: Mutex<()>,
}

/// Disk-backed cache shared by every cover resolution and the batch loader.
///
/// Cheap to clone; clones share the directory and trim lock.
#[derive(Clone)]
pub struct DiskCache {
    inner: Arc<DiskCacheInner>,
}

impl DiskCache {
    /// Open (and create if needed) the cache directory.
    pub async fn open(config: &CacheConfig) -> Result<Self, CacheError> {
        fs::create_dir_all(&config.dir)
            .await
            .map_err(|e| CacheError::DirectoryUnavailable {
                path: config.dir.clone(),
                source: e,
            })?;

        Ok(Self {
            inner: Arc::new(DiskCacheInner {
                dir: config.dir.clone(),
                policy: TrimPolicy {
                    max_bytes: config.max_bytes,
                    target_bytes: config.trim_target_bytes,
                },
                trim_lock: Mutex::new(()),
            }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    pub fn policy(&self) -> TrimPolicy {
        self.inner.policy
    }

    /// Read the bytes stored under `key`, if any.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.entry_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::ReadFailed {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    /// Store `bytes` under `key`, replacing any previous entry.
    ///
    /// The entry is written to a hidden temporary file and renamed into
    /// place. A trim pass is spawned afterwards; the returned handle can be
    /// awaited but callers normally drop it.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<JoinHandle<()>, CacheError> {
        let path = self.entry_path(key)?;
        let temp_path = self.inner.dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));

        let write_failed = |source| CacheError::WriteFailed {
            key: key.to_string(),
            source,
        };

        if let Err(e) = fs::write(&temp_path, bytes).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(write_failed(e));
        }
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(write_failed(e));
        }

        debug!("Cached {} bytes under {}", bytes.len(), key);
        Ok(self.schedule_trim())
    }

    /// Spawn a trim pass in the background. Failures are logged only.
    pub fn schedule_trim(&self) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.trim().await {
                warn!("Cache trim failed: {}", e);
            }
        })
    }

    /// Run one trim pass now.
    ///
    /// An entry that cannot be removed is logged and skipped; the pass keeps
    /// going with the next one.
    pub async fn trim(&self) -> Result<TrimReport, CacheError> {
        let _pass = self.inner.trim_lock.lock().await;

        let entries = self.scan().await?;
        let scanned_bytes: u64 = entries.iter().map(|e| e.size).sum();
        let evictions = plan_evictions(&entries, self.inner.policy);

        let mut report = TrimReport {
            scanned_bytes,
            remaining_bytes: scanned_bytes,
            ..TrimReport::default()
        };
        if evictions.is_empty() {
            return Ok(report);
        }

        for entry in evictions {
            match fs::remove_file(&entry.path).await {
                Ok(()) => {
                    report.removed_entries += 1;
                    report.removed_bytes += entry.size;
                    report.remaining_bytes = report.remaining_bytes.saturating_sub(entry.size);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    report.remaining_bytes = report.remaining_bytes.saturating_sub(entry.size);
                }
                Err(e) => warn!("Failed to evict {:?}: {}", entry.path, e),
            }
        }

        metrics::CACHE_TRIMS.inc();
        metrics::CACHE_EVICTED_BYTES.inc_by(report.removed_bytes);
        info!(
            "Trimmed cache from {} to {} bytes ({} entries removed)",
            report.scanned_bytes, report.remaining_bytes, report.removed_entries
        );

        Ok(report)
    }

    /// Total size of all entries, in bytes.
    pub async fn total_size(&self) -> Result<u64, CacheError> {
        Ok(self.scan().await?.iter().map(|e| e.size).sum())
    }

    /// List visible regular files with their size and creation time.
    async fn scan(&self) -> Result<Vec<CacheEntryInfo>, CacheError> {
        let dir_error = |source| CacheError::DirectoryUnavailable {
            path: self.inner.dir.clone(),
            source,
        };

        let mut read_dir = fs::read_dir(&self.inner.dir).await.map_err(dir_error)?;
        let mut entries = Vec::new();

        while let Some(entry) = read_dir.next_entry().await.map_err(dir_error)? {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Skipping {:?} during scan: {}", entry.path(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let created = match metadata.created().or_else(|_| metadata.modified()) {
                Ok(created) => created,
                Err(e) => {
                    debug!("No timestamp for {:?}: {}", entry.path(), e);
                    continue;
                }
            };

            entries.push(CacheEntryInfo {
                path: entry.path(),
                size: metadata.len(),
                created,
            });
        }

        Ok(entries)
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, CacheError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\', '\0']);
        if !valid {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.inner.dir.join(key))
    }
}

impl std::fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCache")
            .field("dir", &self.inner.dir)
            .field("policy", &self.inner.policy)
            .finish()
    }
}
