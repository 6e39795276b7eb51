//! Size-bounded key/bytes store on local disk.
//!
//! One file per key under the cache directory. Writes replace the whole
//! entry. Every write schedules a background trim that keeps the directory
//! below a ceiling by removing the newest-created entries first until a
//! lower target is reached.

mod disk;
mod trim;

pub use disk::DiskCache;
pub use trim::{plan_evictions, CacheEntryInfo, TrimPolicy, TrimReport};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when using the disk cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Key cannot be used as a file name.
    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),

    /// Writing an entry failed.
    #[error("Failed to write cache entry {key}")]
    WriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading an entry failed for a reason other than absence.
    #[error("Failed to read cache entry {key}")]
    ReadFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Cache directory could not be created or listed.
    #[error("Cache directory unavailable: {path}")]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
