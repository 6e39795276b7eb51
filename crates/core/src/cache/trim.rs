//! Trim policy and eviction planning.

use std::path::PathBuf;
use std::time::SystemTime;

/// Size thresholds for trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimPolicy {
    /// Trim only when the total exceeds this.
    pub max_bytes: u64,
    /// Remove entries until the total is at or below this.
    pub target_bytes: u64,
}

/// A cache file considered by a trim pass.
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    pub path: PathBuf,
    pub size: u64,
    pub created: SystemTime,
}

/// Result of one trim pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimReport {
    pub scanned_bytes: u64,
    pub removed_entries: usize,
    pub removed_bytes: u64,
    pub remaining_bytes: u64,
}

impl TrimReport {
    pub fn trimmed(&self) -> bool {
        self.removed_entries > 0
    }
}

/// Pick the entries to remove, newest created first.
///
/// Returns nothing while the total is within `max_bytes`. Otherwise entries
/// are taken newest-first until the remaining total is at or below
/// `target_bytes`.
pub fn plan_evictions(entries: &[CacheEntryInfo], policy: TrimPolicy) -> Vec<CacheEntryInfo> {
    let mut total: u64 = entries.iter().map(|e| e.size).sum();
    if total <= policy.max_bytes {
        return Vec::new();
    }

    let mut by_newest: Vec<&CacheEntryInfo> = entries.iter().collect();
    by_newest.sort_by(|a, b| b.created.cmp(&a.created));

    let mut evictions = Vec::new();
    for entry in by_newest {
        if total <= policy.target_bytes {
            break;
        }
        total = total.saturating_sub(entry.size);
        evictions.push(entry.clone());
    }
    evictions
}
