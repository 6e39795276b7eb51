use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::query::SortOrder;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub origin: OriginConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub browse: BrowseConfig,
    #[serde(default)]
    pub covers: CoversConfig,
    #[serde(default)]
    pub cloud: CloudConfig,
}

/// Origin API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginConfig {
    /// API host (default: https://gateway.marvel.com)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Public API key, sent as `apikey`
    pub public_key: String,
    /// Private API key, only used for the request hash
    pub private_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://gateway.marvel.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Disk cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Directory holding one file per cached cover
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Trim is triggered once the cache grows beyond this size
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// A trim pass removes entries until the cache is at or below this size
    #[serde(default = "default_trim_target_bytes")]
    pub trim_target_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            max_bytes: default_max_bytes(),
            trim_target_bytes: default_trim_target_bytes(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("covershelf")
        .join("covers")
}

fn default_max_bytes() -> u64 {
    50 * 1024 * 1024 // 50 MB
}

fn default_trim_target_bytes() -> u64 {
    30 * 1024 * 1024 // 30 MB
}

/// Comic browsing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowseConfig {
    /// Records requested per batch (default: 60)
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Load the next batch once the visible index is this close to the end
    #[serde(default = "default_prefetch_distance")]
    pub prefetch_distance: usize,
    /// Optional ordering, e.g. "-focDate"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<SortOrder>,
    /// Skip variant covers
    #[serde(default)]
    pub exclude_variants: bool,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            prefetch_distance: default_prefetch_distance(),
            order_by: None,
            exclude_variants: false,
        }
    }
}

fn default_batch_size() -> u32 {
    60
}

fn default_prefetch_distance() -> usize {
    12
}

/// Cover resolution configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoversConfig {
    /// Maximum resolution units running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for CoversConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    6
}

/// Personal cloud layout configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CloudConfig {
    /// Folder holding custom covers, relative to the app folder root
    #[serde(default)]
    pub folder: String,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub origin: SanitizedOriginConfig,
    pub cache: CacheConfig,
    pub browse: BrowseConfig,
    pub covers: CoversConfig,
    pub cloud: CloudConfig,
}

/// Sanitized origin config (keys hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedOriginConfig {
    pub base_url: String,
    pub public_key_configured: bool,
    pub private_key_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            origin: SanitizedOriginConfig {
                base_url: config.origin.base_url.clone(),
                public_key_configured: !config.origin.public_key.is_empty(),
                private_key_configured: !config.origin.private_key.is_empty(),
                timeout_secs: config.origin.timeout_secs,
            },
            cache: config.cache.clone(),
            browse: config.browse.clone(),
            covers: config.covers.clone(),
            cloud: config.cloud.clone(),
        }
    }
}
