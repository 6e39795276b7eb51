use reqwest::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Origin base URL is an absolute http(s) URL with a host
/// - API keys are present
/// - Cache trim target does not exceed the ceiling
/// - Batch size and resolution concurrency are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let base = Url::parse(&config.origin.base_url).map_err(|e| {
        ConfigError::ValidationError(format!(
            "origin.base_url '{}' is not a valid URL: {}",
            config.origin.base_url, e
        ))
    })?;
    if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
        return Err(ConfigError::ValidationError(format!(
            "origin.base_url '{}' must be an http(s) URL with a host",
            config.origin.base_url
        )));
    }

    if config.origin.public_key.is_empty() || config.origin.private_key.is_empty() {
        return Err(ConfigError::ValidationError(
            "origin.public_key and origin.private_key are required".to_string(),
        ));
    }

    if config.cache.trim_target_bytes > config.cache.max_bytes {
        return Err(ConfigError::ValidationError(format!(
            "cache.trim_target_bytes ({}) cannot exceed cache.max_bytes ({})",
            config.cache.trim_target_bytes, config.cache.max_bytes
        )));
    }

    if config.browse.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "browse.batch_size cannot be 0".to_string(),
        ));
    }

    if config.covers.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "covers.max_concurrent cannot be 0".to_string(),
        ));
    }

    Ok(())
}
