//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Origin API (requests, latency, rejected duplicates, decoded records)
//! - Disk cache (trim passes, evicted bytes)
//! - Cover resolution (outcome by stage)
//! - Batch loading

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

// =============================================================================
// Origin API
// =============================================================================

/// Origin requests by outcome.
pub static ORIGIN_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("covershelf_origin_requests_total", "Total origin API requests"),
        &["status"], // "success", "network", "invalid_format", "invalid_url"
    )
    .unwrap()
});

/// Origin request duration in seconds.
pub static ORIGIN_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "covershelf_origin_request_duration_seconds",
            "Duration of origin API requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["status"],
    )
    .unwrap()
});

/// Queries rejected because an identical one was still running.
pub static DUPLICATE_QUERIES_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "covershelf_duplicate_queries_rejected_total",
        "Queries rejected while an identical query was in flight",
    )
    .unwrap()
});

/// Records decoded from responses, by outcome.
pub static RECORDS_DECODED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "covershelf_records_decoded_total",
            "Result objects decoded into typed records",
        ),
        &["outcome"], // "decoded", "skipped"
    )
    .unwrap()
});

// =============================================================================
// Disk cache
// =============================================================================

/// Trim passes that removed at least one entry.
pub static CACHE_TRIMS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("covershelf_cache_trims_total", "Cache trim passes that evicted entries")
        .unwrap()
});

/// Bytes evicted by trim passes.
pub static CACHE_EVICTED_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "covershelf_cache_evicted_bytes_total",
        "Bytes removed from the cache by trimming",
    )
    .unwrap()
});

// =============================================================================
// Covers
// =============================================================================

/// Cover resolutions by outcome.
pub static COVER_RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("covershelf_cover_resolutions_total", "Cover resolutions by outcome"),
        &["outcome"], // "cache", "personal_cloud", "origin", "unavailable", "cancelled"
    )
    .unwrap()
});

/// Custom cover uploads to the personal cloud, by result.
pub static COVER_UPLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("covershelf_cover_uploads_total", "Custom cover uploads"),
        &["result"], // "uploaded", "no_session", "failed"
    )
    .unwrap()
});

// =============================================================================
// Browsing
// =============================================================================

/// Batch loads by result.
pub static BATCHES_LOADED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("covershelf_batches_loaded_total", "Comic batch loads"),
        &["result"], // "loaded", "failed"
    )
    .unwrap()
});

/// All core metrics, for registration by the embedding application.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Origin
        Box::new(ORIGIN_REQUESTS.clone()),
        Box::new(ORIGIN_REQUEST_DURATION.clone()),
        Box::new(DUPLICATE_QUERIES_REJECTED.clone()),
        Box::new(RECORDS_DECODED.clone()),
        // Cache
        Box::new(CACHE_TRIMS.clone()),
        Box::new(CACHE_EVICTED_BYTES.clone()),
        // Covers
        Box::new(COVER_RESOLUTIONS.clone()),
        Box::new(COVER_UPLOADS.clone()),
        // Browsing
        Box::new(BATCHES_LOADED.clone()),
    ]
}

/// Register every core metric with `registry`.
pub fn register_all(registry: &Registry) -> Result<(), prometheus::Error> {
    for metric in all_metrics() {
        registry.register(metric)?;
    }
    Ok(())
}

/// Encode a registry in Prometheus text format.
pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains_all_metrics() {
        let registry = Registry::new();
        register_all(&registry).unwrap();

        // Vec metrics only show up once a label set has been touched.
        ORIGIN_REQUESTS.with_label_values(&["success"]).inc();
        ORIGIN_REQUEST_DURATION.with_label_values(&["success"]).observe(0.1);
        RECORDS_DECODED.with_label_values(&["decoded"]).inc();
        COVER_RESOLUTIONS.with_label_values(&["cache"]).inc();
        COVER_UPLOADS.with_label_values(&["uploaded"]).inc();
        BATCHES_LOADED.with_label_values(&["loaded"]).inc();

        let output = encode(&registry).unwrap();
        for name in [
            "covershelf_origin_requests_total",
            "covershelf_origin_request_duration_seconds",
            "covershelf_duplicate_queries_rejected_total",
            "covershelf_records_decoded_total",
            "covershelf_cache_trims_total",
            "covershelf_cache_evicted_bytes_total",
            "covershelf_cover_resolutions_total",
            "covershelf_cover_uploads_total",
            "covershelf_batches_loaded_total",
        ] {
            assert!(output.contains(name), "missing {}", name);
        }
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        register_all(&registry).unwrap();
        assert!(register_all(&registry).is_err());
    }
}
