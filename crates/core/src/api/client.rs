//! Signed, deduplicated origin API client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use futures::StreamExt;
use reqwest::Url;
use tracing::{debug, warn};

use super::resource::{decode_all, ApiResource, JsonObject};
use super::response::parse_results;
use super::signing::RequestSigner;
use super::transport::HttpTransport;
use super::{ApiError, TransportError};
use crate::config::OriginConfig;
use crate::metrics;
use crate::query::ApiQuery;

/// Bytes received so far for one running request.
#[derive(Debug)]
struct InFlightRequest {
    buffer: Vec<u8>,
    started: Instant,
}

type InFlightTable = Arc<Mutex<HashMap<String, InFlightRequest>>>;

fn lock(table: &InFlightTable) -> MutexGuard<'_, HashMap<String, InFlightRequest>> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Removes the in-flight entry when the request finishes, fails or is dropped.
struct InFlightGuard {
    table: InFlightTable,
    identity: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(request) = lock(&self.table).remove(&self.identity) {
            debug!(
                "Request {} left in-flight table after {:?}",
                self.identity,
                request.started.elapsed()
            );
        }
    }
}

/// Client for the origin API.
///
/// Owns the in-flight request table. Construct one per application and share
/// it by `Arc`.
pub struct OriginClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    signer: RequestSigner,
    in_flight: InFlightTable,
}

impl OriginClient {
    /// Create a client, validating the configured base URL.
    pub fn new(config: &OriginConfig, transport: Arc<dyn HttpTransport>) -> Result<Self, ApiError> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ApiError::InvalidUrl(format!(
                "{}: expected an http(s) URL with a host",
                config.base_url
            )));
        }

        Ok(Self {
            transport,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            signer: RequestSigner::new(&config.public_key, &config.private_key),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Unsigned URL identifying a query; used as the deduplication key.
    pub fn request_identity(&self, query: &ApiQuery) -> String {
        format!(
            "{}{}?{}",
            self.base_url,
            query.endpoint().path(),
            query.fragments().join("&")
        )
    }

    /// Fully qualified URL including the authentication parameters.
    pub fn signed_url(&self, query: &ApiQuery) -> String {
        let auth = self.signer.sign_now();
        let mut fragments = query.fragments();
        fragments.extend(auth.fragments());
        format!(
            "{}{}?{}",
            self.base_url,
            query.endpoint().path(),
            fragments.join("&")
        )
    }

    /// Whether a request for this query is currently running.
    pub fn is_in_flight(&self, query: &ApiQuery) -> bool {
        lock(&self.in_flight).contains_key(&self.request_identity(query))
    }

    /// Number of requests currently running.
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Execute a query and return the raw result objects.
    ///
    /// Fails with [`ApiError::QueryAlreadyInFlight`] when an identical query
    /// is still running; no second network call is made in that case.
    pub async fn execute(&self, query: &ApiQuery) -> Result<Vec<JsonObject>, ApiError> {
        let identity = self.request_identity(query);
        let url = self.signed_url(query);
        Url::parse(&url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", identity, e)))?;

        let _guard = self.register(&identity)?;

        debug!("Executing origin query {}", identity);
        let started = Instant::now();

        let result = match self.stream_into_buffer(&identity, &url).await {
            Ok(()) => parse_results(&self.take_buffer(&identity)),
            Err(e) => Err(ApiError::Network(e)),
        };

        let status = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::ORIGIN_REQUESTS.with_label_values(&[status]).inc();
        metrics::ORIGIN_REQUEST_DURATION
            .with_label_values(&[status])
            .observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(objects) => debug!("Origin query {} returned {} objects", identity, objects.len()),
            Err(e) => warn!("Origin query {} failed: {}", identity, e),
        }

        result
    }

    /// Execute a query and decode each object as `T`, dropping the ones that fail.
    pub async fn fetch_typed<T: ApiResource>(&self, query: &ApiQuery) -> Result<Vec<T>, ApiError> {
        let objects = self.execute(query).await?;
        Ok(decode_all(&objects))
    }

    fn register(&self, identity: &str) -> Result<InFlightGuard, ApiError> {
        let mut table = lock(&self.in_flight);
        if table.contains_key(identity) {
            metrics::DUPLICATE_QUERIES_REJECTED.inc();
            return Err(ApiError::QueryAlreadyInFlight(identity.to_string()));
        }

        table.insert(
            identity.to_string(),
            InFlightRequest {
                buffer: Vec::new(),
                started: Instant::now(),
            },
        );

        Ok(InFlightGuard {
            table: Arc::clone(&self.in_flight),
            identity: identity.to_string(),
        })
    }

    async fn stream_into_buffer(&self, identity: &str, url: &str) -> Result<(), TransportError> {
        let mut stream = self.transport.get(url).await?;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if let Some(request) = lock(&self.in_flight).get_mut(identity) {
                request.buffer.extend_from_slice(&chunk);
            }
        }

        Ok(())
    }

    fn take_buffer(&self, identity: &str) -> Vec<u8> {
        lock(&self.in_flight)
            .get_mut(identity)
            .map(|request| std::mem::take(&mut request.buffer))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for OriginClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginClient")
            .field("base_url", &self.base_url)
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}
