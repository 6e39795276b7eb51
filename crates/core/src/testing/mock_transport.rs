//! Mock HTTP transport for testing.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};

use crate::api::{ByteStream, HttpTransport, TransportError};

/// A recorded GET for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Full URL, including the signature for API calls.
    pub url: String,
    /// When the request was made.
    pub timestamp: Instant,
}

/// Canned response served by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    chunks: Vec<Vec<u8>>,
    failure: Option<String>,
}

impl MockResponse {
    /// 200 with a JSON body in one chunk.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::bytes(value.to_string().into_bytes())
    }

    /// 200 with a raw body in one chunk.
    pub fn bytes(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Self::chunked(if body.is_empty() { Vec::new() } else { vec![body] })
    }

    /// 200 with a body split into the given chunks.
    pub fn chunked(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            status: 200,
            chunks,
            failure: None,
        }
    }

    /// Non-success status, reported before any body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            chunks: Vec::new(),
            failure: None,
        }
    }

    /// Fail the stream with a connection error after the last chunk.
    pub fn then_fail(mut self, reason: &str) -> Self {
        self.failure = Some(reason.to_string());
        self
    }

    fn into_stream(self, url: &str) -> Result<ByteStream, TransportError> {
        if !(200..300).contains(&self.status) {
            return Err(TransportError::Status {
                status: self.status,
                url: url.split('?').next().unwrap_or(url).to_string(),
            });
        }

        let mut items: Vec<Result<Vec<u8>, TransportError>> =
            self.chunks.into_iter().map(Ok).collect();
        if let Some(reason) = self.failure {
            items.push(Err(TransportError::Connection(reason)));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// Mock implementation of the HttpTransport trait.
///
/// Responses are matched by URL prefix, longest prefix first. One-shot
/// responses queued with [`MockTransport::enqueue_response`] are served
/// before the sticky ones set with [`MockTransport::set_response`]. Unknown
/// URLs get a 404.
///
/// [`MockTransport::hold`] parks every request after it has been recorded
/// until [`MockTransport::release`] is called, which makes in-flight states
/// observable.
///
/// # Example
///
/// ```rust,ignore
/// let transport = MockTransport::new();
/// transport
///     .set_response("https://origin.test/v1/public/comics", MockResponse::json(&body))
///     .await;
///
/// let client = OriginClient::new(&config, Arc::new(transport.clone()))?;
/// client.execute(&ApiQuery::comic_books()).await?;
/// assert_eq!(transport.request_count().await, 1);
/// ```
#[derive(Debug, Clone)]
pub struct MockTransport {
    /// Sticky responses by URL prefix.
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,
    /// One-shot responses by URL prefix.
    queued: Arc<RwLock<HashMap<String, VecDeque<MockResponse>>>>,
    /// Recorded requests.
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
    /// `true` while requests may proceed.
    gate: Arc<watch::Sender<bool>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a new mock transport with no responses.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            responses: Arc::new(RwLock::new(HashMap::new())),
            queued: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
            gate: Arc::new(gate),
        }
    }

    /// Serve `response` for every URL starting with `prefix`.
    pub async fn set_response(&self, prefix: &str, response: MockResponse) {
        self.responses
            .write()
            .await
            .insert(prefix.to_string(), response);
    }

    /// Serve `response` once for the next URL starting with `prefix`.
    pub async fn enqueue_response(&self, prefix: &str, response: MockResponse) {
        self.queued
            .write()
            .await
            .entry(prefix.to_string())
            .or_default()
            .push_back(response);
    }

    /// Park requests until [`MockTransport::release`].
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Let parked and future requests proceed.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    /// Get recorded requests.
    pub async fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }

    /// Get the number of requests made.
    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }

    /// Wait until at least `count` requests have been recorded.
    ///
    /// Panics after five seconds.
    pub async fn wait_for_requests(&self, count: usize) {
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            while self.request_count().await < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "timed out waiting for {} requests", count);
    }

    async fn response_for(&self, url: &str) -> Option<MockResponse> {
        {
            let mut queued = self.queued.write().await;
            let pending = queued.iter().filter(|(_, q)| !q.is_empty()).map(|(p, _)| p);
            let prefix = longest_prefix(pending, url);
            if let Some(prefix) = prefix {
                if let Some(response) = queued.get_mut(&prefix).and_then(VecDeque::pop_front) {
                    return Some(response);
                }
            }
        }

        let responses = self.responses.read().await;
        longest_prefix(responses.keys(), url).and_then(|prefix| responses.get(&prefix).cloned())
    }
}

fn longest_prefix<'a>(prefixes: impl Iterator<Item = &'a String>, url: &str) -> Option<String> {
    prefixes
        .filter(|prefix| url.starts_with(prefix.as_str()))
        .max_by_key(|prefix| prefix.len())
        .cloned()
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &str) -> Result<ByteStream, TransportError> {
        self.requests.write().await.push(RecordedRequest {
            url: url.to_string(),
            timestamp: Instant::now(),
        });

        let mut gate = self.gate.subscribe();
        // The sender lives as long as self.
        let _ = gate.wait_for(|open| *open).await;

        match self.response_for(url).await {
            Some(response) => response.into_stream(url),
            None => Err(TransportError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}
