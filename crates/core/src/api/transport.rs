//! HTTP transport used for API calls and image downloads.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use tracing::debug;

use super::TransportError;

/// Response body as a stream of chunks, in transport order.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

/// Read-only HTTP access.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET and return the body stream.
    ///
    /// Non-success statuses are reported as [`TransportError::Status`]
    /// before any body is streamed.
    async fn get(&self, url: &str) -> Result<ByteStream, TransportError>;
}

/// Drain a body stream into one buffer.
pub async fn collect_body(mut stream: ByteStream) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk?);
    }
    Ok(body)
}

/// [`HttpTransport`] backed by `reqwest`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<ByteStream, TransportError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            debug!("GET {} returned {}", redact(url), status);
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: redact(url),
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(TransportError::from));

        Ok(stream.boxed())
    }
}

/// Strip the query string so signatures don't end up in errors or logs.
fn redact(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{}?…", base),
        None => url.to_string(),
    }
}
