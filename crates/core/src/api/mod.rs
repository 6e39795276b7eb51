//! Client for the origin comics API.
//!
//! Requests are signed with the configured key pair, deduplicated by their
//! unsigned URL while in flight, streamed into a per-request buffer and
//! parsed once on completion.

mod client;
mod resource;
mod response;
mod signing;
mod transport;

pub use client::OriginClient;
pub use resource::{decode_all, ApiResource, DecodeError, JsonObject};
pub use response::parse_results;
pub use signing::{AuthParams, RequestSigner};
pub use transport::{collect_body, ByteStream, HttpTransport, ReqwestTransport};

use thiserror::Error;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// Connection could not be established or was dropped.
    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Errors returned by [`OriginClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// The origin base URL or a composed request URL is malformed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// An identical request is still running.
    #[error("Query already in flight: {0}")]
    QueryAlreadyInFlight(String),

    /// Body was not JSON, or had neither a top-level array nor `data.results`.
    #[error("Invalid response format: {0}")]
    InvalidResponseFormat(String),

    /// Network failure, carries the transport cause.
    #[error("Network error: {0}")]
    Network(#[from] TransportError),
}

impl ApiError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidUrl(_) => "invalid_url",
            ApiError::QueryAlreadyInFlight(_) => "already_in_flight",
            ApiError::InvalidResponseFormat(_) => "invalid_format",
            ApiError::Network(_) => "network",
        }
    }
}
