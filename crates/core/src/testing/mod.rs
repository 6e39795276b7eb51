//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external service traits,
//! so the whole pipeline can be exercised without network access or a real
//! cloud account.
//!
//! # Example
//!
//! ```rust,ignore
//! use covershelf_core::testing::{fixtures, MockCloud, MockResponse, MockTransport};
//!
//! let transport = MockTransport::new();
//! transport
//!     .set_response(&fixtures::cover_url("42"), MockResponse::bytes(fixtures::cover_bytes("42")))
//!     .await;
//!
//! let cloud = MockCloud::new();
//! cloud.put_file("/42.jpg", b"custom".to_vec()).await;
//! ```

mod mock_cloud;
mod mock_transport;

pub use mock_cloud::{MockCloud, RecordedCloudCall};
pub use mock_transport::{MockResponse, MockTransport, RecordedRequest};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};

    use crate::comic::{ComicId, ComicRecord, Thumbnail};

    /// Base of every fixture cover URL.
    pub const IMAGE_HOST: &str = "http://img.test/covers";

    /// Cover image URL of fixture comic `id`.
    pub fn cover_url(id: &str) -> String {
        format!("{}/{}.jpg", IMAGE_HOST, id)
    }

    /// Distinct image bytes for fixture comic `id`.
    pub fn cover_bytes(id: &str) -> Vec<u8> {
        format!("cover-image-{}", id).into_bytes()
    }

    /// Create a comic result object as the origin API sends it.
    ///
    /// Numeric ids are sent as JSON numbers.
    pub fn comic_json(id: &str, title: &str) -> Value {
        let id_value = match id.parse::<u64>() {
            Ok(n) => json!(n),
            Err(_) => json!(id),
        };
        json!({
            "id": id_value,
            "resourceURI": format!("http://origin.test/v1/public/comics/{}", id),
            "title": title,
            "thumbnail": {
                "path": format!("{}/{}", IMAGE_HOST, id),
                "extension": "jpg"
            }
        })
    }

    /// Wrap result objects the way the origin API does.
    pub fn results_envelope(results: Vec<Value>) -> Value {
        json!({
            "code": 200,
            "status": "Ok",
            "data": {
                "offset": 0,
                "count": results.len(),
                "results": results
            }
        })
    }

    /// `count` comic objects with consecutive ids starting at `first_id`.
    pub fn comic_page(first_id: u64, count: u64) -> Value {
        results_envelope(
            (first_id..first_id + count)
                .map(|id| comic_json(&id.to_string(), &format!("Comic #{}", id)))
                .collect(),
        )
    }

    /// Create a decoded comic with a cover.
    pub fn comic(id: &str, title: &str) -> ComicRecord {
        ComicRecord {
            thumbnail: Some(Thumbnail {
                path: format!("{}/{}", IMAGE_HOST, id),
                extension: "jpg".to_string(),
            }),
            ..comic_without_cover(id, title)
        }
    }

    /// Create a decoded comic without a thumbnail.
    pub fn comic_without_cover(id: &str, title: &str) -> ComicRecord {
        ComicRecord {
            id: ComicId::from(id),
            resource_uri: format!("http://origin.test/v1/public/comics/{}", id),
            title: title.to_string(),
            thumbnail: None,
        }
    }
}
