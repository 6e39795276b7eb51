//! Cover image resolution.
//!
//! A cover is resolved in stages, stopping at the first success:
//! the disk cache, then the user's personal cloud folder (only while a
//! session is authorized), then the origin server. Every fresh download is
//! written back into the disk cache.

mod resolver;
mod task;

pub use resolver::CoverResolver;
pub use task::{CancelFlag, CoverTask};

use thiserror::Error;

use crate::comic::{ComicId, ComicRecord};

/// Errors that end a cover resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoverError {
    /// The comic has no thumbnail, so there is nothing to resolve.
    #[error("Comic {0} has no cover source")]
    NoCoverSource(ComicId),

    /// Every stage failed.
    #[error("Cover for comic {id} unavailable: {reason}")]
    CoverUnavailable { id: ComicId, reason: String },

    /// The unit was cancelled before reaching its next stage.
    #[error("Cover resolution for comic {0} cancelled")]
    Cancelled(ComicId),
}

/// Where a resolved cover came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverSource {
    Cache,
    PersonalCloud,
    Origin,
}

impl CoverSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverSource::Cache => "cache",
            CoverSource::PersonalCloud => "personal_cloud",
            CoverSource::Origin => "origin",
        }
    }
}

/// A request to resolve one comic's cover.
///
/// Only constructible for comics that have a thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverRequest {
    comic_id: ComicId,
    image_url: String,
}

impl CoverRequest {
    pub fn new(comic: &ComicRecord) -> Result<Self, CoverError> {
        let image_url = comic
            .thumbnail_url()
            .ok_or_else(|| CoverError::NoCoverSource(comic.id.clone()))?;

        Ok(Self {
            comic_id: comic.id.clone(),
            image_url,
        })
    }

    pub fn comic_id(&self) -> &ComicId {
        &self.comic_id
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    /// Disk cache key for this comic's cover.
    pub fn cache_key(&self) -> &str {
        self.comic_id.as_str()
    }
}

/// A successfully resolved cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCover {
    pub comic_id: ComicId,
    pub bytes: Vec<u8>,
    pub source: CoverSource,
}

/// What happened to the personal cloud copy of a replaced cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Uploaded,
    /// Nobody is logged in; the caller may offer a login.
    NoSession,
    Failed(String),
}

/// Outcome of a user-supplied cover replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverReplacement {
    /// Whether the local cache now holds the new cover.
    pub cached: bool,
    pub upload: UploadStatus,
}
