//! Personal cloud storage used to persist user-chosen covers.
//!
//! The storage SDK itself lives outside this crate; it is consumed through
//! the [`PersonalCloud`] trait. A [`CloudSession`] holds the authenticated
//! client, if the user has logged in.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use crate::comic::ComicId;
use crate::config::CloudConfig;

/// Errors reported by the cloud collaborator.
#[derive(Debug, Clone, Error)]
pub enum CloudError {
    /// The session is no longer authorized.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The requested file does not exist.
    #[error("File not found: {0}")]
    NotFound(String),

    /// Any other failure reported by the SDK.
    #[error("Cloud request failed: {0}")]
    RequestFailed(String),
}

/// A file or folder listed in the user's cloud folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudEntry {
    pub name: String,
}

/// Capability surface of the personal cloud SDK.
#[async_trait]
pub trait PersonalCloud: Send + Sync {
    /// List the entries of a folder.
    async fn list_folder(&self, path: &str) -> Result<Vec<CloudEntry>, CloudError>;

    /// Download a file.
    async fn download(&self, path: &str) -> Result<Vec<u8>, CloudError>;

    /// Upload a file, replacing any existing one.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), CloudError>;
}

/// Where custom covers live in the cloud folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudLayout {
    folder: String,
}

impl CloudLayout {
    pub fn new(config: &CloudConfig) -> Self {
        let folder = config.folder.trim_matches('/');
        Self {
            folder: if folder.is_empty() {
                String::new()
            } else {
                format!("/{}", folder)
            },
        }
    }

    /// Folder path to list; empty for the app folder root.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// `"{id}.jpg"`
    pub fn file_name(&self, id: &ComicId) -> String {
        format!("{}.jpg", id)
    }

    /// `"{folder}/{id}.jpg"`
    pub fn file_path(&self, id: &ComicId) -> String {
        format!("{}/{}", self.folder, self.file_name(id))
    }
}

impl Default for CloudLayout {
    fn default() -> Self {
        Self::new(&CloudConfig::default())
    }
}

/// The user's cloud session, present only while authorized.
///
/// Cheap to clone; clones observe the same login state.
#[derive(Clone, Default)]
pub struct CloudSession {
    client: Arc<RwLock<Option<Arc<dyn PersonalCloud>>>>,
}

impl CloudSession {
    /// A session with nobody logged in.
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// A session that is already authorized.
    pub fn authorized(client: Arc<dyn PersonalCloud>) -> Self {
        Self {
            client: Arc::new(RwLock::new(Some(client))),
        }
    }

    /// Install an authorized client, e.g. after the user logged in.
    pub async fn authorize(&self, client: Arc<dyn PersonalCloud>) {
        *self.client.write().await = Some(client);
        info!("Personal cloud session authorized");
    }

    /// Drop the authorized client.
    pub async fn sign_out(&self) {
        *self.client.write().await = None;
        info!("Personal cloud session signed out");
    }

    pub async fn is_authorized(&self) -> bool {
        self.client.read().await.is_some()
    }

    /// The authorized client, if any.
    pub async fn client(&self) -> Option<Arc<dyn PersonalCloud>> {
        self.client.read().await.clone()
    }
}

impl std::fmt::Debug for CloudSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudSession").finish_non_exhaustive()
    }
}
