//! Mock personal cloud for testing.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::cloud::{CloudEntry, CloudError, PersonalCloud};

/// A recorded cloud call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCloudCall {
    ListFolder(String),
    Download(String),
    Upload { path: String, size: usize },
}

/// Mock implementation of the PersonalCloud trait.
///
/// Files live in memory keyed by their full path, e.g. `"/42.jpg"`.
/// Clones share the same files and recorded calls.
///
/// # Example
///
/// ```rust,ignore
/// let cloud = MockCloud::new();
/// cloud.put_file("/42.jpg", cover_bytes).await;
///
/// let session = CloudSession::authorized(Arc::new(cloud.clone()));
/// // ... resolve covers ...
/// assert!(cloud.recorded_calls().await.contains(&RecordedCloudCall::Download("/42.jpg".into())));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockCloud {
    /// Stored files by full path.
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedCloudCall>>>,
    /// If set, the next call will fail with this error.
    next_error: Arc<RwLock<Option<CloudError>>>,
}

impl MockCloud {
    /// Create an empty mock cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file.
    pub async fn put_file(&self, path: &str, bytes: Vec<u8>) {
        self.files.write().await.insert(path.to_string(), bytes);
    }

    /// Get a stored file.
    pub async fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(path).cloned()
    }

    /// Get recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedCloudCall> {
        self.calls.read().await.clone()
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: CloudError) {
        *self.next_error.write().await = Some(error);
    }

    async fn record(&self, call: RecordedCloudCall) -> Result<(), CloudError> {
        self.calls.write().await.push(call);
        match self.next_error.write().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PersonalCloud for MockCloud {
    async fn list_folder(&self, path: &str) -> Result<Vec<CloudEntry>, CloudError> {
        self.record(RecordedCloudCall::ListFolder(path.to_string()))
            .await?;

        let folder = path.trim_end_matches('/');
        let entries = self
            .files
            .read()
            .await
            .keys()
            .filter_map(|file| {
                let (parent, name) = file.rsplit_once('/')?;
                (parent == folder).then(|| CloudEntry {
                    name: name.to_string(),
                })
            })
            .collect();
        Ok(entries)
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, CloudError> {
        self.record(RecordedCloudCall::Download(path.to_string()))
            .await?;
        self.file(path)
            .await
            .ok_or_else(|| CloudError::NotFound(path.to_string()))
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<(), CloudError> {
        self.record(RecordedCloudCall::Upload {
            path: path.to_string(),
            size: bytes.len(),
        })
        .await?;
        self.put_file(path, bytes).await;
        Ok(())
    }
}
