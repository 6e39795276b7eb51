//! Staged cover resolution: cache, personal cloud, origin.

use std::sync::Arc;

use tokio::sync::{oneshot, Semaphore};
use tracing::{debug, info, warn};

use super::task::{CancelFlag, CoverTask};
use super::{
    CoverError, CoverReplacement, CoverRequest, CoverSource, ResolvedCover, UploadStatus,
};
use crate::api::{collect_body, HttpTransport};
use crate::cache::DiskCache;
use crate::cloud::{CloudLayout, CloudSession, PersonalCloud};
use crate::comic::ComicRecord;
use crate::config::CoversConfig;
use crate::metrics;

/// Resolves comic covers and keeps the disk cache filled.
///
/// Share by `Arc`; [`CoverResolver::spawn`] needs an `Arc<Self>` so units can
/// outlive the caller.
pub struct CoverResolver {
    cache: DiskCache,
    cloud: CloudSession,
    layout: CloudLayout,
    transport: Arc<dyn HttpTransport>,
    /// Bounds how many units may be past the cache stage at once.
    permits: Arc<Semaphore>,
}

impl CoverResolver {
    pub fn new(
        cache: DiskCache,
        cloud: CloudSession,
        layout: CloudLayout,
        transport: Arc<dyn HttpTransport>,
        config: &CoversConfig,
    ) -> Self {
        Self {
            cache,
            cloud,
            layout,
            transport,
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
        }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    pub fn session(&self) -> &CloudSession {
        &self.cloud
    }

    /// Resolve a cover and wait for the result.
    pub async fn resolve(&self, request: &CoverRequest) -> Result<ResolvedCover, CoverError> {
        self.run(request, &CancelFlag::new()).await
    }

    /// Start a resolution unit in the background.
    pub fn spawn(self: &Arc<Self>, request: CoverRequest) -> CoverTask {
        let cancel = CancelFlag::new();
        let (tx, rx) = oneshot::channel();
        let comic_id = request.comic_id().clone();

        let resolver = Arc::clone(self);
        let flag = cancel.clone();
        tokio::spawn(async move {
            let result = resolver.run(&request, &flag).await;
            if flag.is_cancelled() {
                debug!("Dropping cover result for cancelled comic {}", request.comic_id());
                return;
            }
            let _ = tx.send(result);
        });

        CoverTask::new(comic_id, cancel, rx)
    }

    /// Replace a comic's cover with user-supplied bytes.
    ///
    /// The cache write and the cloud upload are independent: a failed upload
    /// leaves the new cover cached, and a failed cache write still uploads.
    pub async fn replace_cover(&self, comic: &ComicRecord, bytes: Vec<u8>) -> CoverReplacement {
        let cached = match self.cache.put(comic.id.as_str(), &bytes).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to cache custom cover for comic {}: {}", comic.id, e);
                false
            }
        };

        let upload = match self.cloud.client().await {
            None => {
                debug!("No cloud session, custom cover for comic {} kept local", comic.id);
                UploadStatus::NoSession
            }
            Some(client) => {
                let path = self.layout.file_path(&comic.id);
                match client.upload(&path, bytes).await {
                    Ok(()) => {
                        info!("Uploaded custom cover for comic {} to {}", comic.id, path);
                        UploadStatus::Uploaded
                    }
                    Err(e) => {
                        warn!("Failed to upload custom cover to {}: {}", path, e);
                        UploadStatus::Failed(e.to_string())
                    }
                }
            }
        };

        let label = match &upload {
            UploadStatus::Uploaded => "uploaded",
            UploadStatus::NoSession => "no_session",
            UploadStatus::Failed(_) => "failed",
        };
        metrics::COVER_UPLOADS.with_label_values(&[label]).inc();

        CoverReplacement { cached, upload }
    }

    async fn run(
        &self,
        request: &CoverRequest,
        cancel: &CancelFlag,
    ) -> Result<ResolvedCover, CoverError> {
        let result = self.resolve_stages(request, cancel).await;

        let outcome = match &result {
            Ok(cover) => cover.source.as_str(),
            Err(CoverError::Cancelled(_)) => "cancelled",
            Err(_) => "unavailable",
        };
        metrics::COVER_RESOLUTIONS.with_label_values(&[outcome]).inc();

        result
    }

    async fn resolve_stages(
        &self,
        request: &CoverRequest,
        cancel: &CancelFlag,
    ) -> Result<ResolvedCover, CoverError> {
        let id = request.comic_id();

        if cancel.is_cancelled() {
            return Err(CoverError::Cancelled(id.clone()));
        }

        if let Some(bytes) = self.check_cache(request).await {
            debug!("Cover for comic {} served from cache", id);
            return Ok(self.resolved(request, bytes, CoverSource::Cache));
        }

        // The semaphore is never closed.
        let _permit = self.permits.acquire().await.ok();

        if cancel.is_cancelled() {
            return Err(CoverError::Cancelled(id.clone()));
        }

        if let Some(client) = self.cloud.client().await {
            if let Some(bytes) = self.check_personal_cloud(client.as_ref(), request).await {
                self.store(request, &bytes).await;
                return Ok(self.resolved(request, bytes, CoverSource::PersonalCloud));
            }
            if cancel.is_cancelled() {
                return Err(CoverError::Cancelled(id.clone()));
            }
        }

        match self.fetch_origin(request).await {
            Ok(bytes) => {
                self.store(request, &bytes).await;
                Ok(self.resolved(request, bytes, CoverSource::Origin))
            }
            Err(reason) => {
                warn!("Cover for comic {} unavailable: {}", id, reason);
                Err(CoverError::CoverUnavailable {
                    id: id.clone(),
                    reason,
                })
            }
        }
    }

    async fn check_cache(&self, request: &CoverRequest) -> Option<Vec<u8>> {
        match self.cache.get(request.cache_key()).await {
            Ok(Some(bytes)) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(e) => {
                warn!("Cache read failed for comic {}: {}", request.comic_id(), e);
                None
            }
        }
    }

    async fn check_personal_cloud(
        &self,
        client: &dyn PersonalCloud,
        request: &CoverRequest,
    ) -> Option<Vec<u8>> {
        let id = request.comic_id();
        let file_name = self.layout.file_name(id);

        let entries = match client.list_folder(self.layout.folder()).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Listing cloud folder failed: {}", e);
                return None;
            }
        };
        if !entries.iter().any(|entry| entry.name == file_name) {
            return None;
        }

        let path = self.layout.file_path(id);
        match client.download(&path).await {
            Ok(bytes) if !bytes.is_empty() => {
                debug!("Custom cover for comic {} found at {}", id, path);
                Some(bytes)
            }
            Ok(_) => {
                warn!("Cloud file {} is empty", path);
                None
            }
            Err(e) => {
                warn!("Downloading {} failed: {}", path, e);
                None
            }
        }
    }

    async fn fetch_origin(&self, request: &CoverRequest) -> Result<Vec<u8>, String> {
        let stream = self
            .transport
            .get(request.image_url())
            .await
            .map_err(|e| e.to_string())?;
        let bytes = collect_body(stream).await.map_err(|e| e.to_string())?;

        if bytes.is_empty() {
            return Err("empty image body".to_string());
        }
        Ok(bytes)
    }

    /// Cache write failures never fail the resolution.
    async fn store(&self, request: &CoverRequest, bytes: &[u8]) {
        if let Err(e) = self.cache.put(request.cache_key(), bytes).await {
            warn!("Failed to cache cover for comic {}: {}", request.comic_id(), e);
        }
    }

    fn resolved(&self, request: &CoverRequest, bytes: Vec<u8>, source: CoverSource) -> ResolvedCover {
        ResolvedCover {
            comic_id: request.comic_id().clone(),
            bytes,
            source,
        }
    }
}

impl std::fmt::Debug for CoverResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverResolver")
            .field("cache", &self.cache)
            .field("layout", &self.layout)
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}
