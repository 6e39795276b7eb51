//! Cancellable handle for a spawned resolution unit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;

use super::{CoverError, ResolvedCover};
use crate::comic::ComicId;

/// Cooperative cancellation flag shared between a unit and its handle.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle to a resolution unit running in the background.
///
/// Cancelling only stops the caller from observing the result. A download
/// already under way still completes and still fills the cache.
#[derive(Debug)]
pub struct CoverTask {
    comic_id: ComicId,
    cancel: CancelFlag,
    result: oneshot::Receiver<Result<ResolvedCover, CoverError>>,
}

impl CoverTask {
    pub(crate) fn new(
        comic_id: ComicId,
        cancel: CancelFlag,
        result: oneshot::Receiver<Result<ResolvedCover, CoverError>>,
    ) -> Self {
        Self {
            comic_id,
            cancel,
            result,
        }
    }

    pub fn comic_id(&self) -> &ComicId {
        &self.comic_id
    }

    /// Stop observing this unit, e.g. because its grid cell was reused.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the result. `None` once the task has been cancelled.
    pub async fn outcome(self) -> Option<Result<ResolvedCover, CoverError>> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let result = self.result.await.ok()?;
        if self.cancel.is_cancelled() {
            return None;
        }
        Some(result)
    }
}
