use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::api::{ApiError, OriginClient};
use crate::comic::ComicRecord;
use crate::config::BrowseConfig;
use crate::metrics;
use crate::query::{ApiQuery, QueryParameter};

/// Tells the display context that records were appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayRefresh {
    /// Index of the first appended record.
    pub first_index: usize,
    /// Number of records appended.
    pub appended: usize,
    /// Number of records loaded after the append.
    pub total: usize,
}

/// Result of one [`BatchLoader::load_next_batch`] call.
#[derive(Debug)]
pub enum BatchOutcome {
    Loaded { appended: usize },
    /// Another batch is still loading; nothing was requested.
    AlreadyLoading,
    /// The fetch failed; no records were added.
    Failed(ApiError),
}

/// Clears the loading flag however the load ends.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Loads comics batch by batch, in display order.
///
/// At most one batch is outstanding at a time. Appended records are announced
/// on the display channel; the receiving side owns all UI mutation.
pub struct BatchLoader {
    client: Arc<OriginClient>,
    config: BrowseConfig,
    records: RwLock<Vec<ComicRecord>>,
    loading: AtomicBool,
    display: mpsc::Sender<DisplayRefresh>,
}

impl BatchLoader {
    pub fn new(
        client: Arc<OriginClient>,
        config: &BrowseConfig,
        display: mpsc::Sender<DisplayRefresh>,
    ) -> Self {
        Self {
            client,
            config: config.clone(),
            records: RwLock::new(Vec::new()),
            loading: AtomicBool::new(false),
            display,
        }
    }

    /// Whether a batch is currently loading.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Number of records loaded so far.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Snapshot of the loaded records.
    pub async fn records(&self) -> Vec<ComicRecord> {
        self.records.read().await.clone()
    }

    pub async fn get(&self, index: usize) -> Option<ComicRecord> {
        self.records.read().await.get(index).cloned()
    }

    /// Whether the grid has scrolled close enough to the end to prefetch.
    pub async fn should_load_more(&self, visible_index: usize) -> bool {
        visible_index.saturating_add(self.config.prefetch_distance) >= self.len().await
    }

    /// Query for the batch starting at `offset`.
    pub fn batch_query(&self, offset: usize) -> ApiQuery {
        let mut query = ApiQuery::comic_books();
        query
            .add(QueryParameter::Limit(self.config.batch_size))
            .add(QueryParameter::Offset(
                u32::try_from(offset).unwrap_or(u32::MAX),
            ));
        if let Some(order) = self.config.order_by {
            query.add(QueryParameter::OrderBy(order));
        }
        if self.config.exclude_variants {
            query.add(QueryParameter::ExcludeVariants(true));
        }
        query
    }

    /// Fetch the next batch and append it.
    ///
    /// A no-op while another batch is loading. Failures leave the records
    /// unchanged, so a later trigger simply retries the same offset. A refresh
    /// that does not fit in the display channel is dropped, not awaited.
    pub async fn load_next_batch(&self) -> BatchOutcome {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Batch already loading, ignoring trigger");
            return BatchOutcome::AlreadyLoading;
        }
        let _guard = LoadingGuard(&self.loading);

        let offset = self.len().await;
        let query = self.batch_query(offset);

        let batch = match self.client.fetch_typed::<ComicRecord>(&query).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Loading batch at offset {} failed: {}", offset, e);
                metrics::BATCHES_LOADED.with_label_values(&["failed"]).inc();
                return BatchOutcome::Failed(e);
            }
        };
        metrics::BATCHES_LOADED.with_label_values(&["loaded"]).inc();

        let appended = batch.len();
        if appended == 0 {
            debug!("Batch at offset {} was empty", offset);
            return BatchOutcome::Loaded { appended };
        }

        let refresh = {
            let mut records = self.records.write().await;
            let first_index = records.len();
            records.extend(batch);
            DisplayRefresh {
                first_index,
                appended,
                total: records.len(),
            }
        };
        info!(
            "Loaded {} comics at offset {} ({} total)",
            appended, refresh.first_index, refresh.total
        );

        // Never wait on the display side while holding the loading flag.
        match self.display.try_send(refresh) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Display channel full, refresh for {} comics dropped", appended);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Display channel closed, refresh dropped");
            }
        }

        BatchOutcome::Loaded { appended }
    }
}

impl std::fmt::Debug for BatchLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchLoader")
            .field("config", &self.config)
            .field("loading", &self.is_loading())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TransportError;
    use crate::config::OriginConfig;
    use crate::query::{SortField, SortOrder};
    use crate::testing::{fixtures, MockResponse, MockTransport};
    use std::time::Duration;

    const COMICS: &str = "https://origin.test/v1/public/comics";

    fn loader(
        transport: &MockTransport,
        config: BrowseConfig,
    ) -> (Arc<BatchLoader>, mpsc::Receiver<DisplayRefresh>) {
        let client = OriginClient::new(
            &OriginConfig {
                base_url: "https://origin.test".to_string(),
                public_key: "pub".to_string(),
                private_key: "priv".to_string(),
                timeout_secs: 5,
            },
            Arc::new(transport.clone()),
        )
        .unwrap();
        let (tx, rx) = mpsc::channel(16);
        (Arc::new(BatchLoader::new(Arc::new(client), &config, tx)), rx)
    }

    fn browse(batch_size: u32) -> BrowseConfig {
        BrowseConfig {
            batch_size,
            ..BrowseConfig::default()
        }
    }

    #[tokio::test]
    async fn test_batches_append_in_order() {
        let transport = MockTransport::new();
        transport
            .enqueue_response(COMICS, MockResponse::json(&fixtures::comic_page(1, 3)))
            .await;
        transport
            .enqueue_response(COMICS, MockResponse::json(&fixtures::comic_page(4, 3)))
            .await;
        let (loader, mut display) = loader(&transport, browse(3));

        assert!(matches!(loader.load_next_batch().await, BatchOutcome::Loaded { appended: 3 }));
        assert!(matches!(loader.load_next_batch().await, BatchOutcome::Loaded { appended: 3 }));

        let ids: Vec<_> = loader
            .records()
            .await
            .iter()
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);

        assert_eq!(
            display.recv().await,
            Some(DisplayRefresh { first_index: 0, appended: 3, total: 3 })
        );
        assert_eq!(
            display.recv().await,
            Some(DisplayRefresh { first_index: 3, appended: 3, total: 6 })
        );

        let urls: Vec<_> = transport
            .recorded_requests()
            .await
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert!(urls[0].contains("&limit=3&offset=0&"));
        assert!(urls[1].contains("&limit=3&offset=3&"));
    }

    #[tokio::test]
    async fn test_trigger_ignored_while_loading() {
        let transport = MockTransport::new();
        transport
            .set_response(COMICS, MockResponse::json(&fixtures::comic_page(1, 2)))
            .await;
        transport.hold();
        let (loader, _display) = loader(&transport, browse(2));

        let first = {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.load_next_batch().await })
        };
        transport.wait_for_requests(1).await;
        assert!(loader.is_loading());

        assert!(matches!(loader.load_next_batch().await, BatchOutcome::AlreadyLoading));

        transport.release();
        assert!(matches!(first.await.unwrap(), BatchOutcome::Loaded { appended: 2 }));
        assert!(!loader.is_loading());
        assert_eq!(transport.request_count().await, 1);
    }

    #[tokio::test]
    async fn test_failure_leaves_records_and_clears_guard() {
        let transport = MockTransport::new();
        transport
            .enqueue_response(COMICS, MockResponse::status(503))
            .await;
        transport
            .set_response(COMICS, MockResponse::json(&fixtures::comic_page(1, 2)))
            .await;
        let (loader, mut display) = loader(&transport, browse(2));

        let outcome = loader.load_next_batch().await;
        assert!(matches!(
            outcome,
            BatchOutcome::Failed(ApiError::Network(TransportError::Status { status: 503, .. }))
        ));
        assert!(loader.is_empty().await);
        assert!(!loader.is_loading());
        assert!(display.try_recv().is_err());

        assert!(matches!(loader.load_next_batch().await, BatchOutcome::Loaded { appended: 2 }));
        let urls: Vec<_> = transport
            .recorded_requests()
            .await
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert!(urls[1].contains("&offset=0&"));
    }

    #[tokio::test]
    async fn test_undrained_display_does_not_stall_loading() {
        let transport = MockTransport::new();
        transport
            .set_response(COMICS, MockResponse::json(&fixtures::comic_page(1, 2)))
            .await;
        let client = OriginClient::new(
            &OriginConfig {
                base_url: "https://origin.test".to_string(),
                public_key: "pub".to_string(),
                private_key: "priv".to_string(),
                timeout_secs: 5,
            },
            Arc::new(transport.clone()),
        )
        .unwrap();
        let (tx, mut display) = mpsc::channel(1);
        let loader = BatchLoader::new(Arc::new(client), &browse(2), tx);

        for _ in 0..3 {
            let outcome = tokio::time::timeout(Duration::from_secs(5), loader.load_next_batch())
                .await
                .expect("batch load stalled on a full display channel");
            assert!(matches!(outcome, BatchOutcome::Loaded { appended: 2 }));
        }
        assert!(!loader.is_loading());
        assert_eq!(loader.len().await, 6);

        // Only the first refresh fit in the channel.
        assert_eq!(
            display.try_recv().ok(),
            Some(DisplayRefresh { first_index: 0, appended: 2, total: 2 })
        );
        assert!(display.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_sends_no_refresh() {
        let transport = MockTransport::new();
        transport
            .set_response(COMICS, MockResponse::json(&serde_json::json!([])))
            .await;
        let (loader, mut display) = loader(&transport, browse(10));

        assert!(matches!(loader.load_next_batch().await, BatchOutcome::Loaded { appended: 0 }));
        assert!(display.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_query_includes_browse_options() {
        let transport = MockTransport::new();
        let config = BrowseConfig {
            batch_size: 20,
            prefetch_distance: 5,
            order_by: Some(SortOrder::descending(SortField::FocDate)),
            exclude_variants: true,
        };
        let (loader, _display) = loader(&transport, config);

        assert_eq!(
            loader.batch_query(40).to_query_string(),
            "&format=comic&formatType=comic&limit=20&offset=40&orderBy=-focDate&noVariants=true"
        );
    }

    #[tokio::test]
    async fn test_should_load_more() {
        let transport = MockTransport::new();
        transport
            .set_response(COMICS, MockResponse::json(&fixtures::comic_page(1, 20)))
            .await;
        let config = BrowseConfig {
            batch_size: 20,
            prefetch_distance: 5,
            ..BrowseConfig::default()
        };
        let (loader, _display) = loader(&transport, config);

        assert!(loader.should_load_more(0).await);
        loader.load_next_batch().await;

        assert!(!loader.should_load_more(0).await);
        assert!(!loader.should_load_more(14).await);
        assert!(loader.should_load_more(15).await);
        assert!(loader.should_load_more(19).await);
    }
}
