//! Cover pipeline integration tests.
//!
//! These tests wire the whole pipeline through `AppContext` with a mock
//! transport and a mock personal cloud:
//! - Browse a batch, then resolve the covers of the visible comics
//! - Cache precedence on the second pass
//! - Personal cloud covers once a user logs in
//! - Custom cover replacement

use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::mpsc;

use covershelf_core::{
    load_config_from_str,
    testing::{fixtures, MockCloud, MockResponse, MockTransport, RecordedCloudCall},
    AppContext, BatchOutcome, CloudSession, CoverError, CoverRequest, CoverSource,
    DisplayRefresh, UploadStatus,
};

const BASE: &str = "https://origin.test";

/// Test helper wiring an `AppContext` to mocks.
struct TestHarness {
    ctx: AppContext,
    display: mpsc::Receiver<DisplayRefresh>,
    transport: MockTransport,
    cloud: MockCloud,
    _cache_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let cache_dir = TempDir::new().expect("Failed to create cache dir");
        let config = load_config_from_str(&format!(
            r#"
[origin]
base_url = "{}"
public_key = "pub"
private_key = "priv"

[cache]
dir = "{}"

[browse]
batch_size = 4
"#,
            BASE,
            cache_dir.path().display()
        ))
        .expect("Failed to parse config");

        let transport = MockTransport::new();
        let (ctx, display) = AppContext::with_transport(
            &config,
            Arc::new(transport.clone()),
            CloudSession::signed_out(),
        )
        .await
        .expect("Failed to build context");

        Self {
            ctx,
            display,
            transport,
            cloud: MockCloud::new(),
            _cache_dir: cache_dir,
        }
    }

    async fn serve_page(&self, first_id: u64, count: u64) {
        self.transport
            .enqueue_response(
                &format!("{}/v1/public/comics", BASE),
                MockResponse::json(&fixtures::comic_page(first_id, count)),
            )
            .await;
    }

    async fn serve_covers(&self, ids: impl IntoIterator<Item = u64>) {
        for id in ids {
            let id = id.to_string();
            self.transport
                .set_response(
                    &fixtures::cover_url(&id),
                    MockResponse::bytes(fixtures::cover_bytes(&id)),
                )
                .await;
        }
    }

    async fn log_in(&self) {
        self.ctx.session.authorize(Arc::new(self.cloud.clone())).await;
    }

    async fn cover_requests(&self) -> usize {
        self.transport
            .recorded_requests()
            .await
            .iter()
            .filter(|r| r.url.starts_with(fixtures::IMAGE_HOST))
            .count()
    }
}

#[tokio::test]
async fn test_browse_then_resolve_visible_covers() {
    let mut h = TestHarness::new().await;
    h.serve_page(1, 4).await;
    h.serve_covers(1..=4).await;

    assert!(matches!(
        h.ctx.loader.load_next_batch().await,
        BatchOutcome::Loaded { appended: 4 }
    ));
    let refresh = h.display.recv().await.expect("display refresh");
    assert_eq!(refresh.total, 4);

    let comics = h.ctx.loader.records().await;
    let tasks: Vec<_> = comics
        .iter()
        .map(|comic| h.ctx.covers.spawn(CoverRequest::new(comic).unwrap()))
        .collect();

    for task in tasks {
        let id = task.comic_id().to_string();
        let cover = task.outcome().await.expect("not cancelled").expect("resolved");
        assert_eq!(cover.source, CoverSource::Origin);
        assert_eq!(cover.bytes, fixtures::cover_bytes(&id));
    }

    // Second pass comes straight from disk.
    for comic in &comics {
        let cover = h
            .ctx
            .covers
            .resolve(&CoverRequest::new(comic).unwrap())
            .await
            .unwrap();
        assert_eq!(cover.source, CoverSource::Cache);
    }
    assert_eq!(h.cover_requests().await, 4);
}

#[tokio::test]
async fn test_comic_without_thumbnail_never_enters_pipeline() {
    let h = TestHarness::new().await;
    h.transport
        .enqueue_response(
            &format!("{}/v1/public/comics", BASE),
            MockResponse::json(&serde_json::json!([
                {"id": "1", "resourceURI": "http://x/1", "title": "T"}
            ])),
        )
        .await;

    h.ctx.loader.load_next_batch().await;
    let comic = h.ctx.loader.get(0).await.expect("decoded");
    assert!(comic.thumbnail.is_none());

    assert!(matches!(
        CoverRequest::new(&comic),
        Err(CoverError::NoCoverSource(_))
    ));
}

#[tokio::test]
async fn test_cloud_cover_used_after_login() {
    let h = TestHarness::new().await;
    h.serve_covers([7]).await;
    h.cloud.put_file("/8.jpg", b"custom-8".to_vec()).await;

    let comic = fixtures::comic("8", "Eight");
    h.serve_covers([8]).await;

    // Signed out: origin.
    let before = h
        .ctx
        .covers
        .resolve(&CoverRequest::new(&fixtures::comic("7", "Seven")).unwrap())
        .await
        .unwrap();
    assert_eq!(before.source, CoverSource::Origin);

    h.log_in().await;
    let cover = h
        .ctx
        .covers
        .resolve(&CoverRequest::new(&comic).unwrap())
        .await
        .unwrap();
    assert_eq!(cover.source, CoverSource::PersonalCloud);
    assert_eq!(cover.bytes, b"custom-8");
    assert_eq!(h.cover_requests().await, 1);

    let calls = h.cloud.recorded_calls().await;
    assert_eq!(
        calls,
        vec![
            RecordedCloudCall::ListFolder(String::new()),
            RecordedCloudCall::Download("/8.jpg".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_replaced_cover_wins_everywhere() {
    let h = TestHarness::new().await;
    h.serve_covers([9]).await;
    let comic = fixtures::comic("9", "Nine");

    let original = h
        .ctx
        .covers
        .resolve(&CoverRequest::new(&comic).unwrap())
        .await
        .unwrap();
    assert_eq!(original.source, CoverSource::Origin);

    h.log_in().await;
    let replacement = h.ctx.covers.replace_cover(&comic, b"my-cover".to_vec()).await;
    assert!(replacement.cached);
    assert_eq!(replacement.upload, UploadStatus::Uploaded);

    let cover = h
        .ctx
        .covers
        .resolve(&CoverRequest::new(&comic).unwrap())
        .await
        .unwrap();
    assert_eq!(cover.source, CoverSource::Cache);
    assert_eq!(cover.bytes, b"my-cover");
    assert_eq!(h.cloud.file("/9.jpg").await.as_deref(), Some(&b"my-cover"[..]));
}

#[tokio::test]
async fn test_unreachable_cover_leaves_cache_empty() {
    let h = TestHarness::new().await;
    let comic = fixtures::comic("10", "Ten");

    let err = h
        .ctx
        .covers
        .resolve(&CoverRequest::new(&comic).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, CoverError::CoverUnavailable { .. }));
    assert!(h.ctx.cache.get("10").await.unwrap().is_none());
}
