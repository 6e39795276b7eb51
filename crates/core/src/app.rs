//! Composition root: builds every component once and hands out handles.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::api::{HttpTransport, OriginClient, ReqwestTransport};
use crate::browse::{BatchLoader, DisplayRefresh};
use crate::cache::DiskCache;
use crate::cloud::{CloudLayout, CloudSession};
use crate::config::{load_config, validate_config, Config, SanitizedConfig};
use crate::covers::CoverResolver;

/// Display refreshes buffered before the loader waits on the UI.
const DISPLAY_CHANNEL_CAPACITY: usize = 32;

/// Shared handles to the pipeline components.
///
/// Cheap to clone. The display receiver returned alongside is the only way
/// to observe appended batches and belongs to the UI context.
#[derive(Clone)]
pub struct AppContext {
    pub cache: DiskCache,
    pub client: Arc<OriginClient>,
    pub covers: Arc<CoverResolver>,
    pub loader: Arc<BatchLoader>,
    pub session: CloudSession,
}

impl AppContext {
    /// Load, validate and build from a config file.
    pub async fn from_path(path: &Path) -> Result<(Self, mpsc::Receiver<DisplayRefresh>)> {
        info!("Loading configuration from {:?}", path);
        let config = load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?;
        validate_config(&config).context("Configuration validation failed")?;

        Self::from_config(&config).await
    }

    /// Build with the production HTTP transport and no cloud session.
    pub async fn from_config(config: &Config) -> Result<(Self, mpsc::Receiver<DisplayRefresh>)> {
        let transport = ReqwestTransport::new(Duration::from_secs(config.origin.timeout_secs))
            .context("Failed to create HTTP client")?;

        Self::with_transport(config, Arc::new(transport), CloudSession::signed_out()).await
    }

    /// Build around an existing transport and cloud session.
    pub async fn with_transport(
        config: &Config,
        transport: Arc<dyn HttpTransport>,
        session: CloudSession,
    ) -> Result<(Self, mpsc::Receiver<DisplayRefresh>)> {
        info!(
            "Starting with configuration: {}",
            serde_json::to_string(&SanitizedConfig::from(config)).unwrap_or_default()
        );

        let cache = DiskCache::open(&config.cache)
            .await
            .with_context(|| format!("Failed to open cover cache at {:?}", config.cache.dir))?;
        info!("Cover cache at {:?}", cache.dir());

        let client = Arc::new(
            OriginClient::new(&config.origin, Arc::clone(&transport))
                .context("Failed to create origin client")?,
        );

        let covers = Arc::new(CoverResolver::new(
            cache.clone(),
            session.clone(),
            CloudLayout::new(&config.cloud),
            transport,
            &config.covers,
        ));

        let (display_tx, display_rx) = mpsc::channel(DISPLAY_CHANNEL_CAPACITY);
        let loader = Arc::new(BatchLoader::new(
            Arc::clone(&client),
            &config.browse,
            display_tx,
        ));

        info!("Cover pipeline initialized");
        Ok((
            Self {
                cache,
                client,
                covers,
                loader,
                session,
            },
            display_rx,
        ))
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("cache", &self.cache)
            .field("client", &self.client)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}
