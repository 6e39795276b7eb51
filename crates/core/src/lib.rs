pub mod api;
pub mod app;
pub mod browse;
pub mod cache;
pub mod cloud;
pub mod comic;
pub mod config;
pub mod covers;
pub mod metrics;
pub mod query;
pub mod testing;

pub use api::{
    ApiError, ApiResource, DecodeError, HttpTransport, OriginClient, ReqwestTransport,
    TransportError,
};
pub use app::AppContext;
pub use browse::{BatchLoader, BatchOutcome, DisplayRefresh};
pub use cache::{CacheError, DiskCache, TrimReport};
pub use cloud::{CloudEntry, CloudError, CloudLayout, CloudSession, PersonalCloud};
pub use comic::{ComicId, ComicRecord, Thumbnail};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use covers::{
    CoverError, CoverReplacement, CoverRequest, CoverResolver, CoverSource, CoverTask,
    ResolvedCover, UploadStatus,
};
pub use query::{ApiQuery, Endpoint, QueryParameter};
