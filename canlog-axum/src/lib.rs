//! HTTP shell around [`CanlogService`].
//!
//! ```text
//! GET       /health
//! POST      /upload     multipart: file, chunk, guid?
//! GET|POST  /commit     ?guid=
//! GET|POST  /abort      ?guid=
//! GET|POST  /process    ?guid=
//! GET       /list       ?folder=
//! GET       /retrieve   ?timestamp=
//! ```

mod config;
mod error;
mod routes;

use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use canlog_blob::{BlockStore, FilesystemBlockStore, MemoryBlockStore, S3BlockStore, S3Config};
use canlog_service::{CanlogService, MemoryPublisher, NotificationPublisher};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::{ServerConfig, StorageBackend};
pub use error::CanlogAxumError;

/// Room for multipart framing around one chunk
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub struct CanlogApp {
    pub service: Arc<CanlogService>,
    pub router: Router<()>,
}

impl CanlogApp {
    pub async fn listen<A>(self, addr: A) -> Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

/// Build the service for `config` (backend, container, queue) and its router
pub async fn build(config: &ServerConfig) -> Result<CanlogApp> {
    let store = block_store(config).await?;
    let publisher: Arc<dyn NotificationPublisher> = Arc::new(MemoryPublisher::new());

    let service = Arc::new(CanlogService::new(store, publisher, config.service.clone()));
    service.init().await?;

    let max_chunk = usize::try_from(config.service.blob.max_chunk_bytes).unwrap_or(usize::MAX);
    let router = router(Arc::clone(&service), max_chunk.saturating_add(MULTIPART_OVERHEAD));
    Ok(CanlogApp { service, router })
}

async fn block_store(config: &ServerConfig) -> Result<Arc<dyn BlockStore>> {
    info!(backend = %config.backend, "configuring block store");
    Ok(match config.backend {
        StorageBackend::Memory => Arc::new(MemoryBlockStore::new()),
        StorageBackend::Filesystem => Arc::new(FilesystemBlockStore::new(&config.storage_root).await?),
        StorageBackend::S3 => Arc::new(S3BlockStore::new(S3Config::from_env()?).await),
    })
}

/// Routes over an existing service
pub fn router(service: Arc<CanlogService>, body_limit: usize) -> Router<()> {
    Router::new()
        .route("/health", get(routes::health))
        .route("/upload", post(routes::upload))
        .route("/commit", get(routes::commit).post(routes::commit))
        .route("/abort", get(routes::abort).post(routes::abort))
        .route("/process", get(routes::process).post(routes::process))
        .route("/list", get(routes::list))
        .route("/retrieve", get(routes::retrieve))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(service)
}
