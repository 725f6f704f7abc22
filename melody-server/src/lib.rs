//! melody-server library
//!
//! HTTP surface of the Melody music library: playlist and song CRUD, the
//! streaming audio relay, uploaded media, and a health endpoint.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::SystemTime;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use url::Url;

pub mod api;
pub mod config;
pub mod error;
pub mod media;
pub mod payload;
pub mod relay;
pub mod resources;
pub mod validation;

use config::ServerConfig;
use media::{MediaStorage, STORAGE_ROUTE};
use relay::{AudioRelay, HostAllowList};
use resources::LinkContext;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Outbound client for `/audio/proxy`
    pub relay: Arc<AudioRelay>,
    /// Uploaded file storage
    pub media: Arc<MediaStorage>,
    /// Public base URL, when configured
    pub app_url: Option<Url>,
    /// Multipart request size limit
    pub upload_limit_bytes: u64,
    pub startup_time: SystemTime,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &ServerConfig) -> error::ApiResult<Self> {
        let relay = AudioRelay::new(
            HostAllowList::new(&config.proxy_allowed_hosts),
            config.proxy_timeout,
        )?;
        let media = MediaStorage::new(&config.root_folder, config.app_url.as_ref());

        Ok(Self {
            db,
            relay: Arc::new(relay),
            media: Arc::new(media),
            app_url: config.app_url.clone(),
            upload_limit_bytes: config.upload_limit_bytes(),
            startup_time: SystemTime::now(),
        })
    }

    /// Link context for a request with the given headers
    pub fn links<'a>(&'a self, headers: &axum::http::HeaderMap) -> LinkContext<'a> {
        LinkContext::from_headers(headers, self.app_url.as_ref(), self.relay.allow_list())
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let storage = ServeDir::new(state.media.root());

    Router::new()
        .merge(api::library_routes())
        .merge(api::relay_routes())
        .merge(api::health_routes())
        .nest_service(STORAGE_ROUTE, storage)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
