//! HTTP API handlers for melody-server

pub mod health;
pub mod library;
pub mod playlists;
pub mod relay;
pub mod songs;

use crate::AppState;
use axum::Router;

pub use health::health_routes;
pub use relay::relay_routes;

/// Library read and write routes under `/api`
pub fn library_routes() -> Router<AppState> {
    Router::new()
        .merge(library::routes())
        .merge(playlists::routes())
        .merge(songs::routes())
}
