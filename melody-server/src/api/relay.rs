//! Audio relay endpoint

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::resources::RELAY_ROUTE;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

/// GET /audio/proxy?url=...
///
/// Streams an allow-listed remote audio file, forwarding range requests.
pub async fn proxy_audio(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let target = state.relay.validate_target(query.url.as_deref())?;
    state.relay.fetch(&target, &headers).await
}

pub fn relay_routes() -> Router<AppState> {
    Router::new().route(RELAY_ROUTE, get(proxy_audio))
}
