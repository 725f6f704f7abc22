//! Library listing

use axum::{extract::State, http::HeaderMap, routing::get, Json, Router};
use melody_common::db::playlists;
use tracing::debug;

use crate::error::ApiResult;
use crate::resources::{DataEnvelope, PlaylistResource};
use crate::AppState;

/// GET /api/library
///
/// All playlists ordered by id, each with its songs ordered by id.
pub async fn get_library(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<DataEnvelope<Vec<PlaylistResource>>>> {
    let library = playlists::list_with_songs(&state.db).await?;
    debug!("Serving library with {} playlists", library.len());

    let links = state.links(&headers);
    let data = library
        .into_iter()
        .map(|playlist| PlaylistResource::from_playlist(playlist, &links))
        .collect();

    Ok(Json(DataEnvelope::new(data)))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/library", get(get_library))
}
