//! Playlist create, update and delete

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{post, put},
    Json, Router,
};
use melody_common::db::playlists;
use melody_common::palette::random_accent;
use melody_common::PlaylistId;
use tracing::info;

use crate::api::songs::release_song_media;
use crate::error::{ApiError, ApiResult};
use crate::payload::FormInput;
use crate::resources::{DataEnvelope, PlaylistResource};
use crate::validation::Validator;
use crate::AppState;

const NAME_MAX: usize = 255;
const ACCENT_MAX: usize = 20;

type PlaylistResponse = Json<DataEnvelope<PlaylistResource>>;

fn not_found(id: PlaylistId) -> ApiError {
    ApiError::NotFound(format!("Playlist {} not found", id))
}

/// POST /api/playlists
///
/// `name` is required; a missing or null `accent` gets a palette color.
pub async fn create_playlist(
    State(state): State<AppState>,
    headers: HeaderMap,
    input: FormInput,
) -> ApiResult<(StatusCode, PlaylistResponse)> {
    let mut v = Validator::new(&input);
    let name = v.string("name", true, NAME_MAX);
    let accent = v.string("accent", false, ACCENT_MAX);
    let (name, accent) = v.finish((name.unwrap_or_default(), accent))?;

    let accent = accent.unwrap_or_else(random_accent);
    let playlist = playlists::insert(&state.db, &name, Some(&accent)).await?;
    info!("Created playlist {} '{}'", playlist.id, playlist.name);

    let links = state.links(&headers);
    Ok((
        StatusCode::CREATED,
        Json(DataEnvelope::new(PlaylistResource::from_playlist(playlist, &links))),
    ))
}

/// PUT /api/playlists/:id
///
/// Absent fields keep their stored value. An explicit null accent, or a
/// playlist without an accent, is given a fresh palette color.
pub async fn update_playlist(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
    headers: HeaderMap,
    input: FormInput,
) -> ApiResult<PlaylistResponse> {
    let current = playlists::find(&state.db, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let mut v = Validator::new(&input);
    let name_sent = v.has("name");
    let name = v.string("name", name_sent, NAME_MAX);
    let accent_sent = v.has("accent");
    let accent = v.string("accent", false, ACCENT_MAX);
    let (name, accent) = v.finish((name, accent))?;

    let name = name.unwrap_or(current.name);
    let stored_accent = current
        .accent
        .filter(|accent| !accent.trim().is_empty());
    let accent = match (accent, accent_sent) {
        (Some(accent), _) => accent,
        (None, true) => random_accent(),
        (None, false) => stored_accent.unwrap_or_else(random_accent),
    };

    let playlist = playlists::update(&state.db, id, &name, Some(&accent))
        .await?
        .ok_or_else(|| not_found(id))?;
    info!("Updated playlist {}", id);

    let links = state.links(&headers);
    Ok(Json(DataEnvelope::new(PlaylistResource::from_playlist(
        playlist, &links,
    ))))
}

/// DELETE /api/playlists/:id
///
/// Songs go with the playlist; the response echoes what was removed.
pub async fn delete_playlist(
    State(state): State<AppState>,
    Path(id): Path<PlaylistId>,
    headers: HeaderMap,
) -> ApiResult<PlaylistResponse> {
    let playlist = playlists::delete(&state.db, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    for song in &playlist.songs {
        release_song_media(&state, song).await;
    }

    info!(
        "Deleted playlist {} with {} songs",
        playlist.id,
        playlist.songs.len()
    );

    let links = state.links(&headers);
    Ok(Json(DataEnvelope::new(PlaylistResource::from_playlist(
        playlist, &links,
    ))))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/playlists", post(create_playlist))
        .route(
            "/api/playlists/:id",
            put(update_playlist)
                .patch(update_playlist)
                .delete(delete_playlist),
        )
}
