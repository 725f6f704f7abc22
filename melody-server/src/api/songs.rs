//! Song create, update and delete
//!
//! Audio and cover art arrive either as URLs or as uploaded files. Uploads
//! are written to media storage first and the resulting public URL is what
//! gets stored on the song.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{post, put},
    Json, Router,
};
use melody_common::db::{playlists, songs, SongRecord};
use melody_common::{LyricLine, PlaylistId, Song, SongId};
use tracing::{debug, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::media::{MediaKind, UploadedFile};
use crate::payload::FormInput;
use crate::resources::{DataEnvelope, SongResource};
use crate::validation::{display_name, Validator};
use crate::AppState;

const TEXT_MAX: usize = 255;
const URL_MAX: usize = 2048;

type SongResponse = Json<DataEnvelope<SongResource>>;

/// Where a media field's content comes from
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
    Url(String),
    Upload(UploadedFile),
}

/// Validated song submission
#[derive(Debug, Clone)]
pub struct SongForm {
    pub playlist_id: PlaylistId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover: Option<MediaSource>,
    pub audio: MediaSource,
    pub duration: Option<f64>,
    pub lyrics: Vec<LyricLine>,
}

/// Apply the song rules to a submission
///
/// `audio_url` and `cover_url` are accepted as aliases of `audio` and
/// `cover`. Exactly one of `audio` and `audio_file` must be given.
pub fn validate_song(input: &mut FormInput) -> ApiResult<SongForm> {
    input.alias("audio_url", "audio");
    input.alias("cover_url", "cover");

    let mut v = Validator::new(input);

    let playlist_id = v.integer("playlist_id", true);
    let title = v.string("title", true, TEXT_MAX);
    let artist = v.string("artist", true, TEXT_MAX);
    let album = v.string("album", false, TEXT_MAX);

    let cover_url = v.string("cover", false, URL_MAX);
    let cover_file = v.file("cover_file", MediaKind::Cover);

    let audio_given = v.filled("audio");
    let audio_file_given = v.has_file("audio_file");
    let audio_url = v.string("audio", false, URL_MAX);
    let audio_file = v.file("audio_file", MediaKind::Audio);

    match (audio_given, audio_file_given) {
        (false, false) => {
            let message = format!(
                "The audio field is required when {} is not present.",
                display_name("audio_file")
            );
            v.error("audio", message);
        }
        (true, true) => {
            let message = format!(
                "The audio field prohibits {} from being present.",
                display_name("audio_file")
            );
            v.error("audio", message);
        }
        _ => {}
    }

    let duration = v.number("duration", false, Some(0.0));
    let lyrics = v.lyrics("lyrics");

    let cover = cover_file
        .map(MediaSource::Upload)
        .or(cover_url.map(MediaSource::Url));
    let audio = audio_file
        .map(MediaSource::Upload)
        .or(audio_url.map(MediaSource::Url));

    let (playlist_id, title, artist, audio) = match v.finish((playlist_id, title, artist, audio))? {
        (Some(playlist_id), Some(title), Some(artist), Some(audio)) => {
            (playlist_id, title, artist, audio)
        }
        _ => {
            return Err(ApiError::Internal(
                "Song validation passed with missing fields".to_string(),
            ))
        }
    };

    Ok(SongForm {
        playlist_id,
        title,
        artist,
        album,
        cover,
        audio,
        duration,
        lyrics,
    })
}

/// Uploads written while handling one request
///
/// If the database write fails the files are removed again so nothing is
/// left without a song pointing at it.
struct StoredUploads<'a> {
    state: &'a AppState,
    urls: Vec<String>,
}

impl<'a> StoredUploads<'a> {
    fn new(state: &'a AppState) -> Self {
        Self {
            state,
            urls: Vec::new(),
        }
    }

    async fn resolve(&mut self, kind: MediaKind, source: MediaSource) -> ApiResult<String> {
        match source {
            MediaSource::Url(url) => Ok(url),
            MediaSource::Upload(file) => {
                let url = self.state.media.store(kind, &file).await?;
                self.urls.push(url.clone());
                Ok(url)
            }
        }
    }

    async fn discard(self) {
        for url in &self.urls {
            self.state.media.remove(url).await;
        }
    }
}

/// Turn a validated form into a record, storing any uploads
async fn build_record(
    state: &AppState,
    form: SongForm,
) -> ApiResult<(SongRecord, StoredUploads<'_>)> {
    if !playlists::exists(&state.db, form.playlist_id).await? {
        return Err(ApiError::NotFound(format!(
            "Playlist {} not found",
            form.playlist_id
        )));
    }

    let mut uploads = StoredUploads::new(state);

    let audio_url = match uploads.resolve(MediaKind::Audio, form.audio).await {
        Ok(url) => url,
        Err(e) => {
            uploads.discard().await;
            return Err(e);
        }
    };
    let cover_url = match form.cover {
        Some(source) => match uploads.resolve(MediaKind::Cover, source).await {
            Ok(url) => Some(url),
            Err(e) => {
                uploads.discard().await;
                return Err(e);
            }
        },
        None => None,
    };

    let record = SongRecord {
        playlist_id: form.playlist_id,
        title: form.title,
        artist: form.artist,
        album: form.album,
        cover_url,
        audio_url,
        duration: form.duration,
        lyrics: form.lyrics,
    };

    Ok((record, uploads))
}

/// Delete a stored upload once no song references it any more
///
/// Any song may point at another song's `/storage` URL, so the file stays
/// while a row still uses it. A failed lookup keeps the file.
pub(crate) async fn release_media(state: &AppState, url: &str) {
    if state.media.local_path(url).is_none() {
        return;
    }
    match songs::url_in_use(&state.db, url).await {
        Ok(false) => state.media.remove(url).await,
        Ok(true) => debug!("Keeping {}, still referenced by another song", url),
        Err(e) => warn!("Could not check references to {}, keeping it: {}", url, e),
    }
}

/// Release every stored file a removed song referenced
pub(crate) async fn release_song_media(state: &AppState, song: &Song) {
    release_media(state, &song.audio_url).await;
    if let Some(cover) = &song.cover_url {
        release_media(state, cover).await;
    }
}

/// Release files the song used to reference but no longer does
async fn remove_replaced(state: &AppState, before: &Song, after: &Song) {
    if before.audio_url != after.audio_url {
        release_media(state, &before.audio_url).await;
    }
    if let Some(old_cover) = &before.cover_url {
        if after.cover_url.as_ref() != Some(old_cover) {
            release_media(state, old_cover).await;
        }
    }
}

/// POST /api/songs
pub async fn create_song(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut input: FormInput,
) -> ApiResult<(StatusCode, SongResponse)> {
    let form = validate_song(&mut input)?;
    let (record, uploads) = build_record(&state, form).await?;

    let song = match songs::insert(&state.db, &record).await {
        Ok(song) => song,
        Err(e) => {
            warn!("Song insert failed, discarding uploads: {}", e);
            uploads.discard().await;
            return Err(e.into());
        }
    };
    info!("Created song {} '{}' in playlist {}", song.id, song.title, song.playlist_id);

    let links = state.links(&headers);
    Ok((
        StatusCode::CREATED,
        Json(DataEnvelope::new(SongResource::from_song(song, &links))),
    ))
}

/// PUT /api/songs/:id
///
/// Same rules as create; the submission replaces the song.
pub async fn update_song(
    State(state): State<AppState>,
    Path(id): Path<SongId>,
    headers: HeaderMap,
    mut input: FormInput,
) -> ApiResult<SongResponse> {
    let before = songs::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Song {} not found", id)))?;

    let form = validate_song(&mut input)?;
    let (record, uploads) = build_record(&state, form).await?;

    let song = match songs::update(&state.db, id, &record).await {
        Ok(Some(song)) => song,
        Ok(None) => {
            uploads.discard().await;
            return Err(ApiError::NotFound(format!("Song {} not found", id)));
        }
        Err(e) => {
            warn!("Song update failed, discarding uploads: {}", e);
            uploads.discard().await;
            return Err(e.into());
        }
    };

    remove_replaced(&state, &before, &song).await;
    info!("Updated song {}", id);

    let links = state.links(&headers);
    Ok(Json(DataEnvelope::new(SongResource::from_song(song, &links))))
}

/// DELETE /api/songs/:id
pub async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<SongId>,
) -> ApiResult<StatusCode> {
    let song = songs::delete(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Song {} not found", id)))?;

    release_song_media(&state, &song).await;

    info!("Deleted song {}", id);
    Ok(StatusCode::NO_CONTENT)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/songs", post(create_song))
        .route(
            "/api/songs/:id",
            put(update_song).patch(update_song).delete(delete_song),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    fn form(value: serde_json::Value) -> FormInput {
        FormInput::from_json(value)
    }

    #[test]
    fn accepts_audio_url_alias() {
        let mut input = form(json!({
            "playlist_id": "2",
            "title": "Title",
            "artist": "Artist",
            "audio_url": "https://samplelib.com/a.mp3",
            "cover_url": "https://img.example.com/c.png",
            "duration": 6
        }));

        let song = validate_song(&mut input).unwrap();

        assert_eq!(song.playlist_id, 2);
        assert_eq!(
            song.audio,
            MediaSource::Url("https://samplelib.com/a.mp3".to_string())
        );
        assert_eq!(
            song.cover,
            Some(MediaSource::Url("https://img.example.com/c.png".to_string()))
        );
        assert_eq!(song.duration, Some(6.0));
    }

    #[test]
    fn audio_source_is_required() {
        let mut input = form(json!({"playlist_id": 1, "title": "T", "artist": "A"}));

        let Err(ApiError::Validation(errors)) = validate_song(&mut input) else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.get("audio").unwrap()[0],
            "The audio field is required when audio file is not present."
        );
    }

    #[test]
    fn audio_and_file_together_are_rejected() {
        let mut input = form(json!({
            "playlist_id": 1,
            "title": "T",
            "artist": "A",
            "audio": "https://samplelib.com/a.mp3"
        }));
        input.files.insert(
            "audio_file".to_string(),
            UploadedFile::new("a.mp3", Some("audio/mpeg".to_string()), Bytes::from_static(b"x")),
        );

        let Err(ApiError::Validation(errors)) = validate_song(&mut input) else {
            panic!("expected validation error");
        };
        assert!(errors.get("audio").is_some());
    }

    #[test]
    fn upload_is_preferred_source_for_cover() {
        let mut input = form(json!({
            "playlist_id": 1,
            "title": "T",
            "artist": "A",
            "audio": "https://samplelib.com/a.mp3",
            "cover": "https://img.example.com/c.png"
        }));
        let file = UploadedFile::new("c.png", Some("image/png".to_string()), Bytes::from_static(b"png"));
        input.files.insert("cover_file".to_string(), file.clone());

        let song = validate_song(&mut input).unwrap();

        assert_eq!(song.cover, Some(MediaSource::Upload(file)));
    }

    #[test]
    fn collects_every_broken_rule() {
        let mut input = form(json!({
            "playlist_id": "abc",
            "title": "",
            "artist": "x".repeat(300),
            "audio": "https://samplelib.com/a.mp3",
            "duration": -3,
            "lyrics": [{"text": "missing time"}]
        }));

        let Err(ApiError::Validation(errors)) = validate_song(&mut input) else {
            panic!("expected validation error");
        };
        for field in ["playlist_id", "title", "artist", "duration", "lyrics.0.time"] {
            assert!(errors.get(field).is_some(), "missing error for {}", field);
        }
    }
}
