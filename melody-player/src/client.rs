//! HTTP client for the library API
//!
//! Thin wrapper over `reqwest` that knows the endpoint paths, unwraps the
//! `{"data": ...}` envelope and turns failure responses into
//! [`ClientError::Api`] with the most useful message the server gave.

use crate::error::ClientError;
use melody_common::{LyricLine, Playlist, PlaylistId, Song, SongId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Song as returned by the API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteSong {
    pub id: SongId,
    pub playlist_id: PlaylistId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover: Option<String>,
    pub audio: String,
    /// URL to load for playback (may go through the relay)
    pub stream_url: String,
    pub duration: Option<f64>,
    #[serde(default)]
    pub lyrics: Vec<LyricLine>,
}

impl From<RemoteSong> for Song {
    fn from(song: RemoteSong) -> Self {
        Song {
            id: song.id,
            playlist_id: song.playlist_id,
            title: song.title,
            artist: song.artist,
            album: song.album,
            cover_url: song.cover,
            audio_url: song.audio,
            stream_url: Some(song.stream_url),
            duration: song.duration,
            lyrics: song.lyrics,
        }
    }
}

/// Playlist as returned by the API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemotePlaylist {
    pub id: PlaylistId,
    pub name: String,
    pub accent: Option<String>,
    #[serde(default)]
    pub songs: Vec<RemoteSong>,
}

impl From<RemotePlaylist> for Playlist {
    fn from(playlist: RemotePlaylist) -> Self {
        Playlist {
            id: playlist.id,
            name: playlist.name,
            accent: playlist.accent,
            songs: playlist.songs.into_iter().map(Song::from).collect(),
        }
    }
}

/// Body for creating or updating a playlist
///
/// `None` fields are left out of the request. `accent: Some(None)` sends an
/// explicit null, which asks the server for a fresh palette color.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaylistInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<Option<String>>,
}

/// Body for creating or replacing a song with URL sources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongInput {
    pub playlist_id: PlaylistId,
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    pub audio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lyrics: Vec<LyricLine>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Library API client
#[derive(Debug, Clone)]
pub struct LibraryClient {
    http: reqwest::Client,
    base: Url,
}

impl LibraryClient {
    /// Client for the server at `base_url` (e.g. `http://127.0.0.1:5780`)
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> ClientResult<Self> {
        let mut base = Url::parse(base_url.trim())
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Every playlist with its songs
    pub async fn library(&self) -> ClientResult<Vec<RemotePlaylist>> {
        let url = self.endpoint("api/library")?;
        self.send(self.http.get(url)).await
    }

    pub async fn create_playlist(&self, input: &PlaylistInput) -> ClientResult<RemotePlaylist> {
        let url = self.endpoint("api/playlists")?;
        self.send(self.http.post(url).json(input)).await
    }

    pub async fn update_playlist(
        &self,
        id: PlaylistId,
        input: &PlaylistInput,
    ) -> ClientResult<RemotePlaylist> {
        let url = self.endpoint(&format!("api/playlists/{}", id))?;
        self.send(self.http.put(url).json(input)).await
    }

    /// Delete a playlist; the server echoes it with the songs it removed
    pub async fn delete_playlist(&self, id: PlaylistId) -> ClientResult<RemotePlaylist> {
        let url = self.endpoint(&format!("api/playlists/{}", id))?;
        self.send(self.http.delete(url)).await
    }

    pub async fn create_song(&self, input: &SongInput) -> ClientResult<RemoteSong> {
        let url = self.endpoint("api/songs")?;
        self.send(self.http.post(url).json(input)).await
    }

    pub async fn update_song(&self, id: SongId, input: &SongInput) -> ClientResult<RemoteSong> {
        let url = self.endpoint(&format!("api/songs/{}", id))?;
        self.send(self.http.put(url).json(input)).await
    }

    pub async fn delete_song(&self, id: SongId) -> ClientResult<()> {
        let url = self.endpoint(&format!("api/songs/{}", id))?;
        let response = self
            .http
            .delete(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(api_error(status.as_u16(), &response.text().await.unwrap_or_default()))
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ClientResult<T> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = response.status();
        debug!("{} {}", status.as_u16(), response.url());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), &body));
        }

        let envelope: Envelope<T> = response.json().await?;
        Ok(envelope.data)
    }
}

/// Build an API error from a failure body
///
/// Prefers the JSON `message`, then the first field error, then the raw
/// text, then a generic line naming the status.
pub fn api_error(status: u16, body: &str) -> ClientError {
    let message = extract_message(body).unwrap_or_else(|| format!("Request failed ({})", status));
    warn!("API request failed with {}: {}", status, message);
    ClientError::Api { status, message }
}

fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return Some(body.to_string());
    };

    if let Some(message) = json
        .get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
    {
        return Some(message.to_string());
    }

    let first_field_error = json
        .get("errors")
        .and_then(Value::as_object)
        .and_then(|errors| errors.values().next())
        .and_then(|messages| match messages {
            Value::Array(items) => items.first().and_then(Value::as_str),
            Value::String(message) => Some(message.as_str()),
            _ => None,
        })
        .map(str::to_string);

    first_field_error.or_else(|| match json {
        Value::String(text) if !text.trim().is_empty() => Some(text),
        _ => None,
    })
}
