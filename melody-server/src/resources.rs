//! JSON resource shapes returned by the library API

use crate::relay::HostAllowList;
use axum::http::{header::HOST, HeaderMap};
use melody_common::{LyricLine, Playlist, PlaylistId, Song, SongId};
use serde::Serialize;
use url::Url;

/// Route of the audio relay
pub const RELAY_ROUTE: &str = "/audio/proxy";

/// `{"data": ...}` wrapper around every successful payload
#[derive(Debug, Serialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

impl<T> DataEnvelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongResource {
    pub id: SongId,
    pub playlist_id: PlaylistId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover: Option<String>,
    pub audio: String,
    pub stream_url: String,
    pub duration: Option<f64>,
    pub lyrics: Vec<LyricLine>,
}

impl SongResource {
    pub fn from_song(song: Song, links: &LinkContext) -> Self {
        let stream_url = links.stream_url(&song.audio_url);
        Self {
            id: song.id,
            playlist_id: song.playlist_id,
            title: song.title,
            artist: song.artist,
            album: song.album,
            cover: song.cover_url,
            audio: song.audio_url,
            stream_url,
            duration: song.duration,
            lyrics: song.lyrics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistResource {
    pub id: PlaylistId,
    pub name: String,
    pub accent: Option<String>,
    pub songs: Vec<SongResource>,
}

impl PlaylistResource {
    pub fn from_playlist(playlist: Playlist, links: &LinkContext) -> Self {
        Self {
            id: playlist.id,
            name: playlist.name,
            accent: playlist.accent,
            songs: playlist
                .songs
                .into_iter()
                .map(|song| SongResource::from_song(song, links))
                .collect(),
        }
    }
}

/// What a handler knows about where the client reached us
///
/// Decides whether a song's audio should be loaded through the relay.
#[derive(Debug, Clone)]
pub struct LinkContext<'a> {
    request_host: Option<String>,
    app_url: Option<&'a Url>,
    allow_list: &'a HostAllowList,
}

impl<'a> LinkContext<'a> {
    pub fn new(
        request_host: Option<String>,
        app_url: Option<&'a Url>,
        allow_list: &'a HostAllowList,
    ) -> Self {
        Self {
            request_host: request_host.map(|host| host.to_ascii_lowercase()),
            app_url,
            allow_list,
        }
    }

    /// Context taken from the request's `Host` header
    pub fn from_headers(
        headers: &HeaderMap,
        app_url: Option<&'a Url>,
        allow_list: &'a HostAllowList,
    ) -> Self {
        let request_host = headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .and_then(host_without_port);
        Self::new(request_host, app_url, allow_list)
    }

    fn is_own_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.request_host.as_deref() == Some(host.as_str())
            || self
                .app_url
                .and_then(|url| url.host_str())
                .is_some_and(|own| own.eq_ignore_ascii_case(&host))
    }

    /// URL a player should load for `audio`
    pub fn stream_url(&self, audio: &str) -> String {
        let Ok(url) = Url::parse(audio) else {
            return audio.to_string();
        };
        if !matches!(url.scheme(), "http" | "https") {
            return audio.to_string();
        }
        let Some(host) = url.host_str() else {
            return audio.to_string();
        };
        if self.is_own_host(host) || !self.allow_list.allows(host) {
            return audio.to_string();
        }

        let base = self
            .app_url
            .map(|url| url.as_str().trim_end_matches('/').to_string())
            .unwrap_or_default();
        format!("{}{}?url={}", base, RELAY_ROUTE, urlencoding::encode(audio))
    }
}

/// Host part of a `Host` header value
fn host_without_port(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Url::parse(&format!("http://{}", value))
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(audio: &str) -> Song {
        Song {
            id: 3,
            playlist_id: 1,
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            album: None,
            cover_url: Some("https://img.example.com/c.png".to_string()),
            audio_url: audio.to_string(),
            stream_url: None,
            duration: Some(6.0),
            lyrics: vec![LyricLine::new(0.0, "hello")],
        }
    }

    #[test]
    fn host_header_port_is_stripped() {
        assert_eq!(host_without_port("localhost:5780"), Some("localhost".to_string()));
        assert_eq!(host_without_port("Music.Example.com"), Some("music.example.com".to_string()));
        assert_eq!(host_without_port(""), None);
    }

    #[test]
    fn allowed_external_audio_goes_through_relay() {
        let allow = HostAllowList::new(["samplelib.com"]);
        let links = LinkContext::new(Some("localhost".to_string()), None, &allow);

        let audio = "https://samplelib.com/lib/preview/mp3/sample-6s.mp3";
        assert_eq!(
            links.stream_url(audio),
            "/audio/proxy?url=https%3A%2F%2Fsamplelib.com%2Flib%2Fpreview%2Fmp3%2Fsample-6s.mp3"
        );
    }

    #[test]
    fn local_and_unlisted_audio_is_unchanged() {
        let allow = HostAllowList::new(["samplelib.com", "localhost"]);
        let app_url = Url::parse("https://samplelib.com").unwrap();

        let by_request = LinkContext::new(Some("localhost".to_string()), None, &allow);
        assert_eq!(
            by_request.stream_url("http://localhost/storage/audio/a.mp3"),
            "http://localhost/storage/audio/a.mp3"
        );
        assert_eq!(by_request.stream_url("/storage/audio/a.mp3"), "/storage/audio/a.mp3");
        assert_eq!(
            by_request.stream_url("https://other.net/a.mp3"),
            "https://other.net/a.mp3"
        );

        let by_app = LinkContext::new(None, Some(&app_url), &allow);
        assert_eq!(
            by_app.stream_url("https://samplelib.com/a.mp3"),
            "https://samplelib.com/a.mp3"
        );
    }

    #[test]
    fn song_resource_keeps_audio_unchanged() {
        let allow = HostAllowList::new(["samplelib.com"]);
        let links = LinkContext::new(None, None, &allow);
        let audio = "https://samplelib.com/a.mp3";

        let resource = SongResource::from_song(song(audio), &links);

        assert_eq!(resource.audio, audio);
        assert!(resource.stream_url.starts_with("/audio/proxy?url="));
        assert_eq!(resource.cover.as_deref(), Some("https://img.example.com/c.png"));

        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["lyrics"][0]["text"], "hello");
        assert!(json.get("audio_url").is_none());
    }
}
