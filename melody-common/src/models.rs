//! Library models shared by the server and the player

use serde::{Deserialize, Serialize};

/// Playlist primary key
pub type PlaylistId = i64;

/// Song primary key
pub type SongId = i64;

/// Named, ordered collection of songs with a display accent color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    /// CSS color used to tint the playlist in the UI (e.g. `#fb7185`)
    pub accent: Option<String>,
    /// Songs ordered by id ascending
    #[serde(default)]
    pub songs: Vec<Song>,
}

impl Playlist {
    /// Song ids in playback order
    pub fn song_ids(&self) -> Vec<SongId> {
        self.songs.iter().map(|song| song.id).collect()
    }

    pub fn contains_song(&self, song_id: SongId) -> bool {
        self.songs.iter().any(|song| song.id == song_id)
    }

    pub fn song(&self, song_id: SongId) -> Option<&Song> {
        self.songs.iter().find(|song| song.id == song_id)
    }

    /// Position of a song within the playlist
    pub fn position_of(&self, song_id: SongId) -> Option<usize> {
        self.songs.iter().position(|song| song.id == song_id)
    }
}

/// A single song entry belonging to exactly one playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub playlist_id: PlaylistId,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub cover_url: Option<String>,
    pub audio_url: String,
    /// URL a player loads instead of `audio_url` (the relay route for
    /// external hosts); only known for songs received from the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    /// Duration in seconds, when known
    pub duration: Option<f64>,
    /// Lyric lines sorted ascending by time
    #[serde(default)]
    pub lyrics: Vec<LyricLine>,
}

impl Song {
    /// URL to load for playback
    pub fn playback_url(&self) -> &str {
        self.stream_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(&self.audio_url)
    }
}

/// Timed lyric line used for karaoke highlighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    /// Offset from the start of the song in seconds (>= 0)
    pub time: f64,
    pub text: String,
}

impl LyricLine {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}
