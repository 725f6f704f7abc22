//! Demo library seed
//!
//! Gives a fresh install something to play. Only runs against an empty
//! library so it never duplicates user data.

use super::{playlists, songs, SongRecord};
use crate::models::LyricLine;
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

struct DemoSong {
    title: &'static str,
    artist: &'static str,
    album: &'static str,
    cover_url: &'static str,
    audio_url: &'static str,
    duration: f64,
    lyrics: &'static [(f64, &'static str)],
}

struct DemoPlaylist {
    name: &'static str,
    accent: &'static str,
    songs: &'static [DemoSong],
}

const DEMO_LIBRARY: &[DemoPlaylist] = &[
    DemoPlaylist {
        name: "Sunset Vibes",
        accent: "#fb7185",
        songs: &[
            DemoSong {
                title: "Aurora Bloom",
                artist: "Eira Lin",
                album: "Chromatic Dreams",
                cover_url: "https://images.unsplash.com/photo-1500530855697-b586d89ba3ee?auto=format&fit=crop&w=400&q=80",
                audio_url: "https://samplelib.com/lib/preview/mp3/sample-6s.mp3",
                duration: 6.0,
                lyrics: &[
                    (0.0, "Morning settles softly on your shoulders."),
                    (1.5, "Every note drifts up into the rose clouds."),
                    (3.0, "Hearts begin to race a little faster."),
                    (4.5, "We dissolve together in the haze of light."),
                ],
            },
            DemoSong {
                title: "Neon Skyline",
                artist: "Nova & The Waves",
                album: "Night Pulse",
                cover_url: "https://images.unsplash.com/photo-1514525253161-7a46d19cd819?auto=format&fit=crop&w=400&q=80",
                audio_url: "https://samplelib.com/lib/preview/mp3/sample-9s.mp3",
                duration: 9.0,
                lyrics: &[
                    (0.0, "The city burns bright through the long night."),
                    (2.4, "The crowd carries us somewhere far away."),
                    (4.5, "Beams of light weave into one another."),
                    (6.8, "Lost in the moment, nothing else remains."),
                ],
            },
        ],
    },
    DemoPlaylist {
        name: "Deep Focus",
        accent: "#f97316",
        songs: &[DemoSong {
            title: "Midnight Drift",
            artist: "Lumen",
            album: "Parallel Lines",
            cover_url: "https://images.unsplash.com/photo-1460661419201-fd4cecdf8a8b?auto=format&fit=crop&w=400&q=80",
            audio_url: "https://samplelib.com/lib/preview/mp3/sample-12s.mp3",
            duration: 12.0,
            lyrics: &[
                (0.0, "In the quiet night the heartbeat slows."),
                (3.5, "Gliding over deep waves of thought."),
                (7.2, "A hushed refrain rocks the edge of sleep."),
                (10.4, "Let it drift along the unseen stream."),
            ],
        }],
    },
];

/// Insert the demo playlists when the library is empty
///
/// Returns `true` when anything was inserted.
pub async fn seed_demo_library(pool: &SqlitePool) -> Result<bool> {
    if playlists::count(pool).await? > 0 {
        info!("Library already has playlists, skipping demo seed");
        return Ok(false);
    }

    for entry in DEMO_LIBRARY {
        let playlist = playlists::insert(pool, entry.name, Some(entry.accent)).await?;

        for song in entry.songs {
            let record = SongRecord {
                playlist_id: playlist.id,
                title: song.title.to_string(),
                artist: song.artist.to_string(),
                album: Some(song.album.to_string()),
                cover_url: Some(song.cover_url.to_string()),
                audio_url: song.audio_url.to_string(),
                duration: Some(song.duration),
                lyrics: song
                    .lyrics
                    .iter()
                    .map(|(time, text)| LyricLine::new(*time, *text))
                    .collect(),
            };
            songs::insert(pool, &record).await?;
        }
    }

    info!("Seeded demo library with {} playlists", DEMO_LIBRARY.len());
    Ok(true)
}
