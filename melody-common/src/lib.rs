//! # Melody Common Library
//!
//! Shared code for the Melody server and player including:
//! - Library models (playlists, songs, lyric lines)
//! - Lyric normalization and the `MM:SS|text` lyric format
//! - Accent palette
//! - Configuration loading and root folder resolution
//! - SQLite schema, repositories and demo seed (`sqlx` feature)

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod lyrics;
pub mod models;
pub mod palette;

pub use error::{Error, Result};
pub use models::{LyricLine, Playlist, PlaylistId, Song, SongId};
