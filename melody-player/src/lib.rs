//! # Melody Player
//!
//! Client-side playback logic for Melody:
//! - Player state machine (playback modes, shuffle queue, history)
//! - Karaoke lyric tracking
//! - Audio effects graph (preamp, six-band EQ, volume, tempo/pitch rate)
//! - HTTP client for the library API

pub mod client;
pub mod effects;
pub mod error;
pub mod history;
pub mod karaoke;
pub mod mode;
pub mod shuffle;
pub mod state;

pub use client::{LibraryClient, PlaylistInput, RemotePlaylist, RemoteSong, SongInput};
pub use effects::{AudioGraph, DspNode, EffectsSettings, PlaybackRate};
pub use error::{ClientError, PlayerError, Result};
pub use karaoke::{active_line_index, KaraokeTracker};
pub use mode::PlaybackMode;
pub use state::{PlayerState, Transition};
