//! Error types for the player and the library client

use melody_common::{PlaylistId, SongId};
use thiserror::Error;

/// Player state errors
#[derive(Debug, Error, PartialEq)]
pub enum PlayerError {
    /// No playlist with this id in the loaded library
    #[error("Unknown playlist: {0}")]
    UnknownPlaylist(PlaylistId),

    /// No song with this id in the loaded library
    #[error("Unknown song: {0}")]
    UnknownSong(SongId),
}

/// Result type for player operations
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Library API client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure or undecodable response
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a failure status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Base URL could not be joined with an endpoint path
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// HTTP status of an API failure
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            ClientError::InvalidUrl(_) => None,
        }
    }
}
