//! Playback history tracking
//!
//! Maintains a bounded history of played songs for "previous" in shuffle mode

use melody_common::SongId;
use std::collections::VecDeque;

/// Default number of songs remembered
pub const DEFAULT_HISTORY_SIZE: usize = 50;

/// Playback history with bounded size
///
/// Most recent entry is at the back. Pushing the song that is already the
/// most recent entry is ignored, so replays do not stack up.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    songs: VecDeque<SongId>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            songs: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Add song to history
    ///
    /// If history is full, oldest song is discarded
    pub fn push(&mut self, song: SongId) {
        if self.max_size == 0 || self.songs.back() == Some(&song) {
            return;
        }
        if self.songs.len() >= self.max_size {
            self.songs.pop_front();
        }
        self.songs.push_back(song);
    }

    pub fn peek(&self) -> Option<SongId> {
        self.songs.back().copied()
    }

    /// Pop most recent song
    pub fn pop(&mut self) -> Option<SongId> {
        self.songs.pop_back()
    }

    /// Keep only songs accepted by `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(SongId) -> bool) {
        self.songs.retain(|id| keep(*id));
        // Pruning can leave two equal neighbours behind
        let mut previous = None;
        self.songs.retain(|id| {
            let duplicate = previous == Some(*id);
            previous = Some(*id);
            !duplicate
        });
    }

    /// Songs oldest first
    pub fn songs(&self) -> impl Iterator<Item = SongId> + '_ {
        self.songs.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn clear(&mut self) {
        self.songs.clear();
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}
