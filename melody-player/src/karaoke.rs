//! Karaoke lyric synchronisation
//!
//! Lines light up slightly before their timestamp so the highlight does not
//! feel late.

use melody_common::LyricLine;

/// How far ahead of the playback position a line becomes active
pub const LOOKAHEAD_SECS: f64 = 0.2;

/// Index of the line active at `position` seconds
///
/// `lines` must be sorted by time (the server stores them that way). Before
/// the first line nothing is active.
pub fn active_line_index(lines: &[LyricLine], position: f64) -> Option<usize> {
    let threshold = position + LOOKAHEAD_SECS;
    lines
        .partition_point(|line| line.time <= threshold)
        .checked_sub(1)
}

/// Change of the highlighted line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LyricChange {
    pub previous: Option<usize>,
    pub current: Option<usize>,
}

/// Follows playback position and reports when the active line changes
#[derive(Debug, Clone, Default)]
pub struct KaraokeTracker {
    active: Option<usize>,
}

impl KaraokeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<usize> {
        self.active
    }

    /// Forget the active line; call when the song changes
    pub fn reset(&mut self) {
        self.active = None;
    }

    /// Feed a new playback position; returns a change only when the active line moved
    pub fn update(&mut self, lines: &[LyricLine], position: f64) -> Option<LyricChange> {
        let current = active_line_index(lines, position);
        if current == self.active {
            return None;
        }
        let change = LyricChange {
            previous: self.active,
            current,
        };
        self.active = current;
        Some(change)
    }
}
