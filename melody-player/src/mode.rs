//! Playback modes

use serde::{Deserialize, Serialize};
use std::fmt;

/// How `next` and `previous` pick the following song
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackMode {
    /// Play through the playlist once
    #[default]
    Normal,
    /// Wrap around at either end
    RepeatAll,
    /// Keep restarting the current song
    RepeatOne,
    /// Random order without repeats until every song has played
    Shuffle,
}

impl PlaybackMode {
    /// Order used by [`PlaybackMode::cycle`]
    pub const ALL: [PlaybackMode; 4] = [
        PlaybackMode::Normal,
        PlaybackMode::RepeatAll,
        PlaybackMode::RepeatOne,
        PlaybackMode::Shuffle,
    ];

    /// Mode after this one in the UI toggle order
    pub fn cycle(self) -> Self {
        match self {
            PlaybackMode::Normal => PlaybackMode::RepeatAll,
            PlaybackMode::RepeatAll => PlaybackMode::RepeatOne,
            PlaybackMode::RepeatOne => PlaybackMode::Shuffle,
            PlaybackMode::Shuffle => PlaybackMode::Normal,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlaybackMode::Normal => "normal",
            PlaybackMode::RepeatAll => "repeat-all",
            PlaybackMode::RepeatOne => "repeat-one",
            PlaybackMode::Shuffle => "shuffle",
        }
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_visits_every_mode() {
        let mut mode = PlaybackMode::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(mode);
            mode = mode.cycle();
        }
        assert_eq!(seen, PlaybackMode::ALL);
        assert_eq!(mode, PlaybackMode::Normal);
    }

    #[test]
    fn serializes_as_kebab_case() {
        assert_eq!(
            serde_json::to_string(&PlaybackMode::RepeatOne).unwrap(),
            "\"repeat-one\""
        );
        let mode: PlaybackMode = serde_json::from_str("\"repeat-all\"").unwrap();
        assert_eq!(mode, PlaybackMode::RepeatAll);
        assert_eq!(PlaybackMode::Shuffle.to_string(), "shuffle");
    }
}
