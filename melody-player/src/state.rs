//! Player state machine
//!
//! Tracks the current playlist and song, the playback mode, shuffle queue
//! and history. Every navigation call returns a [`Transition`] telling the
//! audio layer what to do; the state itself never touches audio.
//!
//! Rules worth knowing:
//! - Leaving a song for a different one records it in history, except when
//!   going back through history in shuffle mode.
//! - In shuffle mode every song plays once before any repeats; the queue
//!   is refilled with a new permutation (minus the current song) when it
//!   runs dry.
//! - Library or playlist changes prune history and queue to songs that
//!   still exist in the current playlist.

use crate::error::{PlayerError, Result};
use crate::history::History;
use crate::mode::PlaybackMode;
use crate::shuffle::ShuffleQueue;
use melody_common::{Playlist, PlaylistId, Song, SongId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

/// What the audio layer should do after a navigation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Load and play a different song
    Play(SongId),
    /// Load a different song but stay paused
    Load(SongId),
    /// Seek the current song to the start and keep playing
    Restart(SongId),
    /// Current song is unchanged; leave the audio alone
    Keep(SongId),
    /// End of the playlist reached; stop playback
    Stop,
    /// Nothing to play (no playlist or an empty one)
    Idle,
}

/// Client-side playback state
#[derive(Debug, Clone)]
pub struct PlayerState {
    playlists: Vec<Playlist>,
    current_playlist: Option<PlaylistId>,
    current_song: Option<SongId>,
    mode: PlaybackMode,
    queue: ShuffleQueue,
    history: History,
    playing: bool,
    rng: StdRng,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerState {
    /// Empty state with an entropy-seeded RNG
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Empty state whose shuffle order is reproducible
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            playlists: Vec::new(),
            current_playlist: None,
            current_song: None,
            mode: PlaybackMode::Normal,
            queue: ShuffleQueue::new(),
            history: History::default(),
            playing: false,
            rng,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn current_playlist(&self) -> Option<&Playlist> {
        let id = self.current_playlist?;
        self.playlists.iter().find(|p| p.id == id)
    }

    pub fn current_song(&self) -> Option<&Song> {
        let id = self.current_song?;
        self.current_playlist()?.song(id)
    }

    pub fn current_song_id(&self) -> Option<SongId> {
        self.current_song
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn shuffle_queue(&self) -> &ShuffleQueue {
        &self.queue
    }

    fn song_ids(&self) -> Vec<SongId> {
        self.current_playlist()
            .map(Playlist::song_ids)
            .unwrap_or_default()
    }

    // ========================================================================
    // Library and selection
    // ========================================================================

    /// Replace the library
    ///
    /// The current playlist and song survive when they still exist;
    /// otherwise the first playlist and its first song are selected. A newly
    /// selected song only starts if playback was already running.
    pub fn set_library(&mut self, playlists: Vec<Playlist>) -> Transition {
        let previous_song = self.current_song;
        self.playlists = playlists;

        let playlist = self
            .current_playlist
            .filter(|id| self.playlists.iter().any(|p| p.id == *id))
            .or_else(|| self.playlists.first().map(|p| p.id));
        self.current_playlist = playlist;

        let ids = self.song_ids();
        self.current_song = self
            .current_song
            .filter(|id| ids.contains(id))
            .or_else(|| ids.first().copied());

        self.prune();
        if self.mode == PlaybackMode::Shuffle && self.queue.is_empty() {
            self.refill_queue();
        }

        debug!(
            "Library replaced: {} playlists, current playlist {:?}, song {:?}",
            self.playlists.len(),
            self.current_playlist,
            self.current_song
        );

        match self.current_song {
            None => {
                self.playing = false;
                Transition::Idle
            }
            Some(id) if Some(id) != previous_song && self.playing => Transition::Play(id),
            Some(id) if Some(id) != previous_song => Transition::Load(id),
            Some(id) => Transition::Keep(id),
        }
    }

    /// Switch to another playlist
    ///
    /// With `keep_song` the current song stays selected if it belongs to the
    /// new playlist; otherwise the playlist's first song is selected.
    pub fn select_playlist(&mut self, playlist_id: PlaylistId, keep_song: bool) -> Result<Transition> {
        let playlist = self
            .playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .ok_or(PlayerError::UnknownPlaylist(playlist_id))?;

        let kept = self
            .current_song
            .filter(|id| keep_song && playlist.contains_song(*id));
        let next = kept.or_else(|| playlist.songs.first().map(|s| s.id));

        let switched = self.current_playlist != Some(playlist_id);
        self.current_playlist = Some(playlist_id);

        if let (Some(old), Some(new)) = (self.current_song, next) {
            if old != new {
                self.history.push(old);
            }
        }
        self.current_song = next;

        self.prune();
        if self.mode == PlaybackMode::Shuffle && (switched || self.queue.is_empty()) {
            self.refill_queue();
        }

        debug!("Selected playlist {} (song {:?})", playlist_id, next);

        Ok(match next {
            None => {
                self.playing = false;
                Transition::Idle
            }
            Some(id) if kept.is_some() => Transition::Keep(id),
            Some(id) => {
                self.playing = true;
                Transition::Play(id)
            }
        })
    }

    /// Jump to a song, switching playlist if it lives elsewhere
    pub fn select_song(&mut self, song_id: SongId) -> Result<Transition> {
        let owner = self
            .playlists
            .iter()
            .find(|p| p.contains_song(song_id))
            .map(|p| p.id)
            .ok_or(PlayerError::UnknownSong(song_id))?;

        let switched = self.current_playlist != Some(owner);
        self.playing = true;
        if !switched && self.current_song == Some(song_id) {
            return Ok(Transition::Restart(song_id));
        }

        self.move_to(song_id, true);
        self.current_playlist = Some(owner);
        if switched {
            self.prune();
            if self.mode == PlaybackMode::Shuffle {
                self.refill_queue();
            }
        } else {
            self.queue.remove(song_id);
        }

        debug!("Selected song {} in playlist {}", song_id, owner);
        Ok(Transition::Play(song_id))
    }

    // ========================================================================
    // Mode
    // ========================================================================

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        if mode == self.mode {
            return;
        }
        let was_shuffle = self.mode == PlaybackMode::Shuffle;
        self.mode = mode;

        if mode == PlaybackMode::Shuffle {
            self.refill_queue();
        } else if was_shuffle {
            self.queue.clear();
        }
        debug!("Playback mode set to {}", mode);
    }

    /// Advance to the next mode and return it
    pub fn cycle_mode(&mut self) -> PlaybackMode {
        self.set_mode(self.mode.cycle());
        self.mode
    }

    // ========================================================================
    // Play / pause
    // ========================================================================

    /// Start playback; returns whether there is a song to play
    pub fn play(&mut self) -> bool {
        self.playing = self.current_song.is_some();
        self.playing
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Flip between playing and paused; returns the new playing flag
    pub fn toggle(&mut self) -> bool {
        if self.playing {
            self.pause();
            false
        } else {
            self.play()
        }
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Move forward according to the playback mode
    pub fn next(&mut self) -> Transition {
        let ids = self.song_ids();
        if ids.is_empty() {
            self.playing = false;
            return Transition::Idle;
        }

        let Some(current) = self.current_song.filter(|id| ids.contains(id)) else {
            let first = match self.mode {
                PlaybackMode::Shuffle => self.pop_queue(&ids).unwrap_or(ids[0]),
                _ => ids[0],
            };
            self.move_to(first, false);
            self.playing = true;
            return Transition::Play(first);
        };

        if ids.len() == 1 || self.mode == PlaybackMode::RepeatOne {
            return self.restart(current);
        }

        let target = match self.mode {
            PlaybackMode::Shuffle => match self.pop_queue(&ids) {
                Some(id) => id,
                None => {
                    self.refill_queue();
                    match self.pop_queue(&ids) {
                        Some(id) => id,
                        None => return self.restart(current),
                    }
                }
            },
            PlaybackMode::Normal | PlaybackMode::RepeatAll | PlaybackMode::RepeatOne => {
                let position = ids.iter().position(|id| *id == current).unwrap_or(0);
                match ids.get(position + 1) {
                    Some(id) => *id,
                    None if self.mode == PlaybackMode::RepeatAll => ids[0],
                    None => {
                        debug!("Reached end of playlist, stopping");
                        self.playing = false;
                        return Transition::Stop;
                    }
                }
            }
        };

        self.move_to(target, true);
        self.playing = true;
        Transition::Play(target)
    }

    /// Move back according to the playback mode
    pub fn previous(&mut self) -> Transition {
        let ids = self.song_ids();
        if ids.is_empty() {
            self.playing = false;
            return Transition::Idle;
        }

        let Some(current) = self.current_song.filter(|id| ids.contains(id)) else {
            self.move_to(ids[0], false);
            self.playing = true;
            return Transition::Play(ids[0]);
        };

        if ids.len() == 1 || self.mode == PlaybackMode::RepeatOne {
            return self.restart(current);
        }

        let target = match self.mode {
            PlaybackMode::Shuffle => {
                let mut from_history = None;
                while let Some(id) = self.history.pop() {
                    if id != current && ids.contains(&id) {
                        from_history = Some(id);
                        break;
                    }
                }
                match from_history {
                    Some(id) => {
                        self.queue.push_front(current);
                        self.queue.remove(id);
                        self.move_to(id, false);
                        self.playing = true;
                        return Transition::Play(id);
                    }
                    None => return self.restart(current),
                }
            }
            PlaybackMode::Normal | PlaybackMode::RepeatAll | PlaybackMode::RepeatOne => {
                let position = ids.iter().position(|id| *id == current).unwrap_or(0);
                match position.checked_sub(1) {
                    Some(index) => ids[index],
                    None if self.mode == PlaybackMode::RepeatAll => ids[ids.len() - 1],
                    None => return self.restart(current),
                }
            }
        };

        self.move_to(target, true);
        self.playing = true;
        Transition::Play(target)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn restart(&mut self, current: SongId) -> Transition {
        self.playing = true;
        Transition::Restart(current)
    }

    fn move_to(&mut self, song_id: SongId, record_history: bool) {
        if record_history {
            if let Some(old) = self.current_song.filter(|old| *old != song_id) {
                self.history.push(old);
            }
        }
        self.current_song = Some(song_id);
    }

    /// Pop the next queued song that still exists and is not playing
    fn pop_queue(&mut self, ids: &[SongId]) -> Option<SongId> {
        while let Some(id) = self.queue.pop() {
            if ids.contains(&id) && Some(id) != self.current_song {
                return Some(id);
            }
        }
        None
    }

    fn refill_queue(&mut self) {
        let ids = self.song_ids();
        self.queue.refill(&ids, self.current_song, &mut self.rng);
    }

    fn prune(&mut self) {
        let ids = self.song_ids();
        self.history.retain(|id| ids.contains(&id));
        self.queue.retain(|id| ids.contains(&id));
    }
}
