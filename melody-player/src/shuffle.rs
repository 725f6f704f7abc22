//! Shuffle queue
//!
//! Holds the songs still to be played in shuffle mode. Every song comes up
//! once before the queue is refilled with a fresh permutation.

use melody_common::SongId;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShuffleQueue {
    pending: VecDeque<SongId>,
}

impl ShuffleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue with a random permutation of `songs`, minus `exclude`
    pub fn refill<R: Rng + ?Sized>(&mut self, songs: &[SongId], exclude: Option<SongId>, rng: &mut R) {
        let mut order: Vec<SongId> = songs
            .iter()
            .copied()
            .filter(|id| Some(*id) != exclude)
            .collect();
        order.shuffle(rng);
        self.pending = order.into();
    }

    /// Next song to play
    pub fn pop(&mut self) -> Option<SongId> {
        self.pending.pop_front()
    }

    /// Put a song back so it plays next
    pub fn push_front(&mut self, song: SongId) {
        self.pending.retain(|id| *id != song);
        self.pending.push_front(song);
    }

    /// Drop a song from the pending order
    pub fn remove(&mut self, song: SongId) {
        self.pending.retain(|id| *id != song);
    }

    pub fn retain(&mut self, mut keep: impl FnMut(SongId) -> bool) {
        self.pending.retain(|id| keep(*id));
    }

    pub fn contains(&self, song: SongId) -> bool {
        self.pending.contains(&song)
    }

    /// Pending songs in play order
    pub fn songs(&self) -> impl Iterator<Item = SongId> + '_ {
        self.pending.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
