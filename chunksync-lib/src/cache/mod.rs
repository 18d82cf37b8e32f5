//! Per-track chunk cache and the fetch orchestration that fills it.

pub mod loader;
pub mod slot;

use std::collections::HashMap;

use log::debug;

use crate::constants::{CACHE_SOFT_LIMIT, CACHE_WINDOW_AHEAD, CACHE_WINDOW_BEHIND};

pub use loader::FetchOrchestrator;
pub use slot::ChunkSlot;

/// Memoized chunk loads, one map per track keyed by chunk index.
///
/// An entry exists from the moment a fetch is requested, so concurrent
/// requests for the same chunk share one slot.
#[derive(Debug, Default)]
pub struct ChunkCache {
    tracks: Vec<HashMap<usize, ChunkSlot>>,
}

impl ChunkCache {
    pub fn new(track_count: usize) -> Self {
        Self {
            tracks: (0..track_count).map(|_| HashMap::new()).collect(),
        }
    }

    pub fn get(&self, track_index: usize, chunk_index: usize) -> Option<&ChunkSlot> {
        self.tracks.get(track_index)?.get(&chunk_index)
    }

    pub fn contains(&self, track_index: usize, chunk_index: usize) -> bool {
        self.get(track_index, chunk_index).is_some()
    }

    pub fn insert(&mut self, track_index: usize, chunk_index: usize, slot: ChunkSlot) {
        if let Some(track) = self.tracks.get_mut(track_index) {
            track.insert(chunk_index, slot);
        }
    }

    /// Number of entries held for a track.
    pub fn len(&self, track_index: usize) -> usize {
        self.tracks.get(track_index).map(HashMap::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.iter().all(HashMap::is_empty)
    }

    /// Cached chunk indices for a track, ascending.
    pub fn chunks(&self, track_index: usize) -> Vec<usize> {
        let mut chunks: Vec<usize> = self
            .tracks
            .get(track_index)
            .map(|track| track.keys().copied().collect())
            .unwrap_or_default();
        chunks.sort_unstable();
        chunks
    }

    /// True when every track has an entry for `chunk_index`.
    pub fn is_chunk_loaded(&self, chunk_index: usize) -> bool {
        !self.tracks.is_empty() && self.tracks.iter().all(|track| track.contains_key(&chunk_index))
    }

    /// True when every track's entry for `chunk_index` has decoded successfully.
    pub fn is_chunk_ready(&self, chunk_index: usize) -> bool {
        !self.tracks.is_empty()
            && self.tracks.iter().all(|track| {
                track
                    .get(&chunk_index)
                    .map(ChunkSlot::is_ready)
                    .unwrap_or(false)
            })
    }

    /// Trim every track holding more than the soft limit down to the window
    /// `[current - 4, current + 3]`. Returns the number of evicted entries.
    pub fn cleanup(&mut self, current_chunk: usize) -> usize {
        let mut evicted = 0;
        for (track_index, track) in self.tracks.iter_mut().enumerate() {
            if track.len() <= CACHE_SOFT_LIMIT {
                continue;
            }
            let before = track.len();
            track.retain(|&chunk, _| {
                chunk + CACHE_WINDOW_BEHIND >= current_chunk
                    && chunk <= current_chunk + CACHE_WINDOW_AHEAD
            });
            let removed = before - track.len();
            if removed > 0 {
                debug!(
                    "evicted {} chunk(s) from track {} around chunk {}",
                    removed, track_index, current_chunk
                );
            }
            evicted += removed;
        }
        evicted
    }
}
