//! Chunk fetch orchestration.
//!
//! Requests are memoized through [`ChunkCache`]: the first request for a
//! (track, chunk) pair inserts a pending slot and starts a fetch thread,
//! later requests reuse that slot whether it is still pending or settled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use log::{debug, warn};

use crate::audio::output::AudioOutput;
use crate::cache::slot::ChunkSlot;
use crate::cache::ChunkCache;
use crate::fetch::ChunkFetcher;
use crate::mixer::MixerState;
use crate::program::Program;
use crate::source::SourceResolver;

pub struct FetchOrchestrator {
    program: Program,
    resolver: SourceResolver,
    fetcher: Arc<dyn ChunkFetcher>,
    output: Arc<dyn AudioOutput>,
    requests: AtomicU64,
}

impl FetchOrchestrator {
    pub fn new(
        program: Program,
        resolver: SourceResolver,
        fetcher: Arc<dyn ChunkFetcher>,
        output: Arc<dyn AudioOutput>,
    ) -> Self {
        Self {
            program,
            resolver,
            fetcher,
            output,
            requests: AtomicU64::new(0),
        }
    }

    /// Make sure every track has a slot for `chunk_index`, then trim the cache
    /// around `current_chunk`.
    ///
    /// Indices past the end of the program are ignored. Tracks that have never
    /// loaded a chunk get their mixer nodes materialized first.
    ///
    /// # Arguments
    ///
    /// * `chunk_index` - Chunk to load on every track.
    /// * `current_chunk` - Playback position used as the eviction window center.
    /// * `cache` - Cache receiving the new slots.
    /// * `mixer` - Mixer whose tracks are materialized on first use.
    ///
    /// # Returns
    ///
    /// The number of fetches started by this call.
    pub fn ensure_loaded(
        &self,
        chunk_index: usize,
        current_chunk: usize,
        cache: &mut ChunkCache,
        mixer: &mut MixerState,
    ) -> usize {
        if chunk_index >= self.program.chunk_count {
            return 0;
        }

        let mut started = 0;
        for track_index in 0..self.program.track_count {
            mixer.materialize(track_index, self.output.as_ref());
            if cache.contains(track_index, chunk_index) {
                continue;
            }

            let slot = ChunkSlot::pending();
            cache.insert(track_index, chunk_index, slot.clone());
            self.spawn_fetch(track_index, chunk_index, slot);
            started += 1;
        }

        cache.cleanup(current_chunk);
        started
    }

    /// Total fetches started since construction.
    pub fn requests_issued(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    fn spawn_fetch(&self, track_index: usize, chunk_index: usize, slot: ChunkSlot) {
        let url = self.resolver.resolve(track_index, chunk_index);
        let fetcher = self.fetcher.clone();
        self.requests.fetch_add(1, Ordering::SeqCst);
        debug!("fetching track {} chunk {}: {}", track_index, chunk_index, url);

        let worker_slot = slot.clone();
        let spawned = thread::Builder::new()
            .name(format!("fetch-{}-{}", track_index, chunk_index))
            .spawn(move || {
                let result = fetcher.fetch(&url).map_err(|err| {
                    warn!(
                        "failed to load track {} chunk {} from {}: {}",
                        track_index, chunk_index, url, err
                    );
                    err.to_string()
                });
                if let Ok(buffer) = &result {
                    debug!(
                        "loaded track {} chunk {} ({:.3}s)",
                        track_index,
                        chunk_index,
                        buffer.duration()
                    );
                }
                worker_slot.resolve(result);
            });

        if let Err(err) = spawned {
            warn!("failed to spawn fetch thread: {}", err);
            slot.resolve(Err(err.to_string()));
        }
    }
}
