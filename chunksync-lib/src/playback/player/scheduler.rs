//! Epoch startup, chunk-boundary transitions, and `timeupdate` ticks.

use std::sync::{Arc, Weak};
use std::thread;

use log::{debug, info, warn};

use crate::audio::buffer::ChunkBuffer;
use crate::audio::output::{EndedCallback, SourceHandle};
use crate::cache::ChunkSlot;
use crate::events::Channel;
use crate::playback::epoch::Epoch;
use crate::playback::ticker::Ticker;

use super::{Core, PlayerState, Shared};

impl Shared {
    /// Start a new epoch at the current position.
    ///
    /// The caller holds the core lock and has already released the previous
    /// epoch. Buffers are awaited on a worker thread; the sources are started
    /// by [`Shared::finish_epoch_start`] once every track has settled.
    pub(super) fn begin_epoch(self: &Arc<Self>, core: &mut Core) {
        debug_assert!(core.live.is_none());

        core.next_epoch_id += 1;
        let id = core.next_epoch_id;
        let chunk_index = core.position.chunk_index;
        let offset = core.position.chunk_offset;
        let generation = core.seek_generation;
        core.position.start_reference = None;

        self.loader
            .ensure_loaded(chunk_index, chunk_index, &mut core.cache, &mut core.mixer);
        self.loader
            .ensure_loaded(chunk_index + 1, chunk_index, &mut core.cache, &mut core.mixer);

        let slots: Vec<Option<ChunkSlot>> = (0..self.program.track_count)
            .map(|track_index| core.cache.get(track_index, chunk_index).cloned())
            .collect();

        let epoch = Epoch::new(id, chunk_index, offset, generation);
        let cancelled = epoch.cancel_flag();
        core.live = Some(epoch);
        debug!("epoch {} pending at chunk {} +{:.3}s", id, chunk_index, offset);

        let weak = Arc::downgrade(self);
        let spawned = thread::Builder::new()
            .name(format!("epoch-{}", id))
            .spawn(move || {
                let mut buffers = Vec::with_capacity(slots.len());
                for (track_index, slot) in slots.into_iter().enumerate() {
                    let buffer = match slot {
                        Some(slot) => match slot.wait_cancellable(&cancelled) {
                            None => {
                                debug!("epoch {} cancelled while loading", id);
                                return;
                            }
                            Some(Ok(buffer)) => Some(buffer),
                            Some(Err(reason)) => {
                                warn!(
                                    "track {} muted for chunk {}: {}",
                                    track_index, chunk_index, reason
                                );
                                None
                            }
                        },
                        None => None,
                    };
                    buffers.push(buffer);
                }

                if let Some(shared) = weak.upgrade() {
                    shared.finish_epoch_start(id, generation, buffers);
                }
            });

        if let Err(err) = spawned {
            warn!("failed to spawn epoch worker, chunk {} plays silent: {}", chunk_index, err);
            self.start_sources(core, vec![None; self.program.track_count]);
        }
    }

    /// Start the sources of epoch `id` if it is still the live one.
    fn finish_epoch_start(self: &Arc<Self>, id: u64, generation: u64, buffers: Vec<Option<ChunkBuffer>>) {
        let mut guard = self.core.lock().unwrap();
        let core = &mut *guard;

        let current = match &core.live {
            Some(epoch) => {
                epoch.id == id && !epoch.is_cancelled() && epoch.seek_generation == generation
            }
            None => false,
        };
        if !current || core.seek_generation != generation || core.state != PlayerState::Playing {
            debug!("discarding stale epoch {}", id);
            return;
        }

        self.start_sources(core, buffers);
    }

    /// Create and start one source per resolved track at a shared instant.
    fn start_sources(self: &Arc<Self>, core: &mut Core, buffers: Vec<Option<ChunkBuffer>>) {
        let Some(epoch) = core.live.as_mut() else {
            return;
        };
        let id = epoch.id;
        let offset = epoch.offset;

        let mut sources: Vec<Box<dyn SourceHandle>> = Vec::new();
        for (track_index, buffer) in buffers.into_iter().enumerate() {
            let Some(buffer) = buffer else {
                continue;
            };
            let Some(nodes) = core.mixer.nodes(track_index) else {
                continue;
            };
            sources.push(self.output.create_source(buffer, nodes));
        }

        let now = self.output.now();
        core.position.start_reference = Some(now - offset);

        let last = sources.len().checked_sub(1);
        for (index, source) in sources.iter_mut().enumerate() {
            let on_ended = if Some(index) == last {
                Some(self.chunk_end_callback(id))
            } else {
                None
            };
            source.start(now, offset, on_ended);
        }

        if sources.is_empty() {
            warn!(
                "epoch {} started with no sources; chunk {} is silent",
                id, epoch.chunk_index
            );
        } else {
            debug!(
                "epoch {} started {} source(s) at {:.3}",
                id,
                sources.len(),
                now
            );
        }

        let weak = Arc::downgrade(self);
        let ticker = Ticker::start(self.program.timeupdate_interval(), move || {
            match weak.upgrade() {
                Some(shared) => shared.tick(id),
                None => false,
            }
        });
        epoch.attach(sources, ticker);
    }

    fn chunk_end_callback(self: &Arc<Self>, id: u64) -> EndedCallback {
        let weak: Weak<Self> = Arc::downgrade(self);
        Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.handle_chunk_end(id);
            }
        })
    }

    /// Publish `timeupdate` for epoch `id`; returns false once it is gone.
    ///
    /// A started epoch with no sources never receives a completion signal,
    /// so the tick also ends its chunk once the chunk duration has elapsed.
    fn tick(self: &Arc<Self>, id: u64) -> bool {
        let (time, silent_done) = {
            let core = self.core.lock().unwrap();
            let Some(epoch) = core.live.as_ref() else {
                return false;
            };
            if epoch.id != id || epoch.is_cancelled() {
                return false;
            }
            let now = self.output.now();
            let silent_done = epoch.is_started()
                && epoch.source_count() == 0
                && core.position.elapsed(&self.program, now) >= self.program.chunk_duration;
            (core.current_time(&self.program, now), silent_done)
        };

        self.events.publish(Channel::TimeUpdate, time);
        if silent_done {
            self.handle_chunk_end(id);
            return false;
        }
        true
    }

    /// Natural completion of epoch `id`: advance, wrap, or end.
    pub(super) fn handle_chunk_end(self: &Arc<Self>, id: u64) {
        let (channel, time) = {
            let mut guard = self.core.lock().unwrap();
            let core = &mut *guard;

            match &core.live {
                Some(epoch) if epoch.id == id && !epoch.is_cancelled() => {}
                _ => {
                    debug!("ignoring completion of stale epoch {}", id);
                    return;
                }
            }
            core.stop_live();

            core.position.chunk_index += 1;
            core.position.chunk_offset = 0.0;
            let channel = if !core.position.is_ended(&self.program) {
                self.begin_epoch(core);
                Channel::ChunkChange
            } else if core.looping {
                info!("looping back to the start");
                core.position.chunk_index = 0;
                core.position.chunk_offset = 0.0;
                self.begin_epoch(core);
                Channel::ChunkChange
            } else {
                info!("playback ended");
                core.position.chunk_index = self.program.chunk_count;
                core.position.chunk_offset = 0.0;
                core.position.paused = true;
                core.state = PlayerState::Ended;
                Channel::Ended
            };

            (channel, core.current_time(&self.program, self.output.now()))
        };

        self.events.publish(channel, time);
    }
}
