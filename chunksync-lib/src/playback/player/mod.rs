//! High-level playback controller.
//!
//! `Player` is a cheap handle over shared state. Every transition happens
//! under one core lock; work that blocks (fetches, waiting for a chunk's
//! buffers, output resume) runs outside it and re-validates the epoch id and
//! seek generation before touching shared state again.

mod controls;
mod scheduler;

use std::sync::{Arc, Mutex};

use crate::audio::output::AudioOutput;
use crate::cache::{ChunkCache, FetchOrchestrator};
use crate::error::PlayerError;
use crate::events::EventBus;
use crate::fetch::ChunkFetcher;
use crate::mixer::MixerState;
use crate::playback::epoch::Epoch;
use crate::playback::position::PlaybackPosition;
use crate::program::{Program, ProgramConfig};
use crate::source::SourceResolver;

/// Transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Paused with no live epoch.
    Idle,
    /// Exactly one live epoch.
    Playing,
    /// Paused at the end of the program until a seek.
    Ended,
}

/// Mutable playback state guarded by [`Shared::core`].
struct Core {
    position: PlaybackPosition,
    state: PlayerState,
    mixer: MixerState,
    cache: ChunkCache,
    live: Option<Epoch>,
    next_epoch_id: u64,
    seek_generation: u64,
    looping: bool,
}

struct Shared {
    program: Program,
    core: Mutex<Core>,
    output: Arc<dyn AudioOutput>,
    loader: FetchOrchestrator,
    events: EventBus,
}

/// Multi-track chunked player.
///
/// Clones share the same session.
#[derive(Clone)]
pub struct Player {
    shared: Arc<Shared>,
}

impl Player {
    /// Create a player whose chunk URLs come from `config.src`.
    ///
    /// # Arguments
    ///
    /// * `config` - Program description and initial mixer/position settings.
    /// * `output` - Audio output backend.
    /// * `fetcher` - Fetches and decodes a chunk URL.
    pub fn new(
        config: ProgramConfig,
        output: Arc<dyn AudioOutput>,
        fetcher: Arc<dyn ChunkFetcher>,
    ) -> Result<Self, PlayerError> {
        let resolver = config.resolver();
        Self::with_resolver(config, resolver, output, fetcher)
    }

    /// Create a player with an explicit source resolver, ignoring `config.src`.
    pub fn with_resolver(
        config: ProgramConfig,
        resolver: SourceResolver,
        output: Arc<dyn AudioOutput>,
        fetcher: Arc<dyn ChunkFetcher>,
    ) -> Result<Self, PlayerError> {
        let program = config.validate()?;
        if !config.current_time.is_finite() {
            return Err(PlayerError::InvalidConfig(format!(
                "current_time must be finite, got {}",
                config.current_time
            )));
        }

        let mut mixer = MixerState::new(program.track_count, config.volume);
        for (track_index, volume) in config.track_volumes.iter().enumerate() {
            mixer.set_track_volume(track_index, *volume)?;
        }
        for (track_index, pan) in config.track_pans.iter().enumerate() {
            mixer.set_track_pan(track_index, *pan)?;
        }

        let mut core = Core {
            position: PlaybackPosition::new(0, 0.0),
            state: PlayerState::Idle,
            mixer,
            cache: ChunkCache::new(program.track_count),
            live: None,
            next_epoch_id: 0,
            seek_generation: 0,
            looping: program.looping,
        };
        core.move_to(&program, config.current_time);

        let loader = FetchOrchestrator::new(program, resolver, fetcher, output.clone());
        Ok(Self {
            shared: Arc::new(Shared {
                program,
                core: Mutex::new(core),
                output,
                loader,
                events: EventBus::new(),
            }),
        })
    }
}

impl Core {
    /// Point the position at `time`, clamped to the program. The end of the
    /// program is represented as `(chunk_count, 0)` and the Ended state.
    fn move_to(&mut self, program: &Program, time: f64) {
        let time = time.clamp(0.0, program.duration());
        if time >= program.duration() {
            self.position.chunk_index = program.chunk_count;
            self.position.chunk_offset = 0.0;
            self.state = PlayerState::Ended;
        } else {
            let (chunk_index, chunk_offset) = program.locate(time);
            self.position.chunk_index = chunk_index;
            self.position.chunk_offset = chunk_offset;
            if self.state == PlayerState::Ended {
                self.state = PlayerState::Idle;
            }
        }
        self.position.start_reference = None;
    }

    fn current_time(&self, program: &Program, now: f64) -> f64 {
        self.position.current_time(program, now)
    }

    /// Release the live epoch, if any.
    fn stop_live(&mut self) {
        if let Some(mut epoch) = self.live.take() {
            epoch.release();
        }
        self.position.start_reference = None;
    }
}
