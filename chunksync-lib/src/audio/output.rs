//! Contract between the playback scheduler and an audio output backend.
//!
//! A backend provides a monotonic clock, per-track gain/pan nodes, and
//! one-shot sources that start at an absolute clock instant.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::audio::buffer::ChunkBuffer;
use crate::error::PlayerError;

/// Callback raised once when a source plays to the end of its buffer.
pub type EndedCallback = Box<dyn FnOnce() + Send + 'static>;

/// `f32` parameter shared between the control side and the audio thread.
#[derive(Debug, Clone)]
pub struct AudioParam {
    bits: Arc<AtomicU32>,
}

impl AudioParam {
    pub fn new(value: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(value.to_bits())),
        }
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Gain and stereo-pan nodes owned by one track.
#[derive(Debug, Clone)]
pub struct TrackNodes {
    pub gain: AudioParam,
    pub pan: AudioParam,
}

impl TrackNodes {
    pub fn new() -> Self {
        Self {
            gain: AudioParam::new(1.0),
            pan: AudioParam::new(0.0),
        }
    }
}

impl Default for TrackNodes {
    fn default() -> Self {
        Self::new()
    }
}

/// A one-shot playback node for a single chunk buffer.
pub trait SourceHandle: Send {
    /// Schedule playback.
    ///
    /// # Arguments
    ///
    /// * `when` - Output-clock instant (seconds) at which playback begins.
    /// * `offset` - Position inside the buffer (seconds) to start from.
    /// * `on_ended` - Raised once if the buffer plays to its end.
    fn start(&mut self, when: f64, offset: f64, on_ended: Option<EndedCallback>);

    /// Stop playback and disconnect. A stopped source never raises completion.
    fn stop(&mut self);
}

/// Audio output subsystem used by the player.
pub trait AudioOutput: Send + Sync {
    /// Make the output ready to produce sound.
    fn resume(&self) -> Result<(), PlayerError>;

    /// Monotonic output clock in seconds.
    fn now(&self) -> f64;

    /// Create the gain and pan nodes for one track.
    fn create_track_nodes(&self) -> TrackNodes {
        TrackNodes::new()
    }

    /// Create a source for `buffer` routed through `nodes` to the destination.
    fn create_source(&self, buffer: ChunkBuffer, nodes: &TrackNodes) -> Box<dyn SourceHandle>;
}

/// Left/right gains for a stereo destination.
///
/// Pan follows a linear balance law: the opposite side is attenuated while
/// the panned-to side stays at `level`.
pub(crate) fn stereo_gains(level: f32, pan: f32) -> (f32, f32) {
    let level = level.max(0.0);
    let pan = pan.clamp(-1.0, 1.0);
    let left = if pan > 0.0 { 1.0 - pan } else { 1.0 };
    let right = if pan < 0.0 { 1.0 + pan } else { 1.0 };
    (level * left, level * right)
}
