//! Deterministic output backend driven by a manually advanced clock.
//!
//! Nothing is rendered; the backend tracks scheduled voices and raises their
//! completion callbacks when [`OfflineOutput::advance`] moves the clock past
//! each voice's end. Used for headless runs and tests.

use std::sync::{Arc, Mutex};

use crate::audio::buffer::ChunkBuffer;
use crate::audio::output::{AudioOutput, EndedCallback, SourceHandle, TrackNodes};
use crate::error::PlayerError;

const END_EPSILON: f64 = 1e-9;

/// Snapshot of a started, still-active voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSnapshot {
    pub id: u64,
    pub start_at: f64,
    pub offset: f64,
    pub duration: f64,
    pub gain: f32,
    pub pan: f32,
}

struct Voice {
    id: u64,
    duration: f64,
    nodes: TrackNodes,
    start_at: Option<f64>,
    offset: f64,
    on_ended: Option<EndedCallback>,
}

impl Voice {
    fn end_time(&self) -> Option<f64> {
        self.start_at
            .map(|start| start + (self.duration - self.offset).max(0.0))
    }
}

#[derive(Default)]
struct OfflineState {
    clock: f64,
    resumed: bool,
    resume_failure: Option<String>,
    voices: Vec<Voice>,
    voices_created: u64,
}

/// Output backend with a virtual clock.
#[derive(Clone, Default)]
pub struct OfflineOutput {
    state: Arc<Mutex<OfflineState>>,
}

impl OfflineOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `resume` calls fail with the given reason (or succeed
    /// again with `None`).
    pub fn fail_resume(&self, reason: Option<&str>) {
        self.state.lock().unwrap().resume_failure = reason.map(str::to_string);
    }

    /// Return true once `resume` has succeeded.
    pub fn is_resumed(&self) -> bool {
        self.state.lock().unwrap().resumed
    }

    /// Move the clock forward and raise completion for every voice that ended.
    ///
    /// Callbacks run on the calling thread, in end-time order, after the
    /// backend's own lock has been released.
    pub fn advance(&self, seconds: f64) {
        let mut finished = {
            let mut state = self.state.lock().unwrap();
            state.clock += seconds.max(0.0);
            let clock = state.clock;

            let mut finished = Vec::new();
            state.voices.retain_mut(|voice| match voice.end_time() {
                Some(end) if end <= clock + END_EPSILON => {
                    finished.push((end, voice.on_ended.take()));
                    false
                }
                _ => true,
            });
            finished
        };

        finished.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (_, callback) in finished {
            if let Some(callback) = callback {
                callback();
            }
        }
    }

    /// Started voices that have neither ended nor been stopped.
    pub fn active_voices(&self) -> Vec<VoiceSnapshot> {
        let state = self.state.lock().unwrap();
        state
            .voices
            .iter()
            .filter_map(|voice| {
                voice.start_at.map(|start_at| VoiceSnapshot {
                    id: voice.id,
                    start_at,
                    offset: voice.offset,
                    duration: voice.duration,
                    gain: voice.nodes.gain.get(),
                    pan: voice.nodes.pan.get(),
                })
            })
            .collect()
    }

    /// Total sources created since construction.
    pub fn voices_created(&self) -> u64 {
        self.state.lock().unwrap().voices_created
    }
}

impl AudioOutput for OfflineOutput {
    fn resume(&self) -> Result<(), PlayerError> {
        let mut state = self.state.lock().unwrap();
        if let Some(reason) = state.resume_failure.clone() {
            return Err(PlayerError::OutputUnavailable(reason));
        }
        state.resumed = true;
        Ok(())
    }

    fn now(&self) -> f64 {
        self.state.lock().unwrap().clock
    }

    fn create_source(&self, buffer: ChunkBuffer, nodes: &TrackNodes) -> Box<dyn SourceHandle> {
        let mut state = self.state.lock().unwrap();
        state.voices_created += 1;
        let id = state.voices_created;
        state.voices.push(Voice {
            id,
            duration: buffer.duration(),
            nodes: nodes.clone(),
            start_at: None,
            offset: 0.0,
            on_ended: None,
        });

        Box::new(OfflineSource {
            id,
            state: self.state.clone(),
        })
    }
}

struct OfflineSource {
    id: u64,
    state: Arc<Mutex<OfflineState>>,
}

impl SourceHandle for OfflineSource {
    fn start(&mut self, when: f64, offset: f64, on_ended: Option<EndedCallback>) {
        let mut state = self.state.lock().unwrap();
        if let Some(voice) = state.voices.iter_mut().find(|voice| voice.id == self.id) {
            voice.start_at = Some(when);
            voice.offset = offset.max(0.0);
            voice.on_ended = on_ended;
        }
    }

    fn stop(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.voices.retain(|voice| voice.id != self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::OfflineOutput;
    use crate::audio::buffer::ChunkBuffer;
    use crate::audio::output::{AudioOutput, TrackNodes};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn completion_fires_once_clock_passes_the_end() {
        let output = OfflineOutput::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let mut source = output.create_source(ChunkBuffer::silence(100, 1, 2.0), &TrackNodes::new());
        source.start(
            output.now(),
            0.5,
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );

        output.advance(1.0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(output.active_voices().len(), 1);

        output.advance(0.5);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(output.active_voices().is_empty());

        output.advance(5.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stopped_sources_never_complete() {
        let output = OfflineOutput::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let mut source = output.create_source(ChunkBuffer::silence(100, 1, 1.0), &TrackNodes::new());
        source.start(
            0.0,
            0.0,
            Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );
        source.stop();
        output.advance(2.0);

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(output.voices_created(), 1);
    }

    #[test]
    fn resume_failure_is_reported() {
        let output = OfflineOutput::new();
        output.fail_resume(Some("no device"));
        assert!(output.resume().is_err());
        assert!(!output.is_resumed());

        output.fail_resume(None);
        assert!(output.resume().is_ok());
        assert!(output.is_resumed());
    }
}
