//! Sound-card backend built on rodio.
//!
//! The default output stream is opened on a dedicated thread that keeps it
//! alive until the backend is dropped. A single long-lived [`MixBus`] source
//! is added to the stream's mixer; every chunk source is a voice on that bus
//! with an absolute start frame, and the output clock is the number of
//! frames the bus has rendered.

use log::{debug, warn};
use rodio::{OutputStreamBuilder, Source};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::audio::buffer::ChunkBuffer;
use crate::audio::output::{stereo_gains, AudioOutput, EndedCallback, SourceHandle, TrackNodes};
use crate::constants::{OUTPUT_STREAM_OPEN_RETRIES, OUTPUT_STREAM_OPEN_RETRY_MS};
use crate::error::PlayerError;

const OUTPUT_CHANNELS: u16 = 2;

/// Rate the bus renders at; rodio converts to the device rate.
pub const BUS_SAMPLE_RATE: u32 = 48_000;

/// Output backend playing through the default audio device.
pub struct RodioOutput {
    bus: Mutex<Option<mpsc::Sender<Voice>>>,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
    frames: Arc<AtomicU64>,
}

impl RodioOutput {
    /// Create the backend. No device is opened until [`AudioOutput::resume`].
    pub fn new() -> Self {
        Self {
            bus: Mutex::new(None),
            shutdown: Mutex::new(None),
            frames: Arc::new(AtomicU64::new(0)),
        }
    }

    fn open_stream(&self, bus: MixBus) -> Result<(), PlayerError> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("chunksync-output".to_string())
            .spawn(move || {
                let mut stream = None;
                for attempt in 1..=OUTPUT_STREAM_OPEN_RETRIES {
                    match OutputStreamBuilder::open_default_stream() {
                        Ok(s) => {
                            stream = Some(s);
                            break;
                        }
                        Err(err) => {
                            if attempt == OUTPUT_STREAM_OPEN_RETRIES {
                                let _ = ready_tx.send(Err(format!(
                                    "failed to open default output stream after {} attempts: {}",
                                    OUTPUT_STREAM_OPEN_RETRIES, err
                                )));
                                return;
                            }
                            warn!(
                                "open_default_stream attempt {}/{} failed: {}",
                                attempt, OUTPUT_STREAM_OPEN_RETRIES, err
                            );
                            thread::sleep(Duration::from_millis(OUTPUT_STREAM_OPEN_RETRY_MS));
                        }
                    }
                }

                let Some(stream) = stream else {
                    return;
                };
                stream.mixer().add(bus);
                if ready_tx.send(Ok(())).is_err() {
                    return;
                }

                // Hold the stream until the backend goes away.
                let _ = shutdown_rx.recv();
                drop(stream);
            })
            .map_err(|err| PlayerError::OutputUnavailable(err.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *self.shutdown.lock().unwrap() = Some(shutdown_tx);
                Ok(())
            }
            Ok(Err(err)) => Err(PlayerError::OutputUnavailable(err)),
            Err(_) => Err(PlayerError::OutputUnavailable(
                "output thread exited before opening a stream".to_string(),
            )),
        }
    }
}

impl Default for RodioOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.lock().unwrap().take() {
            let _ = shutdown.send(());
        }
    }
}

impl AudioOutput for RodioOutput {
    fn resume(&self) -> Result<(), PlayerError> {
        let mut bus = self.bus.lock().unwrap();
        if bus.is_none() {
            let (voices_tx, voices_rx) = mpsc::channel();
            self.open_stream(MixBus::new(voices_rx, self.frames.clone()))?;
            *bus = Some(voices_tx);
            debug!("default output stream opened at {} Hz", BUS_SAMPLE_RATE);
        }
        Ok(())
    }

    fn now(&self) -> f64 {
        frames_to_seconds(self.frames.load(Ordering::Acquire))
    }

    fn create_source(&self, buffer: ChunkBuffer, nodes: &TrackNodes) -> Box<dyn SourceHandle> {
        Box::new(RodioSource {
            bus: self.bus.lock().unwrap().clone(),
            pending: Some((buffer, nodes.clone())),
            stopped: Arc::new(AtomicBool::new(false)),
        })
    }
}

fn frames_to_seconds(frames: u64) -> f64 {
    frames as f64 / BUS_SAMPLE_RATE as f64
}

fn seconds_to_frame(seconds: f64) -> u64 {
    (seconds.max(0.0) * BUS_SAMPLE_RATE as f64).round() as u64
}

struct RodioSource {
    bus: Option<mpsc::Sender<Voice>>,
    pending: Option<(ChunkBuffer, TrackNodes)>,
    stopped: Arc<AtomicBool>,
}

impl SourceHandle for RodioSource {
    fn start(&mut self, when: f64, offset: f64, on_ended: Option<EndedCallback>) {
        let Some((buffer, nodes)) = self.pending.take() else {
            warn!("source started twice; ignoring");
            return;
        };
        let Some(bus) = self.bus.as_ref() else {
            warn!("source started before the output stream was opened");
            return;
        };

        let voice = Voice::new(buffer, nodes, when, offset, self.stopped.clone(), on_ended);
        if bus.send(voice).is_err() {
            warn!("output bus is gone; source dropped");
        }
    }

    fn stop(&mut self) {
        self.pending = None;
        self.stopped.store(true, Ordering::Relaxed);
    }
}

/// One chunk buffer scheduled on the bus.
struct Voice {
    buffer: ChunkBuffer,
    nodes: TrackNodes,
    start_frame: u64,
    /// Buffer position (in buffer frames) at `start_frame`.
    offset_frames: f64,
    stopped: Arc<AtomicBool>,
    on_ended: Option<EndedCallback>,
}

impl Voice {
    fn new(
        buffer: ChunkBuffer,
        nodes: TrackNodes,
        when: f64,
        offset: f64,
        stopped: Arc<AtomicBool>,
        on_ended: Option<EndedCallback>,
    ) -> Self {
        let offset_frames = offset.max(0.0) * buffer.sample_rate as f64;
        Self {
            buffer,
            nodes,
            start_frame: seconds_to_frame(when),
            offset_frames,
            stopped,
            on_ended,
        }
    }

    /// Buffer position for bus frame `frame`, or `None` before the start.
    ///
    /// Depends only on `frame`, so a voice registered after its start frame
    /// lines up with voices sharing the same start.
    fn position(&self, frame: u64) -> Option<f64> {
        let since_start = frame.checked_sub(self.start_frame)?;
        let step = self.buffer.sample_rate as f64 / BUS_SAMPLE_RATE as f64;
        Some(self.offset_frames + since_start as f64 * step)
    }

    /// Linearly interpolated stereo frame at `position`.
    fn frame_at(&self, position: f64) -> (f32, f32) {
        let index = position.floor() as usize;
        let fraction = (position - index as f64) as f32;
        let read = |channel: usize| {
            let a = self.buffer.sample(index, channel);
            if fraction == 0.0 || index + 1 >= self.buffer.frames() {
                return a;
            }
            let b = self.buffer.sample(index + 1, channel);
            a + (b - a) * fraction
        };
        (read(0), read(1))
    }
}

/// Stereo source mixing every scheduled voice into one stream.
///
/// Never ends; renders silence while no voice is due.
struct MixBus {
    voices: Vec<Voice>,
    incoming: mpsc::Receiver<Voice>,
    rendered: Arc<AtomicU64>,
    frame: u64,
    right: f32,
    channel: u16,
}

impl MixBus {
    fn new(incoming: mpsc::Receiver<Voice>, rendered: Arc<AtomicU64>) -> Self {
        let frame = rendered.load(Ordering::Acquire);
        Self {
            voices: Vec::new(),
            incoming,
            rendered,
            frame,
            right: 0.0,
            channel: 0,
        }
    }

    fn render_frame(&mut self) -> (f32, f32) {
        while let Ok(voice) = self.incoming.try_recv() {
            self.voices.push(voice);
        }

        let frame = self.frame;
        let mut left = 0.0;
        let mut right = 0.0;
        self.voices.retain_mut(|voice| {
            if voice.stopped.load(Ordering::Relaxed) {
                return false;
            }
            let Some(position) = voice.position(frame) else {
                return true;
            };
            if position >= voice.buffer.frames() as f64 {
                if let Some(on_ended) = voice.on_ended.take() {
                    // Completion handlers take the player lock; keep them off the audio thread.
                    thread::spawn(on_ended);
                }
                return false;
            }
            let (l, r) = voice.frame_at(position);
            let (gain_l, gain_r) = stereo_gains(voice.nodes.gain.get(), voice.nodes.pan.get());
            left += l * gain_l;
            right += r * gain_r;
            true
        });

        self.frame += 1;
        self.rendered.store(self.frame, Ordering::Release);
        (left, right)
    }
}

impl Iterator for MixBus {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.channel == 1 {
            self.channel = 0;
            return Some(self.right);
        }
        let (left, right) = self.render_frame();
        self.right = right;
        self.channel = 1;
        Some(left)
    }
}

impl Source for MixBus {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        OUTPUT_CHANNELS
    }

    fn sample_rate(&self) -> u32 {
        BUS_SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}
