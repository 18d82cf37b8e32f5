//! Transport, seek, mixer, and event operations for `Player`.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::error::PlayerError;
use crate::events::{Channel, SubscriptionId};
use crate::program::Program;

use super::{Player, PlayerState};

impl Player {
    /// Start playback from the current position.
    ///
    /// No-op while already playing or once the program has ended. Fails with
    /// [`PlayerError::OutputUnavailable`] if the output cannot be resumed, in
    /// which case the player stays idle.
    pub fn play(&self) -> Result<(), PlayerError> {
        if self.state() != PlayerState::Idle {
            return Ok(());
        }

        if let Err(err) = self.shared.output.resume() {
            error!("failed to resume audio output: {}", err);
            return Err(err);
        }

        let time = {
            let mut guard = self.shared.core.lock().unwrap();
            let core = &mut *guard;
            if core.state != PlayerState::Idle {
                return Ok(());
            }
            core.state = PlayerState::Playing;
            core.position.paused = false;
            self.shared.begin_epoch(core);
            core.current_time(&self.shared.program, self.shared.output.now())
        };

        info!("playing from {:.3}s", time);
        self.shared.events.publish(Channel::Play, time);
        Ok(())
    }

    /// Pause playback, keeping the offset reached inside the current chunk.
    ///
    /// No-op unless playing.
    pub fn pause(&self) {
        let time = {
            let mut guard = self.shared.core.lock().unwrap();
            let core = &mut *guard;
            if core.state != PlayerState::Playing {
                return;
            }
            let now = self.shared.output.now();
            core.position.chunk_offset = core.position.elapsed(&self.shared.program, now);
            core.stop_live();
            core.position.paused = true;
            core.state = PlayerState::Idle;
            core.current_time(&self.shared.program, now)
        };

        info!("paused at {:.3}s", time);
        self.shared.events.publish(Channel::Pause, time);
    }

    /// Current program time in seconds.
    pub fn current_time(&self) -> f64 {
        let core = self.shared.core.lock().unwrap();
        core.current_time(&self.shared.program, self.shared.output.now())
    }

    /// Seek to `time` seconds.
    ///
    /// The target is clamped to `0.0..=duration()` and is readable through
    /// [`Player::current_time`] immediately. While playing, the live epoch is
    /// replaced by one starting at the target; a later seek supersedes any
    /// epoch an earlier seek is still loading. Seeking to the very end moves
    /// the player to [`PlayerState::Ended`].
    ///
    /// # Arguments
    ///
    /// * `time` - Target in seconds; must be finite.
    pub fn set_current_time(&self, time: f64) -> Result<(), PlayerError> {
        if !time.is_finite() {
            return Err(PlayerError::InvalidSeek(time));
        }

        let ended_at = {
            let mut guard = self.shared.core.lock().unwrap();
            let core = &mut *guard;
            let program = &self.shared.program;
            core.seek_generation += 1;

            let was_playing = core.state == PlayerState::Playing;
            if was_playing {
                core.stop_live();
            }
            core.move_to(program, time);
            info!(
                "seek to {:.3}s (chunk {}, offset {:.3}s)",
                core.position.chunk_index as f64 * program.chunk_duration
                    + core.position.chunk_offset,
                core.position.chunk_index,
                core.position.chunk_offset
            );

            if core.state == PlayerState::Ended {
                core.position.paused = true;
                was_playing.then(|| program.duration())
            } else {
                if was_playing {
                    core.state = PlayerState::Playing;
                    self.shared.begin_epoch(core);
                }
                None
            }
        };

        if let Some(time) = ended_at {
            self.shared.events.publish(Channel::Ended, time);
        }
        Ok(())
    }

    /// Global volume (0.0..=1.0).
    pub fn volume(&self) -> f32 {
        self.shared.core.lock().unwrap().mixer.volume()
    }

    /// Set the global volume; values are clamped to `0.0..=1.0`.
    pub fn set_volume(&self, volume: f32) {
        self.shared.core.lock().unwrap().mixer.set_volume(volume);
    }

    /// Set one track's volume.
    ///
    /// # Arguments
    ///
    /// * `track_index` - Track in `0..track_count`.
    /// * `volume` - Linear volume, clamped to `0.0..=1.0`.
    pub fn set_track_volume(&self, track_index: usize, volume: f32) -> Result<(), PlayerError> {
        self.shared
            .core
            .lock()
            .unwrap()
            .mixer
            .set_track_volume(track_index, volume)
    }

    /// Set one track's pan, clamped to `-1.0..=1.0`.
    pub fn set_track_pan(&self, track_index: usize, pan: f32) -> Result<(), PlayerError> {
        self.shared
            .core
            .lock()
            .unwrap()
            .mixer
            .set_track_pan(track_index, pan)
    }

    /// Configured volume of a track, whether or not it has loaded audio yet.
    pub fn track_volume(&self, track_index: usize) -> Option<f32> {
        let core = self.shared.core.lock().unwrap();
        core.mixer.track(track_index).map(|track| track.volume)
    }

    /// Gain applied by a track's output node; `None` until the track loads.
    pub fn effective_gain(&self, track_index: usize) -> Option<f32> {
        self.shared
            .core
            .lock()
            .unwrap()
            .mixer
            .effective_gain(track_index)
    }

    /// Pan applied by a track's output node; `None` until the track loads.
    pub fn track_pan(&self, track_index: usize) -> Option<f32> {
        self.shared
            .core
            .lock()
            .unwrap()
            .mixer
            .effective_pan(track_index)
    }

    /// Subscribe to a named channel (`play`, `pause`, `ended`, `timeupdate`,
    /// `chunkchange`). The handler receives the current time.
    pub fn add_event<F>(&self, name: &str, handler: F) -> Result<SubscriptionId, PlayerError>
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let channel: Channel = name.parse()?;
        Ok(self.subscribe(channel, handler))
    }

    /// Remove a subscription made with [`Player::add_event`].
    ///
    /// Returns `Ok(false)` when the subscription was not registered.
    pub fn remove_event(&self, name: &str, id: SubscriptionId) -> Result<bool, PlayerError> {
        let channel: Channel = name.parse()?;
        Ok(self.shared.events.unsubscribe(channel, id))
    }

    /// Subscribe to a channel.
    pub fn subscribe<F>(&self, channel: Channel, handler: F) -> SubscriptionId
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.shared.events.subscribe(channel, Arc::new(handler))
    }

    pub fn unsubscribe(&self, channel: Channel, id: SubscriptionId) -> bool {
        self.shared.events.unsubscribe(channel, id)
    }

    pub fn state(&self) -> PlayerState {
        self.shared.core.lock().unwrap().state
    }

    /// Return true unless playing.
    pub fn is_paused(&self) -> bool {
        self.state() != PlayerState::Playing
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlayerState::Playing
    }

    pub fn is_ended(&self) -> bool {
        self.state() == PlayerState::Ended
    }

    /// Index of the current chunk; equals the chunk count once ended.
    pub fn current_chunk(&self) -> usize {
        self.shared.core.lock().unwrap().position.chunk_index
    }

    /// Program length in seconds.
    pub fn duration(&self) -> f64 {
        self.shared.program.duration()
    }

    pub fn program(&self) -> Program {
        self.shared.program
    }

    pub fn is_looping(&self) -> bool {
        self.shared.core.lock().unwrap().looping
    }

    /// Change whether playback wraps to the start at the end.
    pub fn set_loop(&self, looping: bool) {
        self.shared.core.lock().unwrap().looping = looping;
    }

    /// True when every track has requested `chunk_index`, resolved or not.
    pub fn is_chunk_loaded(&self, chunk_index: usize) -> bool {
        self.shared
            .core
            .lock()
            .unwrap()
            .cache
            .is_chunk_loaded(chunk_index)
    }

    /// True when every track holds a decoded buffer for `chunk_index`.
    pub fn is_chunk_ready(&self, chunk_index: usize) -> bool {
        self.shared
            .core
            .lock()
            .unwrap()
            .cache
            .is_chunk_ready(chunk_index)
    }

    /// Chunk indices currently cached for a track, ascending.
    pub fn cached_chunks(&self, track_index: usize) -> Vec<usize> {
        self.shared.core.lock().unwrap().cache.chunks(track_index)
    }

    /// Fetches issued since construction.
    pub fn fetch_requests(&self) -> u64 {
        self.shared.loader.requests_issued()
    }

    /// Wait until the live epoch has started its sources.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum wait before returning `false`.
    ///
    /// # Returns
    ///
    /// `true` once sources are running, `false` on timeout or when playback
    /// stops while waiting.
    pub fn wait_for_audio(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            {
                let core = self.shared.core.lock().unwrap();
                if core.state != PlayerState::Playing {
                    return false;
                }
                if core.live.as_ref().map(|epoch| epoch.is_started()).unwrap_or(false) {
                    return true;
                }
            }
            if start.elapsed() >= timeout {
                warn!("timed out waiting for chunk buffers");
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}
