//! Program description: user-facing config and its validated, immutable form.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{DEFAULT_CHUNK_DURATION, DEFAULT_SOURCE_PATTERN, DEFAULT_TIMEUPDATE_HZ};
use crate::error::PlayerError;
use crate::source::SourceResolver;

/// Construction configuration, loadable from JSON.
///
/// Missing fields take their defaults, so `{"track_count": 4, "chunk_count": 30}`
/// is a complete config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramConfig {
    pub track_count: usize,
    pub chunk_count: usize,
    /// Seconds per chunk.
    pub chunk_duration: f64,
    /// Base URL, or a pattern containing `{track}` / `{chunk}`.
    pub src: String,
    /// Initial position in seconds.
    pub current_time: f64,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub timeupdate_hz: f64,
    pub volume: f32,
    /// Initial per-track volumes, indexed by track.
    pub track_volumes: Vec<f32>,
    /// Initial per-track pans, indexed by track.
    pub track_pans: Vec<f32>,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            track_count: 1,
            chunk_count: 1,
            chunk_duration: DEFAULT_CHUNK_DURATION,
            src: DEFAULT_SOURCE_PATTERN.to_string(),
            current_time: 0.0,
            looping: false,
            timeupdate_hz: DEFAULT_TIMEUPDATE_HZ,
            volume: 1.0,
            track_volumes: Vec::new(),
            track_pans: Vec::new(),
        }
    }
}

impl ProgramConfig {
    /// Parse a config from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, PlayerError> {
        serde_json::from_str(json).map_err(|err| PlayerError::InvalidConfig(err.to_string()))
    }

    /// Read and parse a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PlayerError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            PlayerError::InvalidConfig(format!("failed to read {}: {}", path.display(), err))
        })?;
        Self::from_json_str(&json)
    }

    /// Pretty-printed JSON form.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Resolver described by `src`.
    pub fn resolver(&self) -> SourceResolver {
        SourceResolver::from(self.src.as_str())
    }

    /// Check invariants and produce the immutable [`Program`].
    pub fn validate(&self) -> Result<Program, PlayerError> {
        if self.track_count < 1 {
            return Err(PlayerError::InvalidConfig(
                "track_count must be at least 1".to_string(),
            ));
        }
        if self.chunk_count < 1 {
            return Err(PlayerError::InvalidConfig(
                "chunk_count must be at least 1".to_string(),
            ));
        }
        if !self.chunk_duration.is_finite() || self.chunk_duration <= 0.0 {
            return Err(PlayerError::InvalidConfig(format!(
                "chunk_duration must be a positive number of seconds, got {}",
                self.chunk_duration
            )));
        }
        if !self.timeupdate_hz.is_finite() || self.timeupdate_hz <= 0.0 {
            return Err(PlayerError::InvalidConfig(format!(
                "timeupdate_hz must be positive, got {}",
                self.timeupdate_hz
            )));
        }
        if self.track_volumes.len() > self.track_count || self.track_pans.len() > self.track_count
        {
            return Err(PlayerError::InvalidConfig(format!(
                "per-track settings exceed track_count {}",
                self.track_count
            )));
        }

        Ok(Program {
            track_count: self.track_count,
            chunk_count: self.chunk_count,
            chunk_duration: self.chunk_duration,
            looping: self.looping,
            timeupdate_hz: self.timeupdate_hz,
        })
    }
}

/// Validated session configuration. Fixed for the lifetime of a player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Program {
    pub track_count: usize,
    pub chunk_count: usize,
    pub chunk_duration: f64,
    /// Loop flag at construction; the player keeps its own runtime copy.
    pub looping: bool,
    pub timeupdate_hz: f64,
}

impl Program {
    /// Total program length in seconds.
    pub fn duration(&self) -> f64 {
        self.chunk_count as f64 * self.chunk_duration
    }

    /// Period of the `timeupdate` ticker.
    pub fn timeupdate_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.timeupdate_hz)
    }

    /// Split an absolute time into `(chunk_index, offset_within_chunk)`.
    ///
    /// The offset is taken as `time - chunk_index * chunk_duration` so that
    /// recombining the pair reproduces `time` exactly.
    pub fn locate(&self, time: f64) -> (usize, f64) {
        let time = time.max(0.0);
        let mut chunk = (time / self.chunk_duration).floor() as usize;
        let mut offset = time - chunk as f64 * self.chunk_duration;
        if offset < 0.0 && chunk > 0 {
            chunk -= 1;
            offset = time - chunk as f64 * self.chunk_duration;
        }
        (chunk, offset.max(0.0))
    }
}
