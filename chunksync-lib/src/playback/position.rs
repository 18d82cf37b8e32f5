//! Time accounting for the externally visible `currentTime`.

use crate::program::Program;

/// Where playback is, and how to reconstruct the offset while playing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackPosition {
    /// `0..=chunk_count`; `chunk_count` marks the end of the program.
    pub chunk_index: usize,
    /// Offset inside the chunk while paused, or the pending start offset of
    /// an epoch whose sources have not started yet.
    pub chunk_offset: f64,
    pub paused: bool,
    /// Output-clock instant corresponding to offset zero of the current
    /// chunk. Only set once an epoch's sources are running.
    pub start_reference: Option<f64>,
}

impl PlaybackPosition {
    pub fn new(chunk_index: usize, chunk_offset: f64) -> Self {
        Self {
            chunk_index,
            chunk_offset,
            paused: true,
            start_reference: None,
        }
    }

    /// Seconds into the current chunk, clamped to `0.0..=chunk_duration`.
    pub fn elapsed(&self, program: &Program, now: f64) -> f64 {
        match self.start_reference {
            Some(reference) if !self.paused => (now - reference).clamp(0.0, program.chunk_duration),
            _ => self.chunk_offset,
        }
    }

    /// Absolute program time in seconds.
    pub fn current_time(&self, program: &Program, now: f64) -> f64 {
        self.chunk_index as f64 * program.chunk_duration + self.elapsed(program, now)
    }

    pub fn is_ended(&self, program: &Program) -> bool {
        self.chunk_index >= program.chunk_count
    }
}

#[cfg(test)]
mod tests {
    use super::PlaybackPosition;
    use crate::program::ProgramConfig;

    fn program() -> crate::program::Program {
        ProgramConfig {
            track_count: 2,
            chunk_count: 3,
            chunk_duration: 10.0,
            ..ProgramConfig::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn paused_position_reports_stored_offset() {
        let program = program();
        let mut position = PlaybackPosition::new(1, 2.5);
        position.start_reference = Some(100.0);
        assert_eq!(position.current_time(&program, 500.0), 12.5);
    }

    #[test]
    fn playing_position_follows_the_clock() {
        let program = program();
        let mut position = PlaybackPosition::new(2, 0.0);
        position.paused = false;
        position.start_reference = Some(40.0);
        assert_eq!(position.current_time(&program, 43.0), 23.0);
        assert_eq!(position.current_time(&program, 80.0), 30.0);
        assert_eq!(position.current_time(&program, 10.0), 20.0);
    }

    #[test]
    fn pending_epoch_reports_its_start_offset() {
        let program = program();
        let mut position = PlaybackPosition::new(0, 4.0);
        position.paused = false;
        assert_eq!(position.current_time(&program, 99.0), 4.0);
        assert!(!position.is_ended(&program));
        assert!(PlaybackPosition::new(3, 0.0).is_ended(&program));
    }
}
