//! Decoded chunk sample storage.

use std::sync::Arc;

/// Decoded, interleaved `f32` samples for one (track, chunk) pair.
///
/// Sample data is shared, so cloning a buffer is cheap.
#[derive(Debug, Clone)]
pub struct ChunkBuffer {
    pub sample_rate: u32,
    pub channels: u16,
    samples: Arc<Vec<f32>>,
}

impl ChunkBuffer {
    /// Wrap interleaved samples.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Frames per second (clamped to at least 1).
    /// * `channels` - Interleaved channel count (clamped to at least 1).
    /// * `samples` - Interleaved sample data.
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
            samples: Arc::new(samples),
        }
    }

    /// Create a silent buffer of the given length in seconds.
    pub fn silence(sample_rate: u32, channels: u16, seconds: f64) -> Self {
        let frames = (seconds.max(0.0) * sample_rate as f64).round() as usize;
        Self::new(
            sample_rate,
            channels,
            vec![0.0; frames * channels.max(1) as usize],
        )
    }

    /// Borrow the interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Read one sample. Channels past the last one repeat the last channel;
    /// frames past the end read as silence.
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        let channel = channel.min(channels - 1);
        self.samples
            .get(frame * channels + channel)
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::ChunkBuffer;

    #[test]
    fn duration_counts_frames_not_samples() {
        let buffer = ChunkBuffer::new(4, 2, vec![0.0; 16]);
        assert_eq!(buffer.frames(), 8);
        assert!((buffer.duration() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn mono_buffers_repeat_into_extra_channels() {
        let buffer = ChunkBuffer::new(10, 1, vec![0.1, 0.2, 0.3]);
        assert_eq!(buffer.sample(1, 0), 0.2);
        assert_eq!(buffer.sample(1, 1), 0.2);
        assert_eq!(buffer.sample(7, 0), 0.0);
    }

    #[test]
    fn silence_matches_requested_length() {
        let buffer = ChunkBuffer::silence(100, 2, 1.5);
        assert_eq!(buffer.frames(), 150);
        assert!(buffer.samples().iter().all(|s| *s == 0.0));
    }
}
