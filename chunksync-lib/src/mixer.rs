//! Per-track volume and pan.
//!
//! Every track carries shadow values from construction. The first chunk load
//! for a track materializes its output nodes and copies the shadow values
//! into them; afterwards every write updates both.

use log::debug;

use crate::audio::output::{AudioOutput, TrackNodes};
use crate::error::PlayerError;

/// Mixer slot for a single track.
#[derive(Debug, Clone)]
pub struct TrackMix {
    pub volume: f32,
    pub pan: f32,
    nodes: Option<TrackNodes>,
}

impl TrackMix {
    fn new() -> Self {
        Self {
            volume: 1.0,
            pan: 0.0,
            nodes: None,
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.nodes.is_some()
    }
}

/// Global volume plus one [`TrackMix`] per track, indexed by track id.
#[derive(Debug, Clone)]
pub struct MixerState {
    volume: f32,
    tracks: Vec<TrackMix>,
}

impl MixerState {
    pub fn new(track_count: usize, volume: f32) -> Self {
        Self {
            volume: clamp_volume(volume),
            tracks: (0..track_count).map(|_| TrackMix::new()).collect(),
        }
    }

    /// Global volume scalar.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the global volume and recompute every materialized track's gain.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_volume(volume);
        for track in &self.tracks {
            if let Some(nodes) = &track.nodes {
                nodes.gain.set(track.volume * self.volume);
            }
        }
    }

    /// Set one track's volume.
    ///
    /// # Arguments
    ///
    /// * `track_index` - Track to update.
    /// * `volume` - Linear volume, clamped to `0.0..=1.0`.
    pub fn set_track_volume(&mut self, track_index: usize, volume: f32) -> Result<(), PlayerError> {
        let global = self.volume;
        let track = self.track_mut(track_index)?;
        track.volume = clamp_volume(volume);
        if let Some(nodes) = &track.nodes {
            nodes.gain.set(track.volume * global);
        }
        Ok(())
    }

    /// Set one track's stereo pan, clamped to `-1.0..=1.0`.
    pub fn set_track_pan(&mut self, track_index: usize, pan: f32) -> Result<(), PlayerError> {
        let track = self.track_mut(track_index)?;
        track.pan = clamp_pan(pan);
        if let Some(nodes) = &track.nodes {
            nodes.pan.set(track.pan);
        }
        Ok(())
    }

    pub fn track(&self, track_index: usize) -> Option<&TrackMix> {
        self.tracks.get(track_index)
    }

    pub fn is_materialized(&self, track_index: usize) -> bool {
        self.tracks
            .get(track_index)
            .map(TrackMix::is_materialized)
            .unwrap_or(false)
    }

    /// Create a track's output nodes if it has none yet, seeding them from
    /// the shadow values. Returns `true` when nodes were created.
    pub fn materialize(&mut self, track_index: usize, output: &dyn AudioOutput) -> bool {
        let global = self.volume;
        let Some(track) = self.tracks.get_mut(track_index) else {
            return false;
        };
        if track.nodes.is_some() {
            return false;
        }

        let nodes = output.create_track_nodes();
        nodes.gain.set(track.volume * global);
        nodes.pan.set(track.pan);
        track.nodes = Some(nodes);
        debug!(
            "materialized track {} (volume {:.2}, pan {:.2})",
            track_index, track.volume, track.pan
        );
        true
    }

    /// Output nodes of a materialized track.
    pub fn nodes(&self, track_index: usize) -> Option<&TrackNodes> {
        self.tracks.get(track_index)?.nodes.as_ref()
    }

    /// Gain currently applied by a materialized track's gain node.
    pub fn effective_gain(&self, track_index: usize) -> Option<f32> {
        self.nodes(track_index).map(|nodes| nodes.gain.get())
    }

    /// Pan currently applied by a materialized track's pan node.
    pub fn effective_pan(&self, track_index: usize) -> Option<f32> {
        self.nodes(track_index).map(|nodes| nodes.pan.get())
    }

    fn track_mut(&mut self, track_index: usize) -> Result<&mut TrackMix, PlayerError> {
        let track_count = self.tracks.len();
        self.tracks
            .get_mut(track_index)
            .ok_or(PlayerError::InvalidTrackIndex {
                index: track_index,
                track_count,
            })
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0)
}

fn clamp_pan(pan: f32) -> f32 {
    if pan.is_nan() {
        return 0.0;
    }
    pan.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::MixerState;
    use crate::audio::offline::OfflineOutput;
    use crate::error::PlayerError;

    #[test]
    fn shadow_values_are_applied_on_materialization() {
        let output = OfflineOutput::new();
        let mut mixer = MixerState::new(2, 0.5);
        mixer.set_track_volume(1, 0.6).unwrap();
        mixer.set_track_pan(1, -0.25).unwrap();
        assert_eq!(mixer.effective_gain(1), None);

        assert!(mixer.materialize(1, &output));
        assert!(!mixer.materialize(1, &output));
        assert!((mixer.effective_gain(1).unwrap() - 0.3).abs() < 1e-6);
        assert_eq!(mixer.effective_pan(1), Some(-0.25));
        assert!(!mixer.is_materialized(0));
    }

    #[test]
    fn global_volume_scales_materialized_tracks() {
        let output = OfflineOutput::new();
        let mut mixer = MixerState::new(3, 1.0);
        for track in 0..3 {
            mixer.materialize(track, &output);
        }

        mixer.set_volume(0.5);
        mixer.set_track_volume(0, 0.8).unwrap();

        assert!((mixer.effective_gain(0).unwrap() - 0.4).abs() < 1e-6);
        assert!((mixer.effective_gain(1).unwrap() - 0.5).abs() < 1e-6);
        assert!((mixer.effective_gain(2).unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_track_is_rejected() {
        let mut mixer = MixerState::new(2, 1.0);
        assert_eq!(
            mixer.set_track_volume(2, 0.5),
            Err(PlayerError::InvalidTrackIndex {
                index: 2,
                track_count: 2
            })
        );
        assert!(mixer.set_track_pan(9, 0.0).is_err());
    }

    #[test]
    fn values_are_clamped() {
        let mut mixer = MixerState::new(1, 4.0);
        assert_eq!(mixer.volume(), 1.0);
        mixer.set_track_pan(0, -3.0).unwrap();
        assert_eq!(mixer.track(0).unwrap().pan, -1.0);
        mixer.set_volume(f32::NAN);
        assert_eq!(mixer.volume(), 0.0);
    }
}
