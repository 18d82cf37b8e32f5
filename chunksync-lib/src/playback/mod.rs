//! Synchronized multi-track playback.

mod epoch;
mod player;
mod position;
mod ticker;

pub use player::{Player, PlayerState};
pub use position::PlaybackPosition;
