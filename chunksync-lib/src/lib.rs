//! # Chunksync Library
//!
//! Synchronized playback of multi-track audio programs whose content is split,
//! per track, into fixed-duration chunks that are fetched and decoded on demand.
//! It includes the playback scheduler, the per-track chunk cache, mixer state,
//! event delivery, and concrete output/fetch backends.

pub mod audio;
pub mod cache;
pub mod constants;
pub mod error;
pub mod events;
pub mod fetch;
pub mod mixer;
pub mod playback;
pub mod program;
pub mod source;

pub use audio::buffer::ChunkBuffer;
pub use audio::offline::OfflineOutput;
pub use audio::output::{AudioOutput, AudioParam, EndedCallback, SourceHandle, TrackNodes};
pub use audio::rodio_output::RodioOutput;
pub use error::{FetchError, PlayerError};
pub use events::{Channel, SubscriptionId};
pub use fetch::{ChunkFetcher, DecodingFetcher};
pub use playback::{Player, PlayerState};
pub use program::{Program, ProgramConfig};
pub use source::SourceResolver;
