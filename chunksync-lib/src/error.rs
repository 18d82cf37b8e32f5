//! Error types surfaced by the player and its fetch collaborators.

use std::fmt::{Display, Formatter};

/// Error type for player construction and transport operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerError {
    OutputUnavailable(String),
    InvalidTrackIndex { index: usize, track_count: usize },
    InvalidConfig(String),
    InvalidSeek(f64),
    UnknownEvent(String),
}

impl Display for PlayerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutputUnavailable(err) => write!(f, "audio output unavailable: {}", err),
            Self::InvalidTrackIndex { index, track_count } => write!(
                f,
                "invalid track index {} (program has {} tracks)",
                index, track_count
            ),
            Self::InvalidConfig(err) => write!(f, "invalid program config: {}", err),
            Self::InvalidSeek(value) => write!(f, "invalid seek target: {}", value),
            Self::UnknownEvent(name) => write!(f, "unknown event channel: {}", name),
        }
    }
}

impl std::error::Error for PlayerError {}

/// Recoverable failure while fetching or decoding one (track, chunk) pair.
///
/// A failed chunk mutes its track for that chunk only.
#[derive(Debug)]
pub enum FetchError {
    Io(std::io::Error),
    Http(String),
    Decode(String),
    Unsupported(String),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Http(err) => write!(f, "http error: {}", err),
            Self::Decode(err) => write!(f, "decode error: {}", err),
            Self::Unsupported(err) => write!(f, "unsupported media: {}", err),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<std::io::Error> for FetchError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<symphonia::core::errors::Error> for FetchError {
    fn from(value: symphonia::core::errors::Error) -> Self {
        match value {
            symphonia::core::errors::Error::IoError(err) => Self::Io(err),
            symphonia::core::errors::Error::Unsupported(what) => Self::Unsupported(what.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}
