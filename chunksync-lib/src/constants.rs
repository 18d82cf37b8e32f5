//! Shared constants for chunk caching and playback defaults.

/// Chunks kept behind the current chunk when a track's cache is trimmed.
pub const CACHE_WINDOW_BEHIND: usize = 4;

/// Chunks kept ahead of the current chunk when a track's cache is trimmed.
pub const CACHE_WINDOW_AHEAD: usize = 3;

/// A track's cache is only trimmed once it holds more entries than this.
pub const CACHE_SOFT_LIMIT: usize = 8;

/// Default `timeupdate` frequency (Hz).
pub const DEFAULT_TIMEUPDATE_HZ: f64 = 4.0;

/// Default chunk duration (seconds).
pub const DEFAULT_CHUNK_DURATION: f64 = 10.0;

/// Source pattern used when none is configured.
pub const DEFAULT_SOURCE_PATTERN: &str = "/track-{track}-chunk-{chunk}.mp3";

/// Attempts made to open the default output stream before giving up.
pub const OUTPUT_STREAM_OPEN_RETRIES: usize = 20;

/// Delay between output stream open attempts (ms).
pub const OUTPUT_STREAM_OPEN_RETRY_MS: u64 = 100;

/// Interval used when waiting on a pending chunk so cancellation is observed (ms).
pub const SLOT_WAIT_POLL_MS: u64 = 20;
