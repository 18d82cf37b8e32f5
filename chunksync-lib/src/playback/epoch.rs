//! One synchronized playback group for a single chunk across all tracks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audio::output::SourceHandle;
use crate::playback::ticker::Ticker;

/// Epoch value object.
///
/// Owns the started sources and the `timeupdate` ticker. Releasing the epoch
/// raises its cancellation flag first, so a startup worker still waiting on
/// fetches discards its buffers instead of starting sources.
pub(crate) struct Epoch {
    pub(crate) id: u64,
    pub(crate) chunk_index: usize,
    /// In-chunk offset the sources start from.
    pub(crate) offset: f64,
    pub(crate) seek_generation: u64,
    cancelled: Arc<AtomicBool>,
    sources: Vec<Box<dyn SourceHandle>>,
    ticker: Option<Ticker>,
    started: bool,
}

impl Epoch {
    pub(crate) fn new(id: u64, chunk_index: usize, offset: f64, seek_generation: u64) -> Self {
        Self {
            id,
            chunk_index,
            offset,
            seek_generation,
            cancelled: Arc::new(AtomicBool::new(false)),
            sources: Vec::new(),
            ticker: None,
            started: false,
        }
    }

    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Take ownership of the started sources and ticker.
    pub(crate) fn attach(&mut self, sources: Vec<Box<dyn SourceHandle>>, ticker: Ticker) {
        self.sources = sources;
        self.ticker = Some(ticker);
        self.started = true;
    }

    pub(crate) fn is_started(&self) -> bool {
        self.started
    }

    pub(crate) fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Cancel, stop every source, and stop the ticker.
    pub(crate) fn release(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        for source in self.sources.iter_mut() {
            source.stop();
        }
        self.sources.clear();
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }
}

impl Drop for Epoch {
    fn drop(&mut self) {
        self.release();
    }
}
