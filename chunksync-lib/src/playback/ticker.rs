//! Periodic callback thread used for `timeupdate` emission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use log::warn;

/// Background thread invoking a callback at a fixed interval until
/// cancelled or until the callback returns `false`.
///
/// Cancelling never joins, so a ticker may be cancelled from its own
/// callback.
pub(crate) struct Ticker {
    cancelled: Arc<AtomicBool>,
    thread: Option<Thread>,
}

impl Ticker {
    /// Spawn the ticker thread.
    ///
    /// # Arguments
    ///
    /// * `interval` - Delay before each invocation.
    /// * `tick` - Callback; returning `false` stops the ticker.
    pub(crate) fn start<F>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let spawned = thread::Builder::new()
            .name("timeupdate".to_string())
            .spawn(move || loop {
                let deadline = Instant::now() + interval;
                loop {
                    if flag.load(Ordering::SeqCst) {
                        return;
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    thread::park_timeout(deadline - now);
                }
                if !tick() {
                    return;
                }
            });

        let thread = match spawned {
            Ok(handle) => Some(handle.thread().clone()),
            Err(err) => {
                warn!("failed to spawn timeupdate thread: {}", err);
                None
            }
        };

        Self { cancelled, thread }
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(thread) = &self.thread {
            thread.unpark();
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}
