//! Single-assignment slot holding the eventual result of one chunk fetch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::audio::buffer::ChunkBuffer;
use crate::constants::SLOT_WAIT_POLL_MS;

#[derive(Debug)]
enum SlotState {
    Pending,
    Ready(ChunkBuffer),
    Failed(String),
}

/// Shareable handle to an in-flight or settled chunk load.
///
/// Clones observe the same slot. The first `resolve` wins; later calls are
/// ignored.
#[derive(Debug, Clone)]
pub struct ChunkSlot {
    inner: Arc<(Mutex<SlotState>, Condvar)>,
}

impl ChunkSlot {
    pub fn pending() -> Self {
        Self {
            inner: Arc::new((Mutex::new(SlotState::Pending), Condvar::new())),
        }
    }

    /// Settle the slot and wake every waiter.
    pub fn resolve(&self, result: Result<ChunkBuffer, String>) {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        if !matches!(*state, SlotState::Pending) {
            return;
        }
        *state = match result {
            Ok(buffer) => SlotState::Ready(buffer),
            Err(reason) => SlotState::Failed(reason),
        };
        cvar.notify_all();
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.inner.0.lock().unwrap(), SlotState::Ready(_))
    }

    pub fn is_settled(&self) -> bool {
        !matches!(*self.inner.0.lock().unwrap(), SlotState::Pending)
    }

    /// Block until the slot settles.
    pub fn wait(&self) -> Result<ChunkBuffer, String> {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        loop {
            match &*state {
                SlotState::Pending => state = cvar.wait(state).unwrap(),
                SlotState::Ready(buffer) => return Ok(buffer.clone()),
                SlotState::Failed(reason) => return Err(reason.clone()),
            }
        }
    }

    /// Block until the slot settles or `cancelled` is raised.
    ///
    /// Returns `None` when cancelled first.
    pub fn wait_cancellable(&self, cancelled: &AtomicBool) -> Option<Result<ChunkBuffer, String>> {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        loop {
            if cancelled.load(Ordering::SeqCst) {
                return None;
            }
            match &*state {
                SlotState::Pending => {
                    let (next, _) = cvar
                        .wait_timeout(state, Duration::from_millis(SLOT_WAIT_POLL_MS))
                        .unwrap();
                    state = next;
                }
                SlotState::Ready(buffer) => return Some(Ok(buffer.clone())),
                SlotState::Failed(reason) => return Some(Err(reason.clone())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ChunkSlot;
    use crate::audio::buffer::ChunkBuffer;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn first_resolution_wins() {
        let slot = ChunkSlot::pending();
        assert!(!slot.is_settled());
        slot.resolve(Err("boom".to_string()));
        slot.resolve(Ok(ChunkBuffer::silence(10, 1, 1.0)));
        assert!(slot.is_settled());
        assert!(!slot.is_ready());
        assert_eq!(slot.wait().unwrap_err(), "boom");
    }

    #[test]
    fn waiters_wake_on_resolve() {
        let slot = ChunkSlot::pending();
        let waiter = {
            let slot = slot.clone();
            thread::spawn(move || slot.wait())
        };
        slot.resolve(Ok(ChunkBuffer::silence(10, 1, 2.0)));
        let buffer = waiter.join().unwrap().unwrap();
        assert_eq!(buffer.frames(), 20);
    }

    #[test]
    fn cancellation_interrupts_wait() {
        let slot = ChunkSlot::pending();
        let cancelled = Arc::new(AtomicBool::new(false));
        let waiter = {
            let slot = slot.clone();
            let cancelled = cancelled.clone();
            thread::spawn(move || slot.wait_cancellable(&cancelled))
        };
        cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(waiter.join().unwrap().is_none());
    }
}
