//! Named event channels and their subscribers.
//!
//! Handlers receive the player's `currentTime` at emission. A panicking
//! handler is logged and skipped; the remaining handlers still run.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::{trace, warn};

use crate::error::PlayerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Play,
    Pause,
    Ended,
    TimeUpdate,
    ChunkChange,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Play,
        Channel::Pause,
        Channel::Ended,
        Channel::TimeUpdate,
        Channel::ChunkChange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Play => "play",
            Channel::Pause => "pause",
            Channel::Ended => "ended",
            Channel::TimeUpdate => "timeupdate",
            Channel::ChunkChange => "chunkchange",
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.name() == s)
            .ok_or_else(|| PlayerError::UnknownEvent(s.to_string()))
    }
}

pub type EventHandler = Arc<dyn Fn(f64) + Send + Sync>;

/// Token returned by a subscription; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Subscribers per channel, invoked in subscription order.
#[derive(Default)]
pub struct EventBus {
    handlers: Mutex<BTreeMap<Channel, Vec<(SubscriptionId, EventHandler)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, channel: Channel, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.handlers
            .lock()
            .unwrap()
            .entry(channel)
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove a subscription. Returns false when it was not registered on `channel`.
    pub fn unsubscribe(&self, channel: Channel, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock().unwrap();
        let Some(list) = handlers.get_mut(&channel) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        before != list.len()
    }

    pub fn subscriber_count(&self, channel: Channel) -> usize {
        self.handlers
            .lock()
            .unwrap()
            .get(&channel)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Invoke every handler on `channel` with `current_time`.
    ///
    /// Handlers run on the calling thread without the bus lock held, so they
    /// may subscribe or unsubscribe.
    pub fn publish(&self, channel: Channel, current_time: f64) {
        let handlers: Vec<EventHandler> = self
            .handlers
            .lock()
            .unwrap()
            .get(&channel)
            .map(|list| list.iter().map(|(_, handler)| handler.clone()).collect())
            .unwrap_or_default();

        trace!("{} at {:.3}s ({} handlers)", channel, current_time, handlers.len());
        for handler in handlers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(current_time)));
            if outcome.is_err() {
                warn!("{} handler panicked; continuing with remaining handlers", channel);
            }
        }
    }
}
