//! Connection-change notification
//!
//! Decouples [`ClientRegistry`](crate::ClientRegistry) from whoever reacts
//! to its membership changes. Subscribers run synchronously on the thread
//! that mutated the registry, after the mutation is visible.

use crate::metrics as m;
use crate::types::ConnectionChange;
use crate::Result;
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Subscriber invoked on every membership change
pub type ChangeCallback = Arc<dyn Fn(&ConnectionChange) -> Result<()> + Send + Sync>;

/// Token returned on registration, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Ordered list of connection-change subscribers
pub struct ConnectionNotifier {
    subscribers: RwLock<Vec<(SubscriptionId, ChangeCallback)>>,
    next_id: AtomicU64,
}

impl ConnectionNotifier {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Replace every subscriber with `callback` (last registration wins)
    pub fn set_callback<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ConnectionChange) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.next_subscription();
        let mut subscribers = self.subscribers.write();
        subscribers.clear();
        subscribers.push((id, Arc::new(callback)));
        id
    }

    /// Add `callback` after the existing subscribers
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ConnectionChange) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.next_subscription();
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscriber; returns false if it was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Invoke every subscriber in registration order.
    ///
    /// Never fails: subscriber errors and panics are logged and counted.
    pub fn fire(&self, change: &ConnectionChange) {
        // Subscribers may re-enter the registry, so run them unlocked.
        let subscribers: Vec<ChangeCallback> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in subscribers {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(change))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(connection = %change.id, "Connection change subscriber failed: {}", e);
                    ::metrics::counter!(m::CALLBACK_FAILURES_TOTAL).increment(1);
                }
                Err(_) => {
                    tracing::error!(connection = %change.id, "Connection change subscriber panicked");
                    ::metrics::counter!(m::CALLBACK_FAILURES_TOTAL).increment(1);
                }
            }
        }
    }

    fn next_subscription(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionNotifier {
    fn default() -> Self {
        Self::new()
    }
}
