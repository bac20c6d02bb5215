//! Display change subscriber registry
//!
//! Each subscriber owns the receiving half of an mpsc channel and a
//! [`Subscription`] guard. Dropping the guard removes the sender from the
//! registry; senders whose receiver is gone are pruned on the next publish.

use crate::vdd::DisplayChange;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

type Subscribers = SmallVec<[(u64, Sender<DisplayChange>); 2]>;

#[derive(Debug, Default)]
struct Registry {
    subscribers: Mutex<Subscribers>,
    next_id: AtomicU64,
}

/// Shared registry of display change subscribers
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    registry: Arc<Registry>,
}

/// Live registration with a [`ChangeNotifier`]; unsubscribes on drop
#[derive(Debug)]
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl ChangeNotifier {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> (Subscription, Receiver<DisplayChange>) {
        let (tx, rx) = mpsc::channel();
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.subscribers.lock().push((id, tx));
        debug!("Display change subscriber {} registered", id);

        (
            Subscription {
                id,
                registry: Arc::downgrade(&self.registry),
            },
            rx,
        )
    }

    /// Deliver `change` to every live subscriber, returning how many received it
    pub fn publish(&self, change: &DisplayChange) -> usize {
        let mut subscribers = self.registry.subscribers.lock();
        subscribers.retain(|(id, tx)| {
            let delivered = tx.send(change.clone()).is_ok();
            if !delivered {
                debug!("Pruning disconnected subscriber {}", id);
            }
            delivered
        });
        trace!(
            "Published {} display(s) to {} subscriber(s)",
            change.displays.len(),
            subscribers.len()
        );
        subscribers.len()
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers.lock().len()
    }
}

impl Subscription {
    /// Explicitly release the registration (same as dropping it)
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.subscribers.lock().retain(|(id, _)| *id != self.id);
            debug!("Display change subscriber {} released", self.id);
        }
    }
}
