//! Typed, synchronous change notification
//!
//! Every observable entity (a parameter, a query set, a render target, a
//! viewport) owns one [`Signal`] per kind of event. Slots run in registration
//! order on the emitting thread and run to completion before `emit` returns.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::Mutex;

/// Identifier handed out by [`Signal::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Slot<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// An ordered list of observers for events of type `T`
pub struct Signal<T> {
    slots: Mutex<Vec<(SubscriptionId, Slot<T>)>>,
    next_id: AtomicU64,
    blocked: AtomicBool,
}

impl<T> Signal<T> {
    /// Create a signal without observers
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            blocked: AtomicBool::new(false),
        }
    }

    /// Register an observer. Observers are called in registration order.
    pub fn subscribe<F>(&self, slot: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.lock().push((id, Arc::new(slot)));
        id
    }

    /// Remove an observer, returning whether it was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    /// Remove every observer
    pub fn clear(&self) {
        self.slots.lock().clear();
    }

    /// Number of registered observers
    pub fn subscriber_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Suppress (or re-enable) emission
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Invoke every observer with `event`.
    ///
    /// The slot list is copied out of the lock first, so an observer may
    /// subscribe, unsubscribe or emit on other signals while being notified.
    pub fn emit(&self, event: &T) {
        if self.is_blocked() {
            tracing::trace!("signal blocked, skipping emit");
            return;
        }

        let slots: Vec<Slot<T>> = self.slots
            .lock()
            .iter()
            .map(|(_, slot)| slot.clone())
            .collect();

        for slot in slots {
            slot(event);
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscriber_count())
            .field("blocked", &self.is_blocked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_in_registration_order() {
        let signal = Signal::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = seen.clone();
            signal.subscribe(move |value: &u32| seen.lock().push((tag, *value)));
        }

        signal.emit(&7);
        assert_eq!(
            *seen.lock(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let signal = Signal::<()>::new();
        let hits = Arc::new(AtomicU64::new(0));

        let counter = hits.clone();
        let id = signal.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        signal.emit(&());
        assert!(signal.unsubscribe(id));
        assert!(!signal.unsubscribe(id));
        signal.emit(&());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn test_blocked_signal_is_silent() {
        let signal = Signal::<()>::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        signal.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        signal.set_blocked(true);
        signal.emit(&());
        signal.set_blocked(false);
        signal.emit(&());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
