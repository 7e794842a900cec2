//! Synchronous observer list with explicit subscription handles.
//!
//! Callbacks run on the emitting thread, in registration order. The
//! subscriber list is copied before dispatch, so a callback may subscribe or
//! unsubscribe (itself included) without deadlocking.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by [`Emitter::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

pub struct Emitter<T> {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(u64, Callback<T>)>>,
}

impl<T> Emitter<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push((id, Arc::new(callback)));
        Subscription(id)
    }

    /// Returns false if the subscription was already removed
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(id, _)| *id != subscription.0);
        subscribers.len() != before
    }

    pub fn emit(&self, event: &T) {
        let callbacks: Vec<Callback<T>> = self.subscribers.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order() {
        let emitter = Emitter::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        emitter.subscribe(move |v| s.lock().push(format!("a{v}")));
        let s = seen.clone();
        emitter.subscribe(move |v| s.lock().push(format!("b{v}")));

        emitter.emit(&1);
        emitter.emit(&2);
        assert_eq!(*seen.lock(), vec!["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn test_unsubscribe() {
        let emitter = Emitter::<u32>::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        let sub = emitter.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        emitter.emit(&0);
        assert!(emitter.unsubscribe(&sub));
        assert!(!emitter.unsubscribe(&sub));
        emitter.emit(&0);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(emitter.is_empty());
    }

    #[test]
    fn test_callback_can_subscribe() {
        let emitter = Arc::new(Emitter::<u32>::new());
        let e = emitter.clone();
        emitter.subscribe(move |_| {
            e.subscribe(|_| {});
        });
        emitter.emit(&0);
        assert_eq!(emitter.len(), 2);
    }
}
