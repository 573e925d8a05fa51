#![forbid(unsafe_code)]

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

type Callback<V> = Arc<dyn Fn(&V) + Send + Sync>;

struct Registry<V> {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback<V>>,
}

/// Synchronous notify-all fan-out. Callbacks run in registration order, once per
/// publish, with no batching.
pub struct SubscriptionBus<V> {
    registry: Arc<Mutex<Registry<V>>>,
}

impl<V: 'static> Default for SubscriptionBus<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: 'static> SubscriptionBus<V> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                callbacks: BTreeMap::new(),
            })),
        }
    }

    /// Registers `callback` and immediately invokes it with `current`.
    pub fn subscribe<F>(&self, current: &V, callback: F) -> Subscription
    where
        F: Fn(&V) + Send + Sync + 'static,
    {
        let callback: Callback<V> = Arc::new(callback);
        let id = {
            let mut registry = self.registry.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.callbacks.insert(id, Arc::clone(&callback));
            id
        };
        callback(current);

        let registry: Weak<Mutex<Registry<V>>> = Arc::downgrade(&self.registry);
        Subscription {
            unregister: Some(Box::new(move || {
                if let Some(registry) = registry.upgrade() {
                    registry.lock().callbacks.remove(&id);
                }
            })),
        }
    }

    pub fn publish(&self, view: &V) {
        // Callbacks may subscribe or unsubscribe; never run them under the lock.
        let callbacks = self
            .registry
            .lock()
            .callbacks
            .values()
            .cloned()
            .collect::<Vec<_>>();
        for callback in callbacks {
            callback(view);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().callbacks.len()
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the callback registered; call
/// `unsubscribe` to remove it.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    unregister: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        if let Some(unregister) = self.unregister.take() {
            unregister();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unregister.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_delivers_current_value_first() {
        let bus = SubscriptionBus::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = bus.subscribe(&7, move |v| sink.lock().push(*v));
        bus.publish(&8);
        assert_eq!(*seen.lock(), vec![7, 8]);
    }

    #[test]
    fn publish_runs_in_registration_order() {
        let bus = SubscriptionBus::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut subs = Vec::new();
        for name in ["a", "b", "c"] {
            let log = Arc::clone(&log);
            subs.push(bus.subscribe(&0, move |v| log.lock().push(format!("{name}{v}"))));
        }
        log.lock().clear();
        bus.publish(&1);
        assert_eq!(*log.lock(), vec!["a1", "b1", "c1"]);

        let b = subs.remove(1);
        b.unsubscribe();
        bus.publish(&2);
        assert_eq!(*log.lock(), vec!["a1", "b1", "c1", "a2", "c2"]);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[test]
    fn unsubscribe_after_bus_dropped_is_harmless() {
        let bus = SubscriptionBus::<u32>::new();
        let sub = bus.subscribe(&0, |_| {});
        drop(bus);
        sub.unsubscribe();
    }
}
