//! Ordered key -> value registry with duplicate detection.
//!
//! Keys are unique, values are unique (structural equality), and insertion
//! order defines the index space. Registration returns the assigned index;
//! removal compacts the order, updates never reorder.
//!
//! Mutations notify all current subscribers synchronously before the
//! mutating call returns, so a handler that registers and then reads a
//! projection sees the post-mutation state. Projection reads go through a
//! version signal, making them reactive inside deriveds/effects.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::types::{Cleanup, StoreError};

type RegistrySubscriber<K, V> = Rc<dyn Fn(&[(K, V)])>;
type NewItemSubscriber<K, V> = Rc<dyn Fn(&K, &V)>;

// =============================================================================
// HASHABLE
// =============================================================================

/// Ordered key -> value registry. Cheap to clone (handle semantics).
pub struct Hashable<K, V> {
    inner: Rc<HashableInner<K, V>>,
}

impl<K, V> Clone for Hashable<K, V> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

struct HashableInner<K, V> {
    items: RefCell<Vec<(K, V)>>,
    /// Bumped on every mutation; projections read it to become reactive.
    version: Signal<u64>,
    counter: Cell<u64>,
    /// Latest registered pair, for insertion-time side effects.
    new_item: RefCell<Option<(K, V)>>,
    subscribers: RefCell<Vec<(usize, RegistrySubscriber<K, V>)>>,
    new_item_subscribers: RefCell<Vec<(usize, NewItemSubscriber<K, V>)>>,
    next_subscriber_id: Cell<usize>,
}

impl<K, V> Default for Hashable<K, V>
where
    K: Clone + PartialEq + 'static,
    V: Clone + PartialEq + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Hashable<K, V>
where
    K: Clone + PartialEq + 'static,
    V: Clone + PartialEq + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Rc::new(HashableInner {
                items: RefCell::new(Vec::new()),
                version: signal(0),
                counter: Cell::new(0),
                new_item: RefCell::new(None),
                subscribers: RefCell::new(Vec::new()),
                new_item_subscribers: RefCell::new(Vec::new()),
                next_subscriber_id: Cell::new(0),
            }),
        }
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Register a new pair. Returns the assigned index (registration order).
    /// Fails without mutating on a duplicate key or duplicate value.
    pub fn register(&self, key: K, value: V) -> Result<usize, StoreError> {
        self.register_with(key, value, |_| {})
    }

    /// Like [`register`](Self::register), running `on_register` inside the
    /// same update, after the pair is inserted and before notifications.
    pub fn register_with(
        &self,
        key: K,
        value: V,
        on_register: impl FnOnce(&K),
    ) -> Result<usize, StoreError> {
        let index = {
            let mut items = self.inner.items.borrow_mut();
            if items.iter().any(|(entry, _)| *entry == key) {
                return Err(StoreError::DuplicateKey);
            }
            if items.iter().any(|(_, entry)| *entry == value) {
                return Err(StoreError::DuplicateValue);
            }
            let index = items.len();
            items.push((key.clone(), value.clone()));
            index
        };

        *self.inner.new_item.borrow_mut() = Some((key.clone(), value.clone()));
        on_register(&key);
        self.bump_version();
        self.notify_new_item(&key, &value);
        self.notify_subscribers();
        Ok(index)
    }

    /// Remove a pair by key. Later entries shift down one index.
    pub fn unregister(&self, key: &K) -> Result<(), StoreError> {
        {
            let mut items = self.inner.items.borrow_mut();
            let position = items
                .iter()
                .position(|(entry, _)| entry == key)
                .ok_or(StoreError::NotFound)?;
            items.remove(position);
        }
        self.bump_version();
        self.notify_subscribers();
        Ok(())
    }

    /// Replace the value stored under `key`. Order is unchanged.
    pub fn update(&self, key: &K, value: V) -> Result<(), StoreError> {
        {
            let mut items = self.inner.items.borrow_mut();
            let entry = items
                .iter_mut()
                .find(|(entry, _)| entry == key)
                .ok_or(StoreError::NotFound)?;
            entry.1 = value;
        }
        self.bump_version();
        self.notify_subscribers();
        Ok(())
    }

    /// Edit the value stored under `key` in place.
    pub fn modify(&self, key: &K, f: impl FnOnce(&mut V)) -> Result<(), StoreError> {
        {
            let mut items = self.inner.items.borrow_mut();
            let entry = items
                .iter_mut()
                .find(|(entry, _)| entry == key)
                .ok_or(StoreError::NotFound)?;
            f(&mut entry.1);
        }
        self.bump_version();
        self.notify_subscribers();
        Ok(())
    }

    // =========================================================================
    // PROJECTIONS
    // =========================================================================

    /// Ordered `(key, value)` pairs. Reactive.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.track();
        self.inner.items.borrow().clone()
    }

    /// Ordered keys. Reactive.
    pub fn keys(&self) -> Vec<K> {
        self.track();
        self.inner.items.borrow().iter().map(|(key, _)| key.clone()).collect()
    }

    /// Ordered values. Reactive.
    pub fn values(&self) -> Vec<V> {
        self.track();
        self.inner.items.borrow().iter().map(|(_, value)| value.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.track();
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index currently occupied by `key`.
    pub fn index_of(&self, key: &K) -> Option<usize> {
        self.track();
        self.inner.items.borrow().iter().position(|(entry, _)| entry == key)
    }

    /// Value at a registration index.
    pub fn value_at(&self, index: usize) -> Option<V> {
        self.track();
        self.inner.items.borrow().get(index).map(|(_, value)| value.clone())
    }

    fn track(&self) {
        // Reading the version inside a derived/effect records the dependency.
        let _ = self.inner.version.get();
    }

    fn bump_version(&self) {
        let next = self.inner.counter.get() + 1;
        self.inner.counter.set(next);
        self.inner.version.set(next);
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Subscribe to the whole registry. Fires immediately with the current
    /// entries, then synchronously on every mutation.
    pub fn subscribe(&self, f: impl Fn(&[(K, V)]) + 'static) -> Cleanup {
        let subscriber: RegistrySubscriber<K, V> = Rc::new(f);
        subscriber(&self.inner.items.borrow().clone());

        let id = self.next_subscriber_id();
        self.inner.subscribers.borrow_mut().push((id, subscriber));

        let inner = self.inner.clone();
        Box::new(move || {
            inner.subscribers.borrow_mut().retain(|(entry, _)| *entry != id);
        })
    }

    /// Subscribe to the "new item" stream (latest registered pair). Fires
    /// immediately if something was already registered, then on every
    /// successful registration.
    pub fn watch_new_item(&self, f: impl Fn(&K, &V) + 'static) -> Cleanup {
        let subscriber: NewItemSubscriber<K, V> = Rc::new(f);
        if let Some((key, value)) = self.inner.new_item.borrow().clone() {
            subscriber(&key, &value);
        }

        let id = self.next_subscriber_id();
        self.inner.new_item_subscribers.borrow_mut().push((id, subscriber));

        let inner = self.inner.clone();
        Box::new(move || {
            inner
                .new_item_subscribers
                .borrow_mut()
                .retain(|(entry, _)| *entry != id);
        })
    }

    fn next_subscriber_id(&self) -> usize {
        let id = self.inner.next_subscriber_id.get();
        self.inner.next_subscriber_id.set(id + 1);
        id
    }

    fn notify_subscribers(&self) {
        let snapshot: Vec<RegistrySubscriber<K, V>> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();
        let items = self.inner.items.borrow().clone();
        for subscriber in snapshot {
            subscriber(&items);
        }
    }

    fn notify_new_item(&self, key: &K, value: &V) {
        let snapshot: Vec<NewItemSubscriber<K, V>> = self
            .inner
            .new_item_subscribers
            .borrow()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();
        for subscriber in snapshot {
            subscriber(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell as StdCell;

    #[test]
    fn test_registration_order_defines_indices() {
        let registry: Hashable<u32, &str> = Hashable::new();
        assert_eq!(registry.register(10, "a"), Ok(0));
        assert_eq!(registry.register(20, "b"), Ok(1));
        assert_eq!(registry.register(30, "c"), Ok(2));
        assert_eq!(registry.keys(), vec![10, 20, 30]);
        assert_eq!(registry.values(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_key_is_atomic() {
        let registry: Hashable<u32, &str> = Hashable::new();
        registry.register(1, "a").unwrap();
        assert_eq!(registry.register(1, "b"), Err(StoreError::DuplicateKey));
        assert_eq!(registry.entries(), vec![(1, "a")]);
    }

    #[test]
    fn test_duplicate_value_is_atomic() {
        let registry: Hashable<u32, &str> = Hashable::new();
        registry.register(1, "a").unwrap();
        assert_eq!(registry.register(2, "a"), Err(StoreError::DuplicateValue));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_compacts_order() {
        let registry: Hashable<u32, &str> = Hashable::new();
        registry.register(1, "a").unwrap();
        registry.register(2, "b").unwrap();
        registry.register(3, "c").unwrap();

        registry.unregister(&2).unwrap();
        assert_eq!(registry.keys(), vec![1, 3]);
        assert_eq!(registry.index_of(&3), Some(1));

        assert_eq!(registry.unregister(&2), Err(StoreError::NotFound));
    }

    #[test]
    fn test_update_and_modify_require_presence() {
        let registry: Hashable<u32, String> = Hashable::new();
        registry.register(1, "a".to_string()).unwrap();

        registry.update(&1, "z".to_string()).unwrap();
        assert_eq!(registry.value_at(0), Some("z".to_string()));
        // Update does not reorder.
        assert_eq!(registry.index_of(&1), Some(0));

        registry.modify(&1, |value| value.push('!')).unwrap();
        assert_eq!(registry.value_at(0), Some("z!".to_string()));

        assert_eq!(registry.update(&9, "x".to_string()), Err(StoreError::NotFound));
        assert_eq!(registry.modify(&9, |_| {}), Err(StoreError::NotFound));
    }

    #[test]
    fn test_subscribers_see_post_mutation_state_synchronously() {
        let registry: Hashable<u32, &str> = Hashable::new();
        let observed = Rc::new(StdCell::new(0));

        let observed_inner = observed.clone();
        let _cleanup = registry.subscribe(move |items| {
            observed_inner.set(items.len());
        });
        assert_eq!(observed.get(), 0);

        registry.register(1, "a").unwrap();
        // Notified before register returned.
        assert_eq!(observed.get(), 1);

        registry.unregister(&1).unwrap();
        assert_eq!(observed.get(), 0);
    }

    #[test]
    fn test_registering_inside_handler_sees_projection() {
        let registry: Hashable<u32, &str> = Hashable::new();
        let seen = Rc::new(StdCell::new(0));

        let registry_inner = registry.clone();
        let seen_inner = seen.clone();
        let _cleanup = registry.watch_new_item(move |_, _| {
            // Projections reflect the insertion that triggered us.
            seen_inner.set(registry_inner.len());
        });

        registry.register(1, "a").unwrap();
        assert_eq!(seen.get(), 1);
        registry.register(2, "b").unwrap();
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn test_new_item_stream_replays_latest() {
        let registry: Hashable<u32, &str> = Hashable::new();
        registry.register(1, "a").unwrap();

        let latest = Rc::new(RefCell::new(None));
        let latest_inner = latest.clone();
        let cleanup = registry.watch_new_item(move |key, value| {
            *latest_inner.borrow_mut() = Some((*key, *value));
        });
        assert_eq!(*latest.borrow(), Some((1, "a")));

        registry.register(2, "b").unwrap();
        assert_eq!(*latest.borrow(), Some((2, "b")));

        cleanup();
        registry.register(3, "c").unwrap();
        assert_eq!(*latest.borrow(), Some((2, "b")));
    }

    #[test]
    fn test_on_register_runs_inside_update() {
        let registry: Hashable<u32, &str> = Hashable::new();
        let captured = Rc::new(StdCell::new(0));

        let captured_inner = captured.clone();
        registry
            .register_with(7, "a", |key| captured_inner.set(*key))
            .unwrap();
        assert_eq!(captured.get(), 7);
    }
}
