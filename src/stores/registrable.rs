//! Ordered list registry keyed by position.
//!
//! Used where identity *is* the index: the registered value itself is the
//! payload and duplicates are rejected by structural equality. A
//! `Registrable<usize>` additionally supports anonymous index reservation
//! ([`Registrable::reserve`]) as long as it holds nothing but the
//! sequential placeholder run `0..len`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::types::{Cleanup, StoreError};

type ListSubscriber<T> = Rc<dyn Fn(&[T])>;
type NewItemSubscriber<T> = Rc<dyn Fn(&T)>;

// =============================================================================
// REGISTRABLE
// =============================================================================

/// Ordered list registry. Cheap to clone (handle semantics).
pub struct Registrable<T> {
    inner: Rc<RegistrableInner<T>>,
}

impl<T> Clone for Registrable<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

struct RegistrableInner<T> {
    items: RefCell<Vec<T>>,
    version: Signal<u64>,
    counter: Cell<u64>,
    new_item: RefCell<Option<T>>,
    subscribers: RefCell<Vec<(usize, ListSubscriber<T>)>>,
    new_item_subscribers: RefCell<Vec<(usize, NewItemSubscriber<T>)>>,
    next_subscriber_id: Cell<usize>,
}

impl<T> Default for Registrable<T>
where
    T: Clone + PartialEq + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registrable<T>
where
    T: Clone + PartialEq + 'static,
{
    pub fn new() -> Self {
        Self::with_items(Vec::new())
    }

    /// Start from pre-registered items.
    pub fn with_items(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(RegistrableInner {
                items: RefCell::new(items),
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

    /// Append a value. Returns its index. Fails without mutating if a
    /// structurally-equal value is already registered.
    pub fn register(&self, value: T) -> Result<usize, StoreError> {
        let index = {
            let mut items = self.inner.items.borrow_mut();
            if items.contains(&value) {
                return Err(StoreError::DuplicateValue);
            }
            let index = items.len();
            items.push(value.clone());
            index
        };
        *self.inner.new_item.borrow_mut() = Some(value.clone());
        self.bump_version();
        self.notify_new_item(&value);
        self.notify_subscribers();
        Ok(index)
    }

    /// Remove the first structurally-equal match.
    pub fn unregister(&self, value: &T) -> Result<(), StoreError> {
        let position = self
            .inner
            .items
            .borrow()
            .iter()
            .position(|entry| entry == value)
            .ok_or(StoreError::NotFound)?;
        self.remove_at(position)
    }

    /// Remove the element at an explicit index.
    pub fn unregister_at(&self, index: usize) -> Result<(), StoreError> {
        if index >= self.inner.items.borrow().len() {
            return Err(StoreError::NotFound);
        }
        self.remove_at(index)
    }

    fn remove_at(&self, index: usize) -> Result<(), StoreError> {
        self.inner.items.borrow_mut().remove(index);
        self.bump_version();
        self.notify_subscribers();
        Ok(())
    }

    // =========================================================================
    // PROJECTIONS
    // =========================================================================

    /// Current items in registration order. Reactive.
    pub fn items(&self) -> Vec<T> {
        self.track();
        self.inner.items.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.track();
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.track();
        self.inner.items.borrow().iter().position(|entry| entry == value)
    }

    /// Visit every item in order with its current snapshot.
    pub fn for_each_item(&self, mut f: impl FnMut(&T)) {
        let items = self.items();
        for item in &items {
            f(item);
        }
    }

    fn track(&self) {
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

    /// Subscribe to the list. Fires immediately, then synchronously on
    /// every mutation.
    pub fn subscribe(&self, f: impl Fn(&[T]) + 'static) -> Cleanup {
        let subscriber: ListSubscriber<T> = Rc::new(f);
        subscriber(&self.inner.items.borrow().clone());

        let id = self.next_subscriber_id();
        self.inner.subscribers.borrow_mut().push((id, subscriber));

        let inner = self.inner.clone();
        Box::new(move || {
            inner.subscribers.borrow_mut().retain(|(entry, _)| *entry != id);
        })
    }

    /// Subscribe to the latest registered value.
    pub fn watch_new_item(&self, f: impl Fn(&T) + 'static) -> Cleanup {
        let subscriber: NewItemSubscriber<T> = Rc::new(f);
        if let Some(value) = self.inner.new_item.borrow().clone() {
            subscriber(&value);
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
        let snapshot: Vec<ListSubscriber<T>> = self
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

    fn notify_new_item(&self, value: &T) {
        let snapshot: Vec<NewItemSubscriber<T>> = self
            .inner
            .new_item_subscribers
            .borrow()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();
        for subscriber in snapshot {
            subscriber(value);
        }
    }
}

impl Registrable<usize> {
    /// Reserve the next index anonymously. Only valid while the registry
    /// holds exactly the placeholder run `0..len`; anything else means the
    /// registry is being used for real values and reservation is a misuse.
    pub fn reserve(&self) -> Result<usize, StoreError> {
        {
            let items = self.inner.items.borrow();
            if !items.iter().copied().eq(0..items.len()) {
                return Err(StoreError::InvalidValue);
            }
        }
        let index = self.inner.items.borrow().len();
        self.register(index)
    }
}
