//! Centralized listener registry.
//!
//! Every attachment - element-level or window-level - goes through this one
//! table keyed by `(target, event type)`. Attaching returns a [`ListenerId`]
//! and removal is by id, so teardown closures cannot detach someone else's
//! handler. [`ListenerRegistry::count`] exposes attachment counts, which is
//! how the tests prove the engines never leak window listeners across
//! component lifecycles.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::element::ElementId;
use super::event::{Event, EventTarget, EventType};

/// Handler invoked during dispatch. Handlers capture their own
/// [`Document`](super::Document) handle if they need to mutate state.
pub(crate) type Handler = Rc<dyn Fn(&Event)>;

/// Identifies one attached listener for later removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    handlers: RefCell<HashMap<(EventTarget, EventType), Vec<(ListenerId, Handler)>>>,
    next_id: Cell<u64>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(
        &self,
        target: EventTarget,
        event_type: EventType,
        handler: Handler,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.handlers
            .borrow_mut()
            .entry((target, event_type))
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove one listener. Returns false if the id is unknown (already
    /// removed) - teardown closures rely on this being safe to repeat.
    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        for bucket in handlers.values_mut() {
            if let Some(position) = bucket.iter().position(|(entry, _)| *entry == id) {
                bucket.remove(position);
                return true;
            }
        }
        false
    }

    /// Drop every listener attached to an element (element removal).
    pub(crate) fn remove_element(&self, element: ElementId) {
        self.handlers
            .borrow_mut()
            .retain(|(target, _), _| *target != EventTarget::Element(element));
    }

    /// Snapshot the handlers for one slot. Dispatch iterates the snapshot,
    /// so handlers may attach/detach listeners while the event is in flight.
    pub(crate) fn snapshot(&self, target: EventTarget, event_type: EventType) -> Vec<Handler> {
        self.handlers
            .borrow()
            .get(&(target, event_type))
            .map(|bucket| bucket.iter().map(|(_, handler)| handler.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of listeners currently attached to one slot.
    pub(crate) fn count(&self, target: EventTarget, event_type: EventType) -> usize {
        self.handlers
            .borrow()
            .get(&(target, event_type))
            .map_or(0, Vec::len)
    }

    #[cfg(test)]
    pub(crate) fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::event::EventPayload;
    use std::cell::Cell as StdCell;

    #[test]
    fn test_add_remove_symmetry() {
        let registry = ListenerRegistry::new();
        let id = registry.add(EventTarget::Window, EventType::Click, Rc::new(|_| {}));
        assert_eq!(registry.count(EventTarget::Window, EventType::Click), 1);

        assert!(registry.remove(id));
        assert_eq!(registry.count(EventTarget::Window, EventType::Click), 0);

        // Removing twice is a no-op, not a panic.
        assert!(!registry.remove(id));
    }

    #[test]
    fn test_remove_element_listeners() {
        let registry = ListenerRegistry::new();
        let element = ElementId(7);
        registry.add(EventTarget::Element(element), EventType::KeyDown, Rc::new(|_| {}));
        registry.add(EventTarget::Element(element), EventType::KeyUp, Rc::new(|_| {}));
        registry.add(EventTarget::Window, EventType::KeyDown, Rc::new(|_| {}));

        registry.remove_element(element);
        assert_eq!(registry.count(EventTarget::Element(element), EventType::KeyDown), 0);
        assert_eq!(registry.count(EventTarget::Element(element), EventType::KeyUp), 0);
        assert_eq!(registry.count(EventTarget::Window, EventType::KeyDown), 1);
    }

    #[test]
    fn test_snapshot_isolated_from_mutation() {
        let registry = Rc::new(ListenerRegistry::new());
        let fired = Rc::new(StdCell::new(0));

        let fired_inner = fired.clone();
        registry.add(
            EventTarget::Window,
            EventType::Click,
            Rc::new(move |_| fired_inner.set(fired_inner.get() + 1)),
        );

        let snapshot = registry.snapshot(EventTarget::Window, EventType::Click);
        registry.clear();

        // The snapshot still runs even though the table was cleared mid-flight.
        let event = Event::new(EventType::Click, None, EventPayload::Pointer);
        for handler in snapshot {
            handler(&event);
        }
        assert_eq!(fired.get(), 1);
    }
}
