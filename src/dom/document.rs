//! Document arena - element tree, focus state and event dispatch.
//!
//! A [`Document`] is a cheaply clonable handle (`Rc` inside); the rendering
//! layer and every store share the same arena. All mutation goes through
//! the document's own methods - external mutation of engine-held
//! collections is not expressible.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::types::Cleanup;

use super::element::{ElementId, ElementKind, ElementNode};
use super::event::{Event, EventTarget, EventType, KeyboardEvent};
use super::listeners::{ListenerId, ListenerRegistry};

// =============================================================================
// DOCUMENT
// =============================================================================

/// Arena of elements standing in for the host DOM.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

struct DocumentInner {
    nodes: RefCell<HashMap<ElementId, ElementNode>>,
    /// Top-level elements in creation order (document order for roots).
    roots: RefCell<Vec<ElementId>>,
    next_id: Cell<u64>,
    /// Currently focused element. Reading through [`Document::active_element`]
    /// creates a reactive dependency.
    active: Signal<Option<ElementId>>,
    listeners: ListenerRegistry,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                nodes: RefCell::new(HashMap::new()),
                roots: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                active: signal(None),
                listeners: ListenerRegistry::new(),
            }),
        }
    }

    // =========================================================================
    // TREE CONSTRUCTION
    // =========================================================================

    /// Create a detached element. It is a root until appended somewhere.
    pub fn create_element(&self, kind: ElementKind) -> ElementId {
        let id = ElementId(self.inner.next_id.get());
        self.inner.next_id.set(self.inner.next_id.get() + 1);
        self.inner.nodes.borrow_mut().insert(id, ElementNode::new(kind));
        self.inner.roots.borrow_mut().push(id);
        id
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&self, parent: ElementId, child: ElementId) {
        let mut nodes = self.inner.nodes.borrow_mut();
        if !nodes.contains_key(&parent) || !nodes.contains_key(&child) {
            return;
        }
        let old_parent = nodes.get_mut(&child).and_then(|node| node.parent.take());
        if let Some(old_parent) = old_parent {
            if let Some(old) = nodes.get_mut(&old_parent) {
                old.children.retain(|entry| *entry != child);
            }
        }
        if let Some(node) = nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = nodes.get_mut(&parent) {
            node.children.push(child);
        }
        drop(nodes);
        self.inner.roots.borrow_mut().retain(|entry| *entry != child);
    }

    /// Remove an element and its whole subtree, dropping their listeners.
    /// Focus moves nowhere (active element clears) if it was inside.
    pub fn remove_element(&self, id: ElementId) {
        let subtree = self.collect_subtree(id);
        if subtree.is_empty() {
            return;
        }

        if let Some(active) = self.inner.active.get() {
            if subtree.contains(&active) {
                self.inner.active.set(None);
            }
        }

        let mut nodes = self.inner.nodes.borrow_mut();
        if let Some(parent) = nodes.get(&id).and_then(|node| node.parent) {
            if let Some(node) = nodes.get_mut(&parent) {
                node.children.retain(|entry| *entry != id);
            }
        }
        for entry in &subtree {
            nodes.remove(entry);
        }
        drop(nodes);

        self.inner.roots.borrow_mut().retain(|entry| *entry != id);
        for entry in subtree {
            self.inner.listeners.remove_element(entry);
        }
    }

    fn collect_subtree(&self, id: ElementId) -> Vec<ElementId> {
        let nodes = self.inner.nodes.borrow();
        if !nodes.contains_key(&id) {
            return Vec::new();
        }
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(node) = nodes.get(&current) {
                stack.extend(node.children.iter().copied());
            }
        }
        result
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn exists(&self, id: ElementId) -> bool {
        self.inner.nodes.borrow().contains_key(&id)
    }

    pub fn kind(&self, id: ElementId) -> Option<ElementKind> {
        self.inner.nodes.borrow().get(&id).map(|node| node.kind)
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.inner.nodes.borrow().get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.inner
            .nodes
            .borrow()
            .get(&id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// True if `node` is `ancestor` or a descendant of it.
    pub fn contains(&self, ancestor: ElementId, node: ElementId) -> bool {
        let nodes = self.inner.nodes.borrow();
        let mut current = Some(node);
        while let Some(entry) = current {
            if entry == ancestor {
                return true;
            }
            current = nodes.get(&entry).and_then(|node| node.parent);
        }
        false
    }

    /// Pre-order walk of the subtree below `id` (excluding `id` itself).
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut result = self.collect_subtree_ordered(id);
        if !result.is_empty() {
            result.remove(0);
        }
        result
    }

    fn collect_subtree_ordered(&self, id: ElementId) -> Vec<ElementId> {
        let nodes = self.inner.nodes.borrow();
        if !nodes.contains_key(&id) {
            return Vec::new();
        }
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(node) = nodes.get(&current) {
                for child in node.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        result
    }

    /// Every element, in document order (roots in creation order, each
    /// followed by its subtree pre-order).
    pub fn all_elements(&self) -> Vec<ElementId> {
        let roots = self.inner.roots.borrow().clone();
        let mut result = Vec::new();
        for root in roots {
            result.extend(self.collect_subtree_ordered(root));
        }
        result
    }

    /// Own text plus descendant text, concatenated in document order.
    pub fn text_content(&self, id: ElementId) -> String {
        let order = self.collect_subtree_ordered(id);
        let nodes = self.inner.nodes.borrow();
        let mut result = String::new();
        for entry in order {
            if let Some(node) = nodes.get(&entry) {
                result.push_str(&node.text);
            }
        }
        result
    }

    // =========================================================================
    // NODE ATTRIBUTES
    // =========================================================================

    fn with_node(&self, id: ElementId, f: impl FnOnce(&mut ElementNode)) {
        if let Some(node) = self.inner.nodes.borrow_mut().get_mut(&id) {
            f(node);
        }
    }

    pub fn set_text(&self, id: ElementId, text: impl Into<String>) {
        let text = text.into();
        self.with_node(id, |node| node.text = text);
    }

    pub fn set_disabled(&self, id: ElementId, disabled: bool) {
        self.with_node(id, |node| node.disabled = disabled);
    }

    pub fn set_href(&self, id: ElementId, has_href: bool) {
        self.with_node(id, |node| node.has_href = has_href);
    }

    pub fn set_content_editable(&self, id: ElementId, editable: bool) {
        self.with_node(id, |node| node.content_editable = editable);
    }

    pub fn set_aria_hidden(&self, id: ElementId, hidden: bool) {
        self.with_node(id, |node| node.aria_hidden = hidden);
    }

    pub fn set_attribute(&self, id: ElementId, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        self.with_node(id, |node| {
            node.attributes.insert(name, value);
        });
    }

    pub fn remove_attribute(&self, id: ElementId, name: &str) {
        self.with_node(id, |node| {
            node.attributes.remove(name);
        });
    }

    pub fn attribute(&self, id: ElementId, name: &str) -> Option<String> {
        self.inner
            .nodes
            .borrow()
            .get(&id)
            .and_then(|node| node.attributes.get(name).cloned())
    }

    // =========================================================================
    // TAB INDEX / FOCUSABILITY
    // =========================================================================

    /// Assign or clear the explicit tabindex.
    pub fn set_tab_index(&self, id: ElementId, tab_index: Option<i32>) {
        self.with_node(id, |node| node.tab_index = tab_index);
    }

    /// Explicit tabindex, if one was assigned.
    pub fn explicit_tab_index(&self, id: ElementId) -> Option<i32> {
        self.inner.nodes.borrow().get(&id).and_then(|node| node.tab_index)
    }

    /// Effective tabindex (explicit, else 0 for natively focusable, else -1).
    pub fn tab_index(&self, id: ElementId) -> i32 {
        self.inner
            .nodes
            .borrow()
            .get(&id)
            .map_or(-1, ElementNode::effective_tab_index)
    }

    pub fn is_focusable(&self, id: ElementId) -> bool {
        self.inner
            .nodes
            .borrow()
            .get(&id)
            .is_some_and(ElementNode::is_focusable)
    }

    /// Put the element into the tab order.
    pub fn make_focusable(&self, id: ElementId, tab_index: i32) {
        self.set_tab_index(id, Some(tab_index));
    }

    /// Pull the element out of the tab order; the returned closure restores
    /// whatever explicit tabindex was there before.
    pub fn remove_focusable(&self, id: ElementId) -> Cleanup {
        let original = self.explicit_tab_index(id);
        self.set_tab_index(id, Some(-1));
        let document = self.clone();
        Box::new(move || document.set_tab_index(id, original))
    }

    // =========================================================================
    // FOCUS
    // =========================================================================

    /// Currently focused element. Reactive when read inside a derived/effect.
    pub fn active_element(&self) -> Option<ElementId> {
        self.inner.active.get()
    }

    /// Move focus to `id` and fire `Focus` (target only) plus a bubbling
    /// `FocusIn`. No-op for unknown elements.
    pub fn focus(&self, id: ElementId) {
        if !self.exists(id) {
            return;
        }
        if self.inner.active.get() == Some(id) {
            return;
        }
        self.inner.active.set(Some(id));

        let focus_event = Event::new(EventType::Focus, Some(id), super::event::EventPayload::Focus);
        self.run_handlers(EventTarget::Element(id), &focus_event);

        let focus_in = Event::focus_in(id);
        self.dispatch(&focus_in);
    }

    /// Clear focus without firing events (focus went to browser chrome).
    pub fn blur(&self) {
        self.inner.active.set(None);
    }

    /// Focus the first descendant with a non-negative tabindex. Returns
    /// whether such an element existed.
    pub fn focus_first_element(&self, container: ElementId) -> bool {
        let target = self
            .descendants(container)
            .into_iter()
            .find(|entry| self.tab_index(*entry) >= 0);
        match target {
            Some(entry) => {
                self.focus(entry);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // LISTENERS / DISPATCH
    // =========================================================================

    pub fn add_listener(
        &self,
        target: EventTarget,
        event_type: EventType,
        handler: impl Fn(&Event) + 'static,
    ) -> ListenerId {
        self.inner.listeners.add(target, event_type, Rc::new(handler))
    }

    /// Detach one listener. Safe to call with an already-removed id.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    /// How many listeners are attached to one slot. Leak tests assert this
    /// returns to zero after teardown.
    pub fn listener_count(&self, target: EventTarget, event_type: EventType) -> usize {
        self.inner.listeners.count(target, event_type)
    }

    /// Dispatch an event: target listeners first, then ancestors for
    /// bubbling types, then window listeners. Handler lists are snapshotted
    /// so handlers may attach/detach listeners or re-enter dispatch.
    pub fn dispatch(&self, event: &Event) {
        if let Some(target) = event.target {
            self.run_handlers(EventTarget::Element(target), event);
            if event.event_type.bubbles() {
                let mut current = self.parent(target);
                while let Some(ancestor) = current {
                    self.run_handlers(EventTarget::Element(ancestor), event);
                    current = self.parent(ancestor);
                }
            }
        }
        if event.event_type.bubbles() || event.target.is_none() {
            self.run_handlers(EventTarget::Window, event);
        }
    }

    fn run_handlers(&self, target: EventTarget, event: &Event) {
        for handler in self.inner.listeners.snapshot(target, event.event_type) {
            handler(event);
        }
    }

    /// Dispatch a key press to an element. Returns the event so the caller
    /// can observe `default_prevented`.
    pub fn dispatch_key_down(&self, target: ElementId, key: KeyboardEvent) -> Event {
        let event = Event::keyboard(EventType::KeyDown, Some(target), key);
        self.dispatch(&event);
        event
    }

    /// Dispatch a key release to an element.
    pub fn dispatch_key_up(&self, target: ElementId, mut key: KeyboardEvent) -> Event {
        key.state = super::event::KeyState::Release;
        let event = Event::keyboard(EventType::KeyUp, Some(target), key);
        self.dispatch(&event);
        event
    }

    /// Dispatch a click on an element.
    pub fn click(&self, target: ElementId) -> Event {
        let event = Event::click(target);
        self.dispatch(&event);
        event
    }

    /// Dispatch a pointer move over an element.
    pub fn pointer_move(&self, target: ElementId) -> Event {
        let event = Event::new(
            EventType::PointerMove,
            Some(target),
            super::event::EventPayload::Pointer,
        );
        self.dispatch(&event);
        event
    }
}
