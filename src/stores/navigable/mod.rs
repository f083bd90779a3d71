//! Index cursor over a dynamic element collection.
//!
//! Drives roving focus, arrow-key traversal and the manual/automatic
//! activation split: the committed index is the confirmed selection, the
//! provisional index is where the user has roved to without committing
//! (manual mode). The collection may grow and shrink at any time, so every
//! operation re-reads it and clamps - the engine never caches a length.
//!
//! Plugins extend a mounted group: [`use_key_match`] (type-ahead),
//! [`use_manual_blur`] (provisional resync when focus leaves the group)
//! and [`use_hover_sync`] (pointer roving).

pub mod hover_sync;
pub mod key_match;
pub mod manual_blur;

pub use hover_sync::use_hover_sync;
pub use key_match::use_key_match;
pub use manual_blur::use_manual_blur;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use spark_signals::{signal, Signal};

use crate::dom::{Document, ElementId, Event, EventTarget, EventType};
use crate::stores::hashable::Hashable;
use crate::types::{
    is_not_valid_key, is_overflowed, Cleanup, Direction, Orientation, StartPosition,
};

// =============================================================================
// ITEM SOURCE
// =============================================================================

/// Where the navigated collection comes from: a fixed list, a signal, or a
/// getter re-evaluated on every read (e.g. a registry projection).
#[derive(Clone)]
pub enum ItemSource {
    Static(Vec<ElementId>),
    Signal(Signal<Vec<ElementId>>),
    Getter(Rc<dyn Fn() -> Vec<ElementId>>),
}

impl ItemSource {
    /// Current collection snapshot.
    pub fn get(&self) -> Vec<ElementId> {
        match self {
            Self::Static(items) => items.clone(),
            Self::Signal(items) => items.get(),
            Self::Getter(f) => f(),
        }
    }

    /// Live view over a registry's key order.
    pub fn registry_keys<V>(registry: &Hashable<ElementId, V>) -> Self
    where
        V: Clone + PartialEq + 'static,
    {
        let registry = registry.clone();
        Self::Getter(Rc::new(move || registry.keys()))
    }
}

impl From<Vec<ElementId>> for ItemSource {
    fn from(items: Vec<ElementId>) -> Self {
        Self::Static(items)
    }
}

impl From<Signal<Vec<ElementId>>> for ItemSource {
    fn from(items: Signal<Vec<ElementId>>) -> Self {
        Self::Signal(items)
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Configuration for [`Navigable::new`].
pub struct NavigableSettings {
    pub items: ItemSource,
    /// Initial committed index.
    pub index: usize,
    /// Manual activation: roving does not commit until confirmed.
    pub manual: bool,
    pub orientation: Orientation,
    /// Start in the waiting (nothing-selected) state.
    pub wait: bool,
    /// Fired with the committed index on every commit.
    pub on_change: Option<Rc<dyn Fn(usize)>>,
}

impl Default for NavigableSettings {
    fn default() -> Self {
        Self {
            items: ItemSource::Static(Vec::new()),
            index: 0,
            manual: false,
            orientation: Orientation::Horizontal,
            wait: true,
            on_change: None,
        }
    }
}

/// Target of an [`interact`](Navigable::interact) call.
pub enum Target {
    /// A literal index.
    At(usize),
    /// A function of the current cursor index.
    With(Box<dyn Fn(usize) -> usize>),
}

type IndexSubscriber = Rc<dyn Fn(usize)>;

// =============================================================================
// NAVIGABLE
// =============================================================================

/// Index-based navigation engine. Cheap to clone (handle semantics).
#[derive(Clone)]
pub struct Navigable {
    inner: Rc<NavigableInner>,
}

struct NavigableInner {
    document: Document,
    items: ItemSource,
    /// Committed (confirmed) index.
    index: Signal<usize>,
    /// Provisional roving index used while in manual mode.
    manual_index: Signal<usize>,
    /// True until the first navigation/selection event.
    waiting: Signal<bool>,
    manual: Signal<bool>,
    orientation: Signal<Orientation>,
    on_change: RefCell<Option<Rc<dyn Fn(usize)>>>,
    index_subscribers: RefCell<Vec<(usize, IndexSubscriber)>>,
    next_subscriber_id: Cell<usize>,
    parent_focused: Cell<bool>,
}

impl Navigable {
    pub fn new(document: Document, settings: NavigableSettings) -> Self {
        Self {
            inner: Rc::new(NavigableInner {
                document,
                items: settings.items,
                index: signal(settings.index),
                manual_index: signal(settings.index),
                waiting: signal(settings.wait),
                manual: signal(settings.manual),
                orientation: signal(settings.orientation),
                on_change: RefCell::new(settings.on_change),
                index_subscribers: RefCell::new(Vec::new()),
                next_subscriber_id: Cell::new(0),
                parent_focused: Cell::new(false),
            }),
        }
    }

    // =========================================================================
    // STATE ACCESS
    // =========================================================================

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// Current collection snapshot (re-read on every call).
    pub fn items(&self) -> Vec<ElementId> {
        self.inner.items.get()
    }

    pub fn len(&self) -> usize {
        self.inner.items.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Committed index, clamped against the live collection size.
    pub fn committed_index(&self) -> usize {
        Self::clamp(self.inner.index.get(), self.len())
    }

    /// Provisional index, clamped against the live collection size.
    pub fn provisional_index(&self) -> usize {
        Self::clamp(self.inner.manual_index.get(), self.len())
    }

    fn clamp(index: usize, length: usize) -> usize {
        if length == 0 {
            0
        } else {
            index.min(length - 1)
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.inner.waiting.get()
    }

    pub fn is_manual(&self) -> bool {
        self.inner.manual.get()
    }

    pub fn set_manual(&self, manual: bool) {
        self.inner.manual.set(manual);
    }

    pub fn orientation(&self) -> Orientation {
        self.inner.orientation.get()
    }

    pub fn set_orientation(&self, orientation: Orientation) {
        self.inner.orientation.set(orientation);
    }

    /// The confirmed element, or `None` while waiting or empty.
    pub fn selected_item(&self) -> Option<ElementId> {
        if self.inner.waiting.get() {
            return None;
        }
        let items = self.items();
        if items.is_empty() {
            return None;
        }
        items.get(Self::clamp(self.inner.index.get(), items.len())).copied()
    }

    /// The element the cursor is roving over (ignores waiting).
    pub fn active_item(&self) -> Option<ElementId> {
        let items = self.items();
        if items.is_empty() {
            return None;
        }
        items
            .get(Self::clamp(self.inner.manual_index.get(), items.len()))
            .copied()
    }

    // =========================================================================
    // CURSOR MOVEMENT
    // =========================================================================

    /// Commit to `index`: focus that element, end waiting, notify.
    pub fn set(&self, index: usize) {
        let items = self.items();
        if index >= items.len() {
            return;
        }
        self.inner.document.focus(items[index]);
        self.commit(index);
    }

    /// Move the cursor. Resolves `target` against the manual-aware cursor,
    /// focuses the element at the resolved index and commits unless the
    /// engine is in manual mode and `force_commit` is false (then only the
    /// provisional index advances).
    pub fn interact(&self, target: Target, force_commit: bool) {
        let items = self.items();
        if items.is_empty() {
            return;
        }
        let manual = self.inner.manual.get();
        let current = if manual {
            Self::clamp(self.inner.manual_index.get(), items.len())
        } else {
            Self::clamp(self.inner.index.get(), items.len())
        };
        let new_index = match &target {
            Target::At(index) => *index,
            Target::With(f) => f(current),
        };
        if new_index >= items.len() {
            return;
        }
        self.inner.document.focus(items[new_index]);

        if manual && !force_commit {
            self.inner.manual_index.set(new_index);
        } else {
            self.commit(new_index);
        }
    }

    /// Confirm `index` without moving DOM focus (used when selection is
    /// seeded programmatically rather than by the user).
    pub(crate) fn commit(&self, index: usize) {
        self.inner.index.set(index);
        self.inner.manual_index.set(index);
        self.inner.waiting.set(false);
        self.notify_index(index);
    }

    /// Leave the waiting state without touching the cursor.
    pub(crate) fn end_waiting(&self) {
        self.inner.waiting.set(false);
    }

    fn navigate(&self, direction: Direction, f: impl Fn(usize, bool, usize) -> usize + 'static) {
        let length = self.len();
        if length == 0 {
            return;
        }
        self.interact(
            Target::With(Box::new(move |index| {
                f(index, is_overflowed(index, direction, length), length)
            })),
            false,
        );
    }

    /// Advance the cursor. Overflow wraps to the first index; `ctrl` jumps
    /// straight to the last.
    pub fn go_next(&self, ctrl: bool) {
        self.navigate(Direction::Ascending, move |index, overflowed, length| {
            if ctrl {
                length - 1
            } else if overflowed {
                0
            } else {
                index + 1
            }
        });
    }

    /// Retreat the cursor. Overflow wraps to the last index; `ctrl` jumps
    /// straight to the first.
    pub fn go_back(&self, ctrl: bool) {
        self.navigate(Direction::Descending, move |index, overflowed, length| {
            if ctrl {
                0
            } else if overflowed {
                length - 1
            } else {
                index - 1
            }
        });
    }

    pub fn go_first(&self) {
        self.interact(Target::At(0), false);
    }

    pub fn go_last(&self) {
        let length = self.len();
        if length > 0 {
            self.interact(Target::At(length - 1), false);
        }
    }

    /// Refocus the confirmed element, if any.
    pub fn focus_selected(&self) {
        if let Some(item) = self.selected_item() {
            self.inner.document.focus(item);
        }
    }

    // =========================================================================
    // EVENT WIRING
    // =========================================================================

    /// Per-item selection handler: pointer events commit immediately,
    /// keyboard events commit on Enter/Space.
    pub fn handle_selection(&self, index: usize, event: &Event) {
        if event.is_pointer() {
            self.set(index);
        } else if let Some(key) = event.key_event() {
            if key.is_press() && matches!(key.key.as_str(), "Enter" | "Space") {
                self.set(index);
            }
        }
    }

    /// Wire arrow-key navigation onto the group container. Returns the
    /// teardown that detaches all three listeners.
    pub fn use_navigation(&self, container: ElementId) -> Cleanup {
        let document = self.inner.document.clone();

        let engine = self.clone();
        let key_down = document.add_listener(
            EventTarget::Element(container),
            EventType::KeyDown,
            move |event| engine.handle_navigation_key(event),
        );

        let inner = self.inner.clone();
        let focus = document.add_listener(
            EventTarget::Element(container),
            EventType::Focus,
            move |event| {
                if event.target == Some(container) {
                    inner.parent_focused.set(true);
                }
            },
        );

        let inner = self.inner.clone();
        let focus_in = document.add_listener(
            EventTarget::Element(container),
            EventType::FocusIn,
            move |event| {
                if event.target != Some(container) {
                    inner.parent_focused.set(false);
                }
            },
        );

        let inner = self.inner.clone();
        Box::new(move || {
            inner.parent_focused.set(false);
            inner.document.remove_listener(key_down);
            inner.document.remove_listener(focus);
            inner.document.remove_listener(focus_in);
        })
    }

    fn handle_navigation_key(&self, event: &Event) {
        let Some(key) = event.key_event() else { return };
        if is_not_valid_key(&key.key) {
            return;
        }
        let ctrl = key.modifiers.ctrl;
        let parent_focused = self.inner.parent_focused.get();
        let waiting = self.inner.waiting.get();

        if matches!(key.key.as_str(), "Enter" | "Space") {
            if parent_focused {
                event.prevent_default();
                if waiting {
                    self.go_first();
                } else {
                    self.focus_selected();
                }
            }
            return;
        }

        let (back_key, next_key) = match self.inner.orientation.get() {
            Orientation::Vertical => ("ArrowUp", "ArrowDown"),
            Orientation::Horizontal => ("ArrowLeft", "ArrowRight"),
        };

        if key.key == back_key {
            event.prevent_default();
            if parent_focused {
                if waiting {
                    self.go_last();
                } else {
                    self.focus_selected();
                }
            } else {
                self.go_back(ctrl);
            }
        } else if key.key == next_key {
            event.prevent_default();
            if parent_focused {
                if waiting {
                    self.go_first();
                } else {
                    self.focus_selected();
                }
            } else {
                self.go_next(ctrl);
            }
        }
    }

    /// Pick the start position when the group pops open. Call after the
    /// children have mounted into the collection - the rendering layer owns
    /// that scheduling.
    pub fn use_dynamic_open(&self, container: ElementId, start_with: StartPosition) {
        match start_with {
            StartPosition::First => self.go_first(),
            StartPosition::Last => self.go_last(),
            StartPosition::Auto => {
                if self.inner.waiting.get() {
                    self.inner.document.focus(container);
                } else {
                    self.focus_selected();
                }
            }
            StartPosition::Index(index) => {
                if index < self.len() {
                    self.set(index);
                } else {
                    log::warn!("dynamic-open start index {index} out of range");
                    self.inner.document.focus(container);
                }
            }
        }
    }

    /// Run plugin hooks against the mounted container, merging teardowns.
    pub fn use_plugins(
        &self,
        container: ElementId,
        plugins: Vec<Box<dyn FnOnce(&Self, ElementId) -> Cleanup>>,
    ) -> Cleanup {
        let cleanups: Vec<Cleanup> = plugins
            .into_iter()
            .map(|plugin| plugin(self, container))
            .collect();
        crate::types::merge_cleanups(cleanups)
    }

    // =========================================================================
    // COLLECTION MUTATION RECONCILIATION
    // =========================================================================

    /// Re-align the cursor after the item at `removed_index` left the
    /// collection: earlier removals shift the cursor down one, removing the
    /// cursor's own item clamps it, and an emptied collection returns the
    /// engine to the waiting state.
    pub fn reconcile_removal(&self, removed_index: usize) {
        let length = self.len();
        if length == 0 {
            self.inner.index.set(0);
            self.inner.manual_index.set(0);
            self.inner.waiting.set(true);
            return;
        }

        let committed = self.inner.index.get();
        let shifted = if removed_index < committed { committed - 1 } else { committed };
        let clamped = Self::clamp(shifted, length);
        if clamped != committed {
            self.inner.index.set(clamped);
        }
        // Removing at or before the cursor changes which element it
        // denotes even when the numeric index stays put.
        if removed_index <= committed {
            self.notify_index(clamped);
        }

        let provisional = self.inner.manual_index.get();
        let shifted = if removed_index < provisional {
            provisional - 1
        } else {
            provisional
        };
        self.inner.manual_index.set(Self::clamp(shifted, length));
    }

    /// Sync the provisional cursor back onto the committed index (used when
    /// focus leaves the group without a commit).
    pub(crate) fn resync_provisional(&self) {
        self.inner.manual_index.set(self.inner.index.get());
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Subscribe to the committed index. Fires immediately, then
    /// synchronously on every commit.
    pub fn subscribe_index(&self, f: impl Fn(usize) + 'static) -> Cleanup {
        let subscriber: IndexSubscriber = Rc::new(f);
        subscriber(self.committed_index());

        let id = self.inner.next_subscriber_id.get();
        self.inner.next_subscriber_id.set(id + 1);
        self.inner.index_subscribers.borrow_mut().push((id, subscriber));

        let inner = self.inner.clone();
        Box::new(move || {
            inner
                .index_subscribers
                .borrow_mut()
                .retain(|(entry, _)| *entry != id);
        })
    }

    /// Subscribe to "is this index the committed one" for one index.
    pub fn is_selected(&self, index: usize, f: impl Fn(bool) + 'static) -> Cleanup {
        self.subscribe_index(move |committed| f(committed == index))
    }

    /// Fires whenever the confirmed element changes to a different one,
    /// passing the previous element along.
    pub fn listen_selected(
        &self,
        f: impl Fn(ElementId, Option<ElementId>) + 'static,
    ) -> Cleanup {
        let previous: Rc<RefCell<Option<ElementId>>> = Rc::new(RefCell::new(None));
        let engine = self.clone();
        self.subscribe_index(move |_| {
            let selected = engine.selected_item();
            let mut previous = previous.borrow_mut();
            if let Some(selected) = selected {
                if *previous != Some(selected) {
                    f(selected, *previous);
                }
            }
            *previous = selected;
        })
    }

    fn notify_index(&self, index: usize) {
        let snapshot: Vec<IndexSubscriber> = self
            .inner
            .index_subscribers
            .borrow()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();
        for subscriber in snapshot {
            subscriber(index);
        }
        let on_change = self.inner.on_change.borrow().clone();
        if let Some(on_change) = on_change {
            on_change(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementKind, KeyboardEvent, Modifiers};
    use std::cell::Cell as StdCell;

    fn setup(count: usize) -> (Document, Vec<ElementId>, Navigable) {
        let document = Document::new();
        let items: Vec<ElementId> = (0..count)
            .map(|_| document.create_element(ElementKind::Button))
            .collect();
        let engine = Navigable::new(
            document.clone(),
            NavigableSettings {
                items: items.clone().into(),
                ..NavigableSettings::default()
            },
        );
        (document, items, engine)
    }

    #[test]
    fn test_waiting_until_first_interaction() {
        let (_, _, engine) = setup(3);
        assert!(engine.is_waiting());
        assert_eq!(engine.selected_item(), None);

        engine.set(1);
        assert!(!engine.is_waiting());
        assert!(engine.selected_item().is_some());
    }

    #[test]
    fn test_set_focuses_and_commits() {
        let (document, items, engine) = setup(3);
        engine.set(2);
        assert_eq!(engine.committed_index(), 2);
        assert_eq!(document.active_element(), Some(items[2]));
    }

    #[test]
    fn test_go_next_go_back_round_trip() {
        let (_, _, engine) = setup(3);
        engine.set(1);
        engine.go_next(false);
        assert_eq!(engine.committed_index(), 2);
        engine.go_back(false);
        assert_eq!(engine.committed_index(), 1);
    }

    #[test]
    fn test_wrap_at_both_ends() {
        let (_, _, engine) = setup(3);
        engine.set(2);
        engine.go_next(false);
        assert_eq!(engine.committed_index(), 0);

        engine.go_back(false);
        assert_eq!(engine.committed_index(), 2);
    }

    #[test]
    fn test_ctrl_jumps_to_extremes() {
        let (_, _, engine) = setup(5);
        engine.set(2);
        engine.go_next(true);
        assert_eq!(engine.committed_index(), 4);
        engine.go_back(true);
        assert_eq!(engine.committed_index(), 0);

        // Regardless of starting position.
        engine.set(0);
        engine.go_next(true);
        assert_eq!(engine.committed_index(), 4);
    }

    #[test]
    fn test_empty_collection_is_a_no_op() {
        let (_, _, engine) = setup(0);
        engine.go_next(false);
        engine.go_back(true);
        engine.go_last();
        assert!(engine.is_waiting());
        assert_eq!(engine.committed_index(), 0);
    }

    #[test]
    fn test_manual_mode_advances_provisional_only() {
        let (document, items, engine) = setup(3);
        engine.set(0);
        engine.set_manual(true);

        engine.go_next(false);
        assert_eq!(engine.committed_index(), 0);
        assert_eq!(engine.provisional_index(), 1);
        // Focus still roves.
        assert_eq!(document.active_element(), Some(items[1]));

        // Forced commit confirms the provisional position.
        engine.interact(Target::At(1), true);
        assert_eq!(engine.committed_index(), 1);
    }

    #[test]
    fn test_interact_out_of_range_is_a_no_op() {
        let (_, _, engine) = setup(2);
        engine.set(1);
        engine.interact(Target::At(9), false);
        assert_eq!(engine.committed_index(), 1);
    }

    fn setup_group(count: usize) -> (Document, ElementId, Vec<ElementId>, Navigable) {
        let document = Document::new();
        let container = document.create_element(ElementKind::Container);
        document.set_tab_index(container, Some(0));
        let items: Vec<ElementId> = (0..count)
            .map(|_| {
                let item = document.create_element(ElementKind::Button);
                document.append_child(container, item);
                item
            })
            .collect();
        let engine = Navigable::new(
            document.clone(),
            NavigableSettings {
                items: items.clone().into(),
                ..NavigableSettings::default()
            },
        );
        (document, container, items, engine)
    }

    #[test]
    fn test_keyboard_navigation_horizontal() {
        let (document, container, items, engine) = setup_group(3);
        let _cleanup = engine.use_navigation(container);
        engine.set(0);

        // ArrowRight on a child advances, ArrowUp is the wrong axis.
        let event = document.dispatch_key_down(items[0], KeyboardEvent::new("ArrowRight"));
        assert!(event.default_prevented());
        assert_eq!(engine.committed_index(), 1);

        document.dispatch_key_down(items[1], KeyboardEvent::new("ArrowUp"));
        assert_eq!(engine.committed_index(), 1);

        document.dispatch_key_down(
            items[1],
            KeyboardEvent::with_modifiers("ArrowLeft", Modifiers::ctrl()),
        );
        assert_eq!(engine.committed_index(), 0);
    }

    #[test]
    fn test_invalid_key_is_a_no_op() {
        let (document, container, items, engine) = setup_group(3);
        let _cleanup = engine.use_navigation(container);
        engine.set(1);

        let event = document.dispatch_key_down(items[1], KeyboardEvent::new("Escape"));
        assert!(!event.default_prevented());
        assert_eq!(engine.committed_index(), 1);
    }

    #[test]
    fn test_container_focused_enter_picks_first_while_waiting() {
        let (document, container, items, engine) = setup_group(3);
        let _cleanup = engine.use_navigation(container);

        document.focus(container);
        document.dispatch_key_down(container, KeyboardEvent::new("Enter"));
        assert_eq!(engine.committed_index(), 0);
        assert!(!engine.is_waiting());
        assert_eq!(document.active_element(), Some(items[0]));
    }

    #[test]
    fn test_use_navigation_cleanup_detaches() {
        let (document, container, items, engine) = setup_group(3);
        let cleanup = engine.use_navigation(container);
        engine.set(0);
        cleanup();

        document.dispatch_key_down(items[0], KeyboardEvent::new("ArrowRight"));
        assert_eq!(engine.committed_index(), 0);
        assert_eq!(
            document.listener_count(EventTarget::Element(container), EventType::KeyDown),
            0
        );
    }

    #[test]
    fn test_use_plugins_composes_and_merges_teardowns() {
        let (document, container, items, engine) = setup_group(3);
        for (item, label) in items.iter().zip(["Apple", "Banana", "Cherry"]) {
            document.set_text(*item, label);
        }

        let plugins: Vec<Box<dyn FnOnce(&Navigable, ElementId) -> Cleanup>> = vec![
            Box::new(|engine, container| use_key_match(engine, container)),
            Box::new(|engine, container| use_manual_blur(engine, container)),
        ];
        let cleanup = engine.use_plugins(container, plugins);

        // Type-ahead runs through the composed wiring; the resulting focus
        // move arms the blur watcher's window listener.
        document.dispatch_key_down(container, KeyboardEvent::new("b"));
        document.dispatch_key_up(container, KeyboardEvent::new("b"));
        assert_eq!(engine.committed_index(), 1);
        assert_eq!(document.listener_count(EventTarget::Window, EventType::FocusIn), 1);

        // One merged teardown reverses everything both plugins attached.
        cleanup();
        assert_eq!(
            document.listener_count(EventTarget::Element(container), EventType::KeyDown),
            0
        );
        assert_eq!(
            document.listener_count(EventTarget::Element(container), EventType::KeyUp),
            0
        );
        assert_eq!(
            document.listener_count(EventTarget::Element(container), EventType::FocusIn),
            0
        );
        assert_eq!(document.listener_count(EventTarget::Window, EventType::FocusIn), 0);
    }

    #[test]
    fn test_dynamic_open_policies() {
        let (document, items, engine) = setup(3);
        let container = document.create_element(ElementKind::Container);
        document.set_tab_index(container, Some(-1));

        // Auto while waiting focuses the container itself.
        engine.use_dynamic_open(container, StartPosition::Auto);
        assert_eq!(document.active_element(), Some(container));
        assert!(engine.is_waiting());

        engine.set(1);
        engine.use_dynamic_open(container, StartPosition::Auto);
        assert_eq!(document.active_element(), Some(items[1]));

        engine.use_dynamic_open(container, StartPosition::Last);
        assert_eq!(engine.committed_index(), 2);

        // Out of range degrades to the container, keeps the last commit.
        engine.use_dynamic_open(container, StartPosition::Index(9));
        assert_eq!(document.active_element(), Some(container));
        assert_eq!(engine.committed_index(), 2);
    }

    #[test]
    fn test_reconcile_removal_shifts_and_clamps() {
        let (_, items, engine) = setup(4);
        let source = signal(items.clone());
        let engine = Navigable::new(
            engine.document().clone(),
            NavigableSettings {
                items: source.clone().into(),
                ..NavigableSettings::default()
            },
        );
        engine.set(2);

        // Remove index 0: committed shifts down to 1.
        let mut remaining = source.get();
        remaining.remove(0);
        source.set(remaining.clone());
        engine.reconcile_removal(0);
        assert_eq!(engine.committed_index(), 1);

        // Removing a later item leaves the cursor alone.
        remaining.remove(2);
        source.set(remaining.clone());
        engine.reconcile_removal(2);
        assert_eq!(engine.committed_index(), 1);

        // Removing the committed item itself clamps to a valid index.
        remaining.remove(1);
        source.set(remaining.clone());
        engine.reconcile_removal(1);
        assert_eq!(engine.committed_index(), 0);

        // Empty the collection: back to waiting.
        source.set(Vec::new());
        engine.reconcile_removal(0);
        assert!(engine.is_waiting());
    }

    #[test]
    fn test_reconcile_removal_notifies_when_cursor_element_changes() {
        let document = Document::new();
        let items: Vec<ElementId> = (0..3)
            .map(|_| document.create_element(ElementKind::Button))
            .collect();
        let source = signal(items.clone());
        let engine = Navigable::new(
            document,
            NavigableSettings {
                items: source.clone().into(),
                ..NavigableSettings::default()
            },
        );
        engine.set(1);

        let notified = Rc::new(StdCell::new(0));
        let notified_inner = notified.clone();
        let _cleanup = engine.subscribe_index(move |_| {
            notified_inner.set(notified_inner.get() + 1);
        });
        assert_eq!(notified.get(), 1);

        // Remove the committed item: the index stays 1 but now denotes
        // the former index-2 element, so observers must hear about it.
        let mut remaining = source.get();
        remaining.remove(1);
        source.set(remaining.clone());
        engine.reconcile_removal(1);
        assert_eq!(engine.committed_index(), 1);
        assert_eq!(engine.selected_item(), Some(items[2]));
        assert_eq!(notified.get(), 2);

        // Removing after the cursor leaves both index and element alone:
        // no notification.
        engine.set(0);
        assert_eq!(notified.get(), 3);
        remaining.remove(1);
        source.set(remaining);
        engine.reconcile_removal(1);
        assert_eq!(engine.selected_item(), Some(items[0]));
        assert_eq!(notified.get(), 3);
    }

    #[test]
    fn test_is_selected_subscription() {
        let (_, _, engine) = setup(3);
        let selected = Rc::new(StdCell::new(false));

        let selected_inner = selected.clone();
        let _cleanup = engine.is_selected(1, move |is_selected| selected_inner.set(is_selected));
        assert!(!selected.get());

        engine.set(1);
        assert!(selected.get());

        engine.set(0);
        assert!(!selected.get());
    }

    #[test]
    fn test_handle_selection_commits_on_enter_and_click() {
        let (_document, items, engine) = setup(3);

        let click = Event::click(items[2]);
        engine.handle_selection(2, &click);
        assert_eq!(engine.committed_index(), 2);

        let key = Event::keyboard(
            EventType::KeyDown,
            Some(items[0]),
            KeyboardEvent::new("Enter"),
        );
        engine.handle_selection(0, &key);
        assert_eq!(engine.committed_index(), 0);

        // Unrelated keys do not commit.
        let key = Event::keyboard(
            EventType::KeyDown,
            Some(items[1]),
            KeyboardEvent::new("a"),
        );
        engine.handle_selection(1, &key);
        assert_eq!(engine.committed_index(), 0);
    }

    #[test]
    fn test_on_change_fires_on_commit() {
        let document = Document::new();
        let items: Vec<ElementId> = (0..2)
            .map(|_| document.create_element(ElementKind::Button))
            .collect();
        let fired = Rc::new(StdCell::new(usize::MAX));
        let fired_inner = fired.clone();
        let engine = Navigable::new(
            document,
            NavigableSettings {
                items: items.into(),
                on_change: Some(Rc::new(move |index| fired_inner.set(index))),
                ..NavigableSettings::default()
            },
        );
        engine.set(1);
        assert_eq!(fired.get(), 1);
    }
}
