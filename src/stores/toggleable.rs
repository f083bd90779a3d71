//! Open/close state machine for disclosure, popover and menu patterns.
//!
//! The engine owns the button/panel association (association only - the
//! rendering layer owns the element lifetimes) and the dismissal wiring:
//! outside click, focus leave and escape each map to at most one window
//! listener, attached while the panel is mounted and open, detached on
//! close and on teardown. Window listeners are the scarce resource here;
//! every attach path is guarded and every teardown is idempotent.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use bitflags::bitflags;
use spark_signals::{signal, Signal};

use crate::dom::{Document, ElementId, ElementKind, Event, EventTarget, EventType};
use crate::types::Cleanup;

bitflags! {
    /// Dismissal reasons a panel can opt into.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DismissReason: u8 {
        const FOCUS_LEAVE = 1;
        const CLICK_OUTSIDE = 1 << 1;
        const ESCAPE_KEY = 1 << 2;
    }
}

/// Focus-return hint for [`Toggleable::close`].
pub enum CloseRef<'a> {
    /// No hint: focus returns to the button.
    None,
    /// Focus this element, unless it lives inside the panel.
    Element(ElementId),
    /// Resolve the return target from the event that triggered the close.
    Event(&'a Event),
}

/// Configuration for [`Toggleable::use_panel`].
pub struct PanelConfig {
    pub dismiss: DismissReason,
    /// Runs before every open -> closed transition.
    pub before_close: Option<Rc<dyn Fn()>>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            dismiss: DismissReason::all(),
            before_close: None,
        }
    }
}

type OpenSubscriber = Rc<dyn Fn(bool)>;

// =============================================================================
// TOGGLEABLE
// =============================================================================

/// Open/closed toggle engine. Cheap to clone (handle semantics).
#[derive(Clone)]
pub struct Toggleable {
    inner: Rc<ToggleableInner>,
}

struct ToggleableInner {
    document: Document,
    open: Signal<bool>,
    button: Cell<Option<ElementId>>,
    panel: Cell<Option<ElementId>>,
    /// Focus must stay within the panel while open: opening suppresses the
    /// triggering event's default action so the button's own focus shift
    /// does not fight the panel's focus management.
    trap_focus: bool,
    before_close: RefCell<Option<Rc<dyn Fn()>>>,
    /// Reasons the mounted panel opted into; re-armed on every reopen.
    dismiss: Cell<DismissReason>,
    dismiss_listeners: RefCell<Vec<(DismissReason, crate::dom::ListenerId)>>,
    subscribers: RefCell<Vec<(usize, OpenSubscriber)>>,
    next_subscriber_id: Cell<usize>,
}

impl Toggleable {
    pub fn new(document: Document, trap_focus: bool) -> Self {
        Self {
            inner: Rc::new(ToggleableInner {
                document,
                open: signal(false),
                button: Cell::new(None),
                panel: Cell::new(None),
                trap_focus,
                before_close: RefCell::new(None),
                dismiss: Cell::new(DismissReason::empty()),
                dismiss_listeners: RefCell::new(Vec::new()),
                subscribers: RefCell::new(Vec::new()),
                next_subscriber_id: Cell::new(0),
            }),
        }
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    pub fn button(&self) -> Option<ElementId> {
        self.inner.button.get()
    }

    pub fn panel(&self) -> Option<ElementId> {
        self.inner.panel.get()
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Transition to OPEN unconditionally.
    pub fn open(&self) {
        self.set_open_state(true);
    }

    /// Force the open flag without focus-return or hook logic.
    pub fn set_open(&self, open: bool) {
        self.set_open_state(open);
    }

    /// Flip the state. Opening under trap-focus semantics suppresses the
    /// triggering event's default action; closing goes through
    /// [`close`](Self::close) with the event as the focus-return hint.
    pub fn toggle(&self, event: &Event) {
        if self.is_open() {
            self.close(CloseRef::Event(event));
        } else {
            if self.inner.trap_focus {
                event.prevent_default();
            }
            self.set_open_state(true);
        }
    }

    /// Transition to CLOSED, running the `before_close` hook first, then
    /// return focus per the hint:
    /// - no hint: the button;
    /// - an element inside the panel: the button; outside: the element;
    /// - an event targeting the panel interior or the button: the button;
    ///   a focusable target outside: that target; anything else: the button.
    ///
    /// A focus event that landed on the button never closes - the button's
    /// own toggle handles that interaction. Closing when already closed is
    /// a no-op.
    pub fn close(&self, close_ref: CloseRef<'_>) {
        if !self.is_open() {
            return;
        }
        let button = self.inner.button.get();
        if let CloseRef::Event(event) = &close_ref {
            if event.is_focus() && event.target.is_some() && event.target == button {
                return;
            }
        }

        let hook = self.inner.before_close.borrow().clone();
        if let Some(hook) = hook {
            hook();
        }
        self.set_open_state(false);

        let target = match close_ref {
            CloseRef::None => button,
            CloseRef::Element(element) => {
                if self.in_panel(element) {
                    button
                } else {
                    Some(element)
                }
            }
            CloseRef::Event(event) => match event.target {
                Some(target) if self.in_panel(target) || Some(target) == button => button,
                Some(target) if self.inner.document.is_focusable(target) => Some(target),
                _ => button,
            },
        };
        if let Some(target) = target {
            self.inner.document.focus(target);
        }
    }

    fn in_panel(&self, element: ElementId) -> bool {
        self.inner
            .panel
            .get()
            .is_some_and(|panel| self.inner.document.contains(panel, element))
    }

    fn set_open_state(&self, open: bool) {
        if self.inner.open.get() == open {
            return;
        }
        self.inner.open.set(open);
        // Dismissal listeners only live while open: released on every
        // close, re-armed on reopen while the panel stays mounted.
        if open {
            if self.inner.panel.get().is_some() {
                self.arm_dismissal();
            }
        } else {
            self.release_dismissal();
        }
        self.notify(open);
    }

    // =========================================================================
    // MOUNT HOOKS
    // =========================================================================

    /// Associate the trigger element and wire its ARIA contract: a
    /// `role="button"` annotation when the element is not a native button,
    /// `aria-controls` pointing at the panel id, and `aria-expanded` kept
    /// in sync with the open flag.
    pub fn define_button(&self, node: ElementId, panel_id: &str) -> Cleanup {
        self.inner.button.set(Some(node));
        let document = self.inner.document.clone();
        if document.kind(node) != Some(ElementKind::Button) {
            document.set_attribute(node, "role", "button");
            document.make_focusable(node, 0);
        }
        document.set_attribute(node, "aria-controls", panel_id);

        let sync = self.subscribe(move |open| {
            document.set_attribute(node, "aria-expanded", if open { "true" } else { "false" });
        });

        let inner = self.inner.clone();
        Box::new(move || {
            sync();
            if inner.button.get() == Some(node) {
                inner.button.set(None);
            }
        })
    }

    /// Associate the panel element and give it the id the button's
    /// `aria-controls` points at.
    pub fn define_panel(&self, node: ElementId, panel_id: &str) -> Cleanup {
        self.inner.panel.set(Some(node));
        self.inner.document.set_attribute(node, "id", panel_id);

        let inner = self.inner.clone();
        Box::new(move || {
            if inner.panel.get() == Some(node) {
                inner.panel.set(None);
            }
        })
    }

    /// Wire the trigger interactions: click toggles, each key in
    /// `open_keys` opens.
    pub fn use_button(&self, node: ElementId, open_keys: &'static [&'static str]) -> Cleanup {
        let document = self.inner.document.clone();

        let engine = self.clone();
        let click = document.add_listener(
            EventTarget::Element(node),
            EventType::Click,
            move |event| engine.toggle(event),
        );

        let engine = self.clone();
        let key_down = document.add_listener(
            EventTarget::Element(node),
            EventType::KeyDown,
            move |event| {
                let Some(key) = event.key_event() else { return };
                if key.is_press() && open_keys.contains(&key.key.as_str()) {
                    event.prevent_default();
                    engine.open();
                }
            },
        );

        Box::new(move || {
            document.remove_listener(click);
            document.remove_listener(key_down);
        })
    }

    /// Mount the panel: register the `before_close` hook and the requested
    /// dismissal reasons. Window listeners are armed while the engine is
    /// open - immediately if it already is, re-armed on every reopen - and
    /// released on every close. The returned teardown symmetrically removes
    /// everything and is safe to call after a close already released the
    /// listeners.
    pub fn use_panel(&self, node: ElementId, config: PanelConfig) -> Cleanup {
        self.inner.panel.set(Some(node));
        *self.inner.before_close.borrow_mut() = config.before_close;
        self.inner.dismiss.set(config.dismiss);
        if self.is_open() {
            self.arm_dismissal();
        }

        let inner = self.inner.clone();
        let engine = self.clone();
        Box::new(move || {
            engine.release_dismissal();
            inner.dismiss.set(DismissReason::empty());
            *inner.before_close.borrow_mut() = None;
            if inner.panel.get() == Some(node) {
                inner.panel.set(None);
            }
        })
    }

    /// Attach one window listener per opted-in reason. Already-armed
    /// reasons are left alone.
    fn arm_dismissal(&self) {
        let dismiss = self.inner.dismiss.get();

        if dismiss.contains(DismissReason::CLICK_OUTSIDE) {
            let engine = self.clone();
            self.attach_dismissal(DismissReason::CLICK_OUTSIDE, EventType::Click, move |event| {
                let Some(target) = event.target else { return };
                // The button's own click handler toggles; stay out of its way.
                if Some(target) == engine.inner.button.get() || engine.in_panel(target) {
                    return;
                }
                engine.close(CloseRef::Event(event));
            });
        }

        if dismiss.contains(DismissReason::FOCUS_LEAVE) {
            let engine = self.clone();
            self.attach_dismissal(DismissReason::FOCUS_LEAVE, EventType::FocusIn, move |event| {
                let Some(target) = event.target else { return };
                if engine.in_panel(target) {
                    return;
                }
                engine.close(CloseRef::Event(event));
            });
        }

        if dismiss.contains(DismissReason::ESCAPE_KEY) {
            let engine = self.clone();
            self.attach_dismissal(DismissReason::ESCAPE_KEY, EventType::KeyDown, move |event| {
                let Some(key) = event.key_event() else { return };
                if key.is_press() && key.key == "Escape" {
                    engine.close(CloseRef::None);
                }
            });
        }
    }

    fn attach_dismissal(
        &self,
        reason: DismissReason,
        event_type: EventType,
        handler: impl Fn(&Event) + 'static,
    ) {
        let mut listeners = self.inner.dismiss_listeners.borrow_mut();
        if listeners.iter().any(|(entry, _)| *entry == reason) {
            return;
        }
        let id = self
            .inner
            .document
            .add_listener(EventTarget::Window, event_type, handler);
        listeners.push((reason, id));
    }

    fn release_dismissal(&self) {
        let listeners: Vec<_> = self.inner.dismiss_listeners.borrow_mut().drain(..).collect();
        for (_, id) in listeners {
            self.inner.document.remove_listener(id);
        }
    }

    // =========================================================================
    // SUBSCRIPTIONS
    // =========================================================================

    /// Subscribe to the open flag. Fires immediately, then synchronously on
    /// every transition.
    pub fn subscribe(&self, f: impl Fn(bool) + 'static) -> Cleanup {
        let subscriber: OpenSubscriber = Rc::new(f);
        subscriber(self.inner.open.get());

        let id = self.inner.next_subscriber_id.get();
        self.inner.next_subscriber_id.set(id + 1);
        self.inner.subscribers.borrow_mut().push((id, subscriber));

        let inner = self.inner.clone();
        Box::new(move || {
            inner.subscribers.borrow_mut().retain(|(entry, _)| *entry != id);
        })
    }

    fn notify(&self, open: bool) {
        let snapshot: Vec<OpenSubscriber> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();
        for subscriber in snapshot {
            subscriber(open);
        }
    }
}
