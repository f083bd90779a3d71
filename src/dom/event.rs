//! Event types flowing through the document dispatcher.
//!
//! The shape follows the keyboard state module: a small `KeyboardEvent`
//! value with modifier flags and press/release state, wrapped here in a
//! generic [`Event`] envelope so pointer and focus events share the same
//! dispatch path and prevent-default mechanics.

use std::cell::Cell;

use super::element::ElementId;

// =============================================================================
// KEYBOARD
// =============================================================================

/// Keyboard modifier state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Create empty modifiers.
    pub fn none() -> Self {
        Self::default()
    }

    /// Create modifiers with ctrl.
    pub fn ctrl() -> Self {
        Self { ctrl: true, ..Self::default() }
    }

    /// Create modifiers with shift.
    pub fn shift() -> Self {
        Self { shift: true, ..Self::default() }
    }
}

/// Key event state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    Press,
    Release,
}

/// Keyboard event.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyboardEvent {
    /// The key that was pressed (e.g. "a", "Enter", "ArrowUp").
    pub key: String,
    /// Modifier keys state.
    pub modifiers: Modifiers,
    /// Press/release state.
    pub state: KeyState,
}

impl KeyboardEvent {
    /// Create a simple key press event.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::default(),
            state: KeyState::Press,
        }
    }

    /// Create a key press with modifiers.
    pub fn with_modifiers(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            state: KeyState::Press,
        }
    }

    /// Check if this is a press event.
    pub fn is_press(&self) -> bool {
        self.state == KeyState::Press
    }
}

// =============================================================================
// EVENT ENVELOPE
// =============================================================================

/// Listener slot an event is dispatched to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventType {
    KeyDown,
    KeyUp,
    Click,
    PointerMove,
    /// Fires on the target element only (does not bubble).
    Focus,
    /// Fires on the target, its ancestors, then the window.
    FocusIn,
}

impl EventType {
    /// Whether the event walks up the ancestor chain to the window.
    pub(crate) fn bubbles(self) -> bool {
        !matches!(self, Self::Focus)
    }
}

/// Where a listener is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// Global scope - the scarce resource the engines must not leak.
    Window,
    Element(ElementId),
}

/// Kind-specific payload.
#[derive(Clone, Debug, PartialEq)]
pub enum EventPayload {
    Keyboard(KeyboardEvent),
    Pointer,
    Focus,
}

/// An event in flight.
///
/// `default_prevented` is a `Cell` so handlers receiving `&Event` can
/// suppress the default action without exclusive access.
#[derive(Debug)]
pub struct Event {
    pub event_type: EventType,
    pub target: Option<ElementId>,
    pub payload: EventPayload,
    default_prevented: Cell<bool>,
}

impl Event {
    pub fn new(event_type: EventType, target: Option<ElementId>, payload: EventPayload) -> Self {
        Self {
            event_type,
            target,
            payload,
            default_prevented: Cell::new(false),
        }
    }

    /// Build a keyboard event envelope.
    pub fn keyboard(event_type: EventType, target: Option<ElementId>, key: KeyboardEvent) -> Self {
        Self::new(event_type, target, EventPayload::Keyboard(key))
    }

    /// Build a click envelope.
    pub fn click(target: ElementId) -> Self {
        Self::new(EventType::Click, Some(target), EventPayload::Pointer)
    }

    /// Build a focus-in envelope.
    pub fn focus_in(target: ElementId) -> Self {
        Self::new(EventType::FocusIn, Some(target), EventPayload::Focus)
    }

    /// The keyboard payload, if this is a keyboard event.
    pub fn key_event(&self) -> Option<&KeyboardEvent> {
        match &self.payload {
            EventPayload::Keyboard(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.payload, EventPayload::Pointer)
    }

    pub fn is_focus(&self) -> bool {
        matches!(self.payload, EventPayload::Focus)
    }

    /// Suppress the default action of whatever produced this event.
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prevent_default_through_shared_ref() {
        let event = Event::keyboard(EventType::KeyDown, None, KeyboardEvent::new("Enter"));
        assert!(!event.default_prevented());
        event.prevent_default();
        assert!(event.default_prevented());
    }

    #[test]
    fn test_key_event_accessor() {
        let event = Event::keyboard(EventType::KeyDown, None, KeyboardEvent::new("a"));
        assert_eq!(event.key_event().map(|k| k.key.as_str()), Some("a"));

        let click = Event::click(ElementId(1));
        assert!(click.key_event().is_none());
        assert!(click.is_pointer());
    }

    #[test]
    fn test_focus_does_not_bubble() {
        assert!(!EventType::Focus.bubbles());
        assert!(EventType::FocusIn.bubbles());
        assert!(EventType::Click.bubbles());
    }
}
