//! Manual-blur reconciliation plugin.
//!
//! While the user roves inside a manual-activation group, the provisional
//! index drifts away from the committed one. If focus then leaves the
//! group entirely, the drift must not survive: this plugin watches
//! window-level focus movement while the group owns focus and resyncs the
//! provisional index back onto the committed index on the way out.
//!
//! The window listener only exists between "focus entered the group" and
//! "focus left the group" - attach is guarded so repeated focus-ins never
//! stack a second listener.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::{ElementId, EventTarget, EventType, ListenerId};
use crate::types::Cleanup;

use super::Navigable;

/// Wire blur reconciliation onto a mounted group container.
pub fn use_manual_blur(navigable: &Navigable, container: ElementId) -> Cleanup {
    let document = navigable.document().clone();
    let window_listener: Rc<RefCell<Option<ListenerId>>> = Rc::new(RefCell::new(None));

    let engine = navigable.clone();
    let window_slot = window_listener.clone();
    let enter = document.add_listener(
        EventTarget::Element(container),
        EventType::FocusIn,
        move |_| {
            if window_slot.borrow().is_some() {
                return;
            }
            let engine = engine.clone();
            let slot = window_slot.clone();
            let document = engine.document().clone();
            let listener = document.add_listener(
                EventTarget::Window,
                EventType::FocusIn,
                move |event| {
                    let Some(target) = event.target else { return };
                    if Some(target) == engine.selected_item() {
                        engine.resync_provisional();
                    }
                    if !engine.document().contains(container, target) {
                        engine.resync_provisional();
                        if let Some(id) = slot.borrow_mut().take() {
                            engine.document().remove_listener(id);
                        }
                    }
                },
            );
            *window_slot.borrow_mut() = Some(listener);
        },
    );

    let window_slot = window_listener;
    Box::new(move || {
        document.remove_listener(enter);
        if let Some(id) = window_slot.borrow_mut().take() {
            document.remove_listener(id);
        }
    })
}
