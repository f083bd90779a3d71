//! Tab-order containment for modal-like containers.
//!
//! Trapping partitions the document's focusable elements into internal
//! (inside the container) and external. External elements are pulled out
//! of the tab order with a forced tabindex of -1, snapshotted first so
//! release restores every original value verbatim. A Tab interceptor on
//! the container closes the cycle: Shift+Tab on the first internal
//! element wraps to the last, Tab on the last wraps to the first.

use crate::dom::{Document, ElementId, EventTarget, EventType, KeyState};
use crate::types::Cleanup;

/// Focus containment for one container element.
pub struct FocusTrap {
    document: Document,
    container: ElementId,
}

impl FocusTrap {
    pub fn new(document: Document, container: ElementId) -> Self {
        Self { document, container }
    }

    /// Document-order focusables split into (internal, external).
    fn partition(&self) -> (Vec<ElementId>, Vec<ElementId>) {
        let mut internal = Vec::new();
        let mut external = Vec::new();
        for element in self.document.all_elements() {
            if !self.document.is_focusable(element) {
                continue;
            }
            if self.document.contains(self.container, element) {
                internal.push(element);
            } else {
                external.push(element);
            }
        }
        (internal, external)
    }

    /// Activate the trap. The membership snapshot is taken now; elements
    /// mounted later are not part of the cycle until the trap is rebuilt.
    ///
    /// `fallback` receives focus on any Tab press when the container holds
    /// no focusable element at all. The returned closure releases the trap:
    /// it detaches the interceptor and restores every external tabindex.
    pub fn trap(&self, fallback: Option<ElementId>) -> Cleanup {
        let (internal, external) = self.partition();

        let snapshot: Vec<(ElementId, Option<i32>)> = external
            .iter()
            .map(|element| (*element, self.document.explicit_tab_index(*element)))
            .collect();
        for element in &external {
            self.document.set_tab_index(*element, Some(-1));
        }

        let document = self.document.clone();
        let interceptor = self.document.add_listener(
            EventTarget::Element(self.container),
            EventType::KeyDown,
            move |event| {
                let Some(key) = event.key_event() else { return };
                if key.key != "Tab" || key.state != KeyState::Press {
                    return;
                }

                match internal.as_slice() {
                    [] => {
                        if let Some(fallback) = fallback {
                            event.prevent_default();
                            document.focus(fallback);
                        }
                    }
                    [only] => {
                        event.prevent_default();
                        document.focus(*only);
                    }
                    [first, .., last] => {
                        let active = document.active_element();
                        if key.modifiers.shift && active == Some(*first) {
                            event.prevent_default();
                            document.focus(*last);
                        } else if !key.modifiers.shift && active == Some(*last) {
                            event.prevent_default();
                            document.focus(*first);
                        }
                    }
                }
            },
        );

        let document = self.document.clone();
        Box::new(move || {
            document.remove_listener(interceptor);
            for (element, original) in snapshot {
                document.set_tab_index(element, original);
            }
        })
    }
}
