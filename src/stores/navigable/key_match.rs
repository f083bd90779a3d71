//! Type-ahead plugin.
//!
//! Keys pressed before the next release accumulate into a lowercase
//! buffer; on release the cursor moves to the first item whose text
//! content starts with the buffer (case-insensitive). The buffer clears
//! after every resolution attempt, match or not.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dom::{ElementId, EventTarget, EventType};
use crate::types::Cleanup;

use super::{Navigable, Target};

/// Wire type-ahead onto a mounted group container.
pub fn use_key_match(navigable: &Navigable, container: ElementId) -> Cleanup {
    let document = navigable.document().clone();
    let keys: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let key_pressed = Rc::new(Cell::new(false));

    let keys_press = keys.clone();
    let pressed = key_pressed.clone();
    let key_down = document.add_listener(
        EventTarget::Element(container),
        EventType::KeyDown,
        move |event| {
            let Some(key) = event.key_event() else { return };
            let lowered = key.key.to_lowercase();
            let mut keys = keys_press.borrow_mut();
            if !keys.contains(&lowered) {
                keys.push(lowered);
            }
            pressed.set(true);
        },
    );

    let engine = navigable.clone();
    let keys_release = keys.clone();
    let pressed = key_pressed.clone();
    let key_up = document.add_listener(
        EventTarget::Element(container),
        EventType::KeyUp,
        move |_| {
            if !pressed.get() {
                return;
            }
            let needle: String = keys_release.borrow().concat();
            let items = engine.items();
            for (index, item) in items.iter().enumerate() {
                let text = engine.document().text_content(*item).to_lowercase();
                if text.starts_with(&needle) {
                    engine.interact(Target::At(index), false);
                    break;
                }
            }
            keys_release.borrow_mut().clear();
            pressed.set(false);
        },
    );

    Box::new(move || {
        document.remove_listener(key_down);
        document.remove_listener(key_up);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, ElementKind, KeyboardEvent};
    use crate::stores::navigable::NavigableSettings;

    fn setup(labels: &[&str]) -> (Document, ElementId, Vec<ElementId>, Navigable) {
        let document = Document::new();
        let container = document.create_element(ElementKind::Container);
        let items: Vec<ElementId> = labels
            .iter()
            .map(|label| {
                let item = document.create_element(ElementKind::Button);
                document.set_text(item, *label);
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
    fn test_single_key_match() {
        let (document, container, _, engine) = setup(&["Apple", "Banana", "Cherry"]);
        let _cleanup = use_key_match(&engine, container);

        document.dispatch_key_down(container, KeyboardEvent::new("b"));
        document.dispatch_key_up(container, KeyboardEvent::new("b"));
        assert_eq!(engine.committed_index(), 1);
    }

    #[test]
    fn test_no_match_leaves_cursor() {
        let (document, container, _, engine) = setup(&["Apple", "Banana", "Cherry"]);
        let _cleanup = use_key_match(&engine, container);
        engine.set(2);

        document.dispatch_key_down(container, KeyboardEvent::new("z"));
        document.dispatch_key_up(container, KeyboardEvent::new("z"));
        assert_eq!(engine.committed_index(), 2);
    }

    #[test]
    fn test_multi_key_buffer_and_clear() {
        let (document, container, _, engine) = setup(&["Car", "Cat", "Cup"]);
        let _cleanup = use_key_match(&engine, container);

        // "c" + "a" buffered before release resolve together.
        document.dispatch_key_down(container, KeyboardEvent::new("c"));
        document.dispatch_key_down(container, KeyboardEvent::new("a"));
        document.dispatch_key_up(container, KeyboardEvent::new("a"));
        assert_eq!(engine.committed_index(), 0);

        // The buffer cleared after resolving, so "cu" matches fresh.
        document.dispatch_key_down(container, KeyboardEvent::new("c"));
        document.dispatch_key_down(container, KeyboardEvent::new("u"));
        document.dispatch_key_up(container, KeyboardEvent::new("u"));
        assert_eq!(engine.committed_index(), 2);
    }

    #[test]
    fn test_cleanup_detaches_listeners() {
        let (document, container, _, engine) = setup(&["Apple", "Banana"]);
        let cleanup = use_key_match(&engine, container);
        cleanup();

        document.dispatch_key_down(container, KeyboardEvent::new("b"));
        document.dispatch_key_up(container, KeyboardEvent::new("b"));
        assert!(engine.is_waiting());
        assert_eq!(
            document.listener_count(EventTarget::Element(container), EventType::KeyUp),
            0
        );
    }
}
