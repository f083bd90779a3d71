//! Hover synchronisation plugin.
//!
//! Pointer movement over an item roves the cursor onto it without
//! committing, so hover and keyboard navigation share one provisional
//! position instead of fighting over two.

use crate::dom::{ElementId, EventTarget, EventType};
use crate::types::Cleanup;

use super::{Navigable, Target};

/// Rove onto `index` whenever the pointer moves over `item`.
pub fn use_hover_sync(navigable: &Navigable, item: ElementId, index: usize) -> Cleanup {
    let document = navigable.document().clone();
    let engine = navigable.clone();
    let listener = document.add_listener(
        EventTarget::Element(item),
        EventType::PointerMove,
        move |_| {
            engine.interact(Target::At(index), false);
        },
    );

    Box::new(move || {
        document.remove_listener(listener);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, ElementKind};
    use crate::stores::navigable::NavigableSettings;

    fn setup(manual: bool) -> (Document, Vec<ElementId>, Navigable) {
        let document = Document::new();
        let container = document.create_element(ElementKind::Container);
        let items: Vec<ElementId> = (0..3)
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
                manual,
                ..NavigableSettings::default()
            },
        );
        (document, items, engine)
    }

    #[test]
    fn test_hover_commits_in_automatic_mode() {
        let (document, items, engine) = setup(false);
        let _cleanups: Vec<Cleanup> = items
            .iter()
            .enumerate()
            .map(|(index, item)| use_hover_sync(&engine, *item, index))
            .collect();

        document.pointer_move(items[2]);
        assert_eq!(engine.committed_index(), 2);
        assert_eq!(document.active_element(), Some(items[2]));
    }

    #[test]
    fn test_hover_roves_without_commit_in_manual_mode() {
        let (document, items, engine) = setup(true);
        let _cleanups: Vec<Cleanup> = items
            .iter()
            .enumerate()
            .map(|(index, item)| use_hover_sync(&engine, *item, index))
            .collect();
        engine.interact(Target::At(0), true);

        document.pointer_move(items[2]);
        assert_eq!(engine.provisional_index(), 2);
        assert_eq!(engine.committed_index(), 0);
    }

    #[test]
    fn test_cleanup_detaches_listener() {
        let (document, items, engine) = setup(false);
        let cleanup = use_hover_sync(&engine, items[1], 1);
        cleanup();

        document.pointer_move(items[1]);
        assert!(engine.is_waiting());
        assert_eq!(
            document.listener_count(EventTarget::Element(items[1]), EventType::PointerMove),
            0
        );
    }
}
