//! Selection engine: binds the navigation cursor to a value domain.
//!
//! Options register their element and value into a backing registry; the
//! committed index of the embedded [`Navigable`] then resolves to the
//! externally observed "current value". A configured default value may
//! pre-seed the selection by linear scan, applied at most once and only
//! before any explicit interaction. The engine becomes permanently
//! initialized on the first explicit `select` or the first registration
//! that arrives marked selected - later marked registrations lose.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dom::{Document, ElementId};
use crate::stores::hashable::Hashable;
use crate::stores::navigable::{ItemSource, Navigable, NavigableSettings};
use crate::types::{merge_cleanups, Cleanup, StoreError};

// =============================================================================
// SELECTABLE
// =============================================================================

/// Value-binding selection engine. Cheap to clone (handle semantics).
pub struct Selectable<V> {
    inner: Rc<SelectableInner<V>>,
}

impl<V> Clone for Selectable<V> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

struct SelectableInner<V> {
    registry: Hashable<ElementId, V>,
    navigable: Navigable,
    default: Option<V>,
    /// Permanently true after the first explicit select or selected
    /// registration. Blocks every later attempt to seed the selection.
    initialized: Cell<bool>,
    /// True once the default value has been matched and applied.
    default_applied: Cell<bool>,
}

impl<V> Selectable<V>
where
    V: Clone + PartialEq + 'static,
{
    /// Create a selection engine over a fresh registry. The navigation
    /// collection is a live view over the registry's key order.
    pub fn new(document: Document, default: Option<V>) -> Self {
        let registry: Hashable<ElementId, V> = Hashable::new();
        let navigable = Navigable::new(
            document,
            NavigableSettings {
                items: ItemSource::registry_keys(&registry),
                ..NavigableSettings::default()
            },
        );
        Self {
            inner: Rc::new(SelectableInner {
                registry,
                navigable,
                default,
                initialized: Cell::new(false),
                default_applied: Cell::new(false),
            }),
        }
    }

    /// The backing registry (option elements and their values).
    pub fn registry(&self) -> &Hashable<ElementId, V> {
        &self.inner.registry
    }

    /// The embedded navigation engine, for keyboard wiring and plugins.
    pub fn navigable(&self) -> &Navigable {
        &self.inner.navigable
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Register an option. When `is_selected` is true and no explicit
    /// interaction has happened yet, the new option becomes the selection
    /// and the engine initializes - inside the same update, so the first
    /// such call in a tick wins deterministically.
    pub fn register(
        &self,
        key: ElementId,
        value: V,
        is_selected: bool,
    ) -> Result<usize, StoreError> {
        let engine = self.clone();
        self.inner.registry.register_with(key, value, move |key| {
            if is_selected && !engine.inner.initialized.get() {
                engine.inner.initialized.set(true);
                if let Some(index) = engine.inner.registry.index_of(key) {
                    engine.inner.navigable.commit(index);
                }
            }
        })
    }

    /// Remove an option and re-align the cursor: the committed index shifts
    /// or clamps per the removal rule, and an emptied registry returns the
    /// engine to the waiting state.
    pub fn unregister(&self, key: &ElementId) -> Result<(), StoreError> {
        let removed_index = self
            .inner
            .registry
            .index_of(key)
            .ok_or(StoreError::NotFound)?;
        self.inner.registry.unregister(key)?;
        self.inner.navigable.reconcile_removal(removed_index);
        Ok(())
    }

    /// Replace the value of an already registered option.
    pub fn update_value(&self, key: &ElementId, value: V) -> Result<(), StoreError> {
        self.inner.registry.update(key, value)
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Explicitly select the option at `index`. Focuses its element,
    /// commits and permanently initializes the engine. Out of range is a
    /// no-op.
    pub fn select(&self, index: usize) {
        if index >= self.inner.registry.len() {
            return;
        }
        self.inner.initialized.set(true);
        self.inner.navigable.set(index);
    }

    /// Index of the first registered value structurally equal to the
    /// configured default. `None` once the engine is initialized, once the
    /// default has been applied, or when nothing matches.
    pub fn initial_value_match(&self) -> Option<usize> {
        if self.inner.initialized.get() || self.inner.default_applied.get() {
            return None;
        }
        let default = self.inner.default.as_ref()?;
        self.inner
            .registry
            .values()
            .iter()
            .position(|value| value == default)
    }

    /// Watch registrations and apply the default-value match exactly once,
    /// as soon as a matching option mounts. Returns the watcher teardown.
    pub fn listen_selection(&self) -> Cleanup {
        let engine = self.clone();
        self.inner.registry.watch_new_item(move |_, _| {
            if let Some(index) = engine.initial_value_match() {
                engine.inner.default_applied.set(true);
                engine.inner.navigable.commit(index);
            }
        })
    }

    /// End the waiting state without changing the cursor.
    pub fn finish_waiting(&self) {
        self.inner.navigable.end_waiting();
    }

    // =========================================================================
    // OBSERVATION
    // =========================================================================

    /// The committed index, or `None` while waiting.
    pub fn selected_index(&self) -> Option<usize> {
        if self.inner.navigable.is_waiting() || self.inner.registry.is_empty() {
            return None;
        }
        Some(self.inner.navigable.committed_index())
    }

    /// The selected value, or `None` while waiting.
    pub fn value(&self) -> Option<V> {
        self.inner.registry.value_at(self.selected_index()?)
    }

    /// Whether the option at `index` is the current selection.
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected_index() == Some(index)
    }

    /// Subscribe to the current value. Fires immediately, then
    /// synchronously whenever the resolved value changes - `None` while
    /// waiting, `Some` once a selection exists.
    pub fn subscribe(&self, f: impl Fn(Option<&V>) + 'static) -> Cleanup {
        let f = Rc::new(f);
        let last: Rc<RefCell<Option<Option<V>>>> = Rc::new(RefCell::new(None));

        let emit = {
            let engine = self.clone();
            let f = f.clone();
            move || {
                let value = engine.value();
                let mut last = last.borrow_mut();
                if last.as_ref() != Some(&value) {
                    f(value.as_ref());
                    *last = Some(value);
                }
            }
        };

        // Both the cursor and the registry can change the resolved value.
        let emit_index = emit.clone();
        let index_sub = self.inner.navigable.subscribe_index(move |_| emit_index());
        let registry_sub = self.inner.registry.subscribe(move |_| emit());
        merge_cleanups(vec![index_sub, registry_sub])
    }

    /// Subscribe to "is the option at `index` selected". Fires immediately,
    /// then on every commit.
    pub fn watch_is_selected(&self, index: usize, f: impl Fn(bool) + 'static) -> Cleanup {
        let engine = self.clone();
        self.inner
            .navigable
            .subscribe_index(move |_| f(engine.is_selected(index)))
    }
}
