//! Core types shared across the behavioral stores.
//!
//! - [`Direction`] / [`Orientation`] - traversal semantics
//! - [`StartPosition`] - dynamic-open focus policy
//! - [`StoreError`] - registry/selection contract violations
//! - Keyboard contract ([`KEYS`], [`is_not_valid_key`])
//! - [`Cleanup`] - teardown closure returned by every `use_*` hook

use thiserror::Error;

// =============================================================================
// TRAVERSAL
// =============================================================================

/// Direction of an index traversal over a registered collection.
///
/// `Ascending` walks toward the last index, `Descending` toward the first.
/// Being a closed enum, no invalid direction can reach the overflow check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Axis a navigable group is laid out on.
///
/// Determines which arrow keys advance/retreat the cursor:
/// Left/Right for `Horizontal`, Up/Down for `Vertical`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Whether `index` would overflow the collection when moving in `direction`.
///
/// Ascending overflows when `index + 1 == length`; descending overflows at
/// index zero. An empty collection overflows in both directions.
pub fn is_overflowed(index: usize, direction: Direction, length: usize) -> bool {
    match direction {
        Direction::Ascending => index + 1 >= length,
        Direction::Descending => index == 0,
    }
}

// =============================================================================
// DYNAMIC-OPEN POLICY
// =============================================================================

/// Where the cursor lands when a navigable group is opened dynamically
/// (e.g. a menu or listbox popping open).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartPosition {
    /// Focus the first item.
    First,
    /// Focus the last item.
    Last,
    /// Focus the container itself while no selection exists,
    /// otherwise refocus the already-selected item.
    Auto,
    /// Focus the item at this index. Out of range degrades to
    /// focusing the container (with a warning), never panics.
    Index(usize),
}

// =============================================================================
// ERRORS
// =============================================================================

/// Contract violations raised by the registries and engines.
///
/// These are developer-facing: they signal misuse of the API at the call
/// site and are never retried or swallowed internally.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A key was registered twice.
    #[error("duplicate key")]
    DuplicateKey,
    /// A structurally-equal value was registered twice.
    #[error("duplicate value")]
    DuplicateValue,
    /// Unregister/update/modify on a key that is not present.
    #[error("item not found")]
    NotFound,
    /// Anonymous index reservation on a registry that holds
    /// non-placeholder values.
    #[error("invalid value")]
    InvalidValue,
}

// =============================================================================
// KEYBOARD CONTRACT
// =============================================================================

/// The keys the navigation engines recognize. Anything else is a no-op.
pub const KEYS: [&str; 6] = [
    "ArrowUp",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
    "Enter",
    "Space",
];

/// True if `key` is outside the recognized navigation key set.
pub fn is_not_valid_key(key: &str) -> bool {
    !KEYS.contains(&key)
}

// =============================================================================
// TEARDOWN
// =============================================================================

/// Teardown closure returned by mount hooks. Invoke exactly once on unmount;
/// it fully reverses listener attachment and tabindex mutation.
pub type Cleanup = Box<dyn FnOnce()>;

/// Merge several teardown closures into one.
pub fn merge_cleanups(cleanups: Vec<Cleanup>) -> Cleanup {
    Box::new(move || {
        for cleanup in cleanups {
            cleanup();
        }
    })
}
