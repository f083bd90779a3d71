//! # spark-headless
//!
//! Headless UI primitives for Rust.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for fine-grained reactivity.
//!
//! ## Architecture
//!
//! The crate ships behavior, not widgets: reactive state engines that a
//! rendering layer binds to its own node tree. Elements live in a
//! [`dom::Document`] arena and are addressed by opaque [`dom::ElementId`]
//! handles, so the same engines run against a browser-style DOM mirror, a
//! terminal frontend or a bare test harness.
//!
//! ```text
//! Rendering layer → Document arena → registries → engines → subscriptions
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Core types (Direction, Orientation, StoreError, Cleanup)
//! - [`dom`] - Document arena: elements, focus, events, listeners
//! - [`stores`] - The engines (Hashable, Registrable, Navigable, Selectable, Toggleable)
//! - [`utils`] - Focus trap

pub mod dom;
pub mod stores;
pub mod types;
pub mod utils;

#[cfg(feature = "crossterm")]
pub mod input;

// Re-export commonly used items
pub use types::*;

pub use dom::{
    Document, ElementId, ElementKind, Event, EventTarget, EventType, KeyState, KeyboardEvent,
    ListenerId, Modifiers,
};

pub use stores::{
    use_hover_sync, use_key_match, use_manual_blur, CloseRef, DismissReason, Hashable, ItemSource,
    Navigable, NavigableSettings, PanelConfig, Registrable, Selectable, Target, Toggleable,
};

pub use utils::FocusTrap;

#[cfg(feature = "crossterm")]
pub use input::keyboard_event_from_crossterm;
