//! Host-document abstraction.
//!
//! The stores are headless: they never touch a real DOM. Instead they run
//! against a [`Document`] - an arena of [`ElementId`]-addressed nodes with
//! tree structure, tab indices, focus state and event dispatch. The
//! rendering layer mirrors its real node tree into a `Document` (or, in
//! tests, builds one directly).

pub mod document;
pub mod element;
pub mod event;
pub mod listeners;

pub use document::Document;
pub use element::{ElementId, ElementKind};
pub use event::{Event, EventPayload, EventTarget, EventType, KeyState, KeyboardEvent, Modifiers};
pub use listeners::ListenerId;
