//! Behavioral stores - the reactive state containers framework components
//! wrap with markup.
//!
//! - [`Hashable`] - ordered key -> value registry
//! - [`Registrable`] - ordered list registry keyed by position
//! - [`Navigable`] - index cursor with roving focus and keyboard traversal
//! - [`Selectable`] - binds the cursor to a value domain
//! - [`Toggleable`] - open/close state for disclosure patterns

pub mod hashable;
pub mod navigable;
pub mod registrable;
pub mod selectable;
pub mod toggleable;

pub use hashable::Hashable;
pub use navigable::{
    use_hover_sync, use_key_match, use_manual_blur, ItemSource, Navigable, NavigableSettings,
    Target,
};
pub use registrable::Registrable;
pub use selectable::Selectable;
pub use toggleable::{CloseRef, DismissReason, PanelConfig, Toggleable};
