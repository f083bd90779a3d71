//! Standalone utilities built on the document arena.

pub mod focus_trap;

pub use focus_trap::FocusTrap;
