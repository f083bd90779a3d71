//! Element nodes and the native-focusability rule set.

use std::collections::HashMap;

// =============================================================================
// ELEMENT ID
// =============================================================================

/// Opaque handle to an element in a [`Document`](super::Document) arena.
///
/// Handles are never reused within a document, so a stale id simply stops
/// resolving instead of aliasing a newer node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u64);

// =============================================================================
// ELEMENT KIND
// =============================================================================

/// What an element renders as, for focusability purposes.
///
/// Mirrors the selector set browsers treat as natively focusable:
/// anchors with an href, non-disabled form controls, embedded content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ElementKind {
    /// Generic non-interactive container (div-like).
    #[default]
    Container,
    /// Inline text node.
    Text,
    Anchor,
    Input,
    Select,
    TextArea,
    Button,
    Iframe,
    Object,
    Embed,
}

// =============================================================================
// ELEMENT NODE
// =============================================================================

/// A node in the document arena.
#[derive(Debug, Default)]
pub(crate) struct ElementNode {
    pub kind: ElementKind,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    /// Explicit tabindex, if one was assigned.
    pub tab_index: Option<i32>,
    pub disabled: bool,
    /// Anchors are only focusable when they carry an href.
    pub has_href: bool,
    pub content_editable: bool,
    pub aria_hidden: bool,
    /// Own text (descendant text is concatenated by the document).
    pub text: String,
    pub attributes: HashMap<String, String>,
}

impl ElementNode {
    pub(crate) fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Whether the element is focusable without an explicit tabindex.
    pub(crate) fn is_natively_focusable(&self) -> bool {
        match self.kind {
            ElementKind::Anchor => self.has_href,
            ElementKind::Input | ElementKind::Select | ElementKind::TextArea
            | ElementKind::Button => !self.disabled && !self.aria_hidden,
            ElementKind::Iframe | ElementKind::Object | ElementKind::Embed => true,
            ElementKind::Container | ElementKind::Text => self.content_editable,
        }
    }

    /// Effective tabindex: the explicit one, else 0 for natively
    /// focusable elements, else -1.
    pub(crate) fn effective_tab_index(&self) -> i32 {
        match self.tab_index {
            Some(index) => index,
            None if self.is_natively_focusable() => 0,
            None => -1,
        }
    }

    /// Focusable = part of the tab-order-eligible set. Elements forced to
    /// tabindex -1 remain programmatically focusable in browsers, but the
    /// stores only ever move focus to elements that pass this check.
    pub(crate) fn is_focusable(&self) -> bool {
        if self.aria_hidden {
            return false;
        }
        match self.tab_index {
            Some(index) => index >= 0,
            None => self.is_natively_focusable(),
        }
    }
}
