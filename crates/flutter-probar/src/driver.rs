//! Driver seam between the semantics layer and a concrete browser.
//!
//! Everything above this module speaks in terms of selectors, semantic node
//! snapshots and key presses. [`crate::browser::CdpPage`] implements the
//! trait over the Chrome DevTools Protocol; [`crate::mock::MockSemanticsPage`]
//! implements it over an in-memory semantics tree for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::ProbeResult;

/// Keys the harness sends. Tab advances focus, Enter activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Advance focus to the next focusable node
    Tab,
    /// Activate the focused node
    Enter,
}

impl Key {
    /// DOM `key` value
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Tab => "Tab",
            Self::Enter => "Enter",
        }
    }

    /// Windows virtual key code, required by Chromium for non-printable keys
    #[must_use]
    pub const fn virtual_key_code(self) -> i64 {
        match self {
            Self::Tab => 9,
            Self::Enter => 13,
        }
    }

    /// Text produced on key-down, if any
    #[must_use]
    pub const fn text(self) -> Option<&'static str> {
        match self {
            Self::Tab => None,
            Self::Enter => Some("\r"),
        }
    }
}

/// Snapshot of the focused semantics node.
///
/// Produced fresh on every traversal step; it has no identity beyond
/// "whatever is focused right now".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusDescriptor {
    /// `role` attribute
    pub role: Option<String>,
    /// `aria-label` attribute
    pub label: Option<String>,
    /// Trimmed text content, `None` when empty
    pub text: Option<String>,
}

impl FocusDescriptor {
    /// Create a descriptor from optional parts
    #[must_use]
    pub fn new(role: Option<&str>, label: Option<&str>, text: Option<&str>) -> Self {
        Self {
            role: role.map(str::to_string),
            label: label.map(str::to_string),
            text: text.map(str::to_string),
        }
    }

    /// Whether the role equals `role`
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}

/// One node matched by a selector, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Position within the selector's match list
    pub index: usize,
    /// `role` attribute
    pub role: Option<String>,
    /// `aria-label` attribute
    pub label: Option<String>,
    /// Trimmed text content
    pub text: Option<String>,
    /// Whether the node has a non-empty layout box
    pub visible: bool,
}

impl NodeSnapshot {
    /// Project onto the attributes traversal predicates see
    #[must_use]
    pub fn descriptor(&self) -> FocusDescriptor {
        FocusDescriptor {
            role: self.role.clone(),
            label: self.label.clone(),
            text: self.text.clone(),
        }
    }
}

/// Reference to the `index`-th match of `selector`.
///
/// Drivers re-run the selector on every action; nothing is cached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    /// Selector the element was resolved through
    pub selector: String,
    /// Position in document order
    pub index: usize,
}

impl ElementRef {
    /// Create an element reference
    #[must_use]
    pub fn new(selector: impl Into<String>, index: usize) -> Self {
        Self {
            selector: selector.into(),
            index,
        }
    }
}

/// Browser primitives the semantics layer is built from.
///
/// Implementations must not hold state that leaks between two drivers: each
/// actor owns one driver and two drivers never observe each other's focus.
#[async_trait]
pub trait SemanticsDriver: Send + Sync {
    /// Navigate to an absolute URL
    async fn goto(&self, url: &str) -> ProbeResult<()>;

    /// Current page URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Reload the current page
    async fn reload(&self) -> ProbeResult<()>;

    /// Number of elements attached for `selector` (visible or not)
    async fn count(&self, selector: &str) -> ProbeResult<usize>;

    /// Script-level `click()` on the first match; `false` when absent
    async fn script_click(&self, selector: &str) -> ProbeResult<bool>;

    /// Script-level `focus()` on the first match; `false` when absent
    async fn focus(&self, selector: &str) -> ProbeResult<bool>;

    /// Descriptor of `document.activeElement` if it is a semantics node
    async fn active_node(&self) -> ProbeResult<Option<FocusDescriptor>>;

    /// Snapshot every match of `selector` in document order
    async fn snapshot(&self, selector: &str) -> ProbeResult<Vec<NodeSnapshot>>;

    /// Pointer click at the element's centre
    async fn click(&self, target: &ElementRef) -> ProbeResult<()>;

    /// Clear an input and type `value` into it
    async fn fill(&self, target: &ElementRef, value: &str) -> ProbeResult<()>;

    /// Press and release a key
    async fn press_key(&self, key: Key) -> ProbeResult<()>;

    /// Insert text at the current focus
    async fn insert_text(&self, text: &str) -> ProbeResult<()>;

    /// Write `key` into `localStorage` of the current origin
    async fn set_local_storage(&self, key: &str, value: &str) -> ProbeResult<()>;

    /// PNG screenshot of the viewport
    async fn screenshot(&self) -> ProbeResult<Vec<u8>>;
}
