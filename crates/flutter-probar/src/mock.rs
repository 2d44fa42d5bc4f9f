//! In-memory Flutter page for tests.
//!
//! `MockSemanticsPage` models the parts of a Flutter Web page the harness
//! touches: the glass pane, the enable-accessibility placeholder, a semantics
//! tree per route, a tab order, and real `<input>` fields. Pointer clicks on
//! invisible or covered nodes are rejected the way the glass pane swallows
//! them in a real browser, so keyboard fallbacks are exercised for real.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::driver::{ElementRef, FocusDescriptor, Key, NodeSnapshot, SemanticsDriver};
use crate::result::{ProbeError, ProbeResult};
use crate::semantics::{
    EMAIL_FIELD, ENABLE_PLACEHOLDER, GLASS_PANE, SEMANTICS_HOST, SEMANTICS_NODE, TEXT_FIELD,
};

/// PNG signature followed by a marker; enough for callers that write the file
const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nmock-screenshot";

/// What a node is in the DOM
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An `flt-semantics` element
    Semantics,
    /// A real `<input>` inside the semantics tree
    Input {
        /// `autocomplete` attribute
        autocomplete: Option<String>,
        /// Disabled decorator inputs are never matched
        disabled: bool,
    },
    /// A focusable element outside the semantics tree (browser chrome, iframe)
    Foreign,
}

/// What happens when a node is activated by click or Enter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAction {
    /// In-app route change to a path
    Navigate(String),
    /// Remove the node labelled with this name from the current screen
    Dismiss(String),
    /// Navigate to `path` when the e-mail field holds `email`, otherwise
    /// show an error alert
    SignIn {
        /// Accepted e-mail
        email: String,
        /// Route after a successful login
        path: String,
    },
}

/// Accessible name of the alert a rejected [`MockAction::SignIn`] shows
pub const SIGN_IN_ERROR: &str = "E-mail ou senha inválidos";

/// One node of a mock screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockNode {
    /// Node kind
    pub kind: NodeKind,
    /// `role` attribute
    pub role: Option<String>,
    /// `aria-label` attribute
    pub label: Option<String>,
    /// Text content
    pub text: Option<String>,
    /// Has a layout box a pointer can hit
    pub visible: bool,
    /// Laid out but covered by another element at its centre
    pub intercepted: bool,
    /// Part of the tab order
    pub focusable: bool,
    /// Activation effect
    pub on_activate: Option<MockAction>,
    /// Current input value
    pub value: String,
}

impl MockNode {
    fn semantics(role: Option<&str>, label: Option<&str>, text: Option<&str>) -> Self {
        Self {
            kind: NodeKind::Semantics,
            role: role.map(str::to_string),
            label: label.map(str::to_string),
            text: text.map(str::to_string),
            visible: true,
            intercepted: false,
            focusable: false,
            on_activate: None,
            value: String::new(),
        }
    }

    /// Focusable button with visible text
    #[must_use]
    pub fn button(text: &str) -> Self {
        Self {
            focusable: true,
            ..Self::semantics(Some("button"), None, Some(text))
        }
    }

    /// Static text
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::semantics(None, None, Some(text))
    }

    /// Focusable node identified by role and accessible name
    #[must_use]
    pub fn labeled(role: &str, label: &str) -> Self {
        Self {
            focusable: true,
            ..Self::semantics(Some(role), Some(label), None)
        }
    }

    /// Focusable card (`role="group"`)
    #[must_use]
    pub fn group(label: &str) -> Self {
        Self::labeled("group", label)
    }

    /// Enabled Flutter text field
    #[must_use]
    pub fn text_field(label: &str) -> Self {
        Self {
            kind: NodeKind::Input {
                autocomplete: None,
                disabled: false,
            },
            focusable: true,
            ..Self::semantics(Some("textbox"), Some(label), None)
        }
    }

    /// Enabled e-mail field
    #[must_use]
    pub fn email_field() -> Self {
        Self {
            kind: NodeKind::Input {
                autocomplete: Some("email".to_string()),
                disabled: false,
            },
            ..Self::text_field("email")
        }
    }

    /// Disabled decorator input Flutter renders next to each field
    #[must_use]
    pub fn decorator_field() -> Self {
        Self {
            kind: NodeKind::Input {
                autocomplete: None,
                disabled: true,
            },
            focusable: false,
            ..Self::text_field("decorator")
        }
    }

    /// Focusable element outside the semantics tree
    #[must_use]
    pub fn foreign(label: &str) -> Self {
        Self {
            kind: NodeKind::Foreign,
            focusable: true,
            ..Self::semantics(None, Some(label), None)
        }
    }

    /// Set the accessible name
    #[must_use]
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// Render without a layout box; pointer clicks miss it
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Visible, but a pointer aimed at its centre hits an overlay instead
    #[must_use]
    pub fn intercepted(mut self) -> Self {
        self.intercepted = true;
        self
    }

    /// Navigate to `path` on activation
    #[must_use]
    pub fn navigates_to(mut self, path: &str) -> Self {
        self.on_activate = Some(MockAction::Navigate(path.to_string()));
        self
    }

    /// Remove the node labelled `label` on activation
    #[must_use]
    pub fn dismisses(mut self, label: &str) -> Self {
        self.on_activate = Some(MockAction::Dismiss(label.to_string()));
        self
    }

    /// Log in to `path` only when the e-mail field holds `email`
    #[must_use]
    pub fn signs_in(mut self, email: &str, path: &str) -> Self {
        self.on_activate = Some(MockAction::SignIn {
            email: email.to_string(),
            path: path.to_string(),
        });
        self
    }

    fn is_semantics(&self) -> bool {
        self.kind == NodeKind::Semantics
    }

    fn is_enabled_input(&self) -> bool {
        matches!(self.kind, NodeKind::Input { disabled: false, .. })
    }

    fn is_email_input(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::Input { autocomplete: Some(a), disabled: false } if a == "email"
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Attached,
    AfterPolls(u32),
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Body,
    Host,
    Node(usize),
}

/// Parsed form of the selectors the harness issues
#[derive(Debug, Clone, PartialEq, Eq)]
enum MockSelector {
    GlassPane,
    Placeholder,
    Host,
    Semantics,
    SemanticsWithRole(String),
    TextField,
    EmailField,
    Unknown,
}

impl MockSelector {
    fn parse(selector: &str) -> Self {
        match selector {
            GLASS_PANE => Self::GlassPane,
            ENABLE_PLACEHOLDER => Self::Placeholder,
            SEMANTICS_HOST => Self::Host,
            SEMANTICS_NODE => Self::Semantics,
            TEXT_FIELD => Self::TextField,
            EMAIL_FIELD => Self::EmailField,
            other => other
                .strip_prefix(r#"flt-semantics[role=""#)
                .and_then(|rest| rest.strip_suffix(r#""]"#))
                .map_or(Self::Unknown, |role| Self::SemanticsWithRole(role.to_string())),
        }
    }
}

#[derive(Debug)]
struct MockState {
    url: String,
    screens: HashMap<String, Vec<MockNode>>,
    staged: Vec<(usize, String, Vec<MockNode>)>,
    surface: Surface,
    semantics_enabled: bool,
    placeholder_clicks: usize,
    focus: Focus,
    keys: Vec<Key>,
    activations: Vec<String>,
    reloads: usize,
    history: Vec<String>,
    local_storage: HashMap<String, String>,
}

impl MockState {
    fn path(&self) -> String {
        path_of(&self.url)
    }

    fn surface_attached(&mut self) -> bool {
        match self.surface {
            Surface::Attached => true,
            Surface::Never => false,
            Surface::AfterPolls(0) => {
                self.surface = Surface::Attached;
                true
            }
            Surface::AfterPolls(n) => {
                self.surface = Surface::AfterPolls(n - 1);
                false
            }
        }
    }

    fn nodes(&self) -> &[MockNode] {
        self.screens.get(&self.path()).map_or(&[], Vec::as_slice)
    }

    fn nodes_mut(&mut self) -> Option<&mut Vec<MockNode>> {
        let path = self.path();
        self.screens.get_mut(&path)
    }

    /// Indices into the current screen matched by `selector`, in document order
    fn matches(&mut self, selector: &str) -> Vec<usize> {
        let parsed = MockSelector::parse(selector);
        let attached = match parsed {
            MockSelector::GlassPane => return singleton(self.surface_attached()),
            MockSelector::Placeholder => {
                let present = self.surface_attached() && !self.semantics_enabled;
                return singleton(present);
            }
            MockSelector::Host => return singleton(self.semantics_enabled),
            _ => self.semantics_enabled,
        };
        if !attached {
            return Vec::new();
        }
        self.nodes()
            .iter()
            .enumerate()
            .filter(|(_, n)| match &parsed {
                MockSelector::Semantics => n.is_semantics(),
                MockSelector::SemanticsWithRole(role) => {
                    n.is_semantics() && n.role.as_deref() == Some(role.as_str())
                }
                MockSelector::TextField => n.is_enabled_input(),
                MockSelector::EmailField => n.is_email_input(),
                _ => false,
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn target(&mut self, target: &ElementRef) -> ProbeResult<usize> {
        self.matches(&target.selector)
            .get(target.index)
            .copied()
            .ok_or_else(|| {
                ProbeError::not_found(format!("{} (nth {})", target.selector, target.index))
            })
    }

    fn navigate(&mut self, url: String) {
        self.history.push(format!("navigate:{url}"));
        self.url = url;
        self.focus = Focus::Body;
    }

    fn activate(&mut self, index: usize) {
        let Some(node) = self.nodes().get(index).cloned() else {
            return;
        };
        let name = node
            .label
            .clone()
            .or_else(|| node.text.clone())
            .unwrap_or_default();
        self.activations.push(name);
        match node.on_activate {
            Some(MockAction::Navigate(path)) => {
                let url = format!("{}{path}", origin_of(&self.url));
                self.navigate(url);
            }
            Some(MockAction::Dismiss(label)) => {
                if let Some(nodes) = self.nodes_mut() {
                    nodes.retain(|n| n.label.as_deref() != Some(label.as_str()));
                }
                self.focus = Focus::Body;
            }
            Some(MockAction::SignIn { email, path }) => {
                let accepted = self
                    .nodes()
                    .iter()
                    .any(|n| n.is_email_input() && n.value == email);
                if accepted {
                    let url = format!("{}{path}", origin_of(&self.url));
                    self.navigate(url);
                } else if let Some(nodes) = self.nodes_mut() {
                    if !nodes.iter().any(|n| n.label.as_deref() == Some(SIGN_IN_ERROR)) {
                        nodes.push(MockNode::labeled("alert", SIGN_IN_ERROR));
                    }
                }
            }
            None => {}
        }
    }

    fn tab(&mut self) {
        if !self.semantics_enabled {
            return;
        }
        let order: Vec<usize> = self
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, n)| n.focusable)
            .map(|(i, _)| i)
            .collect();
        let Some(&first) = order.first() else {
            return;
        };
        let next = match self.focus {
            Focus::Node(current) => order.iter().copied().find(|&i| i > current).unwrap_or(first),
            Focus::Body | Focus::Host => first,
        };
        self.focus = Focus::Node(next);
    }

    fn unload(&mut self) {
        self.semantics_enabled = false;
        self.focus = Focus::Body;
    }
}

/// Match list for elements that exist at most once per page
fn singleton(present: bool) -> Vec<usize> {
    if present {
        vec![0]
    } else {
        Vec::new()
    }
}

/// In-memory [`SemanticsDriver`] with a scripted semantics tree
#[derive(Debug)]
pub struct MockSemanticsPage {
    state: Mutex<MockState>,
}

impl MockSemanticsPage {
    /// Create a page at `url` with a booted engine and an empty tree
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            state: Mutex::new(MockState {
                url: url.to_string(),
                screens: HashMap::new(),
                staged: Vec::new(),
                surface: Surface::Attached,
                semantics_enabled: false,
                placeholder_clicks: 0,
                focus: Focus::Body,
                keys: Vec::new(),
                activations: Vec::new(),
                reloads: 0,
                history: Vec::new(),
                local_storage: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the nodes of the current route
    #[must_use]
    pub fn with_nodes(self, nodes: Vec<MockNode>) -> Self {
        let path = self.state().path();
        self.with_screen(&path, nodes)
    }

    /// Set the nodes shown at `path`
    #[must_use]
    pub fn with_screen(self, path: &str, nodes: Vec<MockNode>) -> Self {
        self.set_screen(path, nodes);
        self
    }

    /// Attach the glass pane only after `polls` unsuccessful polls
    #[must_use]
    pub fn with_surface_delay(self, polls: u32) -> Self {
        self.state().surface = Surface::AfterPolls(polls);
        self
    }

    /// Start with the semantics tree already on
    #[must_use]
    pub fn with_semantics_enabled(self) -> Self {
        self.state().semantics_enabled = true;
        self
    }

    /// Never attach the glass pane
    #[must_use]
    pub fn without_surface(self) -> Self {
        self.state().surface = Surface::Never;
        self
    }

    /// Replace the nodes shown at `path`
    pub fn set_screen(&self, path: &str, nodes: Vec<MockNode>) {
        self.state().screens.insert(path.to_string(), nodes);
    }

    /// Replace the nodes at `path` once the page has been reloaded `reloads` times
    pub fn stage_after_reloads(&self, reloads: usize, path: &str, nodes: Vec<MockNode>) {
        self.state().staged.push((reloads, path.to_string(), nodes));
    }

    /// Whether the semantics tree is on
    #[must_use]
    pub fn semantics_enabled(&self) -> bool {
        self.state().semantics_enabled
    }

    /// Times the placeholder was clicked
    #[must_use]
    pub fn placeholder_clicks(&self) -> usize {
        self.state().placeholder_clicks
    }

    /// Every key pressed, in order
    #[must_use]
    pub fn keys(&self) -> Vec<Key> {
        self.state().keys.clone()
    }

    /// Number of presses of `key`
    #[must_use]
    pub fn key_count(&self, key: Key) -> usize {
        self.state().keys.iter().filter(|k| **k == key).count()
    }

    /// Names of activated nodes, in order
    #[must_use]
    pub fn activations(&self) -> Vec<String> {
        self.state().activations.clone()
    }

    /// Times the page was reloaded
    #[must_use]
    pub fn reloads(&self) -> usize {
        self.state().reloads
    }

    /// Value of the node at `index` on the current route
    #[must_use]
    pub fn value_at(&self, index: usize) -> Option<String> {
        self.state().nodes().get(index).map(|n| n.value.clone())
    }

    /// Value of the input labelled `label` on the current route
    #[must_use]
    pub fn value_of(&self, label: &str) -> Option<String> {
        self.state()
            .nodes()
            .iter()
            .find(|n| n.label.as_deref() == Some(label))
            .map(|n| n.value.clone())
    }

    /// Call history for verification
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Value stored under `key` in local storage
    #[must_use]
    pub fn local_storage(&self, key: &str) -> Option<String> {
        self.state().local_storage.get(key).cloned()
    }
}

#[async_trait]
impl SemanticsDriver for MockSemanticsPage {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        let mut state = self.state();
        state.unload();
        state.navigate(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.state().url.clone())
    }

    async fn reload(&self) -> ProbeResult<()> {
        let mut state = self.state();
        state.reloads += 1;
        state.history.push("reload".to_string());
        state.unload();
        let reloads = state.reloads;
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut state.staged)
            .into_iter()
            .partition(|(at, _, _)| *at <= reloads);
        state.staged = pending;
        for (_, path, nodes) in due {
            state.screens.insert(path, nodes);
        }
        Ok(())
    }

    async fn count(&self, selector: &str) -> ProbeResult<usize> {
        Ok(self.state().matches(selector).len())
    }

    async fn script_click(&self, selector: &str) -> ProbeResult<bool> {
        let mut state = self.state();
        if selector == ENABLE_PLACEHOLDER {
            if state.matches(selector).is_empty() {
                return Ok(false);
            }
            state.placeholder_clicks += 1;
            state.semantics_enabled = true;
            state.history.push("enable-accessibility".to_string());
            return Ok(true);
        }
        match state.matches(selector).first().copied() {
            Some(index) => {
                state.activate(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn focus(&self, selector: &str) -> ProbeResult<bool> {
        let mut state = self.state();
        if selector == SEMANTICS_HOST {
            if !state.semantics_enabled {
                return Ok(false);
            }
            state.focus = Focus::Host;
            return Ok(true);
        }
        match state.matches(selector).first().copied() {
            Some(index) => {
                state.focus = Focus::Node(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn active_node(&self) -> ProbeResult<Option<FocusDescriptor>> {
        let state = self.state();
        let Focus::Node(index) = state.focus else {
            return Ok(None);
        };
        Ok(state
            .nodes()
            .get(index)
            .filter(|n| n.is_semantics())
            .map(|n| FocusDescriptor {
                role: n.role.clone(),
                label: n.label.clone(),
                text: n.text.clone(),
            }))
    }

    async fn snapshot(&self, selector: &str) -> ProbeResult<Vec<NodeSnapshot>> {
        let mut state = self.state();
        let indices = state.matches(selector);
        let nodes = state.nodes();
        Ok(indices
            .iter()
            .enumerate()
            .filter_map(|(position, &i)| {
                nodes.get(i).map(|n| NodeSnapshot {
                    index: position,
                    role: n.role.clone(),
                    label: n.label.clone(),
                    text: n.text.clone(),
                    visible: n.visible,
                })
            })
            .collect())
    }

    async fn click(&self, target: &ElementRef) -> ProbeResult<()> {
        let mut state = self.state();
        let index = state.target(target)?;
        let (visible, intercepted) = state
            .nodes()
            .get(index)
            .map_or((false, false), |n| (n.visible, n.intercepted));
        if !visible {
            return Err(ProbeError::Input {
                message: format!("{} is not hit-testable", target.selector),
            });
        }
        if intercepted {
            return Err(ProbeError::Input {
                message: format!("{}[{}] intercepted by {GLASS_PANE}", target.selector, target.index),
            });
        }
        state.history.push(format!("click:{}#{}", target.selector, target.index));
        state.focus = Focus::Node(index);
        state.activate(index);
        Ok(())
    }

    async fn fill(&self, target: &ElementRef, value: &str) -> ProbeResult<()> {
        let mut state = self.state();
        let index = state.target(target)?;
        state.focus = Focus::Node(index);
        state.history.push(format!("fill:{}#{}", target.selector, target.index));
        if let Some(node) = state.nodes_mut().and_then(|nodes| nodes.get_mut(index)) {
            if !node.visible {
                return Err(ProbeError::Input {
                    message: format!("{} is not editable", target.selector),
                });
            }
            node.value = value.to_string();
        }
        Ok(())
    }

    async fn press_key(&self, key: Key) -> ProbeResult<()> {
        let mut state = self.state();
        state.keys.push(key);
        match key {
            Key::Tab => state.tab(),
            Key::Enter => {
                if let Focus::Node(index) = state.focus {
                    state.activate(index);
                }
            }
        }
        Ok(())
    }

    async fn insert_text(&self, text: &str) -> ProbeResult<()> {
        let mut state = self.state();
        state.history.push(format!("type:{text}"));
        if let Focus::Node(index) = state.focus {
            if let Some(node) = state.nodes_mut().and_then(|nodes| nodes.get_mut(index)) {
                node.value.push_str(text);
            }
        }
        Ok(())
    }

    async fn set_local_storage(&self, key: &str, value: &str) -> ProbeResult<()> {
        let mut state = self.state();
        state.history.push(format!("storage:{key}"));
        state.local_storage.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn screenshot(&self) -> ProbeResult<Vec<u8>> {
        Ok(FAKE_PNG.to_vec())
    }
}

/// `scheme://host[:port]` part of a URL
fn origin_of(url: &str) -> &str {
    let start = url.find("://").map_or(0, |i| i + 3);
    url[start..].find('/').map_or(url, |i| &url[..start + i])
}

/// Path part of a URL without query or fragment, `/` when empty
fn path_of(url: &str) -> String {
    let rest = &url[origin_of(url).len()..];
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    match &rest[..end] {
        "" => "/".to_string(),
        path => path.to_string(),
    }
}
