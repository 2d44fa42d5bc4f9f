//! Semantic element locator.
//!
//! A [`SemanticLocator`] is an ordered list of strategies plus an occurrence
//! index. Nothing touches the page until an action runs; every action walks
//! the tree again from scratch.
//!
//! ```
//! use flutter_probar::SemanticLocator;
//!
//! let login = SemanticLocator::label("login-button")
//!     .or_role_text("button", "^entrar$")
//!     .or_text("entrar");
//! assert_eq!(login.strategies().len(), 3);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::driver::{ElementRef, FocusDescriptor, NodeSnapshot, SemanticsDriver};
use crate::result::{Lookup, ProbeError, ProbeResult};
use crate::semantics::SEMANTICS_NODE;
use crate::wait::{poll_until, WaitOptions};

/// One way of finding an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Strategy {
    /// Exact accessible name (`aria-label`)
    Label(String),
    /// Accessible name matching a pattern
    LabelPattern(String),
    /// Role plus accessible text matching a pattern
    RoleText {
        /// Required `role`
        role: String,
        /// Text pattern
        pattern: String,
    },
    /// Any node with the given role
    Role(String),
    /// Accessible text matching a pattern, any role
    Text(String),
    /// Raw CSS selector, for the real `<input>` elements Flutter renders
    Css(String),
}

impl Strategy {
    /// Selector whose matches this strategy filters
    #[must_use]
    pub fn base_selector(&self) -> &str {
        match self {
            Self::Css(selector) => selector,
            _ => SEMANTICS_NODE,
        }
    }

    fn compile(&self) -> ProbeResult<Compiled> {
        Ok(match self {
            Self::Label(name) => Compiled::Label(name.clone()),
            Self::LabelPattern(p) => Compiled::LabelPattern(pattern(p)?),
            Self::RoleText { role, pattern: p } => Compiled::RoleText(role.clone(), pattern(p)?),
            Self::Role(role) => Compiled::Role(role.clone()),
            Self::Text(p) => Compiled::Text(pattern(p)?),
            Self::Css(_) => Compiled::Any,
        })
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Label(name) => write!(f, "label={name:?}"),
            Self::LabelPattern(p) => write!(f, "label~/{p}/i"),
            Self::RoleText { role, pattern } => write!(f, "role={role} text~/{pattern}/i"),
            Self::Role(role) => write!(f, "role={role}"),
            Self::Text(p) => write!(f, "text~/{p}/i"),
            Self::Css(selector) => write!(f, "css={selector}"),
        }
    }
}

/// Case-insensitive text pattern
fn pattern(source: &str) -> ProbeResult<Regex> {
    Ok(RegexBuilder::new(source).case_insensitive(true).build()?)
}

/// A strategy with its patterns compiled
#[derive(Debug, Clone)]
enum Compiled {
    Label(String),
    LabelPattern(Regex),
    RoleText(String, Regex),
    Role(String),
    Text(Regex),
    Any,
}

impl Compiled {
    fn matches(&self, node: &FocusDescriptor) -> bool {
        match self {
            Self::Label(name) => node.label.as_deref() == Some(name.as_str()),
            Self::LabelPattern(re) => node.label.as_deref().is_some_and(|l| re.is_match(l)),
            Self::RoleText(role, re) => node.has_role(role) && accessible_text_matches(node, re),
            Self::Role(role) => node.has_role(role),
            Self::Text(re) => accessible_text_matches(node, re),
            Self::Any => true,
        }
    }

    /// CSS strategies cannot be evaluated against a focused node
    const fn drives_focus(&self) -> bool {
        !matches!(self, Self::Any)
    }
}

/// Text content, or the accessible name when Flutter rendered the label as
/// an attribute instead of DOM text.
fn accessible_text_matches(node: &FocusDescriptor, re: &Regex) -> bool {
    node.text.as_deref().is_some_and(|t| re.is_match(t))
        || node.label.as_deref().is_some_and(|l| re.is_match(l))
}

/// Focus predicate derived from a locator; true when any strategy matches
#[derive(Debug, Clone)]
pub struct FocusMatcher {
    strategies: Vec<Compiled>,
}

impl FocusMatcher {
    /// Evaluate against a focused-node descriptor
    #[must_use]
    pub fn matches(&self, node: &FocusDescriptor) -> bool {
        self.strategies
            .iter()
            .filter(|s| s.drives_focus())
            .any(|s| s.matches(node))
    }

    /// Whether any strategy can match a focused node at all
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.strategies.iter().any(Compiled::drives_focus)
    }
}

/// An element a locator resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    /// Reference actions are dispatched to
    pub element: ElementRef,
    /// Snapshot taken during resolution
    pub node: NodeSnapshot,
    /// Position of the strategy that matched
    pub strategy: usize,
}

impl Resolved {
    /// Text content, falling back to the accessible name
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.node.text.as_deref().or(self.node.label.as_deref())
    }
}

/// Lazy, ordered element query over the semantics tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemanticLocator {
    strategies: Vec<Strategy>,
    nth: usize,
    name: Option<String>,
}

impl SemanticLocator {
    fn from_strategy(strategy: Strategy) -> Self {
        Self {
            strategies: vec![strategy],
            nth: 0,
            name: None,
        }
    }

    /// Exact accessible name
    #[must_use]
    pub fn label(name: impl Into<String>) -> Self {
        Self::from_strategy(Strategy::Label(name.into()))
    }

    /// Accessible name pattern
    #[must_use]
    pub fn label_pattern(pattern: impl Into<String>) -> Self {
        Self::from_strategy(Strategy::LabelPattern(pattern.into()))
    }

    /// Role plus text pattern
    #[must_use]
    pub fn role_text(role: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::from_strategy(Strategy::RoleText {
            role: role.into(),
            pattern: pattern.into(),
        })
    }

    /// Any node with `role`
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::from_strategy(Strategy::Role(role.into()))
    }

    /// Text pattern, any role
    #[must_use]
    pub fn text(pattern: impl Into<String>) -> Self {
        Self::from_strategy(Strategy::Text(pattern.into()))
    }

    /// Raw CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::from_strategy(Strategy::Css(selector.into()))
    }

    /// The usual chain: exact label, then role and text, then text anywhere
    #[must_use]
    pub fn labeled(label: &str, role: &str, pattern: &str) -> Self {
        Self::label(label)
            .or_role_text(role, pattern)
            .or_text(pattern)
    }

    /// Append a fallback strategy
    #[must_use]
    pub fn or(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Append an exact-label fallback
    #[must_use]
    pub fn or_label(self, name: impl Into<String>) -> Self {
        self.or(Strategy::Label(name.into()))
    }

    /// Append a label-pattern fallback
    #[must_use]
    pub fn or_label_pattern(self, pattern: impl Into<String>) -> Self {
        self.or(Strategy::LabelPattern(pattern.into()))
    }

    /// Append a role-and-text fallback
    #[must_use]
    pub fn or_role_text(self, role: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.or(Strategy::RoleText {
            role: role.into(),
            pattern: pattern.into(),
        })
    }

    /// Append a role fallback
    #[must_use]
    pub fn or_role(self, role: impl Into<String>) -> Self {
        self.or(Strategy::Role(role.into()))
    }

    /// Append a text fallback
    #[must_use]
    pub fn or_text(self, pattern: impl Into<String>) -> Self {
        self.or(Strategy::Text(pattern.into()))
    }

    /// Append a CSS fallback
    #[must_use]
    pub fn or_css(self, selector: impl Into<String>) -> Self {
        self.or(Strategy::Css(selector.into()))
    }

    /// Select the `k`-th match (0-based) instead of the first
    #[must_use]
    pub const fn nth(mut self, k: usize) -> Self {
        self.nth = k;
        self
    }

    /// Human-readable name used in errors and logs
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Strategies in resolution order
    #[must_use]
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Occurrence index
    #[must_use]
    pub const fn index(&self) -> usize {
        self.nth
    }

    /// Description for errors and logs
    #[must_use]
    pub fn description(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let chain: Vec<String> = self.strategies.iter().map(ToString::to_string).collect();
        let chain = chain.join(" | ");
        if self.nth > 0 {
            format!("{chain} (nth {})", self.nth)
        } else {
            chain
        }
    }

    fn compile(&self) -> ProbeResult<Vec<Compiled>> {
        self.strategies.iter().map(Strategy::compile).collect()
    }

    /// Focus predicate equivalent to this locator, for keyboard traversal
    pub fn matcher(&self) -> ProbeResult<FocusMatcher> {
        Ok(FocusMatcher {
            strategies: self.compile()?,
        })
    }

    /// All matches of the first strategy that yields any, in document order
    async fn matches<D: SemanticsDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> ProbeResult<Option<(usize, Vec<NodeSnapshot>)>> {
        let compiled = self.compile()?;
        let mut snapshots: HashMap<&str, Vec<NodeSnapshot>> = HashMap::new();
        for (position, (strategy, matcher)) in self.strategies.iter().zip(&compiled).enumerate() {
            let base = strategy.base_selector();
            if !snapshots.contains_key(base) {
                snapshots.insert(base, driver.snapshot(base).await?);
            }
            let hits: Vec<NodeSnapshot> = snapshots
                .get(base)
                .map(|nodes| {
                    nodes
                        .iter()
                        .filter(|n| matcher.matches(&n.descriptor()))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            if hits.len() > self.nth {
                return Ok(Some((position, hits)));
            }
        }
        Ok(None)
    }

    /// Single resolution pass
    pub async fn resolve<D: SemanticsDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> ProbeResult<Lookup<Resolved>> {
        let Some((position, mut hits)) = self.matches(driver).await? else {
            tracing::trace!(locator = %self.description(), "no strategy matched");
            return Ok(Lookup::NotFound);
        };
        let node = hits.swap_remove(self.nth);
        let strategy = &self.strategies[position];
        if position > 0 {
            tracing::debug!(locator = %self.description(), %strategy, "resolved through fallback");
        }
        Ok(Lookup::Found(Resolved {
            element: ElementRef::new(strategy.base_selector(), node.index),
            node,
            strategy: position,
        }))
    }

    /// Poll until the locator resolves; `ElementNotFound` on the deadline
    pub async fn wait_for<D: SemanticsDriver + ?Sized>(
        &self,
        driver: &D,
        options: &WaitOptions,
    ) -> ProbeResult<Resolved> {
        let description = self.description();
        let waited = poll_until(options, &description, || async {
            Ok(self.resolve(driver).await?.into_option())
        })
        .await;
        match waited {
            Err(ProbeError::Timeout { .. }) => Err(ProbeError::not_found(description)),
            other => other,
        }
    }

    /// Number of matches of the strategy resolution would use
    pub async fn count<D: SemanticsDriver + ?Sized>(&self, driver: &D) -> ProbeResult<usize> {
        Ok(self.matches(driver).await?.map_or(0, |(_, hits)| hits.len()))
    }

    /// Whether the element resolves right now and has a layout box
    pub async fn is_visible<D: SemanticsDriver + ?Sized>(&self, driver: &D) -> ProbeResult<bool> {
        Ok(self
            .resolve(driver)
            .await?
            .found()
            .is_some_and(|r| r.node.visible))
    }

    /// Whether the element becomes visible before `timeout`
    pub async fn is_visible_within<D: SemanticsDriver + ?Sized>(
        &self,
        driver: &D,
        timeout: Duration,
    ) -> ProbeResult<bool> {
        let options = WaitOptions::with_timeout(timeout);
        let waited = poll_until(&options, &self.description(), || async {
            Ok(self.is_visible(driver).await?.then_some(()))
        })
        .await;
        match waited {
            Ok(()) => Ok(true),
            Err(ProbeError::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Wait for the element, then pointer-click it
    pub async fn click<D: SemanticsDriver + ?Sized>(
        &self,
        driver: &D,
        options: &WaitOptions,
    ) -> ProbeResult<()> {
        let resolved = self.wait_for(driver, options).await?;
        driver.click(&resolved.element).await
    }

    /// Wait for the element, then replace its value
    pub async fn fill<D: SemanticsDriver + ?Sized>(
        &self,
        driver: &D,
        value: &str,
        options: &WaitOptions,
    ) -> ProbeResult<()> {
        let resolved = self.wait_for(driver, options).await?;
        driver.fill(&resolved.element, value).await
    }

    /// Text of the element if it resolves right now
    pub async fn text_content<D: SemanticsDriver + ?Sized>(
        &self,
        driver: &D,
    ) -> ProbeResult<Option<String>> {
        Ok(self
            .resolve(driver)
            .await?
            .into_option()
            .and_then(|r| r.text().map(str::to_string)))
    }
}

impl fmt::Display for SemanticLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockNode, MockSemanticsPage};
    use crate::semantics::TEXT_FIELD;

    fn page(nodes: Vec<MockNode>) -> MockSemanticsPage {
        MockSemanticsPage::new("http://app.test/")
            .with_nodes(nodes)
            .with_semantics_enabled()
    }

    mod strategy_tests {
        use super::*;

        #[test]
        fn test_display() {
            let loc = SemanticLocator::label("login-button").or_text("entrar").nth(1);
            assert_eq!(
                loc.description(),
                r#"label="login-button" | text~/entrar/i (nth 1)"#
            );
            assert_eq!(loc.clone().named("login").to_string(), "login");
        }

        #[test]
        fn test_matcher_is_case_insensitive() {
            let m = SemanticLocator::role_text("button", "já tenho uma conta")
                .matcher()
                .unwrap();
            let node = FocusDescriptor::new(Some("button"), None, Some("Já Tenho Uma Conta"));
            assert!(m.matches(&node));
            let wrong_role = FocusDescriptor::new(Some("link"), None, Some("já tenho uma conta"));
            assert!(!m.matches(&wrong_role));
        }

        #[test]
        fn test_css_only_matcher_is_unusable() {
            let m = SemanticLocator::css(TEXT_FIELD).matcher().unwrap();
            assert!(!m.is_usable());
            assert!(!m.matches(&FocusDescriptor::default()));
        }

        #[test]
        fn test_text_matches_label_when_no_text() {
            let m = SemanticLocator::text("^cotraining-mode$").matcher().unwrap();
            assert!(m.matches(&FocusDescriptor::new(
                Some("button"),
                Some("cotraining-mode"),
                None
            )));
        }
    }

    mod resolve_tests {
        use super::*;

        #[tokio::test]
        async fn test_first_strategy_wins() {
            let p = page(vec![
                MockNode::button("Entrar"),
                MockNode::labeled("button", "login-button").with_text("Entrar"),
            ]);
            let r = SemanticLocator::label("login-button")
                .or_text("entrar")
                .resolve(&p)
                .await
                .unwrap()
                .into_option()
                .unwrap();
            assert_eq!(r.strategy, 0);
            assert_eq!(r.element, ElementRef::new(SEMANTICS_NODE, 1));
        }

        #[tokio::test]
        async fn test_falls_back_in_order() {
            let p = page(vec![MockNode::text("Seu plano"), MockNode::button("Entrar")]);
            let r = SemanticLocator::label("assigned-plan")
                .or_role_text("button", "plano")
                .or_text("seu plano")
                .resolve(&p)
                .await
                .unwrap()
                .into_option()
                .unwrap();
            assert_eq!(r.strategy, 2);
            assert_eq!(r.text(), Some("Seu plano"));
        }

        #[tokio::test]
        async fn test_nth_skips_strategies_with_too_few_matches() {
            let p = page(vec![
                MockNode::labeled("button", "card"),
                MockNode::button("Treino A"),
                MockNode::button("Treino B"),
            ]);
            let loc = SemanticLocator::label("card").or_role("button").nth(1);
            let r = loc.resolve(&p).await.unwrap().into_option().unwrap();
            assert_eq!(r.strategy, 1);
            assert_eq!(r.node.text.as_deref(), Some("Treino A"));
            assert_eq!(loc.count(&p).await.unwrap(), 3);
        }

        #[tokio::test]
        async fn test_not_found_is_not_an_error() {
            let p = page(vec![MockNode::button("Entrar")]);
            let found = SemanticLocator::text("sair").resolve(&p).await.unwrap();
            assert_eq!(found, Lookup::NotFound);
            assert_eq!(SemanticLocator::text("sair").count(&p).await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_invalid_pattern_surfaces_from_action() {
            let p = page(vec![MockNode::button("Entrar")]);
            let err = SemanticLocator::text("(unclosed").resolve(&p).await.unwrap_err();
            assert!(matches!(err, ProbeError::InvalidPattern(_)));
        }

        #[tokio::test]
        async fn test_css_strategy_for_inputs() {
            let p = page(vec![
                MockNode::decorator_field(),
                MockNode::text_field("name"),
                MockNode::decorator_field(),
                MockNode::text_field("password"),
            ]);
            let r = SemanticLocator::css(TEXT_FIELD)
                .nth(1)
                .resolve(&p)
                .await
                .unwrap()
                .into_option()
                .unwrap();
            assert_eq!(r.element, ElementRef::new(TEXT_FIELD, 1));
        }
    }

    mod action_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_wait_for_times_out_as_not_found() {
            let p = page(vec![]);
            let opts = WaitOptions::with_timeout(Duration::from_secs(1));
            let err = SemanticLocator::label("x")
                .named("missing thing")
                .wait_for(&p, &opts)
                .await
                .unwrap_err();
            match err {
                ProbeError::ElementNotFound { description } => {
                    assert_eq!(description, "missing thing");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[tokio::test(start_paused = true)]
        async fn test_hidden_element_is_not_visible() {
            let p = page(vec![MockNode::button("Entrar").hidden()]);
            let loc = SemanticLocator::text("entrar");
            assert!(!loc.is_visible(&p).await.unwrap());
            assert!(!loc
                .is_visible_within(&p, Duration::from_millis(500))
                .await
                .unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_click_and_fill() {
            let p = page(vec![
                MockNode::text_field("message-input"),
                MockNode::button("Enviar").navigates_to("/sent"),
            ]);
            let opts = WaitOptions::default();
            SemanticLocator::css(TEXT_FIELD)
                .fill(&p, "Ótimo trabalho!", &opts)
                .await
                .unwrap();
            assert_eq!(p.value_of("message-input").as_deref(), Some("Ótimo trabalho!"));

            SemanticLocator::role_text("button", "enviar")
                .click(&p, &opts)
                .await
                .unwrap();
            assert_eq!(p.current_url().await.unwrap(), "http://app.test/sent");
        }

        #[tokio::test]
        async fn test_text_content() {
            let p = page(vec![MockNode::labeled("heading", "user-name").with_text("Ana")]);
            let text = SemanticLocator::label("user-name").text_content(&p).await.unwrap();
            assert_eq!(text.as_deref(), Some("Ana"));
        }
    }
}
