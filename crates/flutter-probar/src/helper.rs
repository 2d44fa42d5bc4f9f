//! Composite actions over one driver.
//!
//! `FlutterHelper` bundles the enablement primitive, the locator and the
//! traversal engine with one set of timeouts, and adds the pointer-first,
//! keyboard-fallback activation every page object is built on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::config::Timeouts;
use crate::driver::{FocusDescriptor, NodeSnapshot, SemanticsDriver};
use crate::locator::SemanticLocator;
use crate::result::{Lookup, ProbeError, ProbeResult};
use crate::semantics::{enable_accessibility, Enablement, SEMANTICS_NODE};
use crate::traversal::{tab_to_and_activate, tab_to_element, FocusHit};
use crate::wait::{poll_until, settle, wait_for_url, WaitOptions};

/// Nodes dumped by [`FlutterHelper::debug_elements`]
pub const DEBUG_NODE_LIMIT: usize = 30;

/// Characters of text kept per node in the debug dump
const DEBUG_TEXT_LIMIT: usize = 50;

/// How an element ended up activated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivationPath {
    /// Pointer click on the resolved element
    Pointer,
    /// Tab traversal followed by Enter
    Keyboard {
        /// Tab presses it took
        steps: u32,
    },
}

/// Composite helpers bound to one driver
#[derive(Debug)]
pub struct FlutterHelper<'d, D: SemanticsDriver + ?Sized> {
    driver: &'d D,
    timeouts: Timeouts,
}

impl<D: SemanticsDriver + ?Sized> Clone for FlutterHelper<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: SemanticsDriver + ?Sized> Copy for FlutterHelper<'_, D> {}

impl<'d, D: SemanticsDriver + ?Sized> FlutterHelper<'d, D> {
    /// Bind to a driver
    #[must_use]
    pub const fn new(driver: &'d D, timeouts: Timeouts) -> Self {
        Self { driver, timeouts }
    }

    /// The bound driver
    #[must_use]
    pub const fn driver(&self) -> &'d D {
        self.driver
    }

    /// Timeouts in effect
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Enable the semantics tree and wait for it
    pub async fn wait_for_flutter(&self) -> ProbeResult<Enablement> {
        enable_accessibility(self.driver, &self.timeouts.enable_options()).await
    }

    /// Navigate and enable the semantics tree on the new document
    pub async fn open(&self, url: &str) -> ProbeResult<Enablement> {
        tracing::info!(url, "navigating");
        self.driver
            .goto(url)
            .await
            .map_err(|e| match e {
                nav @ ProbeError::Navigation { .. } => nav,
                other => ProbeError::Navigation {
                    url: url.to_string(),
                    message: other.to_string(),
                },
            })?;
        self.wait_for_flutter().await
    }

    /// Reload and enable the semantics tree again
    pub async fn reload(&self) -> ProbeResult<Enablement> {
        self.driver.reload().await?;
        self.wait_for_flutter().await
    }

    /// Wait for the URL to match `pattern` (case-insensitive)
    pub async fn wait_for_route(&self, pattern: &str) -> ProbeResult<String> {
        let re = regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()?;
        wait_for_url(self.driver, &re, &self.timeouts.navigation_wait()).await
    }

    /// Tab until `predicate` matches
    pub async fn tab_to_element<P>(&self, predicate: P) -> ProbeResult<Lookup<FocusHit>>
    where
        P: Fn(&FocusDescriptor) -> bool + Send + Sync,
    {
        tab_to_element(self.driver, predicate, &self.timeouts.traversal_options()).await
    }

    /// Tab until `predicate` matches, then press Enter
    pub async fn tab_to_and_activate<P>(&self, predicate: P) -> ProbeResult<Lookup<FocusHit>>
    where
        P: Fn(&FocusDescriptor) -> bool + Send + Sync,
    {
        tab_to_and_activate(self.driver, predicate, &self.timeouts.traversal_options()).await
    }

    /// Activate the first focused button whose text matches `pattern`
    pub async fn click_button(&self, pattern: &str) -> ProbeResult<Lookup<FocusHit>> {
        let re = regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()?;
        self.tab_to_and_activate(|d| {
            d.has_role("button") && d.text.as_deref().is_some_and(|t| re.is_match(t))
        })
        .await
    }

    /// Activate the first focused node with `role`
    pub async fn activate_role(&self, role: &str) -> ProbeResult<Lookup<FocusHit>> {
        self.tab_to_and_activate(|d| d.has_role(role)).await
    }

    /// Activate the first focused card
    pub async fn click_first_group(&self) -> ProbeResult<Lookup<FocusHit>> {
        self.activate_role("group").await
    }

    /// Type into whatever has focus
    pub async fn type_into_focused(&self, text: &str) -> ProbeResult<()> {
        self.driver.insert_text(text).await?;
        settle(Duration::from_millis(100)).await;
        Ok(())
    }

    /// Wait for an input to attach and become visible, then replace its value
    pub async fn fill_input(&self, locator: &SemanticLocator, value: &str) -> ProbeResult<()> {
        let options = self.timeouts.element_wait();
        locator.wait_for(self.driver, &options).await?;
        let what = format!("{} to be visible", locator.description());
        let resolved = poll_until(&options, &what, || async {
            Ok(locator
                .resolve(self.driver)
                .await?
                .into_option()
                .filter(|r| r.node.visible))
        })
        .await?;
        self.driver.fill(&resolved.element, value).await?;
        settle(Duration::from_millis(200)).await;
        Ok(())
    }

    /// Descriptor of the focused semantics node
    pub async fn focused_element(&self) -> ProbeResult<Option<FocusDescriptor>> {
        self.driver.active_node().await
    }

    /// Log and return the first nodes of the tree
    pub async fn debug_elements(&self) -> ProbeResult<Vec<NodeSnapshot>> {
        let mut nodes = self.driver.snapshot(SEMANTICS_NODE).await?;
        nodes.truncate(DEBUG_NODE_LIMIT);
        for node in &mut nodes {
            if let Some(text) = &node.text {
                if text.chars().count() > DEBUG_TEXT_LIMIT {
                    node.text = Some(text.chars().take(DEBUG_TEXT_LIMIT).collect());
                }
            }
            tracing::info!(
                index = node.index,
                role = ?node.role,
                label = ?node.label,
                text = ?node.text,
                visible = node.visible,
                "semantics node"
            );
        }
        Ok(nodes)
    }

    /// Write a PNG of the page to `dir/{stem}.png`
    pub async fn save_screenshot(&self, dir: &Path, stem: &str) -> ProbeResult<PathBuf> {
        let png = self.driver.screenshot().await?;
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{stem}.png"));
        tokio::fs::write(&path, png).await?;
        tracing::info!(path = %path.display(), "screenshot saved");
        Ok(path)
    }

    /// Activate `locator`: pointer click when it resolves visibly, otherwise
    /// keyboard traversal with the locator's own predicate.
    pub async fn activate(&self, locator: &SemanticLocator) -> ProbeResult<Lookup<ActivationPath>> {
        let resolved = match locator
            .wait_for(self.driver, &self.timeouts.element_wait())
            .await
        {
            Ok(resolved) => Some(resolved),
            Err(e) if e.is_absence() => None,
            Err(e) => return Err(e),
        };

        if let Some(resolved) = resolved.filter(|r| r.node.visible) {
            match self.driver.click(&resolved.element).await {
                Ok(()) => {
                    tracing::debug!(locator = %locator, "activated by pointer");
                    return Ok(Lookup::Found(ActivationPath::Pointer));
                }
                Err(ProbeError::Input { message }) => {
                    tracing::warn!(locator = %locator, %message, "pointer click intercepted");
                }
                Err(e) => return Err(e),
            }
        }

        let matcher = locator.matcher()?;
        if !matcher.is_usable() {
            return Ok(Lookup::NotFound);
        }
        tracing::warn!(locator = %locator, "falling back to keyboard traversal");
        let hit = self.tab_to_and_activate(|d| matcher.matches(d)).await?;
        Ok(hit.map(|h| ActivationPath::Keyboard { steps: h.steps }))
    }

    /// Activate `locator` if it attaches within `timeout`; `false` when it never does
    pub async fn activate_if_present(
        &self,
        locator: &SemanticLocator,
        timeout: Duration,
    ) -> ProbeResult<bool> {
        match locator
            .wait_for(self.driver, &WaitOptions::with_timeout(timeout))
            .await
        {
            Ok(_) => Ok(self.activate(locator).await?.is_found()),
            Err(e) if e.is_absence() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// [`Self::activate`], with absence as an error
    pub async fn activate_required(&self, locator: &SemanticLocator) -> ProbeResult<ActivationPath> {
        self.activate(locator).await?.require(locator.description())
    }

    /// Whether `locator` shows up visibly within `timeout`
    pub async fn is_visible_within(
        &self,
        locator: &SemanticLocator,
        timeout: Duration,
    ) -> ProbeResult<bool> {
        locator.is_visible_within(self.driver, timeout).await
    }

    /// Whether any node's text matches `pattern` right now
    pub async fn has_text(&self, pattern: &str) -> ProbeResult<bool> {
        Ok(SemanticLocator::text(pattern).count(self.driver).await? > 0)
    }
}
