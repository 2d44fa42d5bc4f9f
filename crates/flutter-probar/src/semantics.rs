//! Flutter Web semantics tree: selectors and the enablement primitive.
//!
//! Flutter renders to a canvas behind `flt-glass-pane` and only builds the
//! `flt-semantics` accessibility tree after its hidden "Enable accessibility"
//! placeholder is clicked. Until then there is nothing to locate.

use std::time::Duration;

use serde::Serialize;

use crate::driver::SemanticsDriver;
use crate::result::ProbeResult;
use crate::wait::{poll_until, settle, wait_for_attached, WaitOptions};

/// Rendering-surface marker; attached once the engine has booted
pub const GLASS_PANE: &str = "flt-glass-pane";

/// Hidden control that switches the semantics bridge on
pub const ENABLE_PLACEHOLDER: &str = r#"flt-semantics-placeholder[aria-label="Enable accessibility"]"#;

/// Semantics tree nodes
pub const SEMANTICS_NODE: &str = "flt-semantics";

/// Container that must hold focus for Tab to route through the tree
pub const SEMANTICS_HOST: &str = "flt-semantics-host";

/// Enabled Flutter text inputs (each field also renders a disabled decorator)
pub const TEXT_FIELD: &str =
    r#"flt-semantics input[data-semantics-role="text-field"]:not([disabled])"#;

/// Enabled e-mail input
pub const EMAIL_FIELD: &str = r#"flt-semantics input[autocomplete="email"]:not([disabled])"#;

/// Timing for [`enable_accessibility`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnableOptions {
    /// Deadline for the rendering surface to attach
    pub surface_timeout: Duration,
    /// Deadline for the first semantics node after the toggle
    pub semantics_timeout: Duration,
    /// Settle delay after nodes appear
    pub settle: Duration,
}

impl Default for EnableOptions {
    fn default() -> Self {
        Self {
            surface_timeout: Duration::from_secs(15),
            semantics_timeout: Duration::from_secs(10),
            settle: Duration::from_millis(1_500),
        }
    }
}

/// What [`enable_accessibility`] observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Enablement {
    /// Whether the placeholder was present and clicked
    pub toggled: bool,
    /// Semantics nodes attached once the tree was up
    pub nodes: usize,
}

/// Turn the semantics tree on and wait for it to materialise.
///
/// Safe to call repeatedly: once nodes exist the placeholder is gone, the
/// click is skipped, and every wait returns on its first poll.
pub async fn enable_accessibility<D: SemanticsDriver + ?Sized>(
    driver: &D,
    options: &EnableOptions,
) -> ProbeResult<Enablement> {
    let surface = WaitOptions::with_timeout(options.surface_timeout);
    wait_for_attached(driver, GLASS_PANE, &surface).await?;

    // The engine adds the placeholder a moment after the glass pane.
    let already_enabled = poll_until(&surface, "semantics placeholder", || async {
        if driver.count(SEMANTICS_NODE).await? > 0 {
            return Ok(Some(true));
        }
        Ok((driver.count(ENABLE_PLACEHOLDER).await? > 0).then_some(false))
    })
    .await?;

    let toggled = if already_enabled {
        false
    } else {
        driver.script_click(ENABLE_PLACEHOLDER).await?
    };

    let semantics = WaitOptions::with_timeout(options.semantics_timeout);
    let nodes = wait_for_attached(driver, SEMANTICS_NODE, &semantics).await?;

    if toggled {
        settle(options.settle).await;
    }
    tracing::info!(toggled, nodes, "semantics tree enabled");
    Ok(Enablement { toggled, nodes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockNode, MockSemanticsPage};
    use crate::result::ProbeError;

    fn page() -> MockSemanticsPage {
        MockSemanticsPage::new("http://app.test/login")
            .with_nodes(vec![MockNode::button("Entrar"), MockNode::text("Bem-vindo")])
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_toggles_placeholder() {
        let page = page();
        assert_eq!(page.count(SEMANTICS_NODE).await.unwrap(), 0);

        let e = enable_accessibility(&page, &EnableOptions::default())
            .await
            .unwrap();
        assert!(e.toggled);
        assert_eq!(e.nodes, 2);
        assert_eq!(page.placeholder_clicks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_is_idempotent() {
        let page = page();
        let first = enable_accessibility(&page, &EnableOptions::default())
            .await
            .unwrap();
        let second = enable_accessibility(&page, &EnableOptions::default())
            .await
            .unwrap();

        assert_eq!(first.nodes, second.nodes);
        assert!(!second.toggled);
        assert_eq!(page.placeholder_clicks(), 1);
        assert!(page.semantics_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_waits_for_late_surface() {
        let page = page().with_surface_delay(5);
        let e = enable_accessibility(&page, &EnableOptions::default())
            .await
            .unwrap();
        assert!(e.toggled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_times_out_without_surface() {
        let page = page().without_surface();
        let err = enable_accessibility(&page, &EnableOptions::default())
            .await
            .unwrap_err();
        match err {
            ProbeError::Timeout { what, ms } => {
                assert_eq!(what, GLASS_PANE);
                assert_eq!(ms, 15_000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_times_out_when_tree_stays_empty() {
        let page = MockSemanticsPage::new("http://app.test/");
        let err = enable_accessibility(&page, &EnableOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Timeout { ms: 10_000, .. }));
    }
}
