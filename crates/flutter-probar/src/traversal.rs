//! Keyboard focus traversal.
//!
//! The glass pane intercepts pointer events over most of a Flutter page, so
//! the reliable way to reach a control is the one a keyboard user takes:
//! focus the semantics host, press Tab, look at what got focus, repeat.
//!
//! Outcomes are three-way. `Ok(Found)` means the predicate matched and (for
//! the activating variant) Enter was sent; `Ok(NotFound)` means the step
//! budget ran out; `Err` means the browser could not be driven at all.

use std::time::Duration;

use serde::Serialize;

use crate::driver::{FocusDescriptor, Key, SemanticsDriver};
use crate::result::{Lookup, ProbeResult};
use crate::semantics::SEMANTICS_HOST;
use crate::wait::settle;

/// Default Tab budget
pub const DEFAULT_MAX_STEPS: u32 = 20;

/// Traversal tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalOptions {
    /// Tab presses before giving up
    pub max_steps: u32,
    /// Delay after focusing the semantics host
    pub host_settle: Duration,
    /// Delay after each Tab for the focus change to land
    pub step_settle: Duration,
    /// Delay after Enter for the activation to take effect
    pub activation_settle: Duration,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            host_settle: Duration::from_millis(200),
            step_settle: Duration::from_millis(150),
            activation_settle: Duration::from_millis(300),
        }
    }
}

impl TraversalOptions {
    /// Same timing with a different step budget
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Node that satisfied the predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FocusHit {
    /// What was focused when the predicate matched
    pub descriptor: FocusDescriptor,
    /// Tab presses it took, 1-based
    pub steps: u32,
}

/// Tab through the page until `predicate` accepts the focused node.
pub async fn tab_to_element<D, P>(
    driver: &D,
    predicate: P,
    options: &TraversalOptions,
) -> ProbeResult<Lookup<FocusHit>>
where
    D: SemanticsDriver + ?Sized,
    P: Fn(&FocusDescriptor) -> bool + Send + Sync,
{
    if !driver.focus(SEMANTICS_HOST).await? {
        tracing::debug!("semantics host absent, tabbing from the document body");
    }
    settle(options.host_settle).await;

    for step in 1..=options.max_steps {
        driver.press_key(Key::Tab).await?;
        settle(options.step_settle).await;

        // Focus outside the semantics tree still costs a step.
        let Some(descriptor) = driver.active_node().await? else {
            tracing::trace!(step, "focus outside semantics tree");
            continue;
        };
        tracing::trace!(step, role = ?descriptor.role, label = ?descriptor.label, "focused");
        if predicate(&descriptor) {
            tracing::debug!(step, role = ?descriptor.role, label = ?descriptor.label, "traversal matched");
            return Ok(Lookup::Found(FocusHit {
                descriptor,
                steps: step,
            }));
        }
    }

    tracing::debug!(max_steps = options.max_steps, "traversal exhausted");
    Ok(Lookup::NotFound)
}

/// [`tab_to_element`], then press Enter on the match.
pub async fn tab_to_and_activate<D, P>(
    driver: &D,
    predicate: P,
    options: &TraversalOptions,
) -> ProbeResult<Lookup<FocusHit>>
where
    D: SemanticsDriver + ?Sized,
    P: Fn(&FocusDescriptor) -> bool + Send + Sync,
{
    let hit = tab_to_element(driver, predicate, options).await?;
    if hit.is_found() {
        driver.press_key(Key::Enter).await?;
        settle(options.activation_settle).await;
    }
    Ok(hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockNode, MockSemanticsPage};

    fn buttons(n: usize) -> Vec<MockNode> {
        (1..=n).map(|i| MockNode::button(&format!("B{i}"))).collect()
    }

    fn page(nodes: Vec<MockNode>) -> MockSemanticsPage {
        MockSemanticsPage::new("http://app.test/login")
            .with_nodes(nodes)
            .with_semantics_enabled()
    }

    fn text_is(expected: &'static str) -> impl Fn(&FocusDescriptor) -> bool + Send + Sync {
        move |d| d.text.as_deref() == Some(expected)
    }

    mod traversal_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_never_matching_uses_whole_budget() {
            let p = page(buttons(3));
            let opts = TraversalOptions::default();
            let hit = tab_to_element(&p, |_| false, &opts).await.unwrap();
            assert_eq!(hit, Lookup::NotFound);
            assert_eq!(p.key_count(Key::Tab), 20);
            assert_eq!(p.key_count(Key::Enter), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn test_match_at_step_k() {
            let p = page(buttons(6));
            let hit = tab_to_element(&p, text_is("B4"), &TraversalOptions::default())
                .await
                .unwrap()
                .into_option()
                .unwrap();
            assert_eq!(hit.steps, 4);
            assert!(hit.descriptor.has_role("button"));
            assert_eq!(p.key_count(Key::Tab), 4);
        }

        #[tokio::test(start_paused = true)]
        async fn test_activation_sends_one_enter() {
            let mut nodes = buttons(3);
            nodes.push(MockNode::button("Entrar").navigates_to("/dashboard"));
            let p = page(nodes);
            let hit = tab_to_and_activate(&p, text_is("Entrar"), &TraversalOptions::default())
                .await
                .unwrap();
            assert!(hit.is_found());
            assert_eq!(p.keys(), vec![Key::Tab, Key::Tab, Key::Tab, Key::Tab, Key::Enter]);
            assert_eq!(p.current_url().await.unwrap(), "http://app.test/dashboard");
        }

        #[tokio::test(start_paused = true)]
        async fn test_target_beyond_budget_is_never_activated() {
            let mut nodes = buttons(7);
            nodes.push(MockNode::button("Entrar").navigates_to("/dashboard"));
            let p = page(nodes);
            let opts = TraversalOptions::default().with_max_steps(5);
            let hit = tab_to_and_activate(&p, text_is("Entrar"), &opts).await.unwrap();
            assert_eq!(hit, Lookup::NotFound);
            assert_eq!(p.key_count(Key::Tab), 5);
            assert_eq!(p.key_count(Key::Enter), 0);
            assert!(p.activations().is_empty());
            assert_eq!(p.current_url().await.unwrap(), "http://app.test/login");
        }

        #[tokio::test(start_paused = true)]
        async fn test_focus_escape_consumes_step() {
            let p = page(vec![
                MockNode::foreign("browser-toolbar"),
                MockNode::button("B1"),
            ]);
            let hit = tab_to_element(&p, |_| true, &TraversalOptions::default())
                .await
                .unwrap()
                .into_option()
                .unwrap();
            assert_eq!(hit.steps, 2);
            assert_eq!(hit.descriptor.text.as_deref(), Some("B1"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_only_foreign_focus_is_exhaustion_not_error() {
            let p = page(vec![MockNode::foreign("iframe")]);
            let opts = TraversalOptions::default().with_max_steps(4);
            let hit = tab_to_element(&p, |_| true, &opts).await.unwrap();
            assert_eq!(hit, Lookup::NotFound);
        }

        #[tokio::test(start_paused = true)]
        async fn test_default_timing() {
            let p = page(buttons(2));
            let start = tokio::time::Instant::now();
            tab_to_and_activate(&p, text_is("B2"), &TraversalOptions::default())
                .await
                .unwrap();
            // host 200 + 2 x 150 + activation 300
            let elapsed = start.elapsed();
            assert!(elapsed >= Duration::from_millis(800));
            assert!(elapsed < Duration::from_millis(850));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn run<F: std::future::Future>(future: F) -> F::Output {
            tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap()
                .block_on(future)
        }

        proptest! {
            #[test]
            fn prop_tab_count_bounded_by_budget(
                total in 1usize..30,
                target in proptest::option::of(1usize..30),
                max_steps in 1u32..30,
            ) {
                let target = target.filter(|t| *t <= total);
                let nodes: Vec<MockNode> = (1..=total)
                    .map(|i| {
                        let text = if Some(i) == target { "target".to_string() } else { format!("B{i}") };
                        MockNode::button(&text)
                    })
                    .collect();
                let p = page(nodes);
                let opts = TraversalOptions::default().with_max_steps(max_steps);
                let hit = run(tab_to_and_activate(&p, text_is("target"), &opts)).unwrap();

                match target {
                    Some(k) if k as u32 <= max_steps => {
                        prop_assert_eq!(hit.found().map(|h| h.steps), Some(k as u32));
                        prop_assert_eq!(p.key_count(Key::Tab), k);
                        prop_assert_eq!(p.key_count(Key::Enter), 1);
                    }
                    _ => {
                        prop_assert!(!hit.is_found());
                        prop_assert_eq!(p.key_count(Key::Tab), max_steps as usize);
                        prop_assert_eq!(p.key_count(Key::Enter), 0);
                    }
                }
            }
        }
    }
}
