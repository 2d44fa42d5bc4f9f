//! Cross-actor synchronisation.
//!
//! When one actor acts and another must observe the effect, the observer
//! polls for the effect instead of sleeping a fixed time. The effect is
//! either visible in the backend (`remote`) or on the observer's screen
//! (`ui`), optionally reloading between attempts for screens that do not
//! refresh on their own.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::backend::{BackendClient, SessionState};
use crate::config::Timeouts;
use crate::driver::SemanticsDriver;
use crate::locator::{Resolved, SemanticLocator};
use crate::result::ProbeResult;
use crate::semantics::{enable_accessibility, EnableOptions};
use crate::wait::{poll_until, Backoff, WaitOptions};

/// Backoff between reloads; a reload plus enablement is expensive
const RELOAD_BACKOFF: Backoff = Backoff {
    initial: Duration::from_millis(500),
    max: Duration::from_secs(4),
    factor: 2,
};

/// Bounded wait for another actor's effect
#[derive(Debug, Clone, Copy)]
pub struct Rendezvous {
    options: WaitOptions,
    enable: EnableOptions,
}

impl Rendezvous {
    /// Deadline and backoff for every wait, enablement timing for reloads
    #[must_use]
    pub const fn new(options: WaitOptions, enable: EnableOptions) -> Self {
        Self { options, enable }
    }

    /// Cross-actor deadline from the configured timeouts
    #[must_use]
    pub fn from_timeouts(timeouts: &Timeouts) -> Self {
        Self::new(timeouts.expect_wait(), timeouts.enable_options())
    }

    /// Wait options in effect
    #[must_use]
    pub const fn options(&self) -> &WaitOptions {
        &self.options
    }

    /// Poll the backend until the session satisfies `predicate`
    pub async fn remote<P>(
        &self,
        client: &BackendClient,
        session_id: &str,
        predicate: P,
    ) -> ProbeResult<SessionState>
    where
        P: Fn(&SessionState) -> bool,
    {
        let what = format!("session {session_id} to reach the expected state");
        let state = poll_until(&self.options, &what, || async {
            let state = client.session(session_id).await?;
            Ok(predicate(&state).then_some(state))
        })
        .await?;
        tracing::debug!(session_id, "remote rendezvous reached");
        Ok(state)
    }

    /// Poll the observer's screen until `locator` resolves.
    ///
    /// With `reload`, every retry reloads the page and enables the semantics
    /// tree again before looking.
    pub async fn ui<D: SemanticsDriver + ?Sized>(
        &self,
        driver: &D,
        locator: &SemanticLocator,
        reload: bool,
    ) -> ProbeResult<Resolved> {
        let options = if reload {
            self.options.backoff(RELOAD_BACKOFF)
        } else {
            self.options
        };
        let attempts = AtomicU32::new(0);
        let resolved = poll_until(&options, &locator.description(), || async {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed);
            if reload && attempt > 0 {
                tracing::debug!(attempt, locator = %locator, "reloading observer");
                driver.reload().await?;
                enable_accessibility(driver, &self.enable).await?;
            }
            Ok(locator.resolve(driver).await?.into_option())
        })
        .await?;
        tracing::debug!(
            locator = %locator,
            attempts = attempts.load(Ordering::Relaxed),
            "ui rendezvous reached"
        );
        Ok(resolved)
    }
}
