//! Bounded waits.
//!
//! Every wait is either a condition poll with a deadline or a settle delay
//! for the few cases with no observable signal (first paint of the semantics
//! tree, focus animation). All timing goes through `tokio::time` so tests can
//! run on a paused clock.

use std::future::Future;
use std::time::Duration;

use regex::Regex;
use tokio::time::Instant;

use crate::driver::SemanticsDriver;
use crate::result::{ProbeError, ProbeResult};

/// Default timeout for wait operations (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Default first polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default cap on the polling interval (1 second)
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 1_000;

/// Exponential backoff between polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// First interval
    pub initial: Duration,
    /// Upper bound on any interval
    pub max: Duration,
    /// Growth factor per attempt
    pub factor: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max: Duration::from_millis(DEFAULT_MAX_POLL_INTERVAL_MS),
            factor: 2,
        }
    }
}

impl Backoff {
    /// Constant interval, no growth
    #[must_use]
    pub const fn fixed(interval: Duration) -> Self {
        Self {
            initial: interval,
            max: interval,
            factor: 1,
        }
    }

    /// Interval before attempt number `attempt` (0-based)
    #[must_use]
    pub fn interval(&self, attempt: u32) -> Duration {
        let mut interval = self.initial;
        for _ in 0..attempt {
            interval = interval.saturating_mul(self.factor.max(1));
            if interval >= self.max {
                return self.max;
            }
        }
        interval.min(self.max)
    }
}

/// Options for a bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Deadline measured from the first check
    pub timeout: Duration,
    /// Polling schedule
    pub backoff: Backoff,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            backoff: Backoff::default(),
        }
    }
}

impl WaitOptions {
    /// Create wait options with a timeout and the default backoff
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Replace the backoff schedule
    #[must_use]
    pub const fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Timeout in milliseconds, for error reporting
    #[must_use]
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Poll `check` until it yields `Some`, an error, or the deadline passes.
///
/// The check always runs at least once, even with a zero timeout. Check
/// errors are returned immediately; only absence is retried.
pub async fn poll_until<T, F, Fut>(options: &WaitOptions, what: &str, mut check: F) -> ProbeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Option<T>>>,
{
    let deadline = Instant::now() + options.timeout;
    let mut attempt = 0u32;
    loop {
        if let Some(value) = check().await? {
            tracing::trace!(what, attempt, "condition met");
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(ProbeError::Timeout {
                what: what.to_string(),
                ms: options.timeout_ms(),
            });
        }
        let pause = options.backoff.interval(attempt).min(deadline - now);
        tokio::time::sleep(pause).await;
        attempt = attempt.saturating_add(1);
    }
}

/// Fixed settle delay, reserved for waits with no observable signal.
pub async fn settle(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Wait until at least one element matches `selector`.
pub async fn wait_for_attached<D: SemanticsDriver + ?Sized>(
    driver: &D,
    selector: &str,
    options: &WaitOptions,
) -> ProbeResult<usize> {
    poll_until(options, selector, || async {
        let n = driver.count(selector).await?;
        Ok((n > 0).then_some(n))
    })
    .await
}

/// Wait until the page URL matches `pattern`, returning the URL.
pub async fn wait_for_url<D: SemanticsDriver + ?Sized>(
    driver: &D,
    pattern: &Regex,
    options: &WaitOptions,
) -> ProbeResult<String> {
    let what = format!("URL matching /{}/", pattern.as_str());
    poll_until(options, &what, || async {
        let url = driver.current_url().await?;
        Ok(pattern.is_match(&url).then_some(url))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    mod backoff_tests {
        use super::*;

        #[test]
        fn test_default_backoff_grows_and_caps() {
            let b = Backoff::default();
            assert_eq!(b.interval(0), Duration::from_millis(50));
            assert_eq!(b.interval(1), Duration::from_millis(100));
            assert_eq!(b.interval(2), Duration::from_millis(200));
            assert_eq!(b.interval(10), Duration::from_millis(1_000));
        }

        #[test]
        fn test_fixed_backoff() {
            let b = Backoff::fixed(Duration::from_millis(150));
            assert_eq!(b.interval(0), b.interval(7));
        }
    }

    mod poll_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_poll_succeeds_after_attempts() {
            let calls = AtomicU32::new(0);
            let value = poll_until(&WaitOptions::default(), "counter", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Ok((n >= 3).then_some(n))
            })
            .await
            .unwrap();
            assert_eq!(value, 3);
        }

        #[tokio::test(start_paused = true)]
        async fn test_poll_times_out() {
            let start = Instant::now();
            let opts = WaitOptions::with_timeout(Duration::from_secs(2));
            let err = poll_until(&opts, "never", || async { Ok(None::<()>) })
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::Timeout { ms: 2_000, .. }));
            assert!(start.elapsed() >= Duration::from_secs(2));
            assert!(start.elapsed() < Duration::from_secs(3));
        }

        #[tokio::test(start_paused = true)]
        async fn test_zero_timeout_checks_once() {
            let calls = AtomicU32::new(0);
            let opts = WaitOptions::with_timeout(Duration::ZERO);
            let result = poll_until(&opts, "once", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(()))
            })
            .await;
            assert!(result.is_ok());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_check_error_is_not_retried() {
            let calls = AtomicU32::new(0);
            let err = poll_until(&WaitOptions::default(), "boom", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<Option<()>, _>(ProbeError::script("eval failed"))
            })
            .await
            .unwrap_err();
            assert!(matches!(err, ProbeError::Script { .. }));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }
}
