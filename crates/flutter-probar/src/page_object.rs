//! Page Object Model support.
//!
//! Every screen of the app is wrapped in a struct that owns a
//! [`FlutterHelper`](crate::FlutterHelper) and exposes intent-level methods.
//! The trait below is the part they share: a route pattern for "am I on this
//! screen" checks and an `is_displayed` check journeys can assert on.

use async_trait::async_trait;
use regex::RegexBuilder;

use crate::result::ProbeResult;

/// A screen of the application under test.
///
/// # Example
///
/// ```ignore
/// impl<D: SemanticsDriver + ?Sized> PageObject for LoginPage<'_, D> {
///     fn url_pattern(&self) -> &str {
///         "/login"
///     }
///
///     async fn is_displayed(&self) -> ProbeResult<bool> {
///         self.flutter.has_text("entrar|login").await
///     }
/// }
/// ```
#[async_trait]
pub trait PageObject {
    /// Case-insensitive pattern matched against the page URL
    fn url_pattern(&self) -> &str;

    /// Page name for logging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Load deadline in milliseconds
    fn load_timeout_ms(&self) -> u64 {
        10_000
    }

    /// Whether `url` belongs to this page; malformed patterns never match
    fn matches_url(&self, url: &str) -> bool {
        RegexBuilder::new(self.url_pattern())
            .case_insensitive(true)
            .build()
            .is_ok_and(|re| re.is_match(url))
    }

    /// Whether the page currently shows its own content
    async fn is_displayed(&self) -> ProbeResult<bool>;
}
