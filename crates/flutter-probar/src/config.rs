//! Harness configuration.
//!
//! Layered as defaults, then an optional YAML file, then environment
//! variables. Durations are stored in milliseconds so files stay readable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::result::{ProbeError, ProbeResult};
use crate::semantics::EnableOptions;
use crate::traversal::TraversalOptions;
use crate::wait::WaitOptions;

/// Default Flutter app origin
pub const DEFAULT_APP_URL: &str = "http://localhost:3000";

/// Default backend test API origin
pub const DEFAULT_API_URL: &str = "http://localhost:8001";

/// Browser settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run without a window
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Chromium executable; auto-detected when `None`
    pub chromium_path: Option<PathBuf>,
    /// Chromium sandbox (off in containers)
    pub sandbox: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: false,
        }
    }
}

/// Every wait the harness performs, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Rendering surface attach
    pub surface_ms: u64,
    /// First semantics node after enabling
    pub semantics_ms: u64,
    /// Settle after the tree appears
    pub settle_ms: u64,
    /// Settle after focusing the semantics host
    pub host_settle_ms: u64,
    /// Settle after each Tab
    pub tab_settle_ms: u64,
    /// Settle after Enter
    pub activation_settle_ms: u64,
    /// Tab budget per traversal
    pub max_tab_steps: u32,
    /// URL change after login or route actions
    pub navigation_ms: u64,
    /// Element resolution before an action
    pub element_ms: u64,
    /// Cross-actor expectations
    pub expect_ms: u64,
    /// Whole journey
    pub test_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            surface_ms: 15_000,
            semantics_ms: 10_000,
            settle_ms: 1_500,
            host_settle_ms: 200,
            tab_settle_ms: 150,
            activation_settle_ms: 300,
            max_tab_steps: 20,
            navigation_ms: 20_000,
            element_ms: 10_000,
            expect_ms: 10_000,
            test_ms: 60_000,
        }
    }
}

impl Timeouts {
    /// Enablement timing
    #[must_use]
    pub const fn enable_options(&self) -> EnableOptions {
        EnableOptions {
            surface_timeout: Duration::from_millis(self.surface_ms),
            semantics_timeout: Duration::from_millis(self.semantics_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }

    /// Traversal timing and budget
    #[must_use]
    pub const fn traversal_options(&self) -> TraversalOptions {
        TraversalOptions {
            max_steps: self.max_tab_steps,
            host_settle: Duration::from_millis(self.host_settle_ms),
            step_settle: Duration::from_millis(self.tab_settle_ms),
            activation_settle: Duration::from_millis(self.activation_settle_ms),
        }
    }

    /// Wait for an element before acting on it
    #[must_use]
    pub fn element_wait(&self) -> WaitOptions {
        WaitOptions::with_timeout(Duration::from_millis(self.element_ms))
    }

    /// Wait for a route change
    #[must_use]
    pub fn navigation_wait(&self) -> WaitOptions {
        WaitOptions::with_timeout(Duration::from_millis(self.navigation_ms))
    }

    /// Wait for another actor's effect to show up
    #[must_use]
    pub fn expect_wait(&self) -> WaitOptions {
        WaitOptions::with_timeout(Duration::from_millis(self.expect_ms))
    }

    /// Journey deadline
    #[must_use]
    pub const fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_ms)
    }

    /// Timeouts scaled for tests on a paused clock
    #[must_use]
    pub fn fast() -> Self {
        Self {
            settle_ms: 0,
            host_settle_ms: 0,
            tab_settle_ms: 0,
            activation_settle_ms: 0,
            ..Self::default()
        }
    }
}

/// Complete harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Flutter app origin
    pub app_url: String,
    /// Backend test API origin
    pub api_url: String,
    /// Browser settings
    pub browser: BrowserSettings,
    /// Timeouts
    pub timeouts: Timeouts,
    /// Where reports and failure screenshots go
    pub output_dir: PathBuf,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            app_url: DEFAULT_APP_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            browser: BrowserSettings::default(),
            timeouts: Timeouts::default(),
            output_dir: PathBuf::from("target/flutter-probar"),
        }
    }
}

impl ProbeConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read a YAML file
    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ProbeError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_yaml(&text)
    }

    /// Defaults, then `path` if given, then the process environment
    pub fn load(path: Option<&Path>) -> ProbeResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    pub fn with_env_from<F>(mut self, lookup: F) -> ProbeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k)).filter(|v| !v.is_empty());

        if let Some(url) = first(&["E2E_APP_URL", "APP_URL"]) {
            self.app_url = url;
        }
        if let Some(url) = first(&["E2E_API_URL", "API_URL"]) {
            self.api_url = url;
        }
        if let Some(path) = first(&["CHROMIUM_PATH"]) {
            self.browser.chromium_path = Some(PathBuf::from(path));
        }
        if let Some(flag) = first(&["E2E_HEADLESS"]) {
            self.browser.headless = parse_flag(&flag).ok_or_else(|| ProbeError::Config {
                message: format!("E2E_HEADLESS must be true or false, got {flag:?}"),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject configurations no journey could run with
    pub fn validate(&self) -> ProbeResult<()> {
        for (name, url) in [("app_url", &self.app_url), ("api_url", &self.api_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ProbeError::Config {
                    message: format!("{name} must be an http(s) URL, got {url:?}"),
                });
            }
        }
        if self.timeouts.max_tab_steps == 0 {
            return Err(ProbeError::Config {
                message: "max_tab_steps must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Absolute app URL for a route path
    #[must_use]
    pub fn app_route(&self, path: &str) -> String {
        join_url(&self.app_url, path)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}

/// Join an origin and a path with exactly one slash
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
