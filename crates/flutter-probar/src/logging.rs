//! Structured logging setup.
//!
//! Library code only emits `tracing` events; binaries and live test runs
//! call [`init_tracing`] once to route them to stderr. `RUST_LOG` overrides
//! the level picked here.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "flutter_probar=info";

/// Subscriber settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Filter directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Emit one JSON object per event instead of human-readable lines
    pub json: bool,
    /// ANSI colours on the human-readable output
    pub ansi: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            json: false,
            ansi: true,
        }
    }
}

impl LogSettings {
    /// Settings for a verbosity count (`-v`, `-vv`, ...); `quiet` wins
    #[must_use]
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let level = if quiet {
            "error"
        } else {
            match verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        };
        let filter = if quiet || verbose < 2 {
            format!("flutter_probar={level},flutter_probador={level},warn")
        } else {
            level.to_string()
        };
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Switch to JSON lines
    #[must_use]
    pub const fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Enable or disable ANSI colours
    #[must_use]
    pub const fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// `RUST_LOG` if set and valid, otherwise [`Self::filter`]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.filter))
    }
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed, which is the
/// normal case when several tests share a process.
pub fn init_tracing(settings: &LogSettings) -> bool {
    let registry = tracing_subscriber::registry().with(settings.env_filter());
    let installed = if settings.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(settings.ansi),
            )
            .try_init()
    };
    installed.is_ok()
}
