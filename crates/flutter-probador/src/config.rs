//! CLI configuration

use std::path::{Path, PathBuf};

use flutter_probar::logging::LogSettings;
use flutter_probar::ProbeConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - failures only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - per-step timings and harness debug logs
    Verbose,
    /// Debug - everything, trace logs included
    Debug,
}

impl Verbosity {
    /// Derive from `-v` count and `-q`; quiet wins
    #[must_use]
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Check if debug mode
    #[must_use]
    pub const fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }

    const fn level(self) -> u8 {
        match self {
            Self::Quiet | Self::Normal => 0,
            Self::Verbose => 1,
            Self::Debug => 2,
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Log events as JSON lines
    pub json_logs: bool,
    /// Harness configuration file
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set JSON logging
    #[must_use]
    pub const fn with_json_logs(mut self, json_logs: bool) -> Self {
        self.json_logs = json_logs;
        self
    }

    /// Set the harness configuration file
    #[must_use]
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Subscriber settings matching these flags
    #[must_use]
    pub fn log_settings(&self) -> LogSettings {
        LogSettings::from_verbosity(self.verbosity.level(), self.verbosity.is_quiet())
            .json(self.json_logs)
            .ansi(self.color.should_color())
    }

    /// Load the harness configuration: defaults, the file if any, then env
    pub fn harness_config(&self) -> CliResult<ProbeConfig> {
        let path = self.config_path.as_deref();
        if let Some(path) = path {
            ensure_exists(path)?;
        }
        Ok(ProbeConfig::load(path)?)
    }
}

fn ensure_exists(path: &Path) -> CliResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::config(format!(
            "config file {} does not exist",
            path.display()
        )))
    }
}
