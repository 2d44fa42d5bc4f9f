//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// A journey ran to completion but at least one step failed
    #[error("Journey {journey} failed at step {step:?}")]
    JourneyFailed {
        /// Journey name
        journey: String,
        /// First failing step
        step: String,
    },

    /// Feature compiled out of this binary
    #[error("{0}")]
    FeatureDisabled(String),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Harness library error
    #[error("{0}")]
    Harness(#[from] flutter_probar::ProbeError),

    /// JSON rendering error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a journey failure
    #[must_use]
    pub fn journey_failed(journey: impl Into<String>, step: impl Into<String>) -> Self {
        Self::JourneyFailed {
            journey: journey.into(),
            step: step.into(),
        }
    }
}
