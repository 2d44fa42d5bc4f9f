//! Result and error types for flutter-probar.

use thiserror::Error;

/// Result type for flutter-probar operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving the application
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page or browser-context error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// A bounded wait exceeded its deadline
    #[error("Timed out after {ms}ms waiting for {what}")]
    Timeout {
        /// What was being waited for
        what: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// An action was invoked on a locator that never resolved
    #[error("Element not found: {description}")]
    ElementNotFound {
        /// Human-readable locator description
        description: String,
    },

    /// In-page script evaluation failed
    #[error("Script evaluation failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// Keyboard or pointer input could not be dispatched
    #[error("Input dispatch failed: {message}")]
    Input {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Backend answered with a non-success status
    #[error("Backend returned {status}: {body}")]
    Backend {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Assertion failed inside a journey step
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// A value handed to a page object is malformed
    #[error("Invalid value: {message}")]
    Validation {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Text pattern did not compile
    #[error("Invalid text pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Transport-level HTTP failure (backend unreachable)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create an element-not-found error
    #[must_use]
    pub fn not_found(description: impl Into<String>) -> Self {
        Self::ElementNotFound {
            description: description.into(),
        }
    }

    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create a script evaluation error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Whether this error means "the thing never showed up"
    #[must_use]
    pub const fn is_absence(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ElementNotFound { .. })
    }
}

/// Outcome of a soft lookup: the query itself succeeded, the target may be absent.
///
/// Wrapped in [`ProbeResult`] so callers can tell "not there" apart from
/// "could not ask".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The target was found
    Found(T),
    /// The query ran and nothing matched
    NotFound,
}

impl<T> Lookup<T> {
    /// Whether the target was found
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Borrow the found value
    #[must_use]
    pub const fn found(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    /// Convert into an `Option`
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }

    /// Map the found value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(value) => Lookup::Found(f(value)),
            Self::NotFound => Lookup::NotFound,
        }
    }

    /// Turn absence into an [`ProbeError::ElementNotFound`]
    pub fn require(self, description: impl Into<String>) -> ProbeResult<T> {
        match self {
            Self::Found(value) => Ok(value),
            Self::NotFound => Err(ProbeError::not_found(description)),
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotFound, Self::Found)
    }
}
