//! Error types for the PagerDuty provider.

use miette::Diagnostic;
use pagerduty_workflow::MalformedStateError;
use thiserror::Error;

/// Result type alias using the provider error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the provider.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// No API token was configured.
    #[error("No PagerDuty API token configured")]
    #[diagnostic(
        code(pagerduty_provider::missing_token),
        help("Set `token` in the provider block or the PAGERDUTY_TOKEN environment variable")
    )]
    MissingToken,

    /// Invalid provider configuration.
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(pagerduty_provider::invalid_config))]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// The remote object does not exist.
    #[error("Not found: {resource}")]
    #[diagnostic(code(pagerduty_provider::not_found))]
    NotFound {
        /// Resource path or lookup key
        resource: String,
    },

    /// The API answered with a non-success status.
    #[error("PagerDuty API returned {status}: {body}")]
    #[diagnostic(code(pagerduty_provider::api_error))]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    #[diagnostic(code(pagerduty_provider::http_error))]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(pagerduty_provider::serialization_error))]
    Serialization(#[from] serde_json::Error),

    /// Stored state does not match the resource schema.
    #[error(transparent)]
    #[diagnostic(transparent)]
    MalformedState(#[from] MalformedStateError),

    /// Retries were exhausted.
    #[error("Operation timed out: {operation}: {last_error}")]
    #[diagnostic(
        code(pagerduty_provider::timeout),
        help("Increase `retry_timeout` if the PagerDuty API is slow to respond")
    )]
    Timeout {
        /// Operation that timed out
        operation: String,
        /// Last error seen before giving up
        last_error: String,
    },

    /// A required attribute is missing or has the wrong type.
    #[error("Missing or invalid attribute: {key}")]
    #[diagnostic(code(pagerduty_provider::missing_attribute))]
    MissingAttribute {
        /// Attribute key
        key: String,
    },
}

impl Error {
    /// Returns true if the request may succeed when sent again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            _ => false,
        }
    }

    /// Returns true for HTTP 429, which the API answers before processing
    /// the request.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Api { status: 429, .. })
    }

    /// Returns true for [`Error::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a missing attribute error.
    pub fn missing_attribute(key: impl Into<String>) -> Self {
        Self::MissingAttribute { key: key.into() }
    }
}
