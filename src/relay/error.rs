//! Error types for the relay core.

use axum::http::StatusCode;
use thiserror::Error;

/// Failure of the single outbound call a handler makes.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection, DNS, TLS or timeout failure before a status was received.
    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The status line arrived but the body could not be read.
    #[error("failed to read upstream body: {0}")]
    Body(#[source] reqwest::Error),
}

/// Errors raised while relaying a single request.
///
/// Every variant is contained to its own response; nothing here is fatal to
/// the process.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required field was absent or empty.
    #[error("{0}")]
    MissingFields(&'static str),

    /// The inbound body was not valid JSON for the operation.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// A server-held credential is not configured.
    #[error("{0}")]
    NotConfigured(&'static str),

    /// The target URL could not be built from the supplied domain and path.
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The upstream answered 2xx with a body that is not JSON.
    #[error("Invalid JSON from upstream: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RelayError {
    /// Status for the non-fail-soft handlers.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingFields(_) | RelayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RelayError::NotConfigured(_)
            | RelayError::InvalidUrl(_)
            | RelayError::Upstream(_)
            | RelayError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
