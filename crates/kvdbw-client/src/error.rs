//! Error types for `kvdbw-client`.
//!
//! A backend call fails in one of three ways: no response was obtained
//! (transport), a response was obtained but did not satisfy the operation's
//! success contract (backend operation), or a single-object response body
//! could not be decoded.

use reqwest::StatusCode;

/// A response was received but its status or body did not match what the
/// operation requires.
///
/// Carries the HTTP status echoed back by the backend and nothing else; the
/// backend's error body is not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status_code} {status_text}")]
pub struct BackendOperationError {
    /// HTTP status code returned by the backend.
    pub status_code: u16,
    /// Canonical reason phrase, or a short description of the mismatch.
    pub status_text: String,
}

impl BackendOperationError {
    /// Build an error from a response status using its canonical reason.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status_code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
        }
    }

    pub(crate) fn with_text(status: StatusCode, text: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            status_text: text.into(),
        }
    }
}

/// All errors raised by the backend client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No response was obtained: DNS, connection, TLS, or timeout failure.
    #[error("backend transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The backend answered, but not with what the operation requires.
    #[error("backend operation failed: {0}")]
    Backend(#[from] BackendOperationError),

    /// A single-object response body was not the expected JSON.
    #[error("backend response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid client configuration.
    #[error("backend client config error: {0}")]
    Config(String),

    /// The TLS configuration could not be assembled.
    #[error("backend tls error: {0}")]
    Tls(#[from] rustls::Error),

    /// The underlying HTTP client could not be built.
    #[error("failed to build backend http client: {0}")]
    Build(#[source] reqwest::Error),
}

impl ClientError {
    /// HTTP status of a backend operation error, if this is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Backend(err) => Some(err.status_code),
            _ => None,
        }
    }
}
