//! HTTP error types for KVDB Web.
//!
//! Every failure a browser can trigger collapses into one of two fixed
//! plain responses. The cause is logged, never sent to the client.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use kvdbw_client::ClientError;

/// Application-level error returned from UI handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request itself could not be processed (e.g. malformed form).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A backend call failed; surfaced to the user as a bad request.
    #[error("backend call failed: {0}")]
    Backend(#[from] ClientError),

    /// No route for this API version.
    #[error("path not found")]
    NotFound,
}

impl AppError {
    /// Status code sent to the browser.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Backend(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(status = status.as_u16(), error = %self, "request failed");

        let body = format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        );
        (status, [(header::CONTENT_TYPE, "text/html")], body).into_response()
    }
}
