//! Prometheus metrics endpoint (default `/system/metrics`).
//!
//! Only routed when metrics are enabled. No authentication.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;

use crate::state::AppState;

/// Build the metrics router serving at `endpoint`.
pub fn router(endpoint: &str) -> Router<Arc<AppState>> {
    Router::new().route(endpoint, get(prometheus_metrics))
}

async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.metrics.render(),
    )
}
