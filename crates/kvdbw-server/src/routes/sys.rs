//! Health actuator: `/system/health`

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::any;
use serde::Serialize;
use tracing::warn;

use crate::config::HEALTH_PATH;
use crate::state::AppState;

/// Build the health router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(HEALTH_PATH, any(health))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Report backend health.
///
/// Returns 200 `{"status":"UP"}` when the backend reports UP, otherwise 500
/// `{"status":"DOWN"}`.
async fn health(State(state): State<Arc<AppState>>, method: Method) -> impl IntoResponse {
    state.metrics.increment(HEALTH_PATH, method.as_str(), "");

    match state.client.get_health().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: "UP" })),
        Err(e) => {
            warn!(error = %e, "backend health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(HealthResponse { status: "DOWN" }),
            )
        }
    }
}
