//! HTTP routes for KVDB Web.
//!
//! - `controller`: namespace and key pages under `/{apiVersion}/{namespace}`
//! - `sys`: health actuator
//! - `metrics`: Prometheus exposition
//! - `pages`: HTML rendering for the controller

pub mod controller;
pub mod metrics;
pub mod pages;
pub mod sys;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::PrometheusConfig;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
///
/// Every path not claimed by the health or metrics routes falls through to
/// the controller, which decides between redirect, 404 and the UI flows.
pub fn app(state: Arc<AppState>, prometheus: &PrometheusConfig) -> Router {
    let mut router = Router::new().merge(sys::router());
    if prometheus.enabled {
        router = router.merge(metrics::router(&prometheus.endpoint));
    }

    router
        .fallback(controller::root_controller)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
