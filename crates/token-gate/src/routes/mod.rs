//! HTTP routes for Token Gate.
//!
//! Defines the Axum router and application state.

use crate::gate::Gate;
use crate::handlers;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Upper bound on a single authorization request, including any JWKS fetch.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authorization gate (verifier and key cache inside).
    pub gate: Arc<Gate>,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/authorize` - Authorization decision for one event
/// - `/v1/health` - Liveness check (simple "OK")
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/v1/authorize", post(handlers::authorize))
        .route("/v1/health", get(handlers::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}
