//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{detect, detect_details, fruit_names, health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, create_rate_limiter, rate_limit_middleware, request_id, request_logging,
    security_headers,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let rate_limiter = create_rate_limiter(state.config.rate_limit_rps);

    // Model-backed routes share one rate limiter
    let detect_routes = Router::new()
        .route("/detect", post(detect))
        .route("/detect/details", post(detect_details))
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let result_routes = Router::new().route("/fruit-names", get(fruit_names));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let max_body_size = state.config.max_body_size;

    Router::new()
        .merge(detect_routes)
        .merge(result_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Oversized uploads fail inside the multipart reader and render as 413
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
