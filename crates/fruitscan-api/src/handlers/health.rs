//! Health check handlers.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub detector: String,
    pub classes: usize,
    pub confidence_threshold: f32,
    pub unmapped_class_policy: String,
}

/// Readiness check endpoint (readiness probe).
///
/// The model is loaded before the listener binds, so a running server is ready.
pub async fn ready(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let detection = &state.detection;

    Json(ReadinessResponse {
        status: "ready".to_string(),
        detector: detection.detector_name().to_string(),
        classes: detection.table().len(),
        confidence_threshold: detection.filter().threshold(),
        unmapped_class_policy: detection.filter().policy().to_string(),
    })
}
