//! Axum HTTP API server for fruit detection.
//!
//! This crate provides:
//! - `POST /detect` and `POST /detect/details` for uploaded photos
//! - `GET /fruit-names` for the most recent result
//! - Health, readiness and Prometheus metrics endpoints

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use cache::LastDetectionCache;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{DetectionService, DetectionSettings};
pub use state::AppState;
