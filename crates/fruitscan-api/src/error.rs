//! API error types.
//!
//! Every error leaving a handler is rendered in the same envelope as a
//! successful response, with `status: false` and `data: null`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use fruitscan_models::ApiResponse;
use fruitscan_vision::VisionError;

use crate::metrics;

pub type ApiResult<T> = Result<T, ApiError>;

/// Client-facing message for a missing upload.
pub const MSG_UPLOAD_IMAGE: &str = "Upload image file";
pub const MSG_INVALID_IMAGE: &str = "Uploaded file is not a valid image";
pub const MSG_IMAGE_TOO_LARGE: &str = "Uploaded image is too large";
pub const MSG_INFERENCE_FAILED: &str = "Model inference failed";
pub const MSG_INTERNAL: &str = "Internal server error";
pub const MSG_RATE_LIMITED: &str = "Rate limit exceeded. Please try again later.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or undecodable upload. The message is shown to the client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// The detection model failed, timed out or panicked.
    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Inference(_) | ApiError::Config(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the client.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::PayloadTooLarge(_) => MSG_IMAGE_TOO_LARGE.to_string(),
            ApiError::RateLimited => MSG_RATE_LIMITED.to_string(),
            ApiError::Inference(_) => MSG_INFERENCE_FAILED.to_string(),
            ApiError::Config(_) | ApiError::Internal(_) => MSG_INTERNAL.to_string(),
        }
    }
}

impl From<VisionError> for ApiError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::EmptyUpload => ApiError::bad_request(MSG_UPLOAD_IMAGE),
            VisionError::InvalidImage(_) => ApiError::bad_request(MSG_INVALID_IMAGE),
            VisionError::ImageTooLarge(_) => ApiError::bad_request(MSG_IMAGE_TOO_LARGE),
            VisionError::Internal(msg) => ApiError::Internal(msg),
            other => ApiError::Inference(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
            metrics::record_request_error(self.kind());
        }

        let body = ApiResponse::<String>::failure(self.public_message());
        (status, Json(body)).into_response()
    }
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::Inference(_) => "inference",
            ApiError::RateLimited => "rate_limited",
            ApiError::Config(_) => "config",
            ApiError::Internal(_) => "internal",
        }
    }
}
