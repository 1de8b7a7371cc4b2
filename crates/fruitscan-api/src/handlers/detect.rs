//! Fruit detection handlers.

use std::error::Error;

use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::debug;

use fruitscan_models::{ApiResponse, DetectionReport, MESSAGE_NOT_FOUND, MESSAGE_SUCCESSFUL};

use crate::error::{ApiError, ApiResult, MSG_UPLOAD_IMAGE};
use crate::state::AppState;

/// Multipart field carrying the uploaded photo.
pub const IMAGE_FIELD: &str = "image_file";

/// Detect fruits in an uploaded image.
///
/// `data` holds the detected names joined by `", "`, or `null` if none.
pub async fn detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ApiResponse<String>>> {
    let upload = read_image_field(multipart).await?;
    let fruits = state.detection.detect(upload).await?;

    Ok(Json(ApiResponse::from_fruits(&fruits)))
}

/// Detect fruits and return the per-box breakdown.
pub async fn detect_details(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ApiResponse<DetectionReport>>> {
    let upload = read_image_field(multipart).await?;
    let report = state.detection.detect_report(upload).await?;

    let message = if report.fruits.is_empty() {
        MESSAGE_NOT_FOUND
    } else {
        MESSAGE_SUCCESSFUL
    };

    Ok(Json(ApiResponse {
        status: true,
        message: message.to_string(),
        data: Some(report),
    }))
}

/// Names found by the most recent successful detect call.
pub async fn fruit_names(State(state): State<AppState>) -> Json<ApiResponse<String>> {
    let fruits = state.detection.last_detected().await;
    Json(ApiResponse::from_fruits(&fruits))
}

/// Pull the bytes of the `image_file` field out of a multipart body.
async fn read_image_field(multipart: Result<Multipart, MultipartRejection>) -> ApiResult<Bytes> {
    let mut multipart = multipart.map_err(|e| {
        debug!(error = %e, "Rejected upload without a multipart body");
        ApiError::bad_request(MSG_UPLOAD_IMAGE)
    })?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(IMAGE_FIELD) {
            return field.bytes().await.map_err(multipart_error);
        }
    }

    Err(ApiError::bad_request(MSG_UPLOAD_IMAGE))
}

/// Display text of the body limiter's error.
const LENGTH_LIMIT_EXCEEDED: &str = "length limit exceeded";

fn multipart_error(err: MultipartError) -> ApiError {
    if exceeds_body_limit(&err) {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        debug!(error = %err, "Malformed multipart upload");
        ApiError::bad_request(MSG_UPLOAD_IMAGE)
    }
}

/// The limit error arrives wrapped in multer and axum errors, so the status
/// alone does not always report 413.
fn exceeds_body_limit(err: &MultipartError) -> bool {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return true;
    }

    let mut source: Option<&(dyn Error + 'static)> = Some(err as &(dyn Error + 'static));
    while let Some(current) = source {
        if current.to_string().contains(LENGTH_LIMIT_EXCEEDED) {
            return true;
        }
        source = current.source();
    }

    false
}
