//! Error types for vision operations.

use thiserror::Error;

/// Result type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur while decoding images or running the model.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Uploaded file is empty")]
    EmptyUpload,

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Image exceeds limits: {0}")]
    ImageTooLarge(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VisionError {
    pub fn invalid_image(message: impl Into<String>) -> Self {
        Self::InvalidImage(message.into())
    }

    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    pub fn model_load(message: impl Into<String>) -> Self {
        Self::ModelLoad(message.into())
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True when the caller supplied bad input and should resubmit.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            VisionError::EmptyUpload | VisionError::InvalidImage(_) | VisionError::ImageTooLarge(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(VisionError::EmptyUpload.is_client_error());
        assert!(VisionError::invalid_image("bad magic").is_client_error());
        assert!(!VisionError::inference("session crashed").is_client_error());
        assert!(!VisionError::model_not_found("models/x.onnx").is_client_error());
    }
}
