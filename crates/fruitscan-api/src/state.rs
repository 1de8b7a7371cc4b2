//! Application state.

use std::sync::Arc;

use fruitscan_vision::{DecodeLimits, Detector};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::services::{DetectionService, DetectionSettings};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub detection: DetectionService,
}

impl AppState {
    /// Create application state, loading the model from `config.model.path`.
    pub async fn new(config: ApiConfig) -> ApiResult<Self> {
        let model_config = config.clone();
        let detector = tokio::task::spawn_blocking(move || load_detector(&model_config))
            .await
            .map_err(|e| ApiError::internal(format!("Model loading task failed: {}", e)))??;

        Self::with_detector(config, detector)
    }

    /// Create application state around an already constructed detector.
    pub fn with_detector(config: ApiConfig, detector: Arc<dyn Detector>) -> ApiResult<Self> {
        let table = config
            .detection
            .load_class_table()
            .map_err(|e| ApiError::config(e.to_string()))?;
        let filter = config.detection.build_filter()?;

        let settings = DetectionSettings {
            filter,
            limits: DecodeLimits::with_max_dimension(config.detection.max_image_dimension),
            inference_timeout: config.detection.inference_timeout,
            max_concurrent_inferences: config.detection.max_concurrent_inferences,
        };

        let detection = DetectionService::new(detector, table, settings);

        Ok(Self { config, detection })
    }
}

#[cfg(feature = "onnx")]
fn load_detector(config: &ApiConfig) -> ApiResult<Arc<dyn Detector>> {
    use fruitscan_vision::{YoloDetector, YoloDetectorConfig};

    // The model pre-filter must not hide anything the service threshold keeps.
    let score_threshold = YoloDetectorConfig::default()
        .score_threshold
        .min(config.detection.confidence_threshold);

    let detector = YoloDetector::new(YoloDetectorConfig {
        model_path: config.model.path.clone(),
        num_classes: config.model.num_classes,
        score_threshold,
        nms_threshold: config.model.nms_threshold,
        input_size: config.model.input_size,
    })
    .map_err(|e| ApiError::config(e.to_string()))?;

    Ok(Arc::new(detector))
}

#[cfg(not(feature = "onnx"))]
fn load_detector(_config: &ApiConfig) -> ApiResult<Arc<dyn Detector>> {
    Err(ApiError::config(
        "No detection backend compiled in; enable the `onnx` feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fruitscan_models::Detection;
    use fruitscan_vision::StaticDetector;

    #[tokio::test]
    async fn test_missing_model_fails_startup() {
        let mut config = ApiConfig::default();
        config.model.path = "/nonexistent/yolo.onnx".to_string();

        assert!(matches!(AppState::new(config).await, Err(ApiError::Config(_))));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_no_backend_compiled_in() {
        let err = load_detector(&ApiConfig::default()).err().unwrap();
        assert!(matches!(err, ApiError::Config(ref m) if m.contains("onnx")));
    }

    #[test]
    fn test_invalid_detection_config_fails() {
        let mut config = ApiConfig::default();
        config.detection.unmapped_policy = "guess".to_string();

        let detector = Arc::new(StaticDetector::new(vec![Detection::new(46, 0.9)]));
        assert!(AppState::with_detector(config, detector).is_err());
    }

    #[test]
    fn test_with_detector() {
        let mut config = ApiConfig::default();
        config.detection.class_table = "custom".to_string();

        let state = AppState::with_detector(config, Arc::new(StaticDetector::default())).unwrap();
        assert_eq!(state.detection.table().len(), 6);
        assert_eq!(state.detection.detector_name(), "static");
    }
}
