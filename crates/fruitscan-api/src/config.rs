//! API configuration.

use std::time::Duration;

use fruitscan_models::{
    ClassNameTable, ClassTableError, DetectionFilter, UnmappedClassPolicy,
    DEFAULT_CONFIDENCE_THRESHOLD,
};

use crate::error::{ApiError, ApiResult};

/// Model loading configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Path to the ONNX model file
    pub path: String,
    /// Square input size the model was exported with
    pub input_size: u32,
    /// Number of classes in the model head
    pub num_classes: usize,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/yolo11n.onnx".to_string(),
            input_size: 640,
            num_classes: 80,
            nms_threshold: 0.45,
        }
    }
}

/// Detection post-processing configuration.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Minimum confidence for a detection to count
    pub confidence_threshold: f32,
    /// `coco`, `custom`, or a path to a JSON class table
    pub class_table: String,
    /// `drop`, `unknown`, or `label:<text>`
    pub unmapped_policy: String,
    /// Largest accepted image width/height
    pub max_image_dimension: u32,
    /// Upper bound on a single model call
    pub inference_timeout: Duration,
    /// Model calls allowed to run at once
    pub max_concurrent_inferences: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            class_table: "coco".to_string(),
            unmapped_policy: "drop".to_string(),
            max_image_dimension: 8192,
            inference_timeout: Duration::from_secs(30),
            max_concurrent_inferences: 1,
        }
    }
}

impl DetectionConfig {
    /// Resolve the class table source.
    pub fn load_class_table(&self) -> Result<ClassNameTable, ClassTableError> {
        match self.class_table.trim().to_lowercase().as_str() {
            "" | "coco" => Ok(ClassNameTable::coco_fruits()),
            "custom" => Ok(ClassNameTable::custom_fruits()),
            _ => ClassNameTable::from_file(self.class_table.trim()),
        }
    }

    /// Build the confidence filter, validating threshold and policy.
    pub fn build_filter(&self) -> ApiResult<DetectionFilter> {
        let policy = self
            .unmapped_policy
            .parse::<UnmappedClassPolicy>()
            .map_err(|e| ApiError::config(e.to_string()))?;

        DetectionFilter::new(self.confidence_threshold, policy)
            .map_err(|e| ApiError::config(e.to_string()))
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit for detection routes, requests per second
    pub rate_limit_rps: u32,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    pub model: ModelConfig,
    pub detection: DetectionConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 10 * 1024 * 1024, // 10MB
            environment: "development".to_string(),
            metrics_enabled: true,
            model: ModelConfig::default(),
            detection: DetectionConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    ///
    /// Unparseable numbers fall back to their defaults; semantic validation
    /// happens when the application state is built.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: env_parse("API_PORT").unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_parse("RATE_LIMIT_RPS").unwrap_or(defaults.rate_limit_rps),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
            model: ModelConfig {
                path: std::env::var("MODEL_PATH").unwrap_or(defaults.model.path),
                input_size: env_parse("MODEL_INPUT_SIZE").unwrap_or(defaults.model.input_size),
                num_classes: env_parse("MODEL_NUM_CLASSES").unwrap_or(defaults.model.num_classes),
                nms_threshold: env_parse("NMS_THRESHOLD").unwrap_or(defaults.model.nms_threshold),
            },
            detection: DetectionConfig {
                confidence_threshold: env_parse("CONFIDENCE_THRESHOLD")
                    .unwrap_or(defaults.detection.confidence_threshold),
                class_table: std::env::var("CLASS_TABLE").unwrap_or(defaults.detection.class_table),
                unmapped_policy: std::env::var("UNMAPPED_CLASS_POLICY")
                    .unwrap_or(defaults.detection.unmapped_policy),
                max_image_dimension: env_parse("MAX_IMAGE_DIMENSION")
                    .unwrap_or(defaults.detection.max_image_dimension),
                inference_timeout: env_parse("INFERENCE_TIMEOUT_SECS")
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.detection.inference_timeout),
                max_concurrent_inferences: env_parse("MAX_CONCURRENT_INFERENCES")
                    .unwrap_or(defaults.detection.max_concurrent_inferences),
            },
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
