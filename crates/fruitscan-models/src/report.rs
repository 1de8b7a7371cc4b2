//! Detailed detection report returned by `/detect/details`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::detection::{BoundingBox, Detection};

/// Render a confidence fraction as a percentage string, e.g. `0.85` -> `"85.00%"`.
pub fn format_confidence_percent(confidence: f32) -> String {
    format!("{:.2}%", confidence * 100.0)
}

/// One accepted, named box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportedDetection {
    pub class_id: u32,
    pub class_name: String,
    /// Raw fraction [0, 1].
    pub confidence: f32,
    pub confidence_percent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

impl ReportedDetection {
    pub fn new(detection: &Detection, class_name: &str) -> Self {
        Self {
            class_id: detection.class_id,
            class_name: class_name.to_string(),
            confidence: detection.confidence,
            confidence_percent: format_confidence_percent(detection.confidence),
            bbox: detection.bbox,
        }
    }
}

/// Full breakdown of one detect call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectionReport {
    /// Deduplicated names, lexicographically ordered.
    pub fruits: Vec<String>,
    pub detections: Vec<ReportedDetection>,
    pub confidence_threshold: f32,
}
