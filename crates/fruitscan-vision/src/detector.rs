//! Detection model seam.

use image::DynamicImage;

use fruitscan_models::Detection;

use crate::error::VisionResult;

/// A pre-trained object detection model.
///
/// Implementations are synchronous and may be CPU-heavy; callers are
/// expected to run them off the async runtime.
pub trait Detector: Send + Sync {
    /// Run the model over one image and return every candidate box.
    fn detect(&self, image: &DynamicImage) -> VisionResult<Vec<Detection>>;

    /// Short backend name for logs and readiness checks.
    fn name(&self) -> &'static str;
}

/// Detector that replays a fixed list of detections.
///
/// Used to exercise the HTTP layer without a model file.
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    detections: Vec<Detection>,
}

impl StaticDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }
}

impl Detector for StaticDetector {
    fn detect(&self, _image: &DynamicImage) -> VisionResult<Vec<Detection>> {
        Ok(self.detections.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
