//! Object detection using a YOLOv8 / YOLO11 ONNX export.
//!
//! Execution provider selection:
//! - CUDA on Linux with NVIDIA GPU (when the `cuda` feature is enabled)
//! - CoreML on macOS
//! - CPU fallback on all platforms

use std::path::Path;
use std::sync::Mutex;

use image::DynamicImage;
use ndarray::ArrayView2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use fruitscan_models::{BoundingBox, Detection};

use crate::detector::Detector;
use crate::error::{VisionError, VisionResult};

/// Configuration for the YOLO detector.
#[derive(Debug, Clone)]
pub struct YoloDetectorConfig {
    /// Path to ONNX model file
    pub model_path: String,
    /// Number of classes the model was trained on
    pub num_classes: usize,
    /// Candidates scoring below this are discarded before NMS
    pub score_threshold: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Input image size (model expects square input)
    pub input_size: u32,
}

impl Default for YoloDetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/yolo11n.onnx".to_string(),
            num_classes: 80,
            score_threshold: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// YOLO detector backed by ONNX Runtime.
///
/// The session needs exclusive access to run, so concurrent callers are
/// serialized on the inner mutex.
pub struct YoloDetector {
    session: Mutex<Session>,
    config: YoloDetectorConfig,
}

impl YoloDetector {
    /// Load the model once. Fails if the file is missing or unreadable.
    pub fn new(config: YoloDetectorConfig) -> VisionResult<Self> {
        let model_path = Path::new(&config.model_path);
        if !model_path.exists() {
            return Err(VisionError::model_not_found(&config.model_path));
        }

        let session = Mutex::new(create_session(model_path)?);
        info!(
            model_path = %config.model_path,
            input_size = config.input_size,
            num_classes = config.num_classes,
            "YOLO detector initialized"
        );

        Ok(Self { session, config })
    }

    pub fn config(&self) -> &YoloDetectorConfig {
        &self.config
    }

    /// Resize to the square input and lay out as NCHW floats in [0, 1].
    fn preprocess(&self, img: &DynamicImage) -> VisionResult<Value> {
        let size = self.config.input_size;
        let rgb = img
            .resize_exact(size, size, image::imageops::FilterType::Triangle)
            .to_rgb8();
        let side = size as usize;

        let mut chw = vec![0.0f32; 3 * side * side];
        for (x, y, pixel) in rgb.enumerate_pixels() {
            let offset = y as usize * side + x as usize;
            for c in 0..3 {
                chw[c * side * side + offset] = pixel[c] as f32 / 255.0;
            }
        }

        Tensor::from_array((vec![1usize, 3, side, side], chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| VisionError::internal(format!("Failed to create tensor: {}", e)))
    }

    /// Run the session, returning the output tensor's shape and values.
    fn run_inference(&self, input: Value) -> VisionResult<(Vec<usize>, Vec<f32>)> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| VisionError::internal("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::inference(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| VisionError::inference("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::inference(format!("Failed to extract tensor: {}", e)))?;

        let shape = tensor
            .0
            .iter()
            .map(|&dim| usize::try_from(dim))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VisionError::inference(format!("Dynamic output shape {:?}", tensor.0)))?;

        Ok((shape, tensor.1.to_vec()))
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &DynamicImage) -> VisionResult<Vec<Detection>> {
        let input = self.preprocess(image)?;
        let (shape, raw) = self.run_inference(input)?;
        let detections = decode_output(
            &raw,
            &shape,
            self.config.num_classes,
            self.config.input_size as f32,
            self.config.score_threshold,
            self.config.nms_threshold,
        )?;

        debug!(count = detections.len(), "Object detection completed");
        Ok(detections)
    }

    fn name(&self) -> &'static str {
        "onnx-yolo"
    }
}

/// Decode a raw `[1, 4 + C, N]` YOLO output tensor.
///
/// Each of the N candidates carries a center-format box in input pixel
/// coordinates followed by C class scores. The best class is kept per
/// candidate, then per-class NMS is applied. Boxes come back normalized.
///
/// `shape` is the tensor's reported shape. A model exported with a class
/// count other than `num_classes` is rejected.
pub fn decode_output(
    outputs: &[f32],
    shape: &[usize],
    num_classes: usize,
    input_size: f32,
    score_threshold: f32,
    nms_threshold: f32,
) -> VisionResult<Vec<Detection>> {
    let (num_features, num_boxes) = match *shape {
        [1, features, boxes] if features > 4 => (features, boxes),
        _ => {
            return Err(VisionError::inference(format!(
                "Unexpected output shape {:?}, expected [1, 4 + classes, boxes]",
                shape
            )))
        }
    };
    if num_features - 4 != num_classes {
        return Err(VisionError::inference(format!(
            "Model outputs {} classes but {} are configured",
            num_features - 4,
            num_classes
        )));
    }
    if outputs.len() != num_features * num_boxes {
        return Err(VisionError::inference(format!(
            "Output has {} values, shape {:?} needs {}",
            outputs.len(),
            shape,
            num_features * num_boxes
        )));
    }

    let features = ArrayView2::from_shape((num_features, num_boxes), outputs)
        .map_err(|e| VisionError::inference(format!("Failed to reshape output: {}", e)))?;
    let candidates_view = features.t(); // [N, 4 + C]

    let mut candidates = Vec::new();
    for row in candidates_view.outer_iter() {
        let (best_class, best_score) = row
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (c, score)| {
                if score > best.1 {
                    (c, score)
                } else {
                    best
                }
            });

        if best_score < score_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let x = ((cx - w / 2.0) / input_size).clamp(0.0, 1.0);
        let y = ((cy - h / 2.0) / input_size).clamp(0.0, 1.0);
        let width = (w / input_size).min(1.0 - x).max(0.0);
        let height = (h / input_size).min(1.0 - y).max(0.0);

        candidates.push(
            Detection::new(best_class as u32, best_score)
                .with_bbox(BoundingBox::new(x, y, width, height)),
        );
    }

    Ok(non_maximum_suppression(candidates, nms_threshold))
}

/// Drop lower-confidence boxes overlapping a kept box of the same class.
pub fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == candidate.class_id
                && match (kept.bbox, candidate.bbox) {
                    (Some(a), Some(b)) => a.iou(&b) > iou_threshold,
                    _ => false,
                }
        });
        if !suppressed {
            keep.push(candidate);
        }
    }

    keep
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> VisionResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| VisionError::model_load(format!("Failed to read model file: {}", e)))?;

    let builder = Session::builder()
        .map_err(|e| VisionError::model_load(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| VisionError::model_load(format!("Failed to set optimization level: {}", e)))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for fruit detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, falling back to CPU");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider for fruit detection");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("Using CPU execution provider for fruit detection");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| VisionError::model_load(format!("Failed to load ONNX model: {}", e)))
}
