//! Image ingestion and model invocation for FruitScan.
//!
//! - [`decode`]: turn uploaded bytes into a bounded-size image
//! - [`detector`]: the `Detector` seam the HTTP layer calls through
//! - [`yolo`]: ONNX Runtime YOLO backend (feature `onnx`)

pub mod decode;
pub mod detector;
pub mod error;
#[cfg(feature = "onnx")]
pub mod yolo;

pub use decode::{decode_image, DecodeLimits};
pub use detector::{Detector, StaticDetector};
pub use error::{VisionError, VisionResult};
#[cfg(feature = "onnx")]
pub use yolo::{YoloDetector, YoloDetectorConfig};

