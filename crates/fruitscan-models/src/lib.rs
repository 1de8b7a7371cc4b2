//! Shared data models for the FruitScan detection service.
//!
//! This crate provides Serde-serializable types for:
//! - Raw model detections and bounding boxes
//! - The class id to display name table
//! - Confidence filtering and deduplication into fruit sets
//! - The JSON response envelope and detailed reports

pub mod class_table;
pub mod detection;
pub mod filter;
pub mod fruit_set;
pub mod report;
pub mod response;

// Re-export common types
pub use class_table::{ClassEntry, ClassNameTable, ClassTableError, UnmappedClassPolicy};
pub use detection::{BoundingBox, Detection};
pub use filter::{DetectionFilter, InvalidThreshold, DEFAULT_CONFIDENCE_THRESHOLD};
pub use fruit_set::DetectedFruitSet;
pub use report::{format_confidence_percent, DetectionReport, ReportedDetection};
pub use response::{ApiResponse, MESSAGE_NOT_FOUND, MESSAGE_SUCCESSFUL};
