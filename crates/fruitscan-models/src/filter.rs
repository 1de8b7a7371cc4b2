//! Confidence filtering and class naming of raw detections.

use thiserror::Error;

use crate::class_table::{ClassNameTable, UnmappedClassPolicy};
use crate::detection::Detection;
use crate::fruit_set::DetectedFruitSet;
use crate::report::{DetectionReport, ReportedDetection};

/// Confidence threshold used by every deployed variant of the service.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;

#[derive(Debug, Error, PartialEq)]
#[error("Confidence threshold must be within [0, 1], got {0}")]
pub struct InvalidThreshold(pub f32);

/// Turns raw detections into named results.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFilter {
    threshold: f32,
    policy: UnmappedClassPolicy,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            policy: UnmappedClassPolicy::default(),
        }
    }
}

impl DetectionFilter {
    pub fn new(threshold: f32, policy: UnmappedClassPolicy) -> Result<Self, InvalidThreshold> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(InvalidThreshold(threshold));
        }
        Ok(Self { threshold, policy })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn policy(&self) -> &UnmappedClassPolicy {
        &self.policy
    }

    /// A detection passes when its confidence is at or above the threshold.
    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.confidence >= self.threshold
    }

    /// Keep accepted detections, name them and deduplicate.
    pub fn apply(&self, table: &ClassNameTable, detections: &[Detection]) -> DetectedFruitSet {
        detections
            .iter()
            .filter(|d| self.accepts(d))
            .filter_map(|d| self.policy.resolve(table, d.class_id))
            .collect()
    }

    /// Like [`apply`](Self::apply), but keeps the per-box breakdown.
    ///
    /// Boxes are listed by descending confidence.
    pub fn report(&self, table: &ClassNameTable, detections: &[Detection]) -> DetectionReport {
        let mut reported: Vec<ReportedDetection> = detections
            .iter()
            .filter(|d| self.accepts(d))
            .filter_map(|d| {
                self.policy
                    .resolve(table, d.class_id)
                    .map(|name| ReportedDetection::new(d, name))
            })
            .collect();
        reported.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let fruits: DetectedFruitSet = reported.iter().map(|d| d.class_name.as_str()).collect();

        DetectionReport {
            fruits: fruits.to_vec(),
            detections: reported,
            confidence_threshold: self.threshold,
        }
    }
}
