//! Detection service.
//!
//! Owns everything a detect call needs: the model, the class table, the
//! confidence filter and the last-result cache. The model is shared by all
//! requests, so calls into it wait for a semaphore permit and then run on the
//! blocking pool under a timeout.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use fruitscan_models::{ClassNameTable, Detection, DetectedFruitSet, DetectionFilter, DetectionReport};
use fruitscan_vision::{decode_image, DecodeLimits, Detector};

use crate::cache::LastDetectionCache;
use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Detection pipeline settings.
#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub filter: DetectionFilter,
    pub limits: DecodeLimits,
    pub inference_timeout: Duration,
    pub max_concurrent_inferences: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            filter: DetectionFilter::default(),
            limits: DecodeLimits::default(),
            inference_timeout: Duration::from_secs(30),
            max_concurrent_inferences: 1,
        }
    }
}

#[derive(Clone)]
pub struct DetectionService {
    detector: Arc<dyn Detector>,
    table: Arc<ClassNameTable>,
    filter: DetectionFilter,
    limits: DecodeLimits,
    permits: Arc<Semaphore>,
    inference_timeout: Duration,
    cache: LastDetectionCache,
}

impl DetectionService {
    pub fn new(
        detector: Arc<dyn Detector>,
        table: ClassNameTable,
        settings: DetectionSettings,
    ) -> Self {
        Self {
            detector,
            table: Arc::new(table),
            filter: settings.filter,
            limits: settings.limits,
            permits: Arc::new(Semaphore::new(settings.max_concurrent_inferences.max(1))),
            inference_timeout: settings.inference_timeout,
            cache: LastDetectionCache::new(),
        }
    }

    pub fn table(&self) -> &ClassNameTable {
        &self.table
    }

    pub fn filter(&self) -> &DetectionFilter {
        &self.filter
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Detect fruits in an uploaded image and remember the result.
    pub async fn detect(&self, upload: Bytes) -> ApiResult<DetectedFruitSet> {
        let detections = self.run_model(upload).await?;
        let fruits = self.filter.apply(&self.table, &detections);

        info!(
            raw_detections = detections.len(),
            fruits = fruits.len(),
            "Detection completed"
        );

        self.remember(&fruits).await;
        Ok(fruits)
    }

    /// Like [`detect`](Self::detect), returning the per-box breakdown.
    pub async fn detect_report(&self, upload: Bytes) -> ApiResult<DetectionReport> {
        let detections = self.run_model(upload).await?;
        let report = self.filter.report(&self.table, &detections);
        let fruits: DetectedFruitSet = report.fruits.iter().map(String::as_str).collect();

        info!(
            raw_detections = detections.len(),
            kept_detections = report.detections.len(),
            fruits = fruits.len(),
            "Detailed detection completed"
        );

        self.remember(&fruits).await;
        Ok(report)
    }

    /// Fruit set of the most recent successful detect call.
    pub async fn last_detected(&self) -> DetectedFruitSet {
        self.cache.get().await
    }

    async fn remember(&self, fruits: &DetectedFruitSet) {
        metrics::record_fruits_detected(fruits.iter());
        self.cache.store(fruits.clone()).await;
    }

    /// Decode the upload and run the model over it.
    async fn run_model(&self, upload: Bytes) -> ApiResult<Vec<Detection>> {
        let limits = self.limits;
        let image = tokio::task::spawn_blocking(move || decode_image(&upload, &limits))
            .await
            .map_err(|e| ApiError::internal(format!("Decode task failed: {}", e)))??;

        // Queue time is excluded from the timeout and the duration metric
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ApiError::internal("Inference semaphore closed"))?;

        let detector = Arc::clone(&self.detector);
        let backend = detector.name();
        let start = Instant::now();

        // The permit moves into the blocking task so it is only released
        // once the model call returns, even if the request timed out.
        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            detector.detect(&image)
        });
        let outcome = tokio::time::timeout(self.inference_timeout, task).await;

        let detections = match outcome {
            Ok(Ok(Ok(detections))) => detections,
            Ok(Ok(Err(e))) => {
                metrics::record_inference_failure("error");
                return Err(ApiError::inference(e.to_string()));
            }
            Ok(Err(e)) => {
                metrics::record_inference_failure("aborted");
                return Err(ApiError::inference(format!("Inference task aborted: {}", e)));
            }
            Err(_) => {
                warn!(
                    backend,
                    timeout_ms = self.inference_timeout.as_millis() as u64,
                    "Inference timed out"
                );
                metrics::record_inference_failure("timeout");
                return Err(ApiError::inference(format!(
                    "Inference timed out after {:?}",
                    self.inference_timeout
                )));
            }
        };

        let elapsed = start.elapsed();
        metrics::record_inference_duration(backend, elapsed.as_secs_f64());
        debug!(
            backend,
            count = detections.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Model returned detections"
        );

        Ok(detections)
    }
}
