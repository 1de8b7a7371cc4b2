//! API integration tests.
//!
//! The router runs against a scripted detector: the width of the uploaded
//! image selects what the "model" reports, so each test can stage exactly
//! the detections it needs.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use image::{DynamicImage, ImageOutputFormat};
use serde_json::Value;
use tower::ServiceExt;

use fruitscan_api::{create_router, ApiConfig, AppState};
use fruitscan_models::Detection;
use fruitscan_vision::{Detector, VisionError, VisionResult};

const BOUNDARY: &str = "fruitscan-test-boundary";

enum Outcome {
    Detections(Vec<Detection>),
    Fail,
}

/// Detector whose output depends on the input image width.
struct ScriptedDetector {
    by_width: HashMap<u32, Outcome>,
}

impl Detector for ScriptedDetector {
    fn detect(&self, image: &DynamicImage) -> VisionResult<Vec<Detection>> {
        match self.by_width.get(&image.width()) {
            Some(Outcome::Detections(detections)) => Ok(detections.clone()),
            Some(Outcome::Fail) => Err(VisionError::inference("session crashed")),
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

// Image widths used as script keys
const BANANA: u32 = 10;
const TWO_BANANAS: u32 = 11;
const LOW_CONFIDENCE: u32 = 12;
const BROKEN: u32 = 13;
const MIXED: u32 = 14;

fn scripted_detector() -> ScriptedDetector {
    let mut by_width = HashMap::new();
    by_width.insert(BANANA, Outcome::Detections(vec![Detection::new(46, 0.9)]));
    by_width.insert(
        TWO_BANANAS,
        Outcome::Detections(vec![Detection::new(46, 0.9), Detection::new(46, 0.6)]),
    );
    by_width.insert(
        LOW_CONFIDENCE,
        Outcome::Detections(vec![Detection::new(46, 0.29), Detection::new(47, 0.1)]),
    );
    by_width.insert(BROKEN, Outcome::Fail);
    by_width.insert(
        MIXED,
        Outcome::Detections(vec![
            Detection::new(47, 0.55),
            Detection::new(0, 0.99),
            Detection::new(49, 0.2),
            Detection::new(46, 0.85),
        ]),
    );
    ScriptedDetector { by_width }
}

fn test_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.rate_limit_rps = 1000;
    config
}

fn create_test_router_with(config: ApiConfig) -> Router {
    let state = AppState::with_detector(config, Arc::new(scripted_detector()))
        .expect("valid test state");
    create_router(state, None)
}

fn create_test_router() -> Router {
    create_test_router_with(test_config())
}

fn png(width: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::new_rgb8(width, 8)
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
        .unwrap();
    buf
}

fn multipart_body(field: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"upload.png\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, field: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, bytes)))
        .unwrap()
}

fn upload(bytes: &[u8]) -> Request<Body> {
    multipart_request("/detect", "image_file", bytes)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Test health endpoint.
#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router();

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ready_endpoint() {
    let app = create_test_router();

    let (status, body) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["detector"], "scripted");
    assert_eq!(body["classes"], 3);
    assert_eq!(body["unmapped_class_policy"], "drop");
}

/// Test security and request id headers.
#[tokio::test]
async fn test_security_headers() {
    let app = create_test_router();

    let response = app.oneshot(get("/health")).await.unwrap();
    let headers = response.headers();

    assert!(headers.contains_key("X-Content-Type-Options"));
    assert!(headers.contains_key("X-Frame-Options"));
    assert!(headers.contains_key("X-Request-ID"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_router();

    let request = Request::builder()
        .uri("/health")
        .header("X-Request-ID", "req-1234")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["X-Request-ID"], "req-1234");
}

#[tokio::test]
async fn test_metrics_disabled_without_handle() {
    let app = create_test_router();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fruit_names_before_any_detect() {
    let app = create_test_router();

    let (status, body) = send(&app, get("/fruit-names")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["message"], "Not found");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_detect_single_banana() {
    let app = create_test_router();

    let (status, body) = send(&app, upload(&png(BANANA))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({ "status": true, "message": "Successful", "data": "Banana (কলা)" })
    );
}

#[tokio::test]
async fn test_fruit_names_matches_last_detect() {
    let app = create_test_router();

    let (_, detected) = send(&app, upload(&png(MIXED))).await;
    let (status, cached) = send(&app, get("/fruit-names")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cached["data"], detected["data"]);
    assert_eq!(cached["data"], "Apple (আপেল), Banana (কলা)");
}

#[tokio::test]
async fn test_duplicate_names_collapse() {
    let app = create_test_router();

    let (status, body) = send(&app, upload(&png(TWO_BANANAS))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "Banana (কলা)");
}

#[tokio::test]
async fn test_nothing_above_threshold() {
    let app = create_test_router();

    let (status, body) = send(&app, upload(&png(LOW_CONFIDENCE))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["message"], "Not found");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_names_come_from_table_only() {
    let app = create_test_router();

    let (_, body) = send(&app, upload(&png(MIXED))).await;
    let data = body["data"].as_str().unwrap();

    let table = ["Banana (কলা)", "Apple (আপেল)", "Orange (কমলা)"];
    for name in data.split(", ") {
        assert!(table.contains(&name), "unexpected name {name}");
    }
    // Orange was below threshold
    assert!(!data.contains("Orange"));
}

#[tokio::test]
async fn test_unknown_label_policy() {
    let mut config = test_config();
    config.detection.unmapped_policy = "unknown".to_string();
    let app = create_test_router_with(config);

    let (_, body) = send(&app, upload(&png(MIXED))).await;
    assert_eq!(body["data"], "Apple (আপেল), Banana (কলা), Unknown");
}

#[tokio::test]
async fn test_non_image_upload_rejected() {
    let app = create_test_router();

    let (status, body) = send(&app, upload(b"%PDF-1.4 this is not a photo")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], false);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_empty_upload_rejected() {
    let app = create_test_router();

    let (status, body) = send(&app, upload(b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Upload image file");
}

#[tokio::test]
async fn test_missing_image_field() {
    let app = create_test_router();

    let request = multipart_request("/detect", "photo", &png(BANANA));
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Upload image file");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_non_multipart_body() {
    let app = create_test_router();

    let request = Request::builder()
        .method("POST")
        .uri("/detect")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"image_file": "banana.png"}"#))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], false);
}

#[tokio::test]
async fn test_model_failure_is_500_and_keeps_cache() {
    let app = create_test_router();

    send(&app, upload(&png(BANANA))).await;
    let (status, body) = send(&app, upload(&png(BROKEN))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        serde_json::json!({ "status": false, "message": "Model inference failed", "data": null })
    );

    let (_, cached) = send(&app, get("/fruit-names")).await;
    assert_eq!(cached["data"], "Banana (কলা)");
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let mut config = test_config();
    config.max_body_size = 1024;
    let app = create_test_router_with(config);

    let (status, body) = send(&app, upload(&vec![0u8; 8 * 1024])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        body,
        serde_json::json!({ "status": false, "message": "Uploaded image is too large", "data": null })
    );
}

#[tokio::test]
async fn test_oversized_upload_with_content_length() {
    let mut config = test_config();
    config.max_body_size = 1024;
    let app = create_test_router_with(config);

    let body = multipart_body("image_file", &vec![0u8; 8 * 1024]);
    let request = Request::builder()
        .method("POST")
        .uri("/detect")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers()["content-type"], "application/json");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], false);
    assert_eq!(body["message"], "Uploaded image is too large");
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn test_detect_details() {
    let app = create_test_router();

    let request = multipart_request("/detect/details", "image_file", &png(MIXED));
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successful");

    let data = &body["data"];
    assert_eq!(data["fruits"], serde_json::json!(["Apple (আপেল)", "Banana (কলা)"]));
    assert_eq!(data["detections"].as_array().unwrap().len(), 2);
    assert_eq!(data["detections"][0]["class_id"], 46);
    assert_eq!(data["detections"][0]["confidence_percent"], "85.00%");
    assert!((data["confidence_threshold"].as_f64().unwrap() - 0.3).abs() < 1e-6);

    let (_, cached) = send(&app, get("/fruit-names")).await;
    assert_eq!(cached["data"], "Apple (আপেল), Banana (কলা)");
}

#[tokio::test]
async fn test_rate_limiting() {
    let mut config = test_config();
    config.rate_limit_rps = 1;
    let app = create_test_router_with(config);

    let (first, _) = send(&app, upload(&png(BANANA))).await;
    let (second, body) = send(&app, upload(&png(BANANA))).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["status"], false);
}
