//! Integration tests for the digit upload route.
//!
//! Tests cover:
//! - Successful reading with the documented response shape
//! - Upload validation (missing or non-file field, empty name, extension, undecodable bytes)
//! - 500 when the classifier is missing

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use common::*;

fn app_with_model(model: Arc<dyn Model>) -> axum::Router {
    let service = DigitsService::new(Some(model), &SegmentationParams::default());
    router(Service::Digits(Arc::new(service)), &ServerConfig::default())
}

#[tokio::test]
async fn test_upload_is_read_left_to_right() {
    let app = app_with_model(SequenceModel::new(vec![7, 3], vec![0.9, 0.8]));
    let body = multipart_body("image", "digits.PNG", &png_bytes(&two_digit_image()));

    let (status, body) = send(app, multipart_request(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "37");

    let digits = body["digits"].as_array().unwrap();
    assert_eq!(digits.len(), 2);
    assert_eq!(digits[0]["digit"], 3);
    assert_eq!(digits[0]["x_position"], LEFT_DIGIT.0);
    assert_eq!(digits[1]["digit"], 7);
    assert_eq!(digits[1]["x_position"], RIGHT_DIGIT.0);
    assert!(digits[0]["confidence"].as_f64().unwrap() > 0.79);
    assert!(!digits[0]["processed_image"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_file_part_returns_400() {
    let app = app_with_model(SequenceModel::new(vec![1], vec![0.9]));
    let body = multipart_body("file", "digits.png", &png_bytes(&two_digit_image()));

    let (status, body) = send(app, multipart_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No file part"}));
}

#[tokio::test]
async fn test_empty_file_name_returns_400() {
    let app = app_with_model(SequenceModel::new(vec![1], vec![0.9]));
    let body = multipart_body("image", "", b"");

    let (status, body) = send(app, multipart_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No selected file");
}

#[tokio::test]
async fn test_disallowed_extension_returns_400() {
    let app = app_with_model(SequenceModel::new(vec![1], vec![0.9]));
    let body = multipart_body("image", "digits.gif", &png_bytes(&two_digit_image()));

    let (status, body) = send(app, multipart_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "File type not allowed");
}

#[tokio::test]
async fn test_undecodable_image_returns_400() {
    let app = app_with_model(SequenceModel::new(vec![1], vec![0.9]));
    let body = multipart_body("image", "digits.jpg", b"definitely not a jpeg");

    let (status, body) = send(app, multipart_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Could not load the image.");
}

#[tokio::test]
async fn test_non_multipart_request_returns_400() {
    let app = app_with_model(SequenceModel::new(vec![1], vec![0.9]));

    let (status, body) = send(app, json_request("{}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No file part"}));
}

#[tokio::test]
async fn test_empty_body_returns_no_file_part() {
    let app = app_with_model(SequenceModel::new(vec![1], vec![0.9]));
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/predict")
        .body(axum::body::Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No file part"}));
}

#[tokio::test]
async fn test_text_field_named_image_is_not_a_file() {
    let model = SequenceModel::new(vec![1], vec![0.9]);
    let app = app_with_model(model.clone());
    let body = multipart_text_body("image", "digits.png");

    let (status, body) = send(app, multipart_request(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No file part"}));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_missing_model_returns_500() {
    let service = DigitsService::new(None, &SegmentationParams::default());
    let app = router(Service::Digits(Arc::new(service)), &ServerConfig::default());
    let body = multipart_body("image", "digits.png", &png_bytes(&two_digit_image()));

    let (status, body) = send(app, multipart_request(body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Model not loaded."}));
}

#[test]
fn test_allowed_extensions_are_configurable() {
    let service = DigitsService::new(None, &SegmentationParams::default())
        .with_allowed_extensions(vec!["bmp".to_string()]);

    assert!(service.is_allowed_file("scan.BMP"));
    assert!(!service.is_allowed_file("scan.png"));
    assert!(!service.is_allowed_file("scan"));
}

#[test]
fn test_service_reads_upload_directly() -> anyhow::Result<()> {
    let service = DigitsService::new(
        Some(SequenceModel::new(vec![4], vec![0.99])),
        &SegmentationParams::default(),
    );
    let img = draw_blobs(40, 40, 255, 0, &[(10, 10, 8, 16)]);

    let reading = service.predict(Some(Upload {
        file_name: "one.png".to_string(),
        bytes: png_bytes(&img),
    }))?;

    assert_eq!(reading.prediction, "4");
    Ok(())
}
