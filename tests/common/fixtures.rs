use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tower::ServiceExt;

use modelserve::Model;
use modelserve::services::{RegressionArtifacts, SizeFitArtifacts};
use modelserve::tabular::{
    CategoricalImputer, HandleUnknown, LabelEncoder, NumericImputer, OneHotEncoder, Scaler,
};

/// Returns the same scores for every call and remembers what it was given
pub struct FixedModel {
    scores: Vec<f32>,
    calls: Mutex<Vec<(Vec<usize>, Vec<f32>)>>,
}

impl FixedModel {
    pub fn new(scores: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            scores,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(Vec<usize>, Vec<f32>)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Model for FixedModel {
    fn predict(&self, shape: &[usize], data: Vec<f32>) -> anyhow::Result<Vec<f32>> {
        self.calls.lock().unwrap().push((shape.to_vec(), data));
        Ok(self.scores.clone())
    }
}

/// Classifies the n-th region it sees as `digits[n]` with `confidences[n]`
pub struct SequenceModel {
    digits: Vec<usize>,
    confidences: Vec<f32>,
    next: AtomicUsize,
    shapes: Mutex<Vec<Vec<usize>>>,
    inputs: Mutex<Vec<Vec<f32>>>,
}

impl SequenceModel {
    pub fn new(digits: Vec<usize>, confidences: Vec<f32>) -> Arc<Self> {
        assert_eq!(digits.len(), confidences.len());
        Arc::new(Self {
            digits,
            confidences,
            next: AtomicUsize::new(0),
            shapes: Mutex::new(Vec::new()),
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }

    pub fn shapes(&self) -> Vec<Vec<usize>> {
        self.shapes.lock().unwrap().clone()
    }

    pub fn inputs(&self) -> Vec<Vec<f32>> {
        self.inputs.lock().unwrap().clone()
    }
}

impl Model for SequenceModel {
    fn predict(&self, shape: &[usize], data: Vec<f32>) -> anyhow::Result<Vec<f32>> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        self.shapes.lock().unwrap().push(shape.to_vec());
        self.inputs.lock().unwrap().push(data);

        let digit = self.digits[n % self.digits.len()];
        let confidence = self.confidences[n % self.confidences.len()];
        let rest = (1.0 - confidence) / 9.0;
        let mut scores = vec![rest; 10];
        scores[digit] = confidence;
        Ok(scores)
    }
}

pub struct FailingModel;

impl Model for FailingModel {
    fn predict(&self, _shape: &[usize], _data: Vec<f32>) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("input tensor has wrong rank")
    }
}

/// A region of ink on the canvas: (x, y, width, height)
pub type Blob = (u32, u32, u32, u32);

/// Draw solid rectangles of `ink` on a `background` canvas
pub fn draw_blobs(width: u32, height: u32, background: u8, ink: u8, blobs: &[Blob]) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let inside = blobs
            .iter()
            .any(|&(bx, by, bw, bh)| x >= bx && x < bx + bw && y >= by && y < by + bh);
        Luma([if inside { ink } else { background }])
    })
}

/// Two digit-sized strokes and a speck of noise, dark on white.
/// The right stroke starts higher, so it is traced first.
pub const RIGHT_DIGIT: Blob = (50, 5, 10, 20);
pub const LEFT_DIGIT: Blob = (10, 12, 8, 20);
pub const NOISE: Blob = (30, 35, 2, 2);

pub fn two_digit_image() -> GrayImage {
    draw_blobs(80, 40, 255, 0, &[RIGHT_DIGIT, LEFT_DIGIT, NOISE])
}

pub fn png_bytes(img: &GrayImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut buf, ImageFormat::Png)
        .expect("Failed to encode test image");
    buf.into_inner()
}

pub const BOUNDARY: &str = "modelserve-test-boundary";

/// Build a multipart/form-data body with a single file field
pub fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Build a multipart/form-data body with a single plain text field
pub fn multipart_text_body(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{b}--\r\n",
        b = BOUNDARY,
    )
    .into_bytes()
}

pub fn multipart_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .expect("Failed to build request")
}

pub fn json_request(body: impl Into<String>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .expect("Failed to build request")
}

/// Send one request and decode the JSON response
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.expect("Router failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    let json = serde_json::from_slice(&bytes).expect("Response body is not JSON");
    (status, json)
}

/// Size-fit artifacts for the default schema: 6 numeric columns and
/// 4 categorical columns encoding to 2 + 3 + 3 + 3 indicators
pub fn size_fit_artifacts(model: Arc<dyn Model>) -> SizeFitArtifacts {
    let strings = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    SizeFitArtifacts {
        num_imputer: NumericImputer {
            strategy: Some("mean".to_string()),
            statistics: vec![90.0, 75.0, 95.0, 170.0, 70.0, 30.0],
        },
        num_scaler: Scaler::Standard {
            mean: vec![90.0, 75.0, 95.0, 170.0, 70.0, 30.0],
            scale: vec![10.0; 6],
        },
        cat_imputer: CategoricalImputer {
            strategy: Some("most_frequent".to_string()),
            statistics: strings(&["camiseta", "M", "42", "40"]),
        },
        cat_onehot: OneHotEncoder {
            categories: vec![
                strings(&["camiseta", "pantalon"]),
                strings(&["S", "M", "L"]),
                strings(&["40", "42", "44"]),
                strings(&["38", "40", "42"]),
            ],
            handle_unknown: HandleUnknown::Error,
        },
        label_encoder: LabelEncoder {
            classes: strings(&["Ajustado", "Correcto", "Holgado"]),
        },
        model,
    }
}

/// Two input features, one target
pub fn regression_artifacts(model: Arc<dyn Model>) -> RegressionArtifacts {
    RegressionArtifacts {
        model,
        scaler_x: Scaler::Standard {
            mean: vec![1.0, 2.0],
            scale: vec![2.0, 2.0],
        },
        scaler_y: Scaler::Standard {
            mean: vec![0.5],
            scale: vec![2.0],
        },
    }
}

/// Write a value as a JSON artifact
pub fn write_json(path: &std::path::Path, value: &impl serde::Serialize) {
    let text = serde_json::to_string_pretty(value).expect("Failed to serialize artifact");
    std::fs::write(path, text).expect("Failed to write artifact");
}
