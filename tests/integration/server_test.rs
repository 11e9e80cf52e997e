// HTTP API tests driven through the router without binding a socket

use super::support::{letter_pdf, white_png, BlockRasterizer};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http_body_util::BodyExt;
use imageseal::config::{FailureStatus, ServerConfig};
use imageseal::server::{router, AppState};
use imageseal::watermark::WatermarkService;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "imageseal-test-boundary";

fn app() -> Router {
    app_with(ServerConfig::default(), Some(Arc::new(BlockRasterizer)))
}

fn app_with(
    config: ServerConfig,
    rasterizer: Option<Arc<dyn imageseal::watermark::TextRasterizer>>,
) -> Router {
    router(AppState::new(WatermarkService::new(rasterizer, None)), &config)
}

/// Hand-built `multipart/form-data` body.
struct Form {
    body: Vec<u8>,
}

impl Form {
    fn new() -> Self {
        Self { body: Vec::new() }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, file_name: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let request = Request::builder()
        .uri("/api/watermark/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], "OK");
}

#[tokio::test]
async fn test_add_watermark_returns_png() {
    let request = Form::new()
        .file("cat.jpg", &white_png(120, 80))
        .text("watermarkText", "HELLO")
        .text("fontSize", "18")
        .text("color", "#ff0000")
        .text("opacity", "50")
        .text("angle", "-45")
        .text("spacing", "40")
        .request("/api/watermark/add");
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["mimeType"], "image/png");
    assert_eq!(body["data"]["fileName"], "cat_watermarked.png");

    let png = STANDARD
        .decode(body["data"]["imageBase64"].as_str().unwrap())
        .unwrap();
    let image = image::load_from_memory(&png).unwrap();
    assert_eq!((image.width(), image.height()), (120, 80));
}

#[tokio::test]
async fn test_blank_numbers_keep_defaults() {
    let request = Form::new()
        .file("a.png", &white_png(50, 50))
        .text("watermarkText", "X")
        .text("fontSize", "")
        .text("opacity", " ")
        .text("color", "")
        .request("/api/watermark/add");
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
}

#[tokio::test]
async fn test_add_pdf_watermark() {
    let request = Form::new()
        .text("watermarkText", "CONFIDENTIAL")
        .file("contract.pdf", &letter_pdf(2))
        .request("/api/watermark/add-pdf");
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["pageCount"], 2);
    assert_eq!(body["data"]["mimeType"], "application/pdf");
    assert_eq!(body["data"]["fileName"], "contract_watermarked.pdf");
    assert!(body["message"].as_str().unwrap().contains("2 pages"));

    let pdf = STANDARD
        .decode(body["data"]["pdfBase64"].as_str().unwrap())
        .unwrap();
    assert_eq!(lopdf::Document::load_mem(&pdf).unwrap().get_pages().len(), 2);
}

#[tokio::test]
async fn test_unsupported_extension_is_415() {
    let request = Form::new()
        .file("notes.txt", b"hello")
        .text("watermarkText", "X")
        .request("/api/watermark/add");
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"], Value::Null);
}

#[tokio::test]
async fn test_missing_text_is_400() {
    let request = Form::new()
        .file("a.png", &white_png(10, 10))
        .request("/api/watermark/add");
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_missing_file_is_400() {
    let request = Form::new()
        .text("watermarkText", "X")
        .request("/api/watermark/add-pdf");
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn test_malformed_number_is_400() {
    let request = Form::new()
        .file("a.png", &white_png(10, 10))
        .text("watermarkText", "X")
        .text("fontSize", "huge")
        .request("/api/watermark/add");
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("fontSize"));
}

#[tokio::test]
async fn test_oversized_font_is_400() {
    let request = Form::new()
        .file("a.png", &white_png(10, 10))
        .text("watermarkText", "X")
        .text("fontSize", "100000")
        .request("/api/watermark/add");
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("fontSize"));
}

#[tokio::test]
async fn test_failures_can_be_reported_with_200() {
    let config = ServerConfig {
        failure_status: FailureStatus::Ok,
        ..ServerConfig::default()
    };
    let request = Form::new()
        .file("notes.txt", b"hello")
        .text("watermarkText", "X")
        .request("/api/watermark/add");
    let (status, body) = send(app_with(config, Some(Arc::new(BlockRasterizer))), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("notes.txt"));
}

#[tokio::test]
async fn test_missing_font_is_500() {
    let request = Form::new()
        .file("a.png", &white_png(10, 10))
        .text("watermarkText", "X")
        .request("/api/watermark/add");
    let (status, body) = send(app_with(ServerConfig::default(), None), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let config = ServerConfig {
        max_body_size_mb: 1,
        ..ServerConfig::default()
    };
    let request = Form::new()
        .text("watermarkText", "X")
        .file("big.png", &vec![0u8; 2 * 1024 * 1024])
        .request("/api/watermark/add");
    let (status, _) = send(app_with(config, Some(Arc::new(BlockRasterizer))), request).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_static_frontend_falls_back_to_index() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>imageseal</h1>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

    let config = ServerConfig {
        static_dir: Some(dir.path().to_path_buf()),
        ..ServerConfig::default()
    };
    let app = app_with(config, Some(Arc::new(BlockRasterizer)));

    for (uri, expected) in [("/app.js", "console.log(1)"), ("/upload/history", "<h1>imageseal</h1>")] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], expected.as_bytes(), "{}", uri);
    }
}

#[tokio::test]
async fn test_cors_preflight_is_allowed() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/watermark/add")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
}
