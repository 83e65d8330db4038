//! API integration tests for the restore endpoint and error handling.
//!
//! Tests verify:
//! - End-to-end restoration over multipart HTTP
//! - Tier selection via the paid flag
//! - Error cases (empty upload, unsupported format, broken models)
//! - HTTP response codes, JSON shape and the artifact route

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use super::test_utils::{
    color_png, decode_image_payload, gray_png, is_valid_png, json_body, restore_request,
    MultipartBody, TestApp,
};

// =============================================================================
// Basic Restoration
// =============================================================================

#[tokio::test]
async fn test_restore_success() {
    let app = TestApp::new();

    let request = restore_request(&gray_png(100, 100, 120), false, true, false);
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["cache_hit"], false);
    assert_eq!(json["tier"], "preview");
    assert!(json["restored_url"]
        .as_str()
        .unwrap()
        .starts_with("/outputs/result_"));

    // The payload is a decodable PNG within the preview size cap
    let payload = decode_image_payload(&json);
    assert!(is_valid_png(&payload));
    let img = image::load_from_memory(&payload).unwrap();
    assert!(img.width().max(img.height()) <= 600);
    // Colorization produced a 3-channel result
    assert!(matches!(
        img.color(),
        image::ColorType::Rgb8 | image::ColorType::Rgba8
    ));
}

#[tokio::test]
async fn test_restore_paid_serves_hd() {
    let app = TestApp::new();

    let request = restore_request(&gray_png(100, 100, 120), true, true, true);
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["tier"], "hd");
    assert!(json["restored_url"].as_str().unwrap().ends_with("_hd.png"));
}

#[tokio::test]
async fn test_restore_large_input_downscaled() {
    let app = TestApp::new();

    // 1600px input: HD stays within 1200, preview within 600
    let request = restore_request(&color_png(1600, 800, [90, 90, 90]), false, false, true);
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    let payload = decode_image_payload(&json);
    let img = image::load_from_memory(&payload).unwrap();
    assert!(img.width().max(img.height()) <= 1200);
}

#[tokio::test]
async fn test_restore_defaults_applied_when_flags_missing() {
    let app = TestApp::new();

    // Only the file part: both steps default on, unpaid
    let request = MultipartBody::new()
        .file(&gray_png(50, 50, 120))
        .into_request();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["tier"], "preview");
    // Both models ran: face restorer + colorizer
    assert_eq!(app.model_invocations(), 2);
}

#[tokio::test]
async fn test_restore_ignores_unknown_fields() {
    let app = TestApp::new();

    let request = MultipartBody::new()
        .file(&gray_png(40, 40, 120))
        .text("colorize", "true")
        .text("unexpected", "whatever")
        .into_request();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_payment_url_included_when_configured() {
    let app = TestApp::builder()
        .payment_url("https://pay.example.com/checkout")
        .build();

    let request = restore_request(&gray_png(40, 40, 120), false, true, false);
    let response = app.router.oneshot(request).await.unwrap();

    let json = json_body(response).await;
    assert_eq!(json["payment_url"], "https://pay.example.com/checkout");
}

// =============================================================================
// Error Handling
// =============================================================================

#[tokio::test]
async fn test_missing_file_rejected() {
    let app = TestApp::new();

    let request = MultipartBody::new().text("colorize", "true").into_request();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "empty_upload");
}

#[tokio::test]
async fn test_empty_file_rejected() {
    let app = TestApp::new();

    let request = MultipartBody::new().file(&[]).into_request();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "empty_upload");
}

#[tokio::test]
async fn test_unrecognized_format_rejected() {
    let app = TestApp::new();

    let request = restore_request(b"definitely not an image", false, true, false);
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = json_body(response).await;
    assert_eq!(json["error"], "unsupported_format");
}

#[tokio::test]
async fn test_truncated_image_rejected() {
    let app = TestApp::new();

    let mut data = gray_png(64, 64, 120);
    data.truncate(data.len() / 2);

    let request = restore_request(&data, false, true, false);
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "decode_error");
}

#[tokio::test]
async fn test_broken_models_return_503() {
    let app = TestApp::builder().broken_models().build();

    let request = restore_request(&gray_png(40, 40, 120), true, false, false);
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["error"], "model_unavailable");
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_reports_models_loaded() {
    let app = TestApp::new();

    // Before any restoration: healthy but unloaded
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["models_loaded"], false);

    // Run a restoration that loads both models
    let request = restore_request(&gray_png(40, 40, 120), true, true, false);
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    let json = json_body(response).await;
    assert_eq!(json["models_loaded"], true);
}

// =============================================================================
// Artifact Route
// =============================================================================

#[tokio::test]
async fn test_persisted_artifact_served() {
    let app = TestApp::new();

    let request = restore_request(&gray_png(60, 60, 120), false, true, false);
    let response = app.router.clone().oneshot(request).await.unwrap();
    let json = json_body(response).await;
    let url = json["restored_url"].as_str().unwrap().to_string();

    let request = Request::builder().uri(&url).body(Body::empty()).unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    assert!(response.headers().contains_key("cache-control"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_png(&body));
}

#[tokio::test]
async fn test_missing_artifact_returns_404() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/outputs/result_0000_preview.png")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"], "not_found");
}

#[tokio::test]
async fn test_hostile_artifact_name_returns_404() {
    let app = TestApp::new();

    // Dot-prefixed names are rejected by sanitization, not the filesystem
    let request = Request::builder()
        .uri("/outputs/.hidden")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
