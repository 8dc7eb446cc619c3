//! # HTTP Server Tests
//!
//! Drives the axum router with `tower::ServiceExt::oneshot`. Relay tests
//! fetch from a local upstream bound to an ephemeral port.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    routing::get,
};
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use roundel::export::pdf;
use roundel::relay::relay_url;
use roundel::server::{AppState, ServerConfig, router};
use roundel::source::encode_png;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "roundel-test-boundary";

fn app() -> Router {
    router(Arc::new(AppState::new(ServerConfig::default()).unwrap()))
}

fn photo_png() -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(200, 300, Rgba([40, 90, 200, 255]))).unwrap()
}

/// Relay path for `target`, as a client would request it.
fn proxy_path(target: &str) -> String {
    relay_url("http://localhost", target)
        .unwrap()
        .trim_start_matches("http://localhost")
        .to_string()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Serve a PNG on 127.0.0.1 and return its URL.
async fn spawn_upstream() -> String {
    let png = photo_png();
    let upstream = Router::new()
        .route(
            "/logo.png",
            get(move || {
                let png = png.clone();
                async move { ([(header::CONTENT_TYPE, "image/png")], png) }
            }),
        )
        .route(
            "/missing.png",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });
    format!("http://{}", addr)
}

fn multipart_upload(filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/logo/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================================
// Image relay
// ============================================================================

#[tokio::test]
async fn test_proxy_requires_url() {
    let response = app().oneshot(get_request("/api/imageProxy")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Missing \"url\" query parameter." })
    );

    let response = app().oneshot(get_request("/api/imageProxy?url=")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_proxy_unreachable_upstream() {
    let response = app()
        .oneshot(get_request(&proxy_path("http://127.0.0.1:1/logo.png")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Proxy failed to fetch image: "), "{}", message);
}

#[tokio::test]
async fn test_proxy_upstream_error_status() {
    let base = spawn_upstream().await;
    let response = app()
        .oneshot(get_request(&proxy_path(&format!("{}/missing.png", base))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Not Found"));
}

#[tokio::test]
async fn test_proxy_relays_bytes_with_cors_headers() {
    let base = spawn_upstream().await;
    let response = app()
        .oneshot(get_request(&proxy_path(&format!("{}/logo.png", base))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "GET");
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(body_bytes(response).await, photo_png());
}

// ============================================================================
// Logo sessions
// ============================================================================

#[tokio::test]
async fn test_upload_crop_color_export_flow() {
    let app = app();

    let response = app
        .clone()
        .oneshot(multipart_upload("photo.png", &photo_png()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let upload = body_json(response).await;
    assert_eq!(upload["width"], 200);
    assert_eq!(upload["height"], 300);
    assert_eq!(upload["filename"], "photo.png");
    let id = upload["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/logo/{}/crop", id),
            json!({ "x": 0, "y": 0, "width": 200, "height": 200, "shape": "circle" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let crop = body_json(response).await;
    assert_eq!(crop["side"], 200);
    assert_eq!(crop["color"]["hex"], "#285ac8");

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/logo/{}/cropped", id)))
        .await
        .unwrap();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let cropped = image::load_from_memory(&body_bytes(response).await)
        .unwrap()
        .to_rgba8();
    assert_eq!(cropped.dimensions(), (200, 200));
    assert_eq!(cropped.get_pixel(0, 0)[3], 0);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/logo/{}/color", id),
            json!({ "hex": "#C0FFEE" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["color"]["hex"], "#c0ffee");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/logo/{}/export", id),
            json!({ "blur_level": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"PrintCopy.pdf\""
    );

    let (w, h) = pdf::page_size_mm(&body_bytes(response).await).unwrap();
    assert!((w - 108.42).abs() < 1e-3);
    assert!((h - 108.42).abs() < 1e-3);
}

#[tokio::test]
async fn test_eyedropper_picks_from_crop() {
    let app = app();
    let response = app
        .clone()
        .oneshot(multipart_upload("photo.png", &photo_png()))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    // Nothing to pick from before the first crop
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/logo/{}/color", id),
            json!({ "x": 5, "y": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    app.clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/logo/{}/crop", id),
            json!({ "x": 0, "y": 0, "width": 100, "height": 100, "shape": "square" }),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/logo/{}/color", id),
            json!({ "x": 5, "y": 5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["color"]["hex"], "#285ac8");
}

#[tokio::test]
async fn test_unknown_and_invalid_sessions() {
    let response = app()
        .oneshot(get_request(&format!("/api/logo/{}/cropped", uuid::Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app()
        .oneshot(get_request("/api/logo/not-a-uuid/preview"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_preview_rejects_bad_blur_level() {
    let app = app();
    let response = app
        .clone()
        .oneshot(multipart_upload("photo.png", &photo_png()))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(get_request(&format!("/api/logo/{}/preview?blur=42", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_crop_is_rejected() {
    let app = app();
    let response = app
        .clone()
        .oneshot(multipart_upload("photo.png", &photo_png()))
        .await
        .unwrap();
    let id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/logo/{}/crop", id),
            json!({ "x": 0, "y": 0, "width": 60000, "height": 60000, "shape": "circle" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    // No crop was stored
    let response = app
        .oneshot(get_request(&format!("/api/logo/{}/cropped", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejects_garbage() {
    let response = app()
        .oneshot(multipart_upload("photo.png", b"not an image"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
