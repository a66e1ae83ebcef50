//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::path::Path;
use std::process::Stdio;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use mcatch_api::handlers::UploadResponse;
use mcatch_api::{create_router, ApiConfig, AppState};
use mcatch_models::TrailerConfig;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "mcatch-test-boundary";

async fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = ApiConfig {
        upload_dir: dir.path().join("uploads"),
        output_dir: dir.path().join("outputs"),
        ..Default::default()
    };
    let state = AppState::new(config, TrailerConfig::default()).await.unwrap();
    let handle = PrometheusBuilder::new().build_recorder().handle();
    (create_router(state, Some(handle)), dir)
}

fn multipart_upload(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path).unwrap().next().is_none()
}

#[tokio::test]
async fn test_health() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));

    let body = json_body(response).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["available_runs"], 2);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/download/none.mp4").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let id = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok(), "request id {id}");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_without_video_field() {
    let (app, dir) = test_app().await;

    let response = app
        .oneshot(multipart_upload("document", "notes.txt", b"hello"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "No video file provided");
    assert!(dir_is_empty(&dir.path().join("uploads")));
}

#[tokio::test]
async fn test_upload_with_empty_filename() {
    let (app, dir) = test_app().await;

    let response = app.oneshot(multipart_upload("video", "", b"data")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "No file selected");
    assert!(dir_is_empty(&dir.path().join("uploads")));
}

#[tokio::test]
async fn test_upload_requires_multipart() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_missing_file() {
    let (app, _dir) = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/download/trailer_missing.mp4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], "File not found");
}

#[tokio::test]
async fn test_download_rejects_traversal() {
    let (app, dir) = test_app().await;
    std::fs::write(dir.path().join("secret.mp4"), b"secret").unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/download/..%2Fsecret.mp4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_download_existing_trailer() {
    let (app, dir) = test_app().await;
    std::fs::write(dir.path().join("outputs/trailer_ab12cd34_game.mp4"), b"not really a video").unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/download/trailer_ab12cd34_game.mp4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"trailer_ab12cd34_game.mp4\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"not really a video");
}

#[tokio::test]
#[ignore = "requires ffprobe"]
async fn test_upload_unreadable_video() {
    let (app, dir) = test_app().await;

    let response = app
        .oneshot(multipart_upload("video", "broken.mp4", b"definitely not a video"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["code"], "source_unreadable");
    assert!(dir_is_empty(&dir.path().join("uploads")));
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_upload_generates_trailer() {
    let (app, dir) = test_app().await;

    let clip = dir.path().join("source.mp4");
    let status = tokio::process::Command::new("ffmpeg")
        .args(["-y", "-hide_banner", "-v", "error"])
        .args(["-f", "lavfi", "-i", "testsrc=duration=15:size=320x180:rate=25"])
        .args(["-f", "lavfi", "-i", "sine=frequency=440:duration=15"])
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest"])
        .arg(&clip)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .unwrap();
    assert!(status.success());
    let content = std::fs::read(&clip).unwrap();

    let response = app
        .clone()
        .oneshot(multipart_upload("video", "source clip.mp4", &content))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let upload: UploadResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(upload.success);
    assert_eq!(upload.moments, upload.moments_data.len());
    assert!(upload.duration <= 30.0);
    assert!(dir_is_empty(&dir.path().join("uploads")));

    if let Some(name) = upload.output_file {
        assert!(name.starts_with("trailer_"));
        assert!(name.ends_with("_source_clip.mp4"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/download/{name}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
