//! HTTP surface tests with a fake transcoder.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use lapse_api::{create_router, ApiConfig, AppState};
use lapse_media::{FfmpegCommand, MediaResult, Prober, Transcoder};
use lapse_render::{InMemorySourceRegistry, RenderConfig, RenderOrchestrator, TaskStore};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::watch;
use tower::ServiceExt;

struct WritesOutput;

#[async_trait]
impl Transcoder for WritesOutput {
    async fn transcode(&self, cmd: &FfmpegCommand, _cancel: watch::Receiver<bool>) -> MediaResult<()> {
        tokio::fs::write(cmd.output(), b"fake mp4").await?;
        Ok(())
    }
}

const BOUNDARY: &str = "lapse-test-boundary";

/// Multipart body with one part per `(name, filename, bytes)`.
fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Body {
    let mut body = Vec::new();
    for (name, filename, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    Body::from(body)
}

fn upload_request(body: Body) -> Request<Body> {
    Request::post("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(body)
        .unwrap()
}

struct TestApp {
    router: Router,
    state: AppState,
    _dir: TempDir,
}

fn app_with(configure: impl FnOnce(ApiConfig) -> ApiConfig) -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = configure(ApiConfig {
        upload_dir: dir.path().join("uploads"),
        ..ApiConfig::default()
    });
    let render_config = RenderConfig::default().with_output_dir(dir.path().join("outputs"));

    let sources = Arc::new(InMemorySourceRegistry::new());
    let orchestrator = Arc::new(RenderOrchestrator::new(
        render_config,
        TaskStore::new(),
        sources.clone(),
        Prober::new(Vec::new()),
        Arc::new(WritesOutput),
    ));
    let state = AppState::from_parts(config, sources, orchestrator);

    TestApp {
        router: create_router(state.clone(), None),
        state,
        _dir: dir,
    }
}

fn app() -> TestApp {
    app_with(|c| c)
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(request).await;
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    async fn upload(&self, filename: &str) -> String {
        let part = ("file", Some(filename), &b"recorded bytes"[..]);
        let request = upload_request(multipart(&[part]));
        let (status, body) = self.send_json(request).await;
        assert_eq!(status, StatusCode::OK, "upload failed: {}", body);
        body["fileId"].as_str().unwrap().to_string()
    }

    async fn create(&self, body: Value) -> (StatusCode, Value) {
        let request = Request::post("/api/timelapse")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send_json(request).await
    }

    async fn status(&self, task_id: &str) -> (StatusCode, Value) {
        let request = Request::get(format!("/api/timelapse/{}", task_id))
            .body(Body::empty())
            .unwrap();
        self.send_json(request).await
    }

    async fn wait_settled(&self, task_id: &str) -> Value {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let (_, body) = self.status(task_id).await;
                if body["status"] != "processing" {
                    return body;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("task should settle")
    }
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = app
        .send_json(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_unsupported_aspect_ratio_creates_no_task() {
    let app = app();
    let file_id = app.upload("rec.webm").await;

    let (status, body) = app
        .create(json!({ "fileId": file_id, "outputSeconds": 30, "aspectRatio": "21:9" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("aspectRatio"));
    assert!(app.state.orchestrator.store().is_empty().await);
}

#[tokio::test]
async fn test_unsupported_output_seconds_rejected() {
    let app = app();
    let file_id = app.upload("rec.webm").await;

    let (status, body) = app
        .create(json!({ "fileId": file_id, "outputSeconds": 20 }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("outputSeconds"));
    assert!(app.state.orchestrator.store().is_empty().await);
}

#[tokio::test]
async fn test_negative_recording_seconds_rejected() {
    let app = app();
    let file_id = app.upload("rec.webm").await;

    let (status, _) = app
        .create(json!({ "fileId": file_id, "outputSeconds": 30, "recordingSeconds": -5.0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_source_fields_rejected() {
    let app = app();
    let (status, body) = app.create(json!({ "outputSeconds": 30 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("fileId"));
}

#[tokio::test]
async fn test_malformed_json_rejected_with_detail() {
    let app = app();
    let request = Request::post("/api/timelapse")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = app.send_json(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_unknown_source_is_not_found() {
    let app = app();
    let (status, _) = app
        .create(json!({ "fileId": "does-not-exist", "outputSeconds": 30 }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let app = app();
    let (status, _) = app.status("nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(Request::get("/api/download/nope").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_zero_hint_rejected_when_disallowed() {
    let app = app_with(|c| ApiConfig {
        allow_zero_recording_hint: false,
        ..c
    });
    let file_id = app.upload("rec.webm").await;

    let (status, _) = app
        .create(json!({ "fileId": file_id, "outputSeconds": 30, "recordingSeconds": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.state.orchestrator.store().is_empty().await);
}

#[tokio::test]
async fn test_upload_rejects_unknown_extension_and_empty_body() {
    let app = app();

    let (status, _) = app
        .send(upload_request(multipart(&[("file", Some("notes.txt"), &b"text"[..])])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(upload_request(multipart(&[("file", Some("rec.mp4"), &b""[..])])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send_json(upload_request(multipart(&[("caption", None, &b"hello"[..])])))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("file"));

    // Not a form at all
    let (status, _) = app
        .send(
            Request::post("/api/upload")
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .body(Body::from("raw"))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.state.sources.len().await, 0);
    let leftovers = std::fs::read_dir(&app.state.config.upload_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0, "rejected uploads leave no files behind");
}

#[tokio::test]
async fn test_upload_stores_only_file_part_payload() {
    let app = app();
    let payload: &[u8] = b"\x1a\x45\xdf\xa3 webm payload";

    let (status, body) = app
        .send_json(upload_request(multipart(&[
            ("caption", None, &b"morning session"[..]),
            ("file", Some("recording.webm"), payload),
        ])))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filename"], "recording.webm");
    assert_eq!(body["kind"], "video");

    let file_id = body["fileId"].as_str().unwrap();
    let stored = app.state.config.upload_dir.join(format!("{}.webm", file_id));
    let bytes = std::fs::read(&stored).unwrap();
    assert_eq!(bytes, payload, "no multipart framing reaches disk");
}

#[tokio::test]
async fn test_upload_over_body_limit_is_rejected() {
    let app = app_with(|c| ApiConfig {
        max_body_size: 256,
        ..c
    });
    let payload = vec![7u8; 4096];

    let (status, _) = app
        .send(upload_request(multipart(&[("file", Some("rec.webm"), payload.as_slice())])))
        .await;
    assert!(status.is_client_error(), "unexpected status {}", status);
    assert_eq!(app.state.sources.len().await, 0);
}

#[tokio::test]
async fn test_upload_render_and_download() {
    let app = app();
    let file_id = app.upload("rec.webm").await;

    let (status, body) = app
        .create(json!({
            "fileId": file_id,
            "outputSeconds": 15,
            "recordingSeconds": 60.0,
            "aspectRatio": "9:16"
        }))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let task_id = body["taskId"].as_str().unwrap().to_string();

    let settled = app.wait_settled(&task_id).await;
    assert_eq!(settled["status"], "completed");
    assert_eq!(settled["progress"], 100);
    assert_eq!(settled["outputSeconds"], 15);
    assert_eq!(
        settled["downloadUrl"],
        format!("/api/download/{}", task_id).as_str()
    );

    let response = app
        .router
        .clone()
        .oneshot(
            Request::get(format!("/api/download/{}", task_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "8");
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("timelapse.mp4"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"fake mp4");
}

#[tokio::test]
async fn test_photo_render_completes() {
    let app = app();
    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(app.upload(&format!("IMG_{}.jpg", i)).await);
    }

    let request = Request::post("/api/timelapse/photos")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "sourceIds": ids, "outputSeconds": 15, "aspectRatio": "1:1" }).to_string(),
        ))
        .unwrap();
    let (status, body) = app.send_json(request).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let settled = app.wait_settled(body["taskId"].as_str().unwrap()).await;
    assert_eq!(settled["status"], "completed");
    // Three stills at 30 fps fall back to the one-second floor
    assert_eq!(settled["outputSeconds"], 1);
}

#[tokio::test]
async fn test_cancel_settled_task_is_noop() {
    let app = app();
    let file_id = app.upload("rec.webm").await;
    let (_, body) = app
        .create(json!({ "fileId": file_id, "outputSeconds": 30, "recordingSeconds": 120.0 }))
        .await;
    let task_id = body["taskId"].as_str().unwrap().to_string();
    app.wait_settled(&task_id).await;

    let (status, body) = app
        .send_json(
            Request::delete(format!("/api/timelapse/{}", task_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
}
