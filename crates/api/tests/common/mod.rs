#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use synthgate_core::admission::{AdmissionGate, DEFAULT_LOCK_KEY};
use synthgate_core::memory::{MemoryJobStore, MemoryLockStore};
use synthgate_core::store::JobStore;
use synthgate_pipeline::MetadataAnalyzer;
use synthgate_worker::{reference_orchestrator, JobRunner};
use tower::ServiceExt;

use synthgate_api::config::ServerConfig;
use synthgate_api::router::build_app_router;
use synthgate_api::state::AppState;

const BOUNDARY: &str = "synthgate-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 5 * 1024 * 1024,
        database_url: None,
        lock_key: DEFAULT_LOCK_KEY.to_string(),
        lock_ttl: Duration::from_secs(900),
        metadata_dir: None,
        result_retention_hours: 24,
    }
}

/// The router plus handles on the in-memory stores behind it.
pub struct TestApp {
    pub app: Router,
    pub jobs: Arc<dyn JobStore>,
    pub gate: AdmissionGate,
    /// Worker sharing the app's stores; drive it with `run_once`.
    pub runner: JobRunner,
}

/// Full application router over in-memory stores.
pub fn build_test_app() -> TestApp {
    build_test_app_with_store(Arc::new(MemoryJobStore::new()))
}

/// Full application router over a caller-supplied job store.
pub fn build_test_app_with_store(jobs: Arc<dyn JobStore>) -> TestApp {
    let config = test_config();
    let gate = AdmissionGate::new(
        Arc::new(MemoryLockStore::new()),
        config.lock_key.as_str(),
        config.lock_ttl,
    );
    let analyzer = Arc::new(MetadataAnalyzer::default());
    let runner = JobRunner::new(
        jobs.clone(),
        gate.clone(),
        Arc::new(reference_orchestrator(analyzer.clone())),
        "test-worker",
    );
    let state = AppState {
        jobs: jobs.clone(),
        gate: gate.clone(),
        analyzer,
        config: Arc::new(config.clone()),
        store_backend: "memory",
    };
    TestApp {
        app: build_app_router(state, &config),
        jobs,
        gate,
        runner,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A small PNG with some colour variation.
pub fn png_fixture() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(48, 32, |x, y| {
        Rgb([(x * 5) as u8, (y * 7) as u8, 120])
    }));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Encode a `multipart/form-data` body with optional `file` part.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"input.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_empty(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_multipart(
    app: &Router,
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<&[u8]>,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(fields, file)))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Dispatch a default `/transform` and return its task id.
pub async fn dispatch_transform(app: &Router) -> uuid::Uuid {
    let png = png_fixture();
    let response = post_multipart(
        app,
        "/transform",
        &[
            ("character_name", "Subject"),
            ("resolution_anchor", "64"),
            ("steps", "4"),
        ],
        Some(&png),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let json = body_json(response).await;
    json["task_id"].as_str().unwrap().parse().unwrap()
}
