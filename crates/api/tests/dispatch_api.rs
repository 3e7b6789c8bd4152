//! Integration tests for `/transform` and `/animate` admission.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{body_json, build_test_app, png_fixture, post_multipart};
use synthgate_core::error::StoreError;
use synthgate_core::job::{Job, JobKind, JobState, NewJob};
use synthgate_core::output::JobOutput;
use synthgate_core::progress::Progress;
use synthgate_core::store::JobStore;
use synthgate_core::types::{new_job_id, JobId, Timestamp};

// ---------------------------------------------------------------------------
// Test: transform is admitted, queued and holds the lock
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transform_is_queued_and_takes_the_lock() {
    let t = build_test_app();
    let png = png_fixture();

    let response = post_multipart(
        &t.app,
        "/transform",
        &[("character_name", "Subject"), ("feature_prompt", "red coat")],
        Some(&png),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "QUEUED");
    let task_id: JobId = json["task_id"].as_str().unwrap().parse().unwrap();

    let job = t.jobs.find(task_id).await.unwrap().unwrap();
    assert_eq!(job.kind, JobKind::Static);
    assert_eq!(job.state, JobState::Pending);
    assert_eq!(t.gate.holder().await.unwrap(), Some(task_id.to_string()));
}

// ---------------------------------------------------------------------------
// Test: animate is admitted as a TEMPORAL job
// ---------------------------------------------------------------------------

#[tokio::test]
async fn animate_is_queued_as_temporal() {
    let t = build_test_app();
    let png = png_fixture();

    let response = post_multipart(
        &t.app,
        "/animate",
        &[("character_name", "Subject"), ("duration_frames", "8")],
        Some(&png),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let task_id: JobId = json["task_id"].as_str().unwrap().parse().unwrap();
    let job = t.jobs.find(task_id).await.unwrap().unwrap();
    assert_eq!(job.kind, JobKind::Temporal);
}

// ---------------------------------------------------------------------------
// Test: second dispatch while the lock is held gets 429
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_dispatch_while_busy_returns_429() {
    let t = build_test_app();
    let png = png_fixture();
    let first = common::dispatch_transform(&t.app).await;

    let response = post_multipart(
        &t.app,
        "/animate",
        &[("character_name", "Other")],
        Some(&png),
    )
    .await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(response).await;
    assert_eq!(json["code"], "HARDWARE_BUSY");
    assert_eq!(json["error"], "error_hardware_busy");
    assert_eq!(t.gate.holder().await.unwrap(), Some(first.to_string()));
}

// ---------------------------------------------------------------------------
// Test: busy check runs before the body is validated
// ---------------------------------------------------------------------------

#[tokio::test]
async fn busy_check_precedes_body_validation() {
    let t = build_test_app();
    t.gate.try_acquire(new_job_id()).await.unwrap();

    let response = post_multipart(&t.app, "/transform", &[], None).await;

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

// ---------------------------------------------------------------------------
// Test: missing file is a 400 and leaves the lock free
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_file_returns_400() {
    let t = build_test_app();

    let response = post_multipart(&t.app, "/transform", &[("character_name", "Subject")], None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(!t.gate.is_locked().await.unwrap());
}

// ---------------------------------------------------------------------------
// Test: out-of-range parameters are a 400 and leave the lock free
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_parameters_return_400() {
    let t = build_test_app();
    let png = png_fixture();

    let response = post_multipart(
        &t.app,
        "/transform",
        &[("character_name", "Subject"), ("canny_low", "220"), ("canny_high", "100")],
        Some(&png),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(!t.gate.is_locked().await.unwrap());
}

#[tokio::test]
async fn nan_strength_returns_400_and_queues_nothing() {
    let t = build_test_app();
    let png = png_fixture();

    let response = post_multipart(
        &t.app,
        "/transform",
        &[("character_name", "Subject"), ("strength", "NaN"), ("cfg_scale", "inf")],
        Some(&png),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(!t.gate.is_locked().await.unwrap());
    assert!(t.jobs.claim_next("w").await.unwrap().is_none());
}

#[tokio::test]
async fn blank_subject_name_returns_400() {
    let t = build_test_app();
    let png = png_fixture();

    let response = post_multipart(&t.app, "/animate", &[("character_name", " ")], Some(&png)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unparsable_number_returns_400() {
    let t = build_test_app();
    let png = png_fixture();

    let response = post_multipart(
        &t.app,
        "/animate",
        &[("character_name", "Subject"), ("fps", "fast")],
        Some(&png),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Test: enqueue failure returns 500 and releases the lock
// ---------------------------------------------------------------------------

/// A job store whose writes always fail.
struct UnavailableJobs;

#[async_trait]
impl JobStore for UnavailableJobs {
    async fn enqueue(&self, _job: NewJob) -> Result<Job, StoreError> {
        Err(StoreError::Backend("queue unavailable".into()))
    }
    async fn claim_next(&self, _worker_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(None)
    }
    async fn report_progress(&self, _id: JobId, _p: &Progress) -> Result<bool, StoreError> {
        Ok(false)
    }
    async fn complete(&self, _id: JobId, _o: &JobOutput) -> Result<bool, StoreError> {
        Ok(false)
    }
    async fn fail(&self, _id: JobId, _m: &str) -> Result<bool, StoreError> {
        Ok(false)
    }
    async fn find(&self, _id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(None)
    }
    async fn purge_finished_before(&self, _cutoff: Timestamp) -> Result<u64, StoreError> {
        Ok(0)
    }
}

#[tokio::test]
async fn enqueue_failure_returns_500_and_releases_lock() {
    let t = common::build_test_app_with_store(Arc::new(UnavailableJobs));
    let png = png_fixture();

    let response = post_multipart(
        &t.app,
        "/transform",
        &[("character_name", "Subject")],
        Some(&png),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "DISPATCH_FAILED");
    assert!(!json["error"].as_str().unwrap().contains("queue unavailable"));
    assert!(!t.gate.is_locked().await.unwrap());
}
