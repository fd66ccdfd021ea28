//! Tests for `AppError` -> HTTP response mapping.
//!
//! These tests call `IntoResponse` directly on `AppError` values; no HTTP
//! server is involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use jobrelay_api::engine::{DispatchError, TriggerError};
use jobrelay_api::error::AppError;
use jobrelay_core::error::CoreError;
use jobrelay_db::StoreError;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Client errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Process",
        id: "abc".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Process with id abc not found");
}

#[tokio::test]
async fn unknown_job_type_returns_400() {
    let err = AppError::Core(CoreError::UnknownJobType("foo".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "UNKNOWN_JOB_TYPE");
    assert_eq!(json["error"], "Unknown job type: foo");
}

#[tokio::test]
async fn validation_error_returns_400_with_message() {
    let err = AppError::Core(CoreError::Validation("question must not be empty".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "question must not be empty");
}

#[tokio::test]
async fn store_not_found_returns_404() {
    let id = uuid::Uuid::new_v4();
    let (status, json) = error_to_response(AppError::Store(StoreError::NotFound(id))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], format!("Process with id {id} not found"));
}

// ---------------------------------------------------------------------------
// Server errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn database_error_returns_500_and_sanitizes_message() {
    let err = AppError::Store(StoreError::Database(sqlx::Error::PoolTimedOut));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn corrupt_record_returns_500_and_sanitizes_message() {
    let err = AppError::Store(StoreError::Corrupt {
        job_id: uuid::Uuid::new_v4(),
        reason: "secret column contents".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert!(!json["error"].as_str().unwrap().contains("secret"));
}

#[tokio::test]
async fn queue_failure_returns_503() {
    let err: AppError = DispatchError::Trigger {
        job_id: uuid::Uuid::new_v4(),
        source: TriggerError::Full,
    }
    .into();

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn dispatch_errors_keep_their_client_mapping() {
    let err: AppError = DispatchError::Core(CoreError::UnknownJobType("foo".into())).into();

    let (status, _) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
