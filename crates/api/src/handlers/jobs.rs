//! Handlers for job submission and status polling.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use jobrelay_core::error::CoreError;
use jobrelay_core::types::JobId;
use serde::Serialize;
use serde_json::Value;

use crate::engine::JobView;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Response body for an accepted submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateResponse {
    pub process_id: JobId,
}

/// POST /initiate/{job_type}
///
/// Persists a `PENDING` job and returns its id without waiting for the
/// worker. The body is passed to the worker verbatim.
pub async fn initiate(
    State(state): State<AppState>,
    Path(job_type): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<InitiateResponse>> {
    let Json(input) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let process_id = state.dispatcher.submit(&job_type, input).await?;

    Ok(Json(InitiateResponse { process_id }))
}

/// GET /status/{process_id}
///
/// Current state of a job. Ids that are not UUIDs cannot name a job and
/// are reported as not found.
pub async fn status(
    State(state): State<AppState>,
    Path(process_id): Path<String>,
) -> AppResult<Json<JobView>> {
    let job_id: JobId = process_id.parse().map_err(|_| {
        AppError::Core(CoreError::NotFound {
            entity: "Process",
            id: process_id.clone(),
        })
    })?;

    let view = state.poller.query(job_id).await?;
    Ok(Json(view))
}
