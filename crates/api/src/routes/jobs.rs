use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Job submission and status routes.
///
/// ```text
/// POST   /initiate/{job_type}     initiate
/// GET    /status/{process_id}     status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/initiate/{job_type}", post(jobs::initiate))
        .route("/status/{process_id}", get(jobs::status))
}
