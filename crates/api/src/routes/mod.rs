pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the job route tree.
///
/// Route hierarchy:
///
/// ```text
/// /initiate/{job_type}      submit a job (POST)
/// /status/{process_id}      poll a job (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(jobs::router())
}
