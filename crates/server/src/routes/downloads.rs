// crates/server/src/routes/downloads.rs
//! Job submission.
//!
//! Submitting only registers the job. It runs once a WebSocket sends
//! `start_download` with the returned id, so progress always has a listener.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use toon_dl_server_jobs::metrics::record_job_submitted;
use toon_dl_types::{JobRequest, SubmitResponse};

use crate::error::ApiResult;
use crate::state::AppState;

/// POST /download - Register a job and return its id.
pub async fn submit_download(
    State(state): State<Arc<AppState>>,
    body: Result<Json<JobRequest>, JsonRejection>,
) -> ApiResult<Json<SubmitResponse>> {
    let Json(request) = body?;
    let url = request.url.clone();
    let download_id = state.jobs.registry.register(request);
    record_job_submitted();
    tracing::info!(download_id = %download_id, url = %url, "job submitted");
    Ok(Json(SubmitResponse { download_id }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/download", post(submit_download))
}
