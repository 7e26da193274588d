// crates/server/src/routes/status.rs
//! Service status: job counters and downloader availability.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

const STATUS_MESSAGE: &str = "Welcome to toon-dl";

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct DownloaderStatus {
    pub name: String,
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub version: String,
    /// Submitted, not yet started.
    pub pending_jobs: usize,
    pub running_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    pub cancelled_jobs: u64,
    pub open_connections: usize,
    pub downloader: DownloaderStatus,
}

/// GET /status - Job counters and whether the downloader can be run.
///
/// Always 200: an unavailable downloader is reported, not treated as an error.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let downloader = &state.jobs.downloader;
    let health = downloader.health_check().await;
    if let Err(e) = &health {
        tracing::warn!(downloader = downloader.name(), error = %e, "downloader health check failed");
    }

    let counters = state.jobs.counters.snapshot();
    Json(StatusResponse {
        status: "ok".to_string(),
        message: STATUS_MESSAGE.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pending_jobs: state.jobs.registry.pending_count(),
        running_jobs: counters.running,
        completed_jobs: counters.completed,
        failed_jobs: counters.failed,
        cancelled_jobs: counters.cancelled,
        open_connections: state.open_connections(),
        downloader: DownloaderStatus {
            name: downloader.name().to_string(),
            available: health.is_ok(),
            error: health.err().map(|e| e.to_string()),
        },
    })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}
