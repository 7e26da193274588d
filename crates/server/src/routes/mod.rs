//! HTTP and WebSocket routes for the toon-dl server.

pub mod downloads;
pub mod health;
pub mod metrics;
pub mod status;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::state::AppState;
use crate::ws::ws_handler;

/// Create the combined router.
///
/// Routes:
/// - POST /download - Register a job, returns its download_id
/// - GET  /ws       - Streaming channel: start jobs, receive progress
/// - GET  /status   - Job counters and downloader availability
/// - GET  /health   - Liveness
/// - GET  /metrics  - Prometheus text
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(downloads::router())
        .merge(status::router())
        .merge(health::router())
        .merge(metrics::router())
        .route("/ws", get(ws_handler))
        .with_state(state)
}
