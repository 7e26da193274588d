// crates/server/src/lib.rs
//! toon-dl server library.
//!
//! Axum front end for the webtoon downloader: jobs are submitted over HTTP
//! and started over a WebSocket, which then streams their progress back.

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use metrics::{init_metrics, render_metrics};
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// CORS allows any origin; the browser front end is served elsewhere.
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
