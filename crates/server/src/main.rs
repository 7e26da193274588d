// crates/server/src/main.rs
//! toon-dl server binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use toon_dl_core::{CliDownloader, Downloader};
use toon_dl_server::{create_app, init_metrics, AppState, ServerConfig};
use toon_dl_server_jobs::JobContext;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    // Held for the whole run so the file writer flushes on exit.
    let _log_guard = toon_dl_observability::init_tracing(&config.log_config())?;

    init_metrics();

    let mut downloader = CliDownloader::new(&config.downloader).with_args(&config.downloader_args);
    if let Some(secs) = config.downloader_timeout_secs {
        downloader = downloader.with_timeout(secs);
    }
    if let Err(e) = downloader.health_check().await {
        // Not fatal: jobs will report the failure, and /status shows it.
        tracing::warn!(
            downloader = %config.downloader.display(),
            error = %e,
            "downloader is not runnable"
        );
    }

    let jobs = JobContext::new(Arc::new(downloader))
        .with_cancel_on_disconnect(config.cancel_on_disconnect);
    let state = AppState::with_outbound_buffer(jobs, config.outbound_buffer());
    let app = create_app(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(
        %addr,
        version = env!("CARGO_PKG_VERSION"),
        cancel_on_disconnect = config.cancel_on_disconnect,
        "toon-dl listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Resolve on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
