// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use toon_dl_server_jobs::JobContext;

/// Outbound buffer per connection when none is configured.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Registry, downloader and counters shared by every connection.
    pub jobs: JobContext,
    /// Outbound events buffered per WebSocket before job tasks wait.
    pub outbound_buffer: usize,
    open_connections: AtomicUsize,
}

impl AppState {
    pub fn new(jobs: JobContext) -> Arc<Self> {
        Self::with_outbound_buffer(jobs, DEFAULT_OUTBOUND_BUFFER)
    }

    pub fn with_outbound_buffer(jobs: JobContext, outbound_buffer: usize) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            jobs,
            outbound_buffer: outbound_buffer.max(1),
            open_connections: AtomicUsize::new(0),
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn open_connections(&self) -> usize {
        self.open_connections.load(Ordering::Relaxed)
    }

    /// Count a WebSocket as open until the returned guard is dropped.
    pub fn connection_opened(self: &Arc<Self>) -> ConnectionGuard {
        self.open_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            state: Arc::clone(self),
        }
    }
}

/// Decrements the open connection count on drop.
pub struct ConnectionGuard {
    state: Arc<AppState>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.open_connections.fetch_sub(1, Ordering::Relaxed);
    }
}
