// crates/server-jobs/src/lib.rs
//! Job registry and progress streaming.
//!
//! Provides:
//! - `JobRegistry`: pending jobs, handed off exactly once
//! - `ExecutionBridge`: runs one job and streams its events
//! - `ChannelSession`: one connection's control loop state
//! - `EventSink`: the outbound side shared by a connection's jobs

pub mod bridge;
pub mod counters;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod session;
pub mod sink;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

use std::sync::Arc;

use toon_dl_core::Downloader;

pub use bridge::{ExecutionBridge, JobOutcome};
pub use counters::{CountersSnapshot, JobCounters};
pub use error::{JobError, SessionError};
pub use registry::JobRegistry;
pub use session::ChannelSession;
pub use sink::{EventSink, SharedSink, SinkClosed};

/// Everything a session needs to start jobs. Cheap to clone; the registry and
/// counters are shared, not copied.
#[derive(Clone)]
pub struct JobContext {
    pub registry: Arc<JobRegistry>,
    pub downloader: Arc<dyn Downloader>,
    pub counters: Arc<JobCounters>,
    /// Cancel a connection's running jobs when it closes.
    pub cancel_on_disconnect: bool,
}

impl JobContext {
    /// Fresh registry and counters around `downloader`.
    pub fn new(downloader: Arc<dyn Downloader>) -> Self {
        Self {
            registry: Arc::new(JobRegistry::new()),
            downloader,
            counters: Arc::new(JobCounters::new()),
            cancel_on_disconnect: false,
        }
    }

    pub fn with_cancel_on_disconnect(mut self, cancel: bool) -> Self {
        self.cancel_on_disconnect = cancel;
        self
    }
}
