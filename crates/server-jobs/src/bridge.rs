// crates/server-jobs/src/bridge.rs
//! Runs one job against the downloader and streams its events to a sink.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use toon_dl_core::{Downloader, ProgressReporter};
use toon_dl_types::{JobId, JobRequest, ProgressEvent, ProgressFields};

use crate::counters::JobCounters;
use crate::error::JobError;
use crate::metrics;
use crate::registry::JobRegistry;
use crate::sink::SharedSink;

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed(String),
    Cancelled,
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Completed => "completed",
            JobOutcome::Failed(_) => "failed",
            JobOutcome::Cancelled => "cancelled",
        }
    }
}

/// Tags each downloader update with the job id and writes it to the sink.
struct SinkReporter {
    download_id: JobId,
    sink: SharedSink,
}

#[async_trait]
impl ProgressReporter for SinkReporter {
    async fn report(&self, update: ProgressFields) {
        let event = ProgressEvent::progress(self.download_id.clone(), update);
        if self.sink.deliver(event.into()).await.is_err() {
            tracing::debug!(download_id = %self.download_id, "progress dropped: connection closed");
        }
    }
}

/// One started job, bound to a downloader and an outbound sink.
///
/// A bridge can only be obtained by [`claim`](Self::claim)ing the job out of
/// the registry, so at most one exists per id. [`run`](Self::run) writes zero
/// or more `progress` events followed by exactly one terminal event.
pub struct ExecutionBridge {
    download_id: JobId,
    request: JobRequest,
    downloader: Arc<dyn Downloader>,
    sink: SharedSink,
    cancel: CancellationToken,
    counters: Arc<JobCounters>,
}

impl ExecutionBridge {
    /// Take `download_id` out of `registry` and prepare it for execution.
    pub fn claim(
        registry: &JobRegistry,
        download_id: JobId,
        downloader: Arc<dyn Downloader>,
        sink: SharedSink,
        cancel: CancellationToken,
        counters: Arc<JobCounters>,
    ) -> Result<Self, JobError> {
        let request = registry.take(&download_id)?;
        Ok(Self {
            download_id,
            request,
            downloader,
            sink,
            cancel,
            counters,
        })
    }

    pub fn download_id(&self) -> &JobId {
        &self.download_id
    }

    /// Run the job to its terminal event.
    pub async fn run(self) -> JobOutcome {
        let started = Instant::now();
        self.counters.job_started();
        metrics::record_job_started();
        tracing::info!(
            url = %self.request.url,
            downloader = self.downloader.name(),
            "job started"
        );

        let reporter = SinkReporter {
            download_id: self.download_id.clone(),
            sink: Arc::clone(&self.sink),
        };
        let download = AssertUnwindSafe(self.downloader.download(&self.request, &reporter))
            .catch_unwind();

        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => JobOutcome::Cancelled,
            result = download => match result {
                Ok(Ok(())) => JobOutcome::Completed,
                Ok(Err(e)) => JobOutcome::Failed(e.to_string()),
                Err(_) => JobOutcome::Failed("downloader crashed unexpectedly".to_string()),
            },
        };

        let terminal = match &outcome {
            JobOutcome::Completed => ProgressEvent::completed(self.download_id.clone()),
            JobOutcome::Failed(message) => ProgressEvent::error(self.download_id.clone(), message.clone()),
            JobOutcome::Cancelled => ProgressEvent::error(self.download_id.clone(), "download cancelled"),
        };
        // Counted before delivery so a client that saw the event sees it in /status.
        let elapsed = started.elapsed();
        self.counters.job_finished(&outcome);
        metrics::record_job_finished(&outcome, elapsed);

        if self.sink.deliver(terminal.into()).await.is_err() {
            tracing::debug!(download_id = %self.download_id, "terminal event dropped: connection closed");
        }

        match &outcome {
            JobOutcome::Completed => {
                tracing::info!(duration_secs = elapsed.as_secs_f64(), "job completed")
            }
            JobOutcome::Failed(message) => {
                tracing::warn!(duration_secs = elapsed.as_secs_f64(), error = %message, "job failed")
            }
            JobOutcome::Cancelled => {
                tracing::info!(duration_secs = elapsed.as_secs_f64(), "job cancelled")
            }
        }
        outcome
    }
}
