// crates/server-jobs/src/testing.rs
//! Scripted downloaders and stream helpers for tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use toon_dl_core::{DownloadError, Downloader, ProgressReporter};
use toon_dl_types::{JobId, JobRequest, ProgressEvent, ProgressFields, ServerMessage};

/// How long helpers wait for a message before failing the test.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Emits `{"chapter": n, "total_chapters": N}` updates, then succeeds or fails.
#[derive(Clone)]
pub struct ScriptedDownloader {
    updates: usize,
    delay: Option<Duration>,
    failure: Option<String>,
    fail_url_containing: Option<String>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedDownloader {
    pub fn new(updates: usize) -> Self {
        Self {
            updates,
            delay: None,
            failure: None,
            fail_url_containing: None,
            gate: None,
        }
    }

    /// Sleep before each update.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every job with `message` after the updates.
    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Fail only jobs whose url contains `pattern`.
    pub fn fail_urls_containing(mut self, pattern: impl Into<String>) -> Self {
        self.fail_url_containing = Some(pattern.into());
        self
    }

    /// Wait for `gate` to be notified after the updates, before finishing.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl Downloader for ScriptedDownloader {
    async fn download(
        &self,
        request: &JobRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<(), DownloadError> {
        for chapter in 1..=self.updates {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            progress
                .report(progress_fields(serde_json::json!({
                    "chapter": chapter,
                    "total_chapters": self.updates,
                })))
                .await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(message) = &self.failure {
            return Err(DownloadError::Failed(message.clone()));
        }
        if let Some(pattern) = &self.fail_url_containing {
            if request.url.contains(pattern.as_str()) {
                return Err(DownloadError::Failed(format!("cannot fetch {}", request.url)));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Panics as soon as it is run.
pub struct PanickingDownloader;

#[async_trait]
impl Downloader for PanickingDownloader {
    async fn download(
        &self,
        _request: &JobRequest,
        _progress: &dyn ProgressReporter,
    ) -> Result<(), DownloadError> {
        panic!("scripted downloader panic");
    }

    fn name(&self) -> &str {
        "panicking"
    }
}

/// Build progress fields from a JSON object literal.
pub fn progress_fields(value: serde_json::Value) -> ProgressFields {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("progress fields must be an object, got {other}"),
    }
}

/// Receive the next message or panic after a timeout.
pub async fn recv_message(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> ServerMessage {
    tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for outbound message")
        .expect("outbound channel closed")
}

/// Read messages until `id`'s terminal event; return `id`'s events in order.
/// Messages for other jobs are skipped.
pub async fn collect_job_events(
    rx: &mut mpsc::UnboundedReceiver<ServerMessage>,
    id: &JobId,
) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    loop {
        if let ServerMessage::Event(event) = recv_message(rx).await {
            if &event.download_id == id {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    return events;
                }
            }
        }
    }
}
