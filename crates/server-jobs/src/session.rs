// crates/server-jobs/src/session.rs
//! Per-connection control loop state.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use toon_dl_types::{ClientMessage, DecodeError, JobId};

use crate::bridge::{ExecutionBridge, JobOutcome};
use crate::error::SessionError;
use crate::metrics;
use crate::sink::{SharedSink, SinkClosed};
use crate::JobContext;

/// One streaming connection.
///
/// Feed it inbound frames with [`handle_text`](Self::handle_text) /
/// [`handle_bytes`](Self::handle_bytes). Each `start_download` for a pending
/// job spawns an [`ExecutionBridge`] that writes to the shared sink; handling
/// returns immediately, so one connection can drive many jobs at once.
///
/// A rejected message is answered with an error notice and the session
/// carries on. `Err(SinkClosed)` means the connection itself is gone and the
/// caller should stop reading.
///
/// Dropping the session detaches running jobs. With `cancel_on_disconnect`
/// they are cancelled instead, each still attempting its terminal event.
pub struct ChannelSession {
    conn_id: String,
    ctx: JobContext,
    sink: SharedSink,
    cancel: CancellationToken,
    jobs: JoinSet<(JobId, JobOutcome)>,
    active: HashSet<JobId>,
}

impl ChannelSession {
    pub fn new(conn_id: impl Into<String>, ctx: JobContext, sink: SharedSink) -> Self {
        let conn_id = conn_id.into();
        metrics::record_connection_opened();
        tracing::debug!(conn_id = %conn_id, "session opened");
        Self {
            conn_id,
            ctx,
            sink,
            cancel: CancellationToken::new(),
            jobs: JoinSet::new(),
            active: HashSet::new(),
        }
    }

    /// Jobs started on this connection that have not finished yet, as of the
    /// last handled message, [`running_jobs`](Self::running_jobs) or
    /// [`wait_idle`](Self::wait_idle).
    pub fn active_jobs(&self) -> &HashSet<JobId> {
        &self.active
    }

    /// Retire finished jobs and return how many are still running.
    pub fn running_jobs(&mut self) -> usize {
        self.reap_finished();
        self.active.len()
    }

    /// Handle one text frame.
    pub async fn handle_text(&mut self, text: &str) -> Result<(), SinkClosed> {
        self.handle_decoded(ClientMessage::decode(text)).await
    }

    /// Handle one binary frame; it must hold UTF-8 JSON.
    pub async fn handle_bytes(&mut self, bytes: &[u8]) -> Result<(), SinkClosed> {
        self.handle_decoded(ClientMessage::decode_bytes(bytes)).await
    }

    /// Wait for every job started on this connection to finish.
    pub async fn wait_idle(&mut self) {
        while let Some(joined) = self.jobs.join_next().await {
            self.retire(joined);
        }
    }

    async fn handle_decoded(
        &mut self,
        decoded: Result<ClientMessage, DecodeError>,
    ) -> Result<(), SinkClosed> {
        self.reap_finished();
        let result = match decoded {
            Ok(message) => self.dispatch(message),
            Err(e) => Err(SessionError::from(e)),
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.reject(err).await,
        }
    }

    fn dispatch(&mut self, message: ClientMessage) -> Result<(), SessionError> {
        match message {
            ClientMessage::StartDownload { download_id } => self.start(download_id),
        }
    }

    fn start(&mut self, download_id: JobId) -> Result<(), SessionError> {
        let bridge = ExecutionBridge::claim(
            &self.ctx.registry,
            download_id.clone(),
            Arc::clone(&self.ctx.downloader),
            Arc::clone(&self.sink),
            self.cancel.child_token(),
            Arc::clone(&self.ctx.counters),
        )?;

        let span = tracing::info_span!("job", download_id = %download_id, conn_id = %self.conn_id);
        let id = download_id.clone();
        self.jobs
            .spawn(async move { (id, bridge.run().await) }.instrument(span));
        self.active.insert(download_id);
        Ok(())
    }

    async fn reject(&self, err: SessionError) -> Result<(), SinkClosed> {
        tracing::warn!(conn_id = %self.conn_id, error = %err, "rejected message");
        metrics::record_message_rejected(err.reason());
        self.sink.deliver(err.into_notice().into()).await
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.jobs.try_join_next() {
            self.retire(joined);
        }
    }

    fn retire(&mut self, joined: Result<(JobId, JobOutcome), tokio::task::JoinError>) {
        match joined {
            Ok((id, outcome)) => {
                tracing::debug!(conn_id = %self.conn_id, download_id = %id, outcome = outcome.label(), "job retired");
                self.active.remove(&id);
            }
            Err(e) => {
                tracing::error!(conn_id = %self.conn_id, error = %e, "job task ended abnormally");
            }
        }
    }
}

impl Drop for ChannelSession {
    fn drop(&mut self) {
        self.reap_finished();
        let in_flight = self.jobs.len();
        if self.ctx.cancel_on_disconnect {
            self.cancel.cancel();
        }
        // JoinSet aborts its tasks on drop; jobs must reach a terminal event.
        self.jobs.detach_all();
        metrics::record_connection_closed();
        tracing::info!(
            conn_id = %self.conn_id,
            in_flight,
            cancelled = self.ctx.cancel_on_disconnect && in_flight > 0,
            "session closed"
        );
    }
}
