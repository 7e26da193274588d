// crates/server-jobs/src/sink.rs
//! Outbound side of a connection, as seen by job tasks.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use toon_dl_types::ServerMessage;

/// The connection is gone; the message was not delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("outbound channel closed")]
pub struct SinkClosed;

/// Where a session's messages go.
///
/// Every job on a connection shares one sink. Implementations must accept
/// concurrent callers and keep each caller's messages in call order.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, message: ServerMessage) -> Result<(), SinkClosed>;
}

/// Shared handle to a session's sink.
pub type SharedSink = Arc<dyn EventSink>;

/// Bounded queue drained by a single writer task. `deliver` waits while the
/// queue is full.
#[async_trait]
impl EventSink for mpsc::Sender<ServerMessage> {
    async fn deliver(&self, message: ServerMessage) -> Result<(), SinkClosed> {
        self.send(message).await.map_err(|_| SinkClosed)
    }
}

#[async_trait]
impl EventSink for mpsc::UnboundedSender<ServerMessage> {
    async fn deliver(&self, message: ServerMessage) -> Result<(), SinkClosed> {
        self.send(message).map_err(|_| SinkClosed)
    }
}
