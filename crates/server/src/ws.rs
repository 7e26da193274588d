// crates/server/src/ws.rs
//! `GET /ws`: the streaming channel that starts jobs and carries their events.
//!
//! Each socket gets a [`ChannelSession`] fed by the read loop and a single
//! writer task draining a bounded queue, so concurrent jobs never interleave
//! partial frames and a slow client pushes back on its own jobs only.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use toon_dl_server_jobs::{ChannelSession, SharedSink};
use toon_dl_types::ServerMessage;
use tracing::{debug, info, warn};

use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let _guard = state.connection_opened();
    let conn_id = uuid::Uuid::new_v4().simple().to_string();

    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.outbound_buffer);
    let outbound: SharedSink = Arc::new(tx);

    let writer_conn_id = conn_id.clone();
    let forward_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!(conn_id = %writer_conn_id, error = %e, "failed to encode outbound message");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                debug!(conn_id = %writer_conn_id, "socket write failed, stopping writer");
                break;
            }
        }
    });

    let mut session = ChannelSession::new(conn_id.clone(), state.jobs.clone(), outbound);
    info!(conn_id = %conn_id, "client connected");

    while let Some(frame) = stream.next().await {
        let handled = match frame {
            Ok(Message::Text(text)) => session.handle_text(text.as_str()).await,
            Ok(Message::Binary(bytes)) => session.handle_bytes(&bytes).await,
            Ok(Message::Close(_)) => break,
            // Pong is handled automatically by axum
            Ok(Message::Ping(_) | Message::Pong(_)) => Ok(()),
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "socket read failed");
                break;
            }
        };
        if handled.is_err() {
            debug!(conn_id = %conn_id, "outbound channel closed");
            break;
        }
    }

    let running = session.running_jobs();
    drop(session);
    forward_task.abort();
    info!(conn_id = %conn_id, running_jobs = running, "client disconnected");
}
