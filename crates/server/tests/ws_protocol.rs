//! End-to-end protocol tests: a real listener, HTTP submission, and a
//! WebSocket client driving jobs through a scripted downloader.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use toon_dl_core::Downloader;
use toon_dl_server::{create_app, AppState};
use toon_dl_server_jobs::testing::ScriptedDownloader;
use toon_dl_server_jobs::JobContext;
use tower::ServiceExt;

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve the app on an ephemeral port.
async fn spawn_server(downloader: Arc<dyn Downloader>) -> (SocketAddr, Arc<AppState>) {
    let state = AppState::new(JobContext::new(downloader));
    let app = create_app(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

/// POST /download through the router and return the new id.
async fn submit(state: &Arc<AppState>, body: Value) -> String {
    let response = create_app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/download")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    json["download_id"].as_str().unwrap().to_string()
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    client
}

async fn send_text(client: &mut Client, text: &str) {
    client.send(Message::Text(text.into())).await.unwrap();
}

async fn start(client: &mut Client, id: &str) {
    let msg = json!({"action": "start_download", "download_id": id});
    send_text(client, &msg.to_string()).await;
}

/// Next JSON text frame from the server.
async fn recv_json(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for server message")
            .expect("connection closed")
            .expect("socket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

/// Read until `id`'s terminal event; return that job's messages in order.
async fn job_events(client: &mut Client, id: &str) -> Vec<Value> {
    let mut events = Vec::new();
    loop {
        let msg = recv_json(client).await;
        if msg["download_id"] != id {
            continue;
        }
        let terminal = msg["status"] == "completed" || msg["status"] == "error";
        events.push(msg);
        if terminal {
            return events;
        }
    }
}

#[tokio::test]
async fn happy_path_then_second_start_is_rejected() {
    let (addr, state) = spawn_server(Arc::new(ScriptedDownloader::new(3))).await;
    let id = submit(&state, json!({"url": "X", "start_chapter": 1, "end_chapter": 3})).await;
    let mut client = connect(addr).await;

    start(&mut client, &id).await;
    let events = job_events(&mut client, &id).await;
    assert_eq!(
        events,
        vec![
            json!({"download_id": id, "status": "progress", "chapter": 1, "total_chapters": 3}),
            json!({"download_id": id, "status": "progress", "chapter": 2, "total_chapters": 3}),
            json!({"download_id": id, "status": "progress", "chapter": 3, "total_chapters": 3}),
            json!({"download_id": id, "status": "completed"}),
        ]
    );

    start(&mut client, &id).await;
    let notice = recv_json(&mut client).await;
    assert_eq!(notice["download_id"], id.as_str());
    assert!(notice.get("status").is_none());
    assert!(notice["error"].as_str().unwrap().contains("Invalid download_id"));

    // Still open.
    send_text(&mut client, "ping?").await;
    assert!(recv_json(&mut client).await.get("error").is_some());
    assert_eq!(state.jobs.registry.pending_count(), 0);
}

#[tokio::test]
async fn unknown_id_gets_error_without_progress() {
    let (addr, _state) = spawn_server(Arc::new(ScriptedDownloader::new(3))).await;
    let mut client = connect(addr).await;

    start(&mut client, "never-submitted").await;
    let notice = recv_json(&mut client).await;
    assert_eq!(notice["download_id"], "never-submitted");
    assert!(notice.get("status").is_none());
    assert!(notice["error"].is_string());

    // The next message is the answer to this one, so nothing else was queued.
    send_text(&mut client, "{}").await;
    let next = recv_json(&mut client).await;
    assert!(next.get("download_id").is_none());
    assert!(next["error"].is_string());
}

#[tokio::test]
async fn malformed_payload_keeps_connection_open() {
    let (addr, state) = spawn_server(Arc::new(ScriptedDownloader::new(1))).await;
    let mut client = connect(addr).await;

    for bad in [
        "not json",
        r#"{"action":"start_download"}"#,
        r#"{"action":"pause_download","download_id":"x"}"#,
        r#"[1,2,3]"#,
    ] {
        send_text(&mut client, bad).await;
        let notice = recv_json(&mut client).await;
        assert!(notice.get("download_id").is_none(), "{bad}: {notice}");
        assert!(notice["error"].is_string(), "{bad}: {notice}");
    }

    client
        .send(Message::Binary(vec![0xff, 0xfe, 0x00].into()))
        .await
        .unwrap();
    let notice = recv_json(&mut client).await;
    assert!(notice.get("download_id").is_none());
    assert!(notice["error"].is_string());

    let id = submit(&state, json!({"url": "X"})).await;
    start(&mut client, &id).await;
    let events = job_events(&mut client, &id).await;
    assert_eq!(events.last().unwrap()["status"], "completed");
}

#[tokio::test]
async fn binary_frame_with_json_starts_job() {
    let (addr, state) = spawn_server(Arc::new(ScriptedDownloader::new(1))).await;
    let id = submit(&state, json!({"url": "X"})).await;
    let mut client = connect(addr).await;

    let msg = json!({"action": "start_download", "download_id": id}).to_string();
    client
        .send(Message::Binary(msg.into_bytes().into()))
        .await
        .unwrap();
    let events = job_events(&mut client, &id).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1]["status"], "completed");
}

#[tokio::test]
async fn concurrent_jobs_stream_in_order() {
    let downloader = ScriptedDownloader::new(5)
        .with_delay(Duration::from_millis(5))
        .fail_urls_containing("broken");
    let (addr, state) = spawn_server(Arc::new(downloader)).await;
    let good = submit(&state, json!({"url": "https://example.test/good"})).await;
    let bad = submit(&state, json!({"url": "https://example.test/broken"})).await;
    let mut client = connect(addr).await;

    start(&mut client, &good).await;
    start(&mut client, &bad).await;

    let mut per_job: std::collections::HashMap<String, Vec<Value>> = Default::default();
    let mut finished = 0;
    while finished < 2 {
        let msg = recv_json(&mut client).await;
        let id = msg["download_id"].as_str().unwrap().to_string();
        if msg["status"] == "completed" || msg["status"] == "error" {
            finished += 1;
        }
        per_job.entry(id).or_default().push(msg);
    }

    for (id, expected_terminal) in [(&good, "completed"), (&bad, "error")] {
        let events = &per_job[id.as_str()];
        assert_eq!(events.len(), 6, "{id}: {events:?}");
        for (i, event) in events[..5].iter().enumerate() {
            assert_eq!(event["status"], "progress");
            assert_eq!(event["chapter"], i + 1);
        }
        assert_eq!(events[5]["status"], expected_terminal);
    }
    assert!(per_job[bad.as_str()][5]["error"]
        .as_str()
        .unwrap()
        .contains("broken"));

    let snapshot = state.jobs.counters.snapshot();
    assert_eq!(snapshot.completed, 1);
    assert_eq!(snapshot.failed, 1);
}

#[tokio::test]
async fn job_started_on_one_connection_cannot_start_on_another() {
    let (addr, state) = spawn_server(Arc::new(ScriptedDownloader::new(2))).await;
    let id = submit(&state, json!({"url": "X"})).await;
    let mut first = connect(addr).await;
    let mut second = connect(addr).await;

    start(&mut first, &id).await;
    let events = job_events(&mut first, &id).await;
    assert_eq!(events.last().unwrap()["status"], "completed");

    start(&mut second, &id).await;
    let notice = recv_json(&mut second).await;
    assert_eq!(notice["download_id"], id.as_str());
    assert!(notice.get("status").is_none());
}
