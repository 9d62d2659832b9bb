//! Integration tests against an in-process task server.
//!
//! Run with: `cargo test --package task-graph-client --test http_integration`

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::get,
    Json, Router,
};
use futures_util::{stream, Stream, StreamExt};
use serde_json::{json, Value};
use task_graph_client::{
    ChannelConfig, ChannelEvent, ClientError, HttpEventTransport, HttpSnapshotSource, LiveChannel, SnapshotSource,
};
use task_graph_core::TaskStatus;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

async fn tasks() -> Json<Value> {
    Json(json!({
        "tasks": [
            {"id": "1", "name": "design", "status": "completed"},
            {"id": "2", "name": "build", "status": "pending", "dependencies": [{"taskId": "1"}]}
        ]
    }))
}

async fn stream_updates() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = stream::iter(vec![
        Ok::<_, Infallible>(Event::default().data("connected")),
        Ok(Event::default().event("update").data(r#"{"reason":"task_updated"}"#)),
    ])
    .chain(stream::pending());
    Sse::new(events)
}

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn task_server() -> Router {
    Router::new()
        .route("/api/tasks", get(tasks))
        .route("/api/tasks/stream", get(stream_updates))
}

#[tokio::test]
async fn test_fetch_snapshot() {
    let base = spawn_server(task_server()).await;
    let source = HttpSnapshotSource::new(&base);

    let snapshot = source.fetch().await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.tasks[0].status, TaskStatus::Completed);
    let graph = snapshot.to_graph();
    assert_eq!(graph.edges.len(), 1);
    assert_eq!(graph.edges[0].to_string(), "1-2");
}

#[tokio::test]
async fn test_fetch_http_error() {
    let app = Router::new().route("/api/tasks", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
    let base = spawn_server(app).await;

    let err = HttpSnapshotSource::new(&base).fetch().await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 500, .. }));
    assert!(err.to_string().contains("Status: 500"));
}

#[tokio::test]
async fn test_fetch_bad_payload() {
    let app = Router::new().route("/api/tasks", get(|| async { "not json" }));
    let base = spawn_server(app).await;

    let err = HttpSnapshotSource::new(&base).fetch().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn test_live_channel_receives_update() {
    let base = spawn_server(task_server()).await;
    let channel = LiveChannel::new(HttpEventTransport::new(&base), ChannelConfig::default());
    let (tx, mut events) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(channel.run(tx, cancel.clone()));

    assert_eq!(events.recv().await, Some(ChannelEvent::Opened));
    // The unnamed "connected" message is ignored.
    assert_eq!(
        events.recv().await,
        Some(ChannelEvent::Update {
            data: r#"{"reason":"task_updated"}"#.into()
        })
    );

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_live_channel_missing_endpoint_reports_error() {
    let app = Router::new().route("/api/tasks", get(tasks));
    let base = spawn_server(app).await;
    let channel = LiveChannel::new(HttpEventTransport::new(&base), ChannelConfig::default());
    let (tx, mut events) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(channel.run(tx, cancel.clone()));

    match events.recv().await {
        Some(ChannelEvent::Error { message }) => assert!(message.contains("404")),
        other => panic!("expected error, got {other:?}"),
    }

    cancel.cancel();
    handle.await.unwrap();
}
