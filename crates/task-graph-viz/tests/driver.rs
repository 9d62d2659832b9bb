//! The dashboard event loop against scripted network collaborators.
//!
//! Run with: `cargo test --package task-graph-viz --test driver`

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{pair, Recorder};
use futures_util::{stream, StreamExt};
use task_graph_client::{ChannelConfig, ClientError, ClientResult, EventStream, EventTransport, SnapshotSource, SseEvent};
use task_graph_core::{TaskSnapshot, TaskStatus};
use task_graph_viz::{
    Dashboard, DashboardSession, DriverConfig, Frame, Notification, Placeholder, RenderIntent, Renderer, SceneDiff,
    SessionConfig, StyleFrame, Transform,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Serves its snapshots in order, repeating the last one.
struct Scripted {
    calls: AtomicUsize,
    responses: Vec<Option<TaskSnapshot>>,
}

impl Scripted {
    fn new(responses: Vec<Option<TaskSnapshot>>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            responses,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for Scripted {
    async fn fetch(&self) -> ClientResult<TaskSnapshot> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.responses[n.min(self.responses.len() - 1)] {
            Some(snapshot) => Ok(snapshot.clone()),
            None => Err(ClientError::Status {
                status: 503,
                url: "http://localhost:3000/api/tasks".into(),
            }),
        }
    }
}

/// Sends `updates` update signals on every connection, then stays open.
struct Signals {
    updates: usize,
    connects: Arc<AtomicUsize>,
}

#[async_trait]
impl EventTransport for Signals {
    async fn connect(&self) -> ClientResult<EventStream> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let events: Vec<ClientResult<SseEvent>> = (0..self.updates)
            .map(|_| Ok(SseEvent::new("update", r#"{"reason":"task_updated"}"#)))
            .collect();
        Ok(Box::pin(stream::iter(events).chain(stream::pending())))
    }
}

fn dashboard() -> Dashboard<Recorder> {
    Dashboard::new(
        DashboardSession::new(SessionConfig::default(), Recorder::default()),
        DriverConfig {
            tick_interval: Duration::from_millis(16),
            channel: ChannelConfig::default(),
        },
    )
}

async fn stop_after(cancel: CancellationToken, after: Duration) {
    tokio::time::sleep(after).await;
    cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_update_signal_triggers_refetch() {
    let source = Scripted::new(vec![Some(pair(TaskStatus::Pending)), Some(pair(TaskStatus::Completed))]);
    let connects = Arc::new(AtomicUsize::new(0));
    let transport = Signals {
        updates: 1,
        connects: Arc::clone(&connects),
    };
    let (_intents, intents_rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();

    let (session, ()) = tokio::join!(
        dashboard().run(Arc::clone(&source), transport, intents_rx, cancel.clone()),
        stop_after(cancel.clone(), Duration::from_secs(1)),
    );

    assert_eq!(source.calls(), 2);
    assert_eq!(connects.load(Ordering::SeqCst), 1);
    let recorder = session.renderer();
    assert_eq!(recorder.diffs[0].node_enter.len(), 2);
    assert!(recorder.frames > 1);
    // Teardown exits everything that was drawn.
    let last = recorder.diffs.last().unwrap();
    assert_eq!(last.node_exit.len(), 2);
    assert!(session.snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_intents_reach_session() {
    let source = Scripted::new(vec![Some(pair(TaskStatus::Pending))]);
    let transport = Signals {
        updates: 0,
        connects: Arc::new(AtomicUsize::new(0)),
    };
    let (intents, intents_rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();

    let driver = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        intents.send(RenderIntent::Select("2".into())).await.unwrap();
        // Unknown ids are logged and skipped; the loop keeps going.
        intents.send(RenderIntent::Select("ghost".into())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    };
    let (session, ()) = tokio::join!(
        dashboard().run(Arc::clone(&source), transport, intents_rx, cancel.clone()),
        driver,
    );

    let shown: Vec<_> = session.renderer().details.iter().flatten().map(|id| id.as_str()).collect();
    assert_eq!(shown, vec!["2"]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_first_fetch_is_inline() {
    let source = Scripted::new(vec![None, Some(pair(TaskStatus::Pending)), None]);
    let transport = Signals {
        updates: 2,
        connects: Arc::new(AtomicUsize::new(0)),
    };
    let (_intents, intents_rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();

    let (session, ()) = tokio::join!(
        dashboard().run(Arc::clone(&source), transport, intents_rx, cancel.clone()),
        stop_after(cancel.clone(), Duration::from_secs(1)),
    );

    assert_eq!(source.calls(), 3);
    let notes = &session.renderer().notifications;
    assert_eq!(notes.len(), 2);
    assert!(matches!(notes[0], Notification::Inline { .. }));
    assert!(matches!(notes[1], Notification::Transient { .. }));
}

/// Sends update signals without pause for as long as it is read.
struct Flood;

#[async_trait]
impl EventTransport for Flood {
    async fn connect(&self) -> ClientResult<EventStream> {
        Ok(Box::pin(stream::repeat_with(|| -> ClientResult<SseEvent> {
            Ok(SseEvent::new("update", "{}"))
        })))
    }
}

/// Takes a while to draw every frame.
struct Sluggish;

impl Renderer for Sluggish {
    fn apply_diff(&mut self, _diff: &SceneDiff) {}
    fn apply_frame(&mut self, _frame: &Frame) {
        std::thread::sleep(Duration::from_millis(30));
    }
    fn apply_styles(&mut self, _styles: &StyleFrame) {}
    fn recenter(&mut self, _transform: Transform) {}
    fn notify(&mut self, _notification: &Notification) {}
    fn placeholder(&mut self, _placeholder: Placeholder) {}
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_teardown_during_update_flood() {
    for _ in 0..3 {
        let source = Scripted::new(vec![Some(pair(TaskStatus::Pending))]);
        let dashboard = Dashboard::new(
            DashboardSession::new(SessionConfig::default(), Sluggish),
            DriverConfig::default(),
        );
        let (_intents, intents_rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let run = async {
            let (session, ()) = tokio::join!(
                dashboard.run(Arc::clone(&source), Flood, intents_rx, cancel.clone()),
                stop_after(cancel.clone(), Duration::from_millis(300)),
            );
            session
        };
        let session = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("dashboard did not stop after cancel");
        assert!(session.snapshot().is_none());
    }
}
