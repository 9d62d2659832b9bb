//! Push side: the live update channel.
//!
//! The channel holds a server-sent event subscription open and turns named
//! `update` events into [`ChannelEvent::Update`]. Any failure closes the
//! connection, and a new attempt is made after a fixed delay, forever, until
//! the cancellation token fires.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::source::stream_url;
use crate::sse::{SseEvent, SseParser};
use crate::{ClientError, ClientResult};

/// Name of the only event the channel acts on.
pub const UPDATE_EVENT: &str = "update";

/// Stream of parsed events from one connection.
pub type EventStream = Pin<Box<dyn Stream<Item = ClientResult<SseEvent>> + Send>>;

/// Opens one event stream connection.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn connect(&self) -> ClientResult<EventStream>;
}

/// `GET {base}/api/tasks/stream` with `Accept: text/event-stream`.
#[derive(Debug, Clone)]
pub struct HttpEventTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpEventTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: stream_url(base_url),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventTransport for HttpEventTransport {
    async fn connect(&self) -> ClientResult<EventStream> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let events = response
            .bytes_stream()
            .scan(SseParser::default(), |parser, chunk| {
                let batch: Vec<ClientResult<SseEvent>> = match chunk {
                    Ok(bytes) => parser.feed(&bytes).into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(ClientError::from(e))],
                };
                futures_util::future::ready(Some(futures_util::stream::iter(batch)))
            })
            .flatten();
        Ok(Box::pin(events))
    }
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Fixed wait between a failure and the next connection attempt.
    pub reconnect_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Open,
}

/// What the channel reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The subscription is established.
    Opened,
    /// The server asked clients to check again. The payload is opaque.
    Update { data: String },
    /// The connection failed or dropped; a retry is scheduled.
    Error { message: String },
}

/// Long-lived subscription with unbounded fixed-delay reconnects.
pub struct LiveChannel<T> {
    transport: T,
    config: ChannelConfig,
    state: watch::Sender<ChannelState>,
}

impl<T: EventTransport> LiveChannel<T> {
    pub fn new(transport: T, config: ChannelConfig) -> Self {
        let (state, _) = watch::channel(ChannelState::Disconnected);
        Self {
            transport,
            config,
            state,
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    /// Observe state transitions from another task.
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ChannelState) {
        self.state.send_replace(state);
    }

    /// Run until `cancel` fires or `events` is dropped.
    pub async fn run(self, events: mpsc::Sender<ChannelEvent>, cancel: CancellationToken) {
        loop {
            self.set_state(ChannelState::Connecting);

            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.transport.connect() => result,
            };

            let failure = match connected {
                Ok(mut stream) => {
                    self.set_state(ChannelState::Open);
                    info!("Live update channel opened");
                    if !emit(&events, ChannelEvent::Opened, &cancel).await {
                        break;
                    }

                    loop {
                        tokio::select! {
                            _ = cancel.cancelled() => {
                                self.set_state(ChannelState::Disconnected);
                                return;
                            }

                            item = stream.next() => match item {
                                Some(Ok(event)) if event.event == UPDATE_EVENT => {
                                    debug!(data = %event.data, "update signal received");
                                    let update = ChannelEvent::Update { data: event.data };
                                    if !emit(&events, update, &cancel).await {
                                        self.set_state(ChannelState::Disconnected);
                                        return;
                                    }
                                }
                                Some(Ok(event)) => {
                                    debug!(event = %event.event, data = %event.data, "ignoring message");
                                }
                                Some(Err(e)) => break e.to_string(),
                                None => break ClientError::Stream("stream closed by server".into()).to_string(),
                            }
                        }
                    }
                }
                Err(e) => e.to_string(),
            };

            // Dropping the stream closes the connection.
            self.set_state(ChannelState::Disconnected);
            warn!(
                error = %failure,
                retry_in_ms = self.config.reconnect_delay.as_millis() as u64,
                "Live update channel failed"
            );
            if !emit(&events, ChannelEvent::Error { message: failure }, &cancel).await {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        self.set_state(ChannelState::Disconnected);
    }
}

/// Deliver `event` unless cancelled first. A full buffer must not hold up
/// teardown. Returns `false` when the channel should stop.
async fn emit(events: &mpsc::Sender<ChannelEvent>, event: ChannelEvent, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        sent = events.send(event) => sent.is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Hands out scripted connections and records when each attempt happened.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Vec<ClientResult<SseEvent>>>>,
        attempts: mpsc::UnboundedSender<Instant>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Vec<ClientResult<SseEvent>>>) -> (Self, mpsc::UnboundedReceiver<Instant>) {
            let (attempts, rx) = mpsc::unbounded_channel();
            let transport = Self {
                script: Mutex::new(script.into()),
                attempts,
            };
            (transport, rx)
        }
    }

    #[async_trait]
    impl EventTransport for ScriptedTransport {
        async fn connect(&self) -> ClientResult<EventStream> {
            let _ = self.attempts.send(Instant::now());
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(events) => Ok(Box::pin(futures_util::stream::iter(events))),
                None => Err(ClientError::Stream("connection refused".into())),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_once_after_fixed_delay() {
        let (transport, mut attempts) = ScriptedTransport::new(vec![]);
        let channel = LiveChannel::new(transport, ChannelConfig::default());
        let (tx, mut events) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(tx, cancel.clone()));

        let first = attempts.recv().await.unwrap();
        assert!(matches!(events.recv().await, Some(ChannelEvent::Error { .. })));

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(attempts.try_recv().is_err(), "retried before the delay elapsed");

        tokio::time::advance(Duration::from_millis(1)).await;
        let second = attempts.recv().await.unwrap();
        assert_eq!(second - first, Duration::from_secs(5));
        assert!(attempts.try_recv().is_err(), "more than one attempt");

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_then_error_then_reconnect() {
        let (transport, mut attempts) = ScriptedTransport::new(vec![vec![
            Ok(SseEvent::new("message", "hello")),
            Ok(SseEvent::new("update", "{}")),
            Err(ClientError::Stream("reset".into())),
        ]]);
        let channel = LiveChannel::new(transport, ChannelConfig::default());
        let state = channel.subscribe_state();
        let (tx, mut events) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(tx, cancel.clone()));

        assert_eq!(events.recv().await, Some(ChannelEvent::Opened));
        assert_eq!(events.recv().await, Some(ChannelEvent::Update { data: "{}".into() }));
        match events.recv().await {
            Some(ChannelEvent::Error { message }) => assert!(message.contains("reset")),
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(*state.borrow(), ChannelState::Disconnected);

        let first = attempts.recv().await.unwrap();
        let second = attempts.recv().await.unwrap();
        assert_eq!(second - first, Duration::from_secs(5));

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(*state.borrow(), ChannelState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_close_counts_as_error() {
        let (transport, _attempts) = ScriptedTransport::new(vec![vec![]]);
        let channel = LiveChannel::new(transport, ChannelConfig::default());
        let (tx, mut events) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(tx, cancel.clone()));

        assert_eq!(events.recv().await, Some(ChannelEvent::Opened));
        assert!(matches!(events.recv().await, Some(ChannelEvent::Error { .. })));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_stops_retrying() {
        let (transport, mut attempts) = ScriptedTransport::new(vec![]);
        let channel = LiveChannel::new(transport, ChannelConfig::default());
        let (tx, _events) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(tx, cancel.clone()));

        attempts.recv().await.unwrap();
        cancel.cancel();
        handle.await.unwrap();

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(attempts.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_with_full_buffer_stops_channel() {
        let flood = (0..64).map(|i| Ok(SseEvent::new("update", i.to_string()))).collect();
        let (transport, _attempts) = ScriptedTransport::new(vec![flood]);
        let channel = LiveChannel::new(transport, ChannelConfig::default());
        let mut state = channel.subscribe_state();
        // Nobody reads: `Opened` fills the buffer and the first update blocks.
        let (tx, _events) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(channel.run(tx, cancel.clone()));

        state.wait_for(|s| *s == ChannelState::Open).await.unwrap();
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("channel stuck on a full buffer")
            .unwrap();
        assert_eq!(*state.borrow(), ChannelState::Disconnected);
    }

    #[tokio::test]
    async fn test_dropped_receiver_stops_channel() {
        let (transport, _attempts) = ScriptedTransport::new(vec![]);
        let channel = LiveChannel::new(transport, ChannelConfig::default());
        let (tx, events) = mpsc::channel(16);
        drop(events);
        channel.run(tx, CancellationToken::new()).await;
    }
}
