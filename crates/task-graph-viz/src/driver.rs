//! The event loop that owns a [`DashboardSession`].
//!
//! Everything that touches the session runs on this one loop: channel
//! signals, fetch completions, renderer intents and simulation ticks.
//! Only the network work itself is spawned.

use std::sync::Arc;
use std::time::Duration;

use task_graph_client::{ChannelConfig, ChannelEvent, ClientResult, EventTransport, LiveChannel, SnapshotSource};
use task_graph_core::TaskSnapshot;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::renderer::{RenderIntent, Renderer};
use crate::session::{DashboardSession, FetchOutcome, FetchTicket};

type FetchResult = (FetchTicket, ClientResult<TaskSnapshot>);

#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Interval of the simulation timer.
    pub tick_interval: Duration,
    pub channel: ChannelConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(16),
            channel: ChannelConfig::default(),
        }
    }
}

pub struct Dashboard<R> {
    session: DashboardSession<R>,
    config: DriverConfig,
}

impl<R: Renderer> Dashboard<R> {
    pub fn new(session: DashboardSession<R>, config: DriverConfig) -> Self {
        Self { session, config }
    }

    /// Load the first snapshot, subscribe to updates and run until `cancel`
    /// fires. The session is torn down and handed back on exit.
    pub async fn run<S, T>(
        self,
        source: Arc<S>,
        transport: T,
        mut intents: mpsc::Receiver<RenderIntent>,
        cancel: CancellationToken,
    ) -> DashboardSession<R>
    where
        S: SnapshotSource + 'static,
        T: EventTransport + 'static,
    {
        let Self { mut session, config } = self;

        let (event_tx, mut events) = mpsc::channel(16);
        let channel_cancel = cancel.child_token();
        let channel = LiveChannel::new(transport, config.channel.clone());
        let channel_task = tokio::spawn(channel.run(event_tx, channel_cancel.clone()));

        let (fetch_tx, mut fetches) = mpsc::channel::<FetchResult>(8);
        spawn_fetch(&mut session, &source, &fetch_tx);

        let mut ticker = tokio::time::interval(config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(tick_ms = config.tick_interval.as_millis() as u64, "Dashboard running");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(event) = events.recv() => match event {
                    ChannelEvent::Opened => debug!("Update channel open"),
                    ChannelEvent::Update { .. } => spawn_fetch(&mut session, &source, &fetch_tx),
                    ChannelEvent::Error { message } => debug!(%message, "Update channel will reconnect"),
                },
                Some((ticket, result)) = fetches.recv() => {
                    match session.apply_fetch(ticket, result) {
                        FetchOutcome::Applied { changed, .. } => debug!(seq = ticket.seq(), changed, "Applied snapshot"),
                        FetchOutcome::Stale => debug!(seq = ticket.seq(), "Dropped stale snapshot"),
                        FetchOutcome::Failed => {}
                    }
                }
                Some(intent) = intents.recv() => {
                    if let Err(e) = session.handle_intent(intent) {
                        warn!(error = %e, "Ignoring intent");
                    }
                }
                _ = ticker.tick() => {
                    session.tick();
                }
            }
        }

        channel_cancel.cancel();
        // Closing the receivers releases any sender still waiting on a full
        // buffer.
        drop(events);
        drop(fetches);
        if let Err(e) = channel_task.await {
            error!(error = %e, "Update channel task failed");
        }
        session.teardown();
        info!("Dashboard stopped");
        session
    }
}

fn spawn_fetch<R, S>(session: &mut DashboardSession<R>, source: &Arc<S>, results: &mpsc::Sender<FetchResult>)
where
    R: Renderer,
    S: SnapshotSource + 'static,
{
    let ticket = session.begin_fetch();
    let source = Arc::clone(source);
    let results = results.clone();
    tokio::spawn(async move {
        let result = source.fetch().await;
        // The loop is gone once the dashboard stops; the result is moot.
        let _ = results.send((ticket, result)).await;
    });
}
