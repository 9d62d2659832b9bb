//! Network side of the task graph dashboard.
//!
//! - [`SnapshotSource`] pulls the full task list (`GET /api/tasks`).
//! - [`LiveChannel`] holds the server-sent event subscription
//!   (`GET /api/tasks/stream`) and reports "check again" signals.
//!
//! Neither carries any diffing or layout logic; the dashboard session
//! decides what to do with a fetched snapshot.

mod channel;
mod error;
mod source;
mod sse;

pub use channel::{
    ChannelConfig, ChannelEvent, ChannelState, EventStream, EventTransport, HttpEventTransport, LiveChannel,
    UPDATE_EVENT,
};
pub use error::{ClientError, ClientResult};
pub use source::{stream_url, tasks_url, HttpSnapshotSource, SnapshotSource, STREAM_PATH, TASKS_PATH};
pub use sse::{SseEvent, SseParser};
