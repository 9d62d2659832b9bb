//! Pull side: fetching the full task snapshot.

use async_trait::async_trait;
use task_graph_core::TaskSnapshot;
use tracing::debug;

use crate::{ClientError, ClientResult};

/// Path of the snapshot endpoint.
pub const TASKS_PATH: &str = "/api/tasks";

/// Path of the server-sent event stream.
pub const STREAM_PATH: &str = "/api/tasks/stream";

pub fn tasks_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), TASKS_PATH)
}

pub fn stream_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), STREAM_PATH)
}

/// Anything that can produce the current task list.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> ClientResult<TaskSnapshot>;
}

/// Reads `{ "tasks": [...] }` from `GET {base}/api/tasks`.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotSource {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: tasks_url(base_url),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> ClientResult<TaskSnapshot> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let body = response.bytes().await?;
        let snapshot: TaskSnapshot = serde_json::from_slice(&body)?;
        debug!(url = %self.url, tasks = snapshot.len(), "fetched snapshot");
        Ok(snapshot)
    }
}
