//! Error types for the dashboard session.

use task_graph_client::ClientError;
use task_graph_layout::LayoutError;
use thiserror::Error;

/// Errors surfaced inside the session. None of them end the session; they
/// are turned into notifications, placeholders or log lines.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The renderer reported that it cannot draw.
    #[error("Renderer unavailable")]
    RendererUnavailable,

    /// Fetching a snapshot failed.
    #[error(transparent)]
    Fetch(#[from] ClientError),

    /// An intent referenced a node the layout does not know.
    #[error(transparent)]
    Layout(#[from] LayoutError),
}
