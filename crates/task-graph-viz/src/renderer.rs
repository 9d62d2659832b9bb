//! The boundary to whatever draws the dashboard.
//!
//! The session pushes diffs, frames and styles into a [`Renderer`]; the
//! renderer reports user input back as [`RenderIntent`]s. The session
//! never reads state back out of the renderer.

use std::time::Duration;

use task_graph_core::{ProgressSummary, Task, TaskId};
use task_graph_layout::Position;

use crate::details::TaskDetails;
use crate::minimap::Minimap;
use crate::render::StyleFrame;
use crate::scene::SceneDiff;
use crate::view::{SortOption, StatusFilter, Transform};

/// User input, as reported by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderIntent {
    /// A node was clicked. Clicking the selected node again deselects it.
    Select(TaskId),
    /// A dependency tag in the details panel was clicked.
    Highlight(TaskId),
    DragStart(TaskId),
    /// Drag moved by `(dx, dy)` in graph coordinates.
    Drag { id: TaskId, dx: f32, dy: f32 },
    DragEnd(TaskId),
    Unpin(TaskId),
    Zoom(Transform),
    Resize { width: f32, height: f32 },
    ResetView,
    SetFilter(StatusFilter),
    SetSearch(String),
    SetSort(SortOption),
}

/// Something the user should be told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Dismisses itself after `ttl`.
    Transient { message: String, ttl: Duration },
    /// Stays in place of the content until the next successful load.
    Inline { message: String },
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Notification::Transient { message, .. } | Notification::Inline { message } => message,
        }
    }
}

/// Persistent state shown instead of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// The renderer cannot draw at all.
    RendererUnavailable,
    /// The snapshot holds no tasks.
    Empty,
}

/// Node positions after a tick or a drag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub positions: Vec<(TaskId, Position)>,
}

impl Frame {
    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.iter().find(|(n, _)| n.as_str() == id).map(|(_, p)| *p)
    }
}

/// Drawing surface driven by a [`crate::DashboardSession`].
///
/// Only the graph calls are required. The panel calls default to no-ops
/// so a graph-only renderer can ignore them.
pub trait Renderer {
    /// Whether the surface can draw. Checked once, when the session starts.
    fn is_available(&self) -> bool {
        true
    }

    /// Create, update and destroy elements. Apply in [`SceneDiff::ops`] order.
    fn apply_diff(&mut self, diff: &SceneDiff);

    fn apply_frame(&mut self, frame: &Frame);

    fn apply_styles(&mut self, styles: &StyleFrame);

    /// Move the view to `transform`.
    fn recenter(&mut self, transform: Transform);

    fn notify(&mut self, notification: &Notification);

    fn placeholder(&mut self, placeholder: Placeholder);

    fn show_details(&mut self, _details: Option<&TaskDetails>) {}

    fn show_progress(&mut self, _progress: &ProgressSummary) {}

    fn show_analysis(&mut self, _analysis: Option<&str>) {}

    fn show_list(&mut self, _tasks: &[&Task]) {}

    fn show_minimap(&mut self, _minimap: Option<&Minimap>) {}
}
