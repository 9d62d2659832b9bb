//! Renderer-agnostic core of the live task graph dashboard.
//!
//! A [`DashboardSession`] owns the last rendered snapshot, the reconciled
//! [`Scene`], the force [`Simulation`](task_graph_layout::Simulation) and
//! the [`ViewState`]. New snapshots are diffed, reconciled into
//! enter/update/exit sets and pushed to a [`Renderer`]; the renderer
//! answers with [`RenderIntent`]s. [`Dashboard`] drives a session from
//! the live update channel on a single event loop.

mod details;
mod driver;
mod error;
pub mod minimap;
mod render;
mod renderer;
mod scene;
mod selection;
mod session;
mod settings;
mod view;

pub use details::{DependencyTag, FileTag, TaskDetails};
pub use driver::{Dashboard, DriverConfig};
pub use error::SessionError;
pub use minimap::Minimap;
pub use render::{
    resolve_edge_visuals, resolve_node_visuals, EdgeRenderContext, EdgeVisuals, NodeRenderContext, NodeVisuals,
    StyleFrame,
};
pub use renderer::{Frame, Notification, Placeholder, RenderIntent, Renderer};
pub use scene::{NodeEnter, Scene, SceneDiff, SceneNode, SceneOp};
pub use selection::{SelectionChange, SelectionState};
pub use session::{DashboardSession, FetchOutcome, FetchTicket};
pub use settings::{FetchOrdering, SessionConfig, SettingsInteraction};
pub use view::{SortOption, StatusFilter, Transform, ViewState, SCALE_EXTENT};
