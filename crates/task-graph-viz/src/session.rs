//! The dashboard session: one owned context holding the last rendered
//! snapshot, the scene, the simulation and the view state.
//!
//! Each piece of node state has a single writer. The simulation owns
//! positions, drag intents own pins, the view state owns visibility and
//! selection. The session is the only place these are wired together.

use std::collections::HashMap;

use task_graph_client::ClientResult;
use task_graph_core::{detect_change, ProgressSummary, TaskId, TaskSnapshot};
use task_graph_layout::{LayoutError, Position, Simulation, Stabilizer, Viewport};
use tracing::{debug, info, warn};

use crate::details::TaskDetails;
use crate::error::SessionError;
use crate::minimap;
use crate::render::StyleFrame;
use crate::renderer::{Frame, Notification, Placeholder, RenderIntent, Renderer};
use crate::scene::Scene;
use crate::selection::SelectionChange;
use crate::settings::{FetchOrdering, SessionConfig};
use crate::view::{Transform, ViewState};

/// Issued when a fetch starts; handed back with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket {
    seq: u64,
}

impl FetchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What applying a fetch result did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The snapshot was accepted. `changed` is false when the differ found
    /// nothing to reconcile.
    Applied { changed: bool, analysis_changed: bool },
    /// An older response arrived after a newer one was applied.
    Stale,
    /// The fetch failed; the user was notified.
    Failed,
}

pub struct DashboardSession<R> {
    config: SessionConfig,
    renderer: R,
    available: bool,
    snapshot: Option<TaskSnapshot>,
    scene: Scene,
    simulation: Simulation,
    stabilizer: Stabilizer,
    view: ViewState,
    analysis: Option<String>,
    progress: ProgressSummary,
    issued: u64,
    applied: u64,
}

impl<R: Renderer> DashboardSession<R> {
    pub fn new(config: SessionConfig, mut renderer: R) -> Self {
        let available = renderer.is_available();
        if !available {
            warn!("Renderer unavailable, showing placeholder");
            renderer.placeholder(Placeholder::RendererUnavailable);
        }
        Self {
            simulation: Simulation::new(config.forces.clone(), config.viewport),
            stabilizer: Stabilizer::new(config.stabilizer.clone(), config.forces.clone()),
            config,
            renderer,
            available,
            snapshot: None,
            scene: Scene::new(),
            view: ViewState::default(),
            analysis: None,
            progress: ProgressSummary::default(),
            issued: 0,
            applied: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// The last rendered snapshot.
    pub fn snapshot(&self) -> Option<&TaskSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn analysis(&self) -> Option<&str> {
        self.analysis.as_deref()
    }

    pub fn progress(&self) -> ProgressSummary {
        self.progress
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.simulation.position(id)
    }

    /// Number the next fetch.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket { seq: self.issued }
    }

    /// Apply the result of the fetch identified by `ticket`.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, result: ClientResult<TaskSnapshot>) -> FetchOutcome {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let message = e.to_string();
                let notification = if self.snapshot.is_some() {
                    warn!(seq = ticket.seq, error = %e, "Snapshot fetch failed, keeping current view");
                    Notification::Transient {
                        message,
                        ttl: self.config.notification_ttl,
                    }
                } else {
                    warn!(seq = ticket.seq, error = %e, "Initial snapshot fetch failed");
                    Notification::Inline { message }
                };
                self.renderer.notify(&notification);
                return FetchOutcome::Failed;
            }
        };

        if self.config.ordering == FetchOrdering::LatestIssued && ticket.seq < self.applied {
            info!(
                seq = ticket.seq,
                applied = self.applied,
                "Discarding response older than the one shown"
            );
            return FetchOutcome::Stale;
        }
        self.applied = self.applied.max(ticket.seq);
        self.apply_snapshot(snapshot)
    }

    /// Render `next` against the last rendered snapshot.
    pub fn apply_snapshot(&mut self, next: TaskSnapshot) -> FetchOutcome {
        // Progress and analysis follow every response, changed or not.
        self.progress = next.progress();
        self.renderer.show_progress(&self.progress);

        let analysis = next.analysis_result().map(str::to_owned);
        let analysis_changed = analysis != self.analysis;
        if analysis_changed {
            debug!(present = analysis.is_some(), "Analysis result changed");
            self.analysis = analysis;
            self.renderer.show_analysis(self.analysis.as_deref());
        }

        let changed = match &self.snapshot {
            Some(current) => detect_change(current, &next).is_some(),
            None => true,
        };
        if !changed {
            debug!(tasks = next.len(), "Snapshot unchanged, skipping reconcile");
            return FetchOutcome::Applied {
                changed,
                analysis_changed,
            };
        }

        // Without a renderer the placeholder stays; snapshots are only kept.
        if !self.available {
            self.snapshot = Some(next);
            return FetchOutcome::Applied {
                changed,
                analysis_changed,
            };
        }

        if next.is_empty() {
            self.show_empty();
            self.snapshot = Some(next);
            return FetchOutcome::Applied {
                changed,
                analysis_changed,
            };
        }

        if let Some(gone) = self.view.selection.retain_in(&next) {
            info!(task_id = %gone, "Selected task disappeared, clearing selection");
        }
        if self.view.highlight.as_ref().is_some_and(|id| !next.contains(id.as_str())) {
            self.view.highlight = None;
        }

        self.reconcile(&next);
        self.snapshot = Some(next);
        self.refresh_view();
        FetchOutcome::Applied {
            changed,
            analysis_changed,
        }
    }

    fn reconcile(&mut self, next: &TaskSnapshot) {
        let graph = next.to_graph();
        let placed = match self.stabilizer.stabilize(&graph, &self.simulation) {
            Ok(placed) => placed,
            Err(e) => {
                warn!(error = %e, "Stabilization failed, placing new nodes on the default spiral");
                HashMap::new()
            }
        };

        // Kept nodes continue from where they are; no restart. New nodes
        // enter the scene wherever the simulation put them.
        self.simulation.set_topology(&graph, &placed);
        let simulation = &self.simulation;
        let diff = self.scene.reconcile(&graph, |id| simulation.position(id));

        if !diff.is_empty() {
            self.renderer.apply_diff(&diff);
        }
        self.renderer.apply_frame(&self.frame());
    }

    fn show_empty(&mut self) {
        info!("Snapshot is empty, tearing down graph");
        self.clear_graph();
        self.view.selection.clear();
        self.view.highlight = None;
        self.renderer.show_details(None);
        self.renderer.show_list(&[]);
        self.renderer.show_minimap(None);
        self.renderer.placeholder(Placeholder::Empty);
    }

    /// Drop every element and start the next render from scratch.
    fn clear_graph(&mut self) {
        let diff = self.scene.clear();
        if !diff.is_empty() {
            self.renderer.apply_diff(&diff);
        }
        self.simulation = Simulation::new(self.config.forces.clone(), self.config.viewport);
        self.view.transform = Transform::IDENTITY;
    }

    /// Current positions of every node.
    pub fn frame(&self) -> Frame {
        Frame {
            positions: self.simulation.positions().map(|(id, p)| (id.clone(), p)).collect(),
        }
    }

    /// Styles for the current view state.
    pub fn styles(&self) -> StyleFrame {
        match &self.snapshot {
            Some(snapshot) => StyleFrame::build(&self.scene, &self.view, &self.view.visible_ids(snapshot)),
            None => StyleFrame::default(),
        }
    }

    /// Details of the selected task.
    pub fn details(&self) -> Option<TaskDetails> {
        let snapshot = self.snapshot.as_ref()?;
        let task = snapshot.get(self.view.selection.selected()?.as_str())?;
        Some(TaskDetails::build(task, snapshot))
    }

    fn refresh_view(&mut self) {
        let styles = self.styles();
        self.renderer.apply_styles(&styles);
        if let Some(snapshot) = &self.snapshot {
            self.renderer.show_list(&self.view.list(snapshot));
        }
        let details = self.details();
        self.renderer.show_details(details.as_ref());
        self.refresh_minimap();
    }

    fn refresh_minimap(&mut self) {
        let map = minimap::project(
            self.simulation.positions(),
            self.scene.edges(),
            self.view.transform,
            self.config.viewport,
        );
        self.renderer.show_minimap(map.as_ref());
    }

    /// Advance the simulation by one timer tick. Returns whether it moved.
    pub fn tick(&mut self) -> bool {
        if !self.available || !self.simulation.step() {
            return false;
        }
        if let Err(e) = self.simulation.check_finite() {
            warn!(error = %e, "Layout diverged, resetting positions");
            self.simulation.reset();
        }
        self.renderer.apply_frame(&self.frame());
        self.refresh_minimap();
        true
    }

    /// Reduce one renderer intent into session state.
    pub fn handle_intent(&mut self, intent: RenderIntent) -> Result<(), SessionError> {
        if !self.available {
            return Err(SessionError::RendererUnavailable);
        }
        debug!(?intent, "Handling intent");
        match intent {
            RenderIntent::Select(id) => {
                if self.config.interaction.node_clicking_enabled {
                    self.select(id)?;
                }
            }
            RenderIntent::Highlight(id) => {
                let at = self.require(&id)?;
                self.view.highlight = Some(id);
                self.center_on(at);
                let styles = self.styles();
                self.renderer.apply_styles(&styles);
            }
            RenderIntent::DragStart(id) => {
                if self.config.interaction.dragging_enabled {
                    self.simulation.drag_start(id.as_str())?;
                }
            }
            RenderIntent::Drag { id, dx, dy } => {
                if self.config.interaction.dragging_enabled {
                    self.simulation.drag_by(id.as_str(), dx, dy)?;
                    self.renderer.apply_frame(&self.frame());
                }
            }
            RenderIntent::DragEnd(id) => {
                if self.config.interaction.dragging_enabled {
                    self.simulation.drag_end(id.as_str())?;
                }
            }
            RenderIntent::Unpin(id) => {
                if self.simulation.unpin(id.as_str())? {
                    self.simulation.restart();
                }
            }
            RenderIntent::Zoom(transform) => {
                self.view.transform = transform.clamped();
                self.refresh_minimap();
            }
            RenderIntent::Resize { width, height } => {
                if width <= 0.0 || height <= 0.0 {
                    return Err(LayoutError::InvalidGraph(format!("viewport {width}x{height}")).into());
                }
                self.config.viewport = Viewport::new(width, height);
                self.simulation.set_viewport(self.config.viewport);
                self.refresh_minimap();
            }
            RenderIntent::ResetView => {
                self.view.transform = Transform::IDENTITY;
                self.renderer.recenter(Transform::IDENTITY);
                self.simulation.reset();
                self.renderer.apply_frame(&self.frame());
                self.refresh_minimap();
            }
            RenderIntent::SetFilter(filter) => {
                self.view.filter = filter;
                self.refresh_view();
            }
            RenderIntent::SetSearch(term) => {
                self.view.search = term;
                self.refresh_view();
            }
            RenderIntent::SetSort(sort) => {
                self.view.sort = sort;
                if let Some(snapshot) = &self.snapshot {
                    self.renderer.show_list(&self.view.list(snapshot));
                }
            }
        }
        Ok(())
    }

    fn require(&self, id: &TaskId) -> Result<Position, SessionError> {
        self.simulation
            .position(id.as_str())
            .ok_or_else(|| LayoutError::UnknownNode(id.to_string()).into())
    }

    fn select(&mut self, id: TaskId) -> Result<(), SessionError> {
        let at = self.require(&id)?;
        self.view.highlight = None;
        match self.view.selection.toggle(id) {
            SelectionChange::Selected(id) | SelectionChange::Switched { to: id, .. } => {
                debug!(task_id = %id, "Selected task");
                self.center_on(at);
            }
            SelectionChange::Cleared(id) => {
                debug!(task_id = %id, "Cleared selection");
            }
        }
        let styles = self.styles();
        self.renderer.apply_styles(&styles);
        let details = self.details();
        self.renderer.show_details(details.as_ref());
        Ok(())
    }

    fn center_on(&mut self, at: Position) {
        if !self.config.interaction.center_on_select {
            return;
        }
        self.view.transform = self.view.transform.centered_on(at, self.config.viewport);
        self.renderer.recenter(self.view.transform);
        self.refresh_minimap();
    }

    /// Release everything the session holds. The session can be reused and
    /// renders the next snapshot as a first load.
    pub fn teardown(&mut self) {
        self.clear_graph();
        self.snapshot = None;
        self.view = ViewState::default();
        self.analysis = None;
        self.progress = ProgressSummary::default();
        debug!("Session torn down");
    }
}
