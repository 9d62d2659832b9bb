//! The live force simulation.

use std::collections::HashMap;

use task_graph_core::{Degree, TaskGraph, TaskId};
use tracing::debug;

use crate::force::{self, ForceConfig, Jiggle, Role};
use crate::{LayoutError, LayoutResult, Position, Velocity, Viewport};

/// Alpha target held while a node is being dragged.
const DRAG_ALPHA_TARGET: f32 = 0.3;

/// Half-width of the square new positions are scattered in on reset.
const RESET_SCATTER: f32 = 25.0;

/// Spacing of the default sunflower placement.
const INITIAL_RADIUS: f32 = 10.0;

/// Per-node simulation state.
#[derive(Debug, Clone)]
pub(crate) struct Body {
    pub(crate) id: TaskId,
    pub(crate) position: Position,
    pub(crate) velocity: Velocity,
    pub(crate) pin: Option<Position>,
    pub(crate) role: Role,
    pub(crate) x_target: f32,
    pub(crate) y_strength: f32,
}

/// A resolved dependency link between two bodies.
#[derive(Debug, Clone)]
pub(crate) struct Link {
    pub(crate) source: usize,
    pub(crate) target: usize,
    pub(crate) strength: f32,
    pub(crate) bias: f32,
}

/// Lifecycle of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutState {
    /// No nodes have been placed yet.
    Uninitialized,
    /// Ticking; alpha is above its minimum or a drag holds it up.
    Running,
    /// Cooled down; ticks stop until restarted.
    Converged,
}

/// Force simulation over the nodes of a [`TaskGraph`].
///
/// Node positions and velocities change only inside [`Simulation::tick`]
/// (plus the wholesale [`Simulation::reset`]). Pins change only through
/// [`Simulation::pin`], [`Simulation::unpin`] and the drag methods.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: ForceConfig,
    viewport: Viewport,
    bodies: Vec<Body>,
    index: HashMap<TaskId, usize>,
    links: Vec<Link>,
    alpha: f32,
    alpha_target: f32,
    running: bool,
    jiggle: Jiggle,
    ticks: u64,
}

impl Simulation {
    pub fn new(config: ForceConfig, viewport: Viewport) -> Self {
        Self {
            config,
            viewport,
            bodies: Vec::new(),
            index: HashMap::new(),
            links: Vec::new(),
            alpha: 1.0,
            alpha_target: 0.0,
            running: true,
            jiggle: Jiggle::default(),
            ticks: 0,
        }
    }

    pub fn config(&self) -> &ForceConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn state(&self) -> LayoutState {
        if self.bodies.is_empty() {
            LayoutState::Uninitialized
        } else if self.running {
            LayoutState::Running
        } else {
            LayoutState::Converged
        }
    }

    pub fn is_running(&self) -> bool {
        self.running && !self.bodies.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.index.get(id).map(|&i| self.bodies[i].position)
    }

    pub fn pin_of(&self, id: &str) -> Option<Position> {
        self.index.get(id).and_then(|&i| self.bodies[i].pin)
    }

    pub fn role(&self, id: &str) -> Option<Role> {
        self.index.get(id).map(|&i| self.bodies[i].role)
    }

    /// Current positions in insertion order.
    pub fn positions(&self) -> impl Iterator<Item = (&TaskId, Position)> + '_ {
        self.bodies.iter().map(|b| (&b.id, b.position))
    }

    /// Replace the node and link sets.
    ///
    /// Nodes already present keep their position, velocity and pin. New
    /// nodes start at `seeds[id]` when given, otherwise on a sunflower
    /// spiral around the viewport center. Removed nodes are dropped along
    /// with their pins. Degree-based targets are recomputed for everyone.
    /// Alpha and the running flag are left alone; call
    /// [`Simulation::restart`] to resume ticking.
    pub fn set_topology(&mut self, graph: &TaskGraph, seeds: &HashMap<TaskId, Position>) {
        let degrees = graph.degrees();
        let center = self.viewport.center();
        let mut previous: HashMap<TaskId, Body> = self.bodies.drain(..).map(|b| (b.id.clone(), b)).collect();

        let mut bodies = Vec::with_capacity(graph.nodes.len());
        for (i, node) in graph.nodes.iter().enumerate() {
            let degree = degrees.get(&node.id).copied().unwrap_or_default();
            let role = Role::from_degree(degree);
            let mut body = previous.remove(&node.id).unwrap_or_else(|| Body {
                id: node.id.clone(),
                position: seeds
                    .get(&node.id)
                    .copied()
                    .unwrap_or_else(|| phyllotaxis(center, i)),
                velocity: Velocity::default(),
                pin: None,
                role,
                x_target: 0.0,
                y_strength: 0.0,
            });
            body.role = role;
            body.x_target = self.config.x_target(role, self.viewport);
            body.y_strength = self.config.y_strength(degree);
            bodies.push(body);
        }

        if !previous.is_empty() {
            debug!(removed = previous.len(), "dropping nodes from simulation");
        }

        self.index = bodies.iter().enumerate().map(|(i, b)| (b.id.clone(), i)).collect();
        self.bodies = bodies;
        self.links = self.resolve_links(graph, &degrees);
    }

    fn resolve_links(&self, graph: &TaskGraph, degrees: &HashMap<TaskId, Degree>) -> Vec<Link> {
        let count = |id: &TaskId| degrees.get(id).map(Degree::total).unwrap_or(1).max(1) as f32;
        graph
            .edges
            .iter()
            .filter_map(|edge| {
                let source = *self.index.get(&edge.source)?;
                let target = *self.index.get(&edge.target)?;
                let (cs, ct) = (count(&edge.source), count(&edge.target));
                Some(Link {
                    source,
                    target,
                    strength: 1.0 / cs.min(ct),
                    bias: cs / (cs + ct),
                })
            })
            .collect()
    }

    /// Update the drawing area. Targets follow the new size; positions do
    /// not jump.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        for body in &mut self.bodies {
            body.x_target = self.config.x_target(body.role, viewport);
        }
    }

    /// Advance one step, whether or not the simulation is running.
    pub fn tick(&mut self) {
        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;
        let alpha = self.alpha;

        force::apply_link(
            &mut self.bodies,
            &self.links,
            self.config.link_distance,
            alpha,
            &mut self.jiggle,
        );
        force::apply_many_body(&mut self.bodies, &self.config, alpha);
        force::apply_center(&mut self.bodies, self.viewport.center(), self.config.center_strength);
        force::apply_collide(
            &mut self.bodies,
            self.config.collide_radius,
            self.config.collide_strength,
            &mut self.jiggle,
        );
        force::apply_position_targets(
            &mut self.bodies,
            self.config.x_strength,
            self.viewport.center().y,
            alpha,
        );

        let keep = 1.0 - self.config.velocity_decay;
        for body in &mut self.bodies {
            match body.pin {
                Some(pin) => {
                    body.position = pin;
                    body.velocity = Velocity::default();
                }
                None => {
                    body.velocity.x *= keep;
                    body.velocity.y *= keep;
                    body.position.x += body.velocity.x;
                    body.position.y += body.velocity.y;
                }
            }
        }
        self.ticks += 1;
    }

    /// Timer-driven step. Returns `false` without ticking once converged.
    pub fn step(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.tick();
        if self.alpha < self.config.alpha_min {
            self.running = false;
            debug!(ticks = self.ticks, "simulation converged");
        }
        true
    }

    /// Resume ticking without changing alpha.
    pub fn restart(&mut self) {
        self.running = true;
    }

    /// Set alpha and resume ticking.
    pub fn reheat(&mut self, alpha: f32) {
        self.alpha = alpha;
        self.restart();
    }

    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target;
    }

    pub fn pin(&mut self, id: &str, at: Position) -> LayoutResult<()> {
        let body = self.body_mut(id)?;
        body.pin = Some(at);
        Ok(())
    }

    /// Release a pin. Returns whether the node was pinned.
    pub fn unpin(&mut self, id: &str) -> LayoutResult<bool> {
        Ok(self.body_mut(id)?.pin.take().is_some())
    }

    /// Pin the node where it is and keep the simulation warm.
    pub fn drag_start(&mut self, id: &str) -> LayoutResult<()> {
        let body = self.body_mut(id)?;
        body.pin = Some(body.position);
        self.alpha_target = DRAG_ALPHA_TARGET;
        self.restart();
        Ok(())
    }

    /// Move the pin of a dragged node by the given delta.
    pub fn drag_by(&mut self, id: &str, dx: f32, dy: f32) -> LayoutResult<Position> {
        let body = self.body_mut(id)?;
        let pin = body.pin.unwrap_or(body.position).offset(dx, dy);
        body.pin = Some(pin);
        Ok(pin)
    }

    /// Let the simulation cool again. The node stays pinned.
    pub fn drag_end(&mut self, id: &str) -> LayoutResult<()> {
        self.body_mut(id)?;
        self.alpha_target = 0.0;
        Ok(())
    }

    /// Scatter every node near the center, clear all pins and reheat.
    pub fn reset(&mut self) {
        let center = self.viewport.center();
        for body in &mut self.bodies {
            let dx = self.jiggle.unit() * 2.0 * RESET_SCATTER;
            let dy = self.jiggle.unit() * 2.0 * RESET_SCATTER;
            body.position = center.offset(dx, dy);
            body.velocity = Velocity::default();
            body.pin = None;
        }
        self.alpha_target = 0.0;
        self.reheat(1.0);
    }

    /// First node with a non-finite coordinate, if any.
    pub fn check_finite(&self) -> LayoutResult<()> {
        match self.bodies.iter().find(|b| !b.position.is_finite()) {
            Some(body) => Err(LayoutError::NonFinite {
                id: body.id.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn body_mut(&mut self, id: &str) -> LayoutResult<&mut Body> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.bodies[i]),
            None => Err(LayoutError::UnknownNode(id.to_string())),
        }
    }
}

/// Sunflower placement of the `i`-th node around `center`.
pub(crate) fn phyllotaxis(center: Position, i: usize) -> Position {
    let radius = INITIAL_RADIUS * (0.5 + i as f32).sqrt();
    let angle = i as f32 * std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    center.offset(radius * angle.cos(), radius * angle.sin())
}
