//! Force configuration and the individual forces applied on every tick.

use task_graph_core::Degree;

use crate::simulation::{Body, Link};
use crate::{Position, QuadTree, Viewport};

/// Configuration shared by the live simulation and its stabilizing copy.
#[derive(Debug, Clone)]
pub struct ForceConfig {
    /// Rest length of a dependency link.
    pub link_distance: f32,
    /// Many-body charge per node (negative repels).
    pub charge_strength: f32,
    /// Barnes-Hut theta (0.5-1.0, higher = faster but less accurate).
    pub theta: f32,
    /// Maximum quadtree depth.
    pub max_tree_depth: usize,
    /// Fraction of the mean offset from the viewport center removed per tick.
    pub center_strength: f32,
    /// Collision radius per node.
    pub collide_radius: f32,
    /// Collision resolution strength (0-1).
    pub collide_strength: f32,
    /// Pull toward the degree-based horizontal band.
    pub x_strength: f32,
    /// Horizontal band of nodes without prerequisites, as a fraction of width.
    pub source_band: f32,
    /// Horizontal band of nodes nothing depends on.
    pub sink_band: f32,
    /// Horizontal band of every other node.
    pub middle_band: f32,
    /// Vertical centering strength of an unconnected node.
    pub y_base_strength: f32,
    /// Extra vertical centering strength per connection.
    pub y_degree_step: f32,
    /// Upper bound of the vertical centering strength.
    pub y_max_strength: f32,
    /// The simulation stops once alpha drops below this.
    pub alpha_min: f32,
    /// Per-tick interpolation rate of alpha toward its target.
    pub alpha_decay: f32,
    /// Fraction of velocity lost per tick.
    pub velocity_decay: f32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        let alpha_min = 0.001_f32;
        Self {
            link_distance: 100.0,
            charge_strength: -300.0,
            theta: 0.9,
            max_tree_depth: 12,
            center_strength: 1.0,
            collide_radius: 30.0,
            collide_strength: 1.0,
            x_strength: 0.2,
            source_band: 0.2,
            sink_band: 0.8,
            middle_band: 0.5,
            y_base_strength: 0.05,
            y_degree_step: 0.03,
            y_max_strength: 0.3,
            alpha_min,
            // Cools from 1 to alpha_min in ~300 ticks.
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            velocity_decay: 0.4,
        }
    }
}

/// Placement role of a node, derived from its degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// No incoming edges: nothing it waits on.
    Source,
    /// No outgoing edges: nothing waits on it.
    Sink,
    /// Everything else.
    Intermediate,
}

impl Role {
    /// Zero incoming wins over zero outgoing, so isolated nodes are sources.
    pub fn from_degree(degree: Degree) -> Self {
        if degree.incoming == 0 {
            Role::Source
        } else if degree.outgoing == 0 {
            Role::Sink
        } else {
            Role::Intermediate
        }
    }
}

impl ForceConfig {
    /// Horizontal target for a node with the given role.
    pub fn x_target(&self, role: Role, viewport: Viewport) -> f32 {
        let band = match role {
            Role::Source => self.source_band,
            Role::Sink => self.sink_band,
            Role::Intermediate => self.middle_band,
        };
        viewport.width * band
    }

    /// Vertical centering strength; grows with total degree, capped.
    pub fn y_strength(&self, degree: Degree) -> f32 {
        (self.y_base_strength + degree.total() as f32 * self.y_degree_step).min(self.y_max_strength)
    }
}

/// Deterministic stand-in for random jitter on coincident bodies.
#[derive(Debug, Clone)]
pub(crate) struct Jiggle(u32);

impl Default for Jiggle {
    fn default() -> Self {
        Self(1)
    }
}

impl Jiggle {
    /// Uniform value in `[-0.5, 0.5)`.
    pub(crate) fn unit(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0 as f32 / 4_294_967_296.0 - 0.5
    }

    pub(crate) fn next(&mut self) -> f32 {
        self.unit() * 1e-6
    }

    fn or_jiggle(&mut self, v: f32) -> f32 {
        if v == 0.0 {
            self.next()
        } else {
            v
        }
    }
}

/// Spring force pulling linked bodies toward `distance` apart.
pub(crate) fn apply_link(bodies: &mut [Body], links: &[Link], distance: f32, alpha: f32, jiggle: &mut Jiggle) {
    for link in links {
        let (s, t) = (&bodies[link.source], &bodies[link.target]);
        let x = jiggle.or_jiggle(t.position.x + t.velocity.x - s.position.x - s.velocity.x);
        let y = jiggle.or_jiggle(t.position.y + t.velocity.y - s.position.y - s.velocity.y);
        let l = (x * x + y * y).sqrt();
        let l = (l - distance) / l * alpha * link.strength;
        let (x, y) = (x * l, y * l);

        let target = &mut bodies[link.target];
        target.velocity.x -= x * link.bias;
        target.velocity.y -= y * link.bias;
        let source = &mut bodies[link.source];
        source.velocity.x += x * (1.0 - link.bias);
        source.velocity.y += y * (1.0 - link.bias);
    }
}

/// Many-body repulsion, approximated with a Barnes-Hut quadtree.
pub(crate) fn apply_many_body(bodies: &mut [Body], config: &ForceConfig, alpha: f32) {
    let positions: Vec<Position> = bodies.iter().map(|b| b.position).collect();
    let tree = QuadTree::build(&positions, config.max_tree_depth);
    for (i, body) in bodies.iter_mut().enumerate() {
        let acc = tree.repulsion(&positions, i, config.charge_strength, config.theta);
        body.velocity.x += acc.x * alpha;
        body.velocity.y += acc.y * alpha;
    }
}

/// Translate every body so the mean position moves toward `center`.
pub(crate) fn apply_center(bodies: &mut [Body], center: Position, strength: f32) {
    if bodies.is_empty() || strength == 0.0 {
        return;
    }
    let n = bodies.len() as f32;
    let sx = (bodies.iter().map(|b| b.position.x).sum::<f32>() / n - center.x) * strength;
    let sy = (bodies.iter().map(|b| b.position.y).sum::<f32>() / n - center.y) * strength;
    for body in bodies {
        body.position.x -= sx;
        body.position.y -= sy;
    }
}

/// Push apart bodies whose collision circles overlap.
pub(crate) fn apply_collide(bodies: &mut [Body], radius: f32, strength: f32, jiggle: &mut Jiggle) {
    let r = radius * 2.0;
    let r2 = r * r;
    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            let (a, b) = (&bodies[i], &bodies[j]);
            let mut x = (a.position.x + a.velocity.x) - (b.position.x + b.velocity.x);
            let mut y = (a.position.y + a.velocity.y) - (b.position.y + b.velocity.y);
            let l = x * x + y * y;
            if l >= r2 {
                continue;
            }
            x = jiggle.or_jiggle(x);
            y = jiggle.or_jiggle(y);
            let l = (x * x + y * y).sqrt();
            let l = (r - l) / l * strength;
            // Equal radii: each body takes half of the correction.
            let (dx, dy) = (x * l * 0.5, y * l * 0.5);
            bodies[i].velocity.x += dx;
            bodies[i].velocity.y += dy;
            bodies[j].velocity.x -= dx;
            bodies[j].velocity.y -= dy;
        }
    }
}

/// Degree-based horizontal band and vertical centering pulls.
pub(crate) fn apply_position_targets(bodies: &mut [Body], x_strength: f32, center_y: f32, alpha: f32) {
    for body in bodies {
        body.velocity.x += (body.x_target - body.position.x) * x_strength * alpha;
        body.velocity.y += (center_y - body.position.y) * body.y_strength * alpha;
    }
}
