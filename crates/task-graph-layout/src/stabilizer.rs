//! Pre-settles newly introduced nodes in a shadow copy of the simulation so
//! they do not fly in from the origin when first drawn.

use std::collections::HashMap;

use task_graph_core::{TaskGraph, TaskId};
use tracing::debug;

use crate::simulation::phyllotaxis;
use crate::{ForceConfig, LayoutError, LayoutResult, Position, Simulation};

#[derive(Debug, Clone)]
pub struct StabilizerConfig {
    /// Ticks run on the shadow simulation before positions are read back.
    pub warmup_ticks: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self { warmup_ticks: 10 }
    }
}

/// Computes starting positions for nodes that the live simulation has not
/// seen yet. The live simulation is only read.
#[derive(Debug, Clone)]
pub struct Stabilizer {
    config: StabilizerConfig,
    forces: ForceConfig,
}

impl Stabilizer {
    pub fn new(config: StabilizerConfig, forces: ForceConfig) -> Self {
        Self { config, forces }
    }

    pub fn config(&self) -> &StabilizerConfig {
        &self.config
    }

    /// Positions for the nodes of `graph` that `live` does not contain.
    ///
    /// Existing nodes are pinned at their current (or pinned) location in
    /// the shadow copy, so only the new nodes move during warm-up. A new
    /// node linked to an existing one starts next to it; others start on
    /// the sunflower spiral around the viewport center.
    pub fn stabilize(&self, graph: &TaskGraph, live: &Simulation) -> LayoutResult<HashMap<TaskId, Position>> {
        let fresh: Vec<&TaskId> = graph
            .nodes
            .iter()
            .map(|n| &n.id)
            .filter(|id| !live.contains(id.as_str()))
            .collect();
        if fresh.is_empty() {
            return Ok(HashMap::new());
        }

        let mut anchors: HashMap<TaskId, Position> = HashMap::new();
        for node in &graph.nodes {
            let id = node.id.as_str();
            if let Some(at) = live.pin_of(id).or_else(|| live.position(id)) {
                anchors.insert(node.id.clone(), at);
            }
        }

        let mut seeds = anchors.clone();
        if !anchors.is_empty() {
            for (i, id) in fresh.iter().enumerate() {
                if let Some(near) = self.neighbor_anchor(graph, id, &anchors) {
                    let origin = Position::default();
                    let spot = phyllotaxis(origin, i + 1);
                    let scale = self.forces.link_distance / 2.0 / spot.distance(origin).max(1.0);
                    seeds.insert((*id).clone(), near.offset(spot.x * scale, spot.y * scale));
                }
            }
        }

        let mut forces = self.forces.clone();
        if !anchors.is_empty() {
            // Pinned anchors cannot recenter, so centering would only drag
            // the new nodes away from them.
            forces.center_strength = 0.0;
        }
        let mut shadow = Simulation::new(forces, live.viewport());
        shadow.set_topology(graph, &seeds);
        for (id, at) in &anchors {
            shadow.pin(id.as_str(), *at)?;
        }
        for _ in 0..self.config.warmup_ticks {
            shadow.tick();
        }

        let mut placed = HashMap::with_capacity(fresh.len());
        for id in fresh {
            let at = shadow
                .position(id.as_str())
                .ok_or_else(|| LayoutError::UnknownNode(id.to_string()))?;
            if !at.is_finite() {
                return Err(LayoutError::NonFinite { id: id.to_string() });
            }
            placed.insert(id.clone(), at);
        }

        debug!(
            new_nodes = placed.len(),
            pinned = anchors.len(),
            ticks = self.config.warmup_ticks,
            "stabilized new nodes"
        );
        Ok(placed)
    }

    fn neighbor_anchor(&self, graph: &TaskGraph, id: &TaskId, anchors: &HashMap<TaskId, Position>) -> Option<Position> {
        graph.edges.iter().find_map(|edge| {
            if &edge.source == id {
                anchors.get(&edge.target).copied()
            } else if &edge.target == id {
                anchors.get(&edge.source).copied()
            } else {
                None
            }
        })
    }
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::new(StabilizerConfig::default(), ForceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Viewport;
    use task_graph_core::{Task, TaskSnapshot};

    fn graph(tasks: Vec<Task>) -> TaskGraph {
        TaskSnapshot::new(tasks).to_graph()
    }

    fn live_with(graph: &TaskGraph) -> Simulation {
        let mut sim = Simulation::new(ForceConfig::default(), Viewport::new(800.0, 400.0));
        let seeds = Stabilizer::default().stabilize(graph, &sim).unwrap();
        sim.set_topology(graph, &seeds);
        sim
    }

    #[test]
    fn test_first_render_places_every_node() {
        let g = graph((0..12).map(|i| Task::new(format!("t{i}"), "isolated")).collect());
        let sim = Simulation::new(ForceConfig::default(), Viewport::default());
        let placed = Stabilizer::default().stabilize(&g, &sim).unwrap();

        assert_eq!(placed.len(), 12);
        let points: Vec<Position> = placed.values().copied().collect();
        for (i, a) in points.iter().enumerate() {
            assert!(a.is_finite());
            for b in &points[i + 1..] {
                assert!(a.distance(*b) > 1.0, "isolated nodes overlap: {a:?} {b:?}");
            }
        }
    }

    #[test]
    fn test_only_new_nodes_are_returned() {
        let before = graph(vec![Task::new("a", "a"), Task::new("b", "b").with_dependency("a")]);
        let sim = live_with(&before);
        let after = graph(vec![
            Task::new("a", "a"),
            Task::new("b", "b").with_dependency("a"),
            Task::new("c", "c").with_dependency("b"),
        ]);

        let placed = Stabilizer::default().stabilize(&after, &sim).unwrap();
        assert_eq!(placed.keys().map(TaskId::as_str).collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn test_existing_positions_untouched() {
        let before = graph(vec![Task::new("a", "a"), Task::new("b", "b").with_dependency("a")]);
        let mut sim = live_with(&before);
        for _ in 0..30 {
            sim.tick();
        }
        let snapshot: Vec<(TaskId, Position)> = sim.positions().map(|(id, p)| (id.clone(), p)).collect();
        let alpha = sim.alpha();

        let after = graph(vec![
            Task::new("a", "a"),
            Task::new("b", "b").with_dependency("a"),
            Task::new("c", "c").with_dependency("a"),
        ]);
        let placed = Stabilizer::default().stabilize(&after, &sim).unwrap();
        sim.set_topology(&after, &placed);

        for (id, p) in snapshot {
            assert_eq!(sim.position(id.as_str()), Some(p));
        }
        assert_eq!(sim.alpha(), alpha);
    }

    #[test]
    fn test_new_node_starts_near_its_neighbor() {
        let before = graph(vec![Task::new("a", "a")]);
        let mut sim = live_with(&before);
        sim.pin("a", Position::new(100.0, 100.0)).unwrap();

        let after = graph(vec![Task::new("a", "a"), Task::new("b", "b").with_dependency("a")]);
        let placed = Stabilizer::default().stabilize(&after, &sim).unwrap();
        let b = placed[&TaskId::from("b")];
        assert!(b.distance(Position::new(100.0, 100.0)) < 450.0);
    }

    #[test]
    fn test_no_new_nodes_is_empty() {
        let g = graph(vec![Task::new("a", "a")]);
        let sim = live_with(&g);
        assert!(Stabilizer::default().stabilize(&g, &sim).unwrap().is_empty());
    }
}
