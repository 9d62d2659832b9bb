//! Layout command: stabilize and settle a snapshot offline, print positions.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use task_graph_layout::{ForceConfig, Role, Simulation, Stabilizer};
use tracing::info;

use super::read_snapshot;
use crate::config::Config;

#[derive(Debug, Serialize)]
pub struct PlacedNode {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub role: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LayoutOutput {
    pub width: f32,
    pub height: f32,
    pub ticks: u64,
    pub nodes: Vec<PlacedNode>,
    pub edges: Vec<(String, String)>,
}

fn role_name(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::Source) => "source",
        Some(Role::Sink) => "sink",
        Some(Role::Intermediate) => "intermediate",
        None => "unknown",
    }
}

/// Lay out `path`. With `ticks` the simulation runs exactly that many
/// steps after stabilization; otherwise it runs until it converges.
pub fn execute(config: &Config, path: &Path, ticks: Option<usize>) -> Result<LayoutOutput> {
    let snapshot = read_snapshot(path)?;
    let graph = snapshot.to_graph();
    let forces = ForceConfig::default();

    let mut simulation = Simulation::new(forces.clone(), config.viewport());
    let seeds = Stabilizer::new(config.stabilizer(), forces)
        .stabilize(&graph, &simulation)
        .context("Failed to stabilize layout")?;
    simulation.set_topology(&graph, &seeds);

    match ticks {
        Some(n) => (0..n).for_each(|_| simulation.tick()),
        None => while simulation.step() {},
    }
    simulation.check_finite().context("Layout diverged")?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        ticks = simulation.ticks(),
        "Layout settled"
    );

    let nodes = simulation
        .positions()
        .map(|(id, p)| PlacedNode {
            id: id.to_string(),
            x: p.x,
            y: p.y,
            role: role_name(simulation.role(id.as_str())),
        })
        .collect();
    let edges = graph
        .edges
        .iter()
        .map(|e| (e.source.to_string(), e.target.to_string()))
        .collect();

    Ok(LayoutOutput {
        width: config.viewport_width,
        height: config.viewport_height,
        ticks: simulation.ticks(),
        nodes,
        edges,
    })
}
