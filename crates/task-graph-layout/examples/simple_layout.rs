//! Settle a small task graph, then grow it and show where the new task lands.
//!
//! Run with: cargo run --example simple_layout

use std::collections::HashMap;
use std::time::Instant;

use task_graph_core::{Task, TaskSnapshot, TaskStatus};
use task_graph_layout::{ForceConfig, LayoutState, Simulation, Stabilizer, Viewport};

fn main() {
    tracing_subscriber::fmt::init();

    let mut tasks = vec![
        Task::new("schema", "Design schema").with_status(TaskStatus::Completed),
        Task::new("api", "Build API").with_dependency("schema"),
        Task::new("ui", "Build UI").with_dependency("schema"),
        Task::new("e2e", "End-to-end tests")
            .with_dependency("api")
            .with_dependency("ui"),
    ];

    let viewport = Viewport::new(800.0, 400.0);
    let stabilizer = Stabilizer::default();
    let mut sim = Simulation::new(ForceConfig::default(), viewport);

    let graph = TaskSnapshot::new(tasks.clone()).to_graph();
    let seeds = stabilizer.stabilize(&graph, &sim).expect("stabilize initial graph");
    sim.set_topology(&graph, &seeds);

    let start = Instant::now();
    let mut ticks = 0;
    while sim.step() {
        ticks += 1;
    }
    println!("Converged after {} ticks in {:.2?}", ticks, start.elapsed());
    assert_eq!(sim.state(), LayoutState::Converged);

    for (id, pos) in sim.positions() {
        println!("  {:<8} ({:7.1}, {:7.1})  {:?}", id.as_str(), pos.x, pos.y, sim.role(id.as_str()));
    }

    tasks.push(Task::new("release", "Release").with_dependency("e2e"));
    let graph = TaskSnapshot::new(tasks).to_graph();
    let seeds: HashMap<_, _> = stabilizer.stabilize(&graph, &sim).expect("stabilize grown graph");
    for (id, pos) in &seeds {
        println!("\nNew task {} starts at ({:.1}, {:.1})", id, pos.x, pos.y);
    }
    sim.set_topology(&graph, &seeds);
    sim.reheat(0.3);
    while sim.step() {}

    println!("\nFinal positions:");
    for (id, pos) in sim.positions() {
        println!("  {:<8} ({:7.1}, {:7.1})", id.as_str(), pos.x, pos.y);
    }
}
