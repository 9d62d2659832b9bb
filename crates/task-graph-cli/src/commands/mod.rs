//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use task_graph_core::{Task, TaskSnapshot};

pub mod config;
pub mod diff;
pub mod layout;
pub mod watch;

/// A snapshot file: the `{ "tasks": [...] }` envelope or a bare task array.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Bare(Vec<Task>),
    Envelope(TaskSnapshot),
}

/// Read a task snapshot from a JSON file.
pub fn read_snapshot(path: &Path) -> Result<TaskSnapshot> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read snapshot from {}", path.display()))?;
    let file: SnapshotFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    Ok(match file {
        SnapshotFile::Bare(tasks) => TaskSnapshot::new(tasks),
        SnapshotFile::Envelope(snapshot) => snapshot,
    })
}
