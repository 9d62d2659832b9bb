//! Diff command: compare two snapshot files the way the dashboard does.

use std::path::Path;

use anyhow::Result;
use task_graph_core::{detect_change, COMPARED_FIELDS};

use super::read_snapshot;

/// Print whether `new` differs from `old`. Returns whether it does.
pub fn execute(old: &Path, new: &Path) -> Result<bool> {
    let old = read_snapshot(old)?;
    let new = read_snapshot(new)?;

    match detect_change(&old, &new) {
        Some(reason) => {
            println!("changed: {}", reason);
            Ok(true)
        }
        None => {
            println!("unchanged ({} tasks)", new.len());
            println!("compared fields: {}", COMPARED_FIELDS.join(", "));
            Ok(false)
        }
    }
}
