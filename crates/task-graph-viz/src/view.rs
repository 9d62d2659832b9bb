//! View state: pan/zoom, selection, filter, search and sort.
//!
//! Nothing here touches the simulation. Filtering produces a set of visible
//! ids that the style pass turns into opacity; sorting only orders the list
//! view.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use task_graph_core::{Task, TaskId, TaskSnapshot, TaskStatus};
use task_graph_layout::{Position, Viewport};

use crate::selection::SelectionState;

/// Allowed zoom range.
pub const SCALE_EXTENT: (f32, f32) = (0.1, 4.0);

/// Pan/zoom transform: `screen = graph * k + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub k: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform { x: 0.0, y: 0.0, k: 1.0 };

    pub fn new(x: f32, y: f32, k: f32) -> Self {
        Self { x, y, k }
    }

    /// Same transform with the scale clamped to [`SCALE_EXTENT`].
    pub fn clamped(self) -> Self {
        Self {
            k: self.k.clamp(SCALE_EXTENT.0, SCALE_EXTENT.1),
            ..self
        }
    }

    pub fn apply(&self, p: Position) -> Position {
        Position::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    pub fn invert(&self, p: Position) -> Position {
        Position::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    /// Translate so `target` lands on the viewport center; scale is kept.
    pub fn centered_on(&self, target: Position, viewport: Viewport) -> Self {
        let center = viewport.center();
        Self {
            x: center.x - target.x * self.k,
            y: center.y - target.y * self.k,
            k: self.k,
        }
    }
}

/// Status filter of the list and graph.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(TaskStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: TaskStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Only(TaskStatus::Pending)),
            "in_progress" => Ok(StatusFilter::Only(TaskStatus::InProgress)),
            "completed" => Ok(StatusFilter::Only(TaskStatus::Completed)),
            other => Err(format!("unknown status filter: {other}")),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => f.write_str(status.as_str()),
        }
    }
}

/// Ordering of the list view.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOption {
    #[serde(rename = "name-asc")]
    NameAsc,
    #[serde(rename = "name-desc")]
    NameDesc,
    #[serde(rename = "status")]
    Status,
    #[serde(rename = "date-asc")]
    DateAsc,
    #[default]
    #[serde(rename = "date-desc")]
    DateDesc,
}

impl SortOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::NameAsc => "name-asc",
            SortOption::NameDesc => "name-desc",
            SortOption::Status => "status",
            SortOption::DateAsc => "date-asc",
            SortOption::DateDesc => "date-desc",
        }
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name-asc" => Ok(SortOption::NameAsc),
            "name-desc" => Ok(SortOption::NameDesc),
            "status" => Ok(SortOption::Status),
            "date-asc" => Ok(SortOption::DateAsc),
            "date-desc" => Ok(SortOption::DateDesc),
            other => Err(format!("unknown sort option: {other}")),
        }
    }
}

fn name_key(task: &Task) -> (String, &str) {
    (task.display_name().to_lowercase(), task.display_name())
}

/// Creation time in epoch milliseconds; missing or unparsable is 0.
fn created_key(task: &Task) -> i64 {
    task.created_at
        .as_ref()
        .and_then(|t| t.to_datetime())
        .map(|d| d.timestamp_millis())
        .unwrap_or(0)
}

/// Everything the user controls about how the graph is looked at.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub selection: SelectionState,
    /// Node highlighted without being selected (e.g. a dependency tag was
    /// clicked). Cleared by the next selection change.
    pub highlight: Option<TaskId>,
    pub filter: StatusFilter,
    pub search: String,
    pub sort: SortOption,
    pub transform: Transform,
}

impl ViewState {
    /// Status filter AND case-insensitive search on name or description.
    pub fn matches(&self, task: &Task) -> bool {
        if !self.filter.matches(task.status) {
            return false;
        }
        let term = self.search.trim();
        if term.is_empty() {
            return true;
        }
        let term = term.to_lowercase();
        let contains = |field: &Option<String>| field.as_deref().is_some_and(|s| s.to_lowercase().contains(&term));
        contains(&task.name) || contains(&task.description)
    }

    pub fn visible_ids(&self, snapshot: &TaskSnapshot) -> HashSet<TaskId> {
        snapshot
            .tasks
            .iter()
            .filter(|t| self.matches(t))
            .map(|t| t.id.clone())
            .collect()
    }

    /// Matching tasks in list order. Ties keep snapshot order.
    pub fn list<'a>(&self, snapshot: &'a TaskSnapshot) -> Vec<&'a Task> {
        let mut tasks: Vec<&Task> = snapshot.tasks.iter().filter(|t| self.matches(t)).collect();
        match self.sort {
            SortOption::NameAsc => tasks.sort_by(|a, b| name_key(a).cmp(&name_key(b))),
            SortOption::NameDesc => tasks.sort_by(|a, b| name_key(b).cmp(&name_key(a))),
            SortOption::Status => tasks.sort_by_key(|t| t.status.rank()),
            SortOption::DateAsc => tasks.sort_by_key(|t| created_key(t)),
            SortOption::DateDesc => tasks.sort_by_key(|t| std::cmp::Reverse(created_key(t))),
        }
        tasks
    }

    /// The node drawn as highlighted: an explicit highlight, else the
    /// selection.
    pub fn highlighted(&self) -> Option<&TaskId> {
        self.highlight.as_ref().or(self.selection.selected())
    }
}
