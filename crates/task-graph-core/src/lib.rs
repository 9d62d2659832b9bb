//! Core domain types shared across the task-graph workspace.
//!
//! A [`TaskSnapshot`] is the full task list as served by the backend. It is
//! projected into a [`TaskGraph`] (one node per task, one edge per resolvable
//! dependency) and compared against the previously rendered snapshot with
//! [`has_changed`].

mod diff;

pub use diff::{detect_change, has_changed, ChangeReason, COMPARED_FIELDS};

use chrono::{DateTime, TimeZone, Utc};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::warn;

// =============================================================================
// Task Records
// =============================================================================

/// Opaque, stable identifier of a task within a snapshot.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    /// Missing or unrecognised status value.
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Unknown => "unknown",
        }
    }

    /// Get a display label for the status.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Unknown => "Unknown",
        }
    }

    /// Sort rank used by the list view: pending < in_progress < completed.
    /// Unknown statuses sort first.
    pub fn rank(&self) -> u8 {
        match self {
            TaskStatus::Unknown => 0,
            TaskStatus::Pending => 1,
            TaskStatus::InProgress => 2,
            TaskStatus::Completed => 3,
        }
    }

    /// Style class for renderers (`in_progress` becomes `in-progress`).
    pub fn css_class(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Unknown => "unknown",
        }
    }

    /// Color key the renderer maps onto its palette.
    pub fn color(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "#f1c40f",
            TaskStatus::InProgress => "primary",
            TaskStatus::Completed => "secondary",
            TaskStatus::Unknown => "#7f8c8d",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference from a task to one of its prerequisites.
///
/// The backend emits either a bare id or an object wrapping it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencyRef {
    Id(TaskId),
    Wrapped {
        #[serde(rename = "taskId", alias = "id")]
        task_id: TaskId,
    },
}

impl DependencyRef {
    /// The referenced task id, unwrapped.
    pub fn task_id(&self) -> &TaskId {
        match self {
            DependencyRef::Id(id) => id,
            DependencyRef::Wrapped { task_id } => task_id,
        }
    }
}

impl From<&str> for DependencyRef {
    fn from(value: &str) -> Self {
        DependencyRef::Id(TaskId::from(value))
    }
}

/// A file touched by a task.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedFile {
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,
}

/// A timestamp kept in its wire form.
///
/// The backend sends ISO-8601 strings, older stores send epoch millis. The
/// raw text is what change detection compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timestamp(pub String);

impl Timestamp {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into a UTC instant, accepting RFC 3339 text or epoch millis.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.0) {
            return Some(dt.with_timezone(&Utc));
        }
        let millis: i64 = self.0.parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Timestamp(s),
            Raw::Number(n) => Timestamp(n.to_string()),
        })
    }
}

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A task record as served by the task backend.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: TaskStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub implementation_guide: Option<String>,
    #[serde(default)]
    pub verification_criteria: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<DependencyRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub related_files: Vec<RelatedFile>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub analysis_result: Option<String>,
}

impl Task {
    /// Create a pending task with only an id and a name.
    pub fn new(id: impl Into<TaskId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            status: TaskStatus::Pending,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_dependency(mut self, dep: impl Into<DependencyRef>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Name for display; absent names render as empty.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Ids of every prerequisite, unwrapped, in declaration order.
    pub fn dependency_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.dependencies.iter().map(DependencyRef::task_id)
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// A complete copy of the server's task list at one point in time.
///
/// Serialized as the `{ "tasks": [...] }` envelope of `GET /api/tasks`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub tasks: Vec<Task>,
}

impl TaskSnapshot {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Find a task by id.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Index tasks by id.
    pub fn by_id(&self) -> HashMap<&str, &Task> {
        self.tasks.iter().map(|t| (t.id.as_str(), t)).collect()
    }

    /// First non-empty analysis result carried by any task.
    pub fn analysis_result(&self) -> Option<&str> {
        self.tasks
            .iter()
            .filter_map(|t| t.analysis_result.as_deref())
            .find(|s| !s.is_empty())
    }

    /// Status counts for the progress indicator.
    pub fn progress(&self) -> ProgressSummary {
        let mut summary = ProgressSummary {
            total: self.tasks.len(),
            ..Default::default()
        };
        for task in &self.tasks {
            match task.status {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Unknown => {}
            }
        }
        summary
    }

    /// Project the snapshot into its dependency graph.
    pub fn to_graph(&self) -> TaskGraph {
        TaskGraph::from_snapshot(self)
    }
}

/// Per-status task counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
}

impl ProgressSummary {
    /// Share of tasks in `status`, in percent. Zero for an empty list.
    pub fn percent(&self, status: TaskStatus) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let count = match status {
            TaskStatus::Pending => self.pending,
            TaskStatus::InProgress => self.in_progress,
            TaskStatus::Completed => self.completed,
            TaskStatus::Unknown => self.total - self.pending - self.in_progress - self.completed,
        };
        count as f64 / self.total as f64 * 100.0
    }
}

// =============================================================================
// Dependency Graph
// =============================================================================

/// Graph node derived 1:1 from a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
}

/// Identity of an edge: the ordered `(source, target)` pair.
///
/// `source` is the prerequisite, `target` the task that depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EdgeKey {
    pub source: TaskId,
    pub target: TaskId,
}

impl EdgeKey {
    pub fn new(source: impl Into<TaskId>, target: impl Into<TaskId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn touches(&self, id: &str) -> bool {
        self.source.as_str() == id || self.target.as_str() == id
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

/// A dependency that could not be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingDependency {
    pub task: TaskId,
    pub missing: TaskId,
}

/// In/out degree of a node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Degree {
    pub incoming: usize,
    pub outgoing: usize,
}

impl Degree {
    pub fn total(&self) -> usize {
        self.incoming + self.outgoing
    }
}

/// Nodes and edges derived from one snapshot.
#[derive(Debug, Default, Clone)]
pub struct TaskGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<EdgeKey>,
    /// References dropped because their target is not in the snapshot.
    pub dangling: Vec<DanglingDependency>,
}

impl TaskGraph {
    /// Derive nodes and edges. Dangling and self references are excluded
    /// from the edge set and logged; duplicate references collapse into one
    /// edge.
    pub fn from_snapshot(snapshot: &TaskSnapshot) -> Self {
        let ids: HashSet<&str> = snapshot.tasks.iter().map(|t| t.id.as_str()).collect();

        let nodes = snapshot
            .tasks
            .iter()
            .map(|task| GraphNode {
                id: task.id.clone(),
                name: task.display_name().to_string(),
                status: task.status,
            })
            .collect();

        let mut edges = Vec::new();
        let mut seen = HashSet::new();
        let mut dangling = Vec::new();

        for task in &snapshot.tasks {
            for dep in task.dependency_ids() {
                if !ids.contains(dep.as_str()) {
                    warn!(task_id = %task.id, dependency = %dep, "dependency link ignored: task not in snapshot");
                    dangling.push(DanglingDependency {
                        task: task.id.clone(),
                        missing: dep.clone(),
                    });
                    continue;
                }
                if dep == &task.id {
                    warn!(task_id = %task.id, "dependency link ignored: task depends on itself");
                    continue;
                }
                let key = EdgeKey::new(dep.clone(), task.id.clone());
                if seen.insert(key.clone()) {
                    edges.push(key);
                }
            }
        }

        Self {
            nodes,
            edges,
            dangling,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Convert to petgraph StableDiGraph for analysis.
    /// Returns the graph and a mapping from TaskId to NodeIndex.
    pub fn to_petgraph(&self) -> (StableDiGraph<GraphNode, ()>, HashMap<TaskId, NodeIndex>) {
        let mut graph = StableDiGraph::new();
        let mut id_to_index = HashMap::new();

        for node in &self.nodes {
            let idx = graph.add_node(node.clone());
            id_to_index.insert(node.id.clone(), idx);
        }

        for edge in &self.edges {
            if let (Some(&from_idx), Some(&to_idx)) =
                (id_to_index.get(&edge.source), id_to_index.get(&edge.target))
            {
                graph.add_edge(from_idx, to_idx, ());
            }
        }

        (graph, id_to_index)
    }

    /// In/out degree of every node, recomputed from scratch.
    pub fn degrees(&self) -> HashMap<TaskId, Degree> {
        let (graph, id_to_index) = self.to_petgraph();
        id_to_index
            .into_iter()
            .map(|(id, idx)| {
                let degree = Degree {
                    incoming: graph.neighbors_directed(idx, Direction::Incoming).count(),
                    outgoing: graph.neighbors_directed(idx, Direction::Outgoing).count(),
                };
                (id, degree)
            })
            .collect()
    }
}
