//! The reconciled scene and the enter/update/exit diff against a new graph.

use std::collections::{BTreeSet, HashMap};

use task_graph_core::{EdgeKey, GraphNode, TaskGraph, TaskId, TaskStatus};
use task_graph_layout::Position;
use tracing::debug;

/// Visual node as the renderer knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneNode {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
}

impl From<&GraphNode> for SceneNode {
    fn from(node: &GraphNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            status: node.status,
        }
    }
}

/// A node to create, at its stabilized position.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEnter {
    pub node: SceneNode,
    pub position: Position,
}

/// One step of applying a [`SceneDiff`], in application order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneOp<'a> {
    ExitEdge(&'a EdgeKey),
    ExitNode(&'a TaskId),
    EnterNode(&'a NodeEnter),
    EnterEdge(&'a EdgeKey),
    UpdateNode(&'a SceneNode),
}

/// Structural changes between two scenes.
///
/// Apply exits first, then enters, then updates; [`SceneDiff::ops`] yields
/// them in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDiff {
    pub node_exit: Vec<TaskId>,
    pub edge_exit: Vec<EdgeKey>,
    pub node_enter: Vec<NodeEnter>,
    pub edge_enter: Vec<EdgeKey>,
    /// Kept nodes whose name or status changed. The element is updated in
    /// place, never recreated.
    pub node_update: Vec<SceneNode>,
}

impl SceneDiff {
    pub fn is_empty(&self) -> bool {
        !self.is_structural() && self.node_update.is_empty()
    }

    /// Whether anything is created or destroyed.
    pub fn is_structural(&self) -> bool {
        !(self.node_exit.is_empty()
            && self.edge_exit.is_empty()
            && self.node_enter.is_empty()
            && self.edge_enter.is_empty())
    }

    pub fn ops(&self) -> impl Iterator<Item = SceneOp<'_>> {
        self.edge_exit
            .iter()
            .map(SceneOp::ExitEdge)
            .chain(self.node_exit.iter().map(SceneOp::ExitNode))
            .chain(self.node_enter.iter().map(SceneOp::EnterNode))
            .chain(self.edge_enter.iter().map(SceneOp::EnterEdge))
            .chain(self.node_update.iter().map(SceneOp::UpdateNode))
    }
}

/// The set of visual elements currently shown, keyed by node id and by
/// `(source, target)` for edges.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    index: HashMap<TaskId, usize>,
    edges: BTreeSet<EdgeKey>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&SceneNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeKey> {
        self.edges.iter()
    }

    pub fn contains_edge(&self, edge: &EdgeKey) -> bool {
        self.edges.contains(edge)
    }

    /// Map `graph` onto the scene.
    ///
    /// `position` supplies the starting point of entering nodes; it is not
    /// consulted for kept nodes, whose positions belong to the simulation.
    pub fn reconcile<F>(&mut self, graph: &TaskGraph, position: F) -> SceneDiff
    where
        F: Fn(&str) -> Option<Position>,
    {
        let mut diff = SceneDiff::default();
        let incoming: HashMap<&TaskId, &GraphNode> = graph.nodes.iter().map(|n| (&n.id, n)).collect();
        let incoming_edges: BTreeSet<&EdgeKey> = graph.edges.iter().collect();

        // exit
        diff.edge_exit = self
            .edges
            .iter()
            .filter(|e| !incoming_edges.contains(e))
            .cloned()
            .collect();
        diff.node_exit = self
            .nodes
            .iter()
            .filter(|n| !incoming.contains_key(&n.id))
            .map(|n| n.id.clone())
            .collect();

        // enter + update, following the new graph's order
        let mut nodes = Vec::with_capacity(graph.nodes.len());
        for node in &graph.nodes {
            let next = SceneNode::from(node);
            match self.node(node.id.as_str()) {
                Some(current) => {
                    if current != &next {
                        diff.node_update.push(next.clone());
                    }
                }
                None => diff.node_enter.push(NodeEnter {
                    node: next.clone(),
                    position: position(node.id.as_str()).unwrap_or_default(),
                }),
            }
            nodes.push(next);
        }
        diff.edge_enter = graph
            .edges
            .iter()
            .filter(|e| !self.edges.contains(*e))
            .cloned()
            .collect();

        self.index = nodes.iter().enumerate().map(|(i, n)| (n.id.clone(), i)).collect();
        self.nodes = nodes;
        self.edges = graph.edges.iter().cloned().collect();

        debug!(
            enter = diff.node_enter.len(),
            update = diff.node_update.len(),
            exit = diff.node_exit.len(),
            edge_enter = diff.edge_enter.len(),
            edge_exit = diff.edge_exit.len(),
            "reconciled scene"
        );
        diff
    }

    /// Remove everything. The returned diff exits every element.
    pub fn clear(&mut self) -> SceneDiff {
        let diff = SceneDiff {
            edge_exit: std::mem::take(&mut self.edges).into_iter().collect(),
            node_exit: self.nodes.drain(..).map(|n| n.id).collect(),
            ..Default::default()
        };
        self.index.clear();
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use task_graph_core::{Task, TaskSnapshot};

    fn graph(tasks: Vec<Task>) -> TaskGraph {
        TaskSnapshot::new(tasks).to_graph()
    }

    fn pair(status: TaskStatus) -> TaskGraph {
        graph(vec![
            Task::new("1", "one"),
            Task::new("2", "two").with_status(status).with_dependency("1"),
        ])
    }

    fn at_origin(_: &str) -> Option<Position> {
        Some(Position::default())
    }

    #[test]
    fn test_first_reconcile_enters_everything() {
        let mut scene = Scene::new();
        let diff = scene.reconcile(&pair(TaskStatus::Pending), |id| {
            Some(if id == "1" { Position::new(1.0, 2.0) } else { Position::new(3.0, 4.0) })
        });
        assert_eq!(diff.node_enter.len(), 2);
        assert_eq!(diff.node_enter[0].position, Position::new(1.0, 2.0));
        assert_eq!(diff.edge_enter, vec![EdgeKey::new("1", "2")]);
        assert!(diff.node_exit.is_empty() && diff.node_update.is_empty());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut scene = Scene::new();
        scene.reconcile(&pair(TaskStatus::Pending), at_origin);
        let diff = scene.reconcile(&pair(TaskStatus::Pending), at_origin);
        assert!(!diff.is_structural());
        assert!(diff.is_empty());
    }

    #[test]
    fn test_status_change_is_single_update() {
        let mut scene = Scene::new();
        scene.reconcile(&pair(TaskStatus::Pending), at_origin);
        let diff = scene.reconcile(&pair(TaskStatus::Completed), |_| panic!("kept nodes are not placed"));

        assert_eq!(diff.node_update.len(), 1);
        assert_eq!(diff.node_update[0].id.as_str(), "2");
        assert_eq!(diff.node_update[0].status, TaskStatus::Completed);
        assert!(!diff.is_structural());
        assert!(scene.contains_edge(&EdgeKey::new("1", "2")));
    }

    #[test]
    fn test_removal_takes_only_incident_edges() {
        let mut scene = Scene::new();
        scene.reconcile(
            &graph(vec![
                Task::new("a", "a"),
                Task::new("b", "b").with_dependency("a"),
                Task::new("c", "c").with_dependency("b"),
                Task::new("d", "d").with_dependency("a"),
            ]),
            at_origin,
        );
        let diff = scene.reconcile(
            &graph(vec![
                Task::new("a", "a"),
                Task::new("c", "c").with_dependency("b"),
                Task::new("d", "d").with_dependency("a"),
            ]),
            at_origin,
        );

        assert_eq!(diff.node_exit, vec![TaskId::from("b")]);
        assert_eq!(diff.edge_exit, vec![EdgeKey::new("a", "b"), EdgeKey::new("b", "c")]);
        assert!(diff.node_enter.is_empty() && diff.edge_enter.is_empty());
        assert_eq!(scene.node_count(), 3);
        assert!(scene.contains_edge(&EdgeKey::new("a", "d")));
    }

    #[test]
    fn test_dangling_edge_appears_when_target_arrives() {
        let mut scene = Scene::new();
        let diff = scene.reconcile(&graph(vec![Task::new("2", "two").with_dependency("1")]), at_origin);
        assert!(diff.edge_enter.is_empty());

        let diff = scene.reconcile(&pair(TaskStatus::Pending), at_origin);
        assert_eq!(diff.node_enter.len(), 1);
        assert_eq!(diff.edge_enter, vec![EdgeKey::new("1", "2")]);
    }

    #[test]
    fn test_ops_order_exits_before_enters() {
        let mut scene = Scene::new();
        scene.reconcile(&graph(vec![Task::new("old", "old"), Task::new("keep", "keep")]), at_origin);
        let diff = scene.reconcile(
            &graph(vec![Task::new("keep", "renamed"), Task::new("new", "new")]),
            at_origin,
        );
        let kinds: Vec<&str> = diff
            .ops()
            .map(|op| match op {
                SceneOp::ExitEdge(_) => "exit-edge",
                SceneOp::ExitNode(_) => "exit",
                SceneOp::EnterNode(_) => "enter",
                SceneOp::EnterEdge(_) => "enter-edge",
                SceneOp::UpdateNode(_) => "update",
            })
            .collect();
        assert_eq!(kinds, vec!["exit", "enter", "update"]);
    }

    #[test]
    fn test_clear_exits_everything() {
        let mut scene = Scene::new();
        scene.reconcile(&pair(TaskStatus::Pending), at_origin);
        let diff = scene.clear();
        assert_eq!(diff.node_exit.len(), 2);
        assert_eq!(diff.edge_exit.len(), 1);
        assert!(scene.is_empty());
        assert_eq!(scene.edge_count(), 0);
    }
}
