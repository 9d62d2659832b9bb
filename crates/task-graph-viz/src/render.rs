//! Pure mapping from (node, view state) to visual attributes.
//!
//! The renderer applies these records as they are; it is never asked for
//! its current state.

use std::collections::HashSet;

use task_graph_core::{EdgeKey, TaskId, TaskStatus};

use crate::scene::Scene;
use crate::view::ViewState;

pub const NODE_OPACITY_VISIBLE: f32 = 1.0;
pub const NODE_OPACITY_DIMMED: f32 = 0.2;
/// Grayscale filter strength applied to dimmed nodes.
pub const NODE_GRAYSCALE_DIMMED: f32 = 0.8;
pub const EDGE_OPACITY_VISIBLE: f32 = 0.6;
pub const EDGE_OPACITY_DIMMED: f32 = 0.1;
pub const EDGE_STROKE_VISIBLE: &str = "#999";
pub const EDGE_STROKE_DIMMED: &str = "#ccc";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeVisuals {
    pub opacity: f32,
    pub grayscale: f32,
    pub fill: &'static str,
    pub status_class: &'static str,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct NodeRenderContext {
    pub status: TaskStatus,
    pub visible: bool,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeVisuals {
    pub opacity: f32,
    pub stroke: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct EdgeRenderContext {
    pub source_visible: bool,
    pub target_visible: bool,
}

pub fn resolve_node_visuals(ctx: NodeRenderContext) -> NodeVisuals {
    let (opacity, grayscale) = if ctx.visible {
        (NODE_OPACITY_VISIBLE, 0.0)
    } else {
        (NODE_OPACITY_DIMMED, NODE_GRAYSCALE_DIMMED)
    };
    NodeVisuals {
        opacity,
        grayscale,
        fill: ctx.status.color(),
        status_class: ctx.status.css_class(),
        highlighted: ctx.highlighted,
    }
}

/// An edge is drawn normally only if both endpoints are visible.
pub fn resolve_edge_visuals(ctx: EdgeRenderContext) -> EdgeVisuals {
    if ctx.source_visible && ctx.target_visible {
        EdgeVisuals {
            opacity: EDGE_OPACITY_VISIBLE,
            stroke: EDGE_STROKE_VISIBLE,
        }
    } else {
        EdgeVisuals {
            opacity: EDGE_OPACITY_DIMMED,
            stroke: EDGE_STROKE_DIMMED,
        }
    }
}

/// Styles for every element of the scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleFrame {
    pub nodes: Vec<(TaskId, NodeVisuals)>,
    pub edges: Vec<(EdgeKey, EdgeVisuals)>,
}

impl StyleFrame {
    pub fn node(&self, id: &str) -> Option<&NodeVisuals> {
        self.nodes.iter().find(|(n, _)| n.as_str() == id).map(|(_, v)| v)
    }

    pub fn edge(&self, key: &EdgeKey) -> Option<&EdgeVisuals> {
        self.edges.iter().find(|(e, _)| e == key).map(|(_, v)| v)
    }

    pub fn build(scene: &Scene, view: &ViewState, visible: &HashSet<TaskId>) -> Self {
        let highlighted = view.highlighted();
        let nodes = scene
            .nodes()
            .iter()
            .map(|node| {
                let visuals = resolve_node_visuals(NodeRenderContext {
                    status: node.status,
                    visible: visible.contains(&node.id),
                    highlighted: highlighted == Some(&node.id),
                });
                (node.id.clone(), visuals)
            })
            .collect();
        let edges = scene
            .edges()
            .map(|edge| {
                let visuals = resolve_edge_visuals(EdgeRenderContext {
                    source_visible: visible.contains(&edge.source),
                    target_visible: visible.contains(&edge.target),
                });
                (edge.clone(), visuals)
            })
            .collect();
        Self { nodes, edges }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use task_graph_core::{Task, TaskSnapshot};
    use task_graph_layout::Position;

    #[test]
    fn test_dimmed_node() {
        let v = resolve_node_visuals(NodeRenderContext {
            status: TaskStatus::InProgress,
            visible: false,
            highlighted: false,
        });
        assert_eq!(v.opacity, 0.2);
        assert_eq!(v.grayscale, 0.8);
        assert_eq!(v.status_class, "in-progress");
    }

    #[test]
    fn test_edge_needs_both_endpoints() {
        let half = resolve_edge_visuals(EdgeRenderContext {
            source_visible: true,
            target_visible: false,
        });
        assert_eq!(half.opacity, 0.1);
        let full = resolve_edge_visuals(EdgeRenderContext {
            source_visible: true,
            target_visible: true,
        });
        assert_eq!(full.opacity, 0.6);
        assert_eq!(full.stroke, "#999");
    }

    #[test]
    fn test_style_frame_follows_view() {
        let snapshot = TaskSnapshot::new(vec![
            Task::new("1", "one"),
            Task::new("2", "two").with_dependency("1"),
        ]);
        let mut scene = Scene::new();
        scene.reconcile(&snapshot.to_graph(), |_| Some(Position::default()));

        let mut view = ViewState::default();
        view.selection.toggle("2".into());
        view.search = "two".into();
        let frame = StyleFrame::build(&scene, &view, &view.visible_ids(&snapshot));

        assert_eq!(frame.node("1").unwrap().opacity, 0.2);
        assert_eq!(frame.node("2").unwrap().opacity, 1.0);
        assert!(frame.node("2").unwrap().highlighted);
        assert!(!frame.node("1").unwrap().highlighted);
        assert_eq!(frame.edge(&EdgeKey::new("1", "2")).unwrap().opacity, 0.1);
    }
}
