//! Overview projection of the whole graph plus the visible window.

use std::collections::HashMap;

use task_graph_core::{EdgeKey, TaskId};
use task_graph_layout::{Position, Viewport};

use crate::view::Transform;

/// Minimap edge length as a fraction of the smaller viewport side.
pub const MINIMAP_FRACTION: f32 = 0.2;
/// Graph-space padding around the node bounds.
pub const MINIMAP_PADDING: f32 = 20.0;
/// Distance from the bottom-right corner of the viewport.
pub const MINIMAP_MARGIN: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Everything in minimap-local coordinates (`0..size` on both axes).
#[derive(Debug, Clone, PartialEq)]
pub struct Minimap {
    pub size: f32,
    /// Top-left corner of the minimap on the canvas.
    pub origin: Position,
    pub nodes: Vec<(TaskId, Position)>,
    pub edges: Vec<(EdgeKey, Position, Position)>,
    /// The part of the graph currently on screen.
    pub window: Rect,
}

/// Linear map from one interval onto `0..size`.
#[derive(Debug, Clone, Copy)]
struct Scale {
    min: f32,
    span: f32,
    size: f32,
}

impl Scale {
    fn new(min: f32, max: f32, size: f32) -> Self {
        let (min, max) = (min - MINIMAP_PADDING, max + MINIMAP_PADDING);
        Self {
            min,
            span: max - min,
            size,
        }
    }

    fn map(&self, v: f32) -> f32 {
        (v - self.min) / self.span * self.size
    }
}

/// Project node positions. Returns `None` when there is nothing to draw.
pub fn project<'a, N, E>(positions: N, edges: E, transform: Transform, viewport: Viewport) -> Option<Minimap>
where
    N: IntoIterator<Item = (&'a TaskId, Position)>,
    E: IntoIterator<Item = &'a EdgeKey>,
{
    let positions: Vec<(&TaskId, Position)> = positions.into_iter().collect();
    if positions.is_empty() {
        return None;
    }

    let size = viewport.width.min(viewport.height) * MINIMAP_FRACTION;
    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for (_, p) in &positions {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let sx = Scale::new(min_x, max_x, size);
    let sy = Scale::new(min_y, max_y, size);
    let project = |p: Position| Position::new(sx.map(p.x), sy.map(p.y));

    let by_id: HashMap<&TaskId, Position> = positions.iter().copied().collect();
    let edges = edges
        .into_iter()
        .filter_map(|e| {
            let s = by_id.get(&e.source)?;
            let t = by_id.get(&e.target)?;
            Some((e.clone(), project(*s), project(*t)))
        })
        .collect();

    let vx = -transform.x / transform.k;
    let vy = -transform.y / transform.k;
    let vw = viewport.width / transform.k;
    let vh = viewport.height / transform.k;
    let window = Rect {
        x: sx.map(vx),
        y: sy.map(vy),
        width: sx.map(vx + vw) - sx.map(vx),
        height: sy.map(vy + vh) - sy.map(vy),
    };

    Some(Minimap {
        size,
        origin: Position::new(
            viewport.width - size - MINIMAP_MARGIN,
            viewport.height - size - MINIMAP_MARGIN * (viewport.height / viewport.width),
        ),
        nodes: positions.into_iter().map(|(id, p)| (id.clone(), project(p))).collect(),
        edges,
        window,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph_has_no_minimap() {
        let none: Vec<(&TaskId, Position)> = Vec::new();
        assert!(project(none, [], Transform::IDENTITY, Viewport::default()).is_none());
    }

    #[test]
    fn test_projection_fits_size() {
        let a = TaskId::from("a");
        let b = TaskId::from("b");
        let edge = EdgeKey::new("a", "b");
        let positions = vec![(&a, Position::new(0.0, 0.0)), (&b, Position::new(100.0, 100.0))];
        let map = project(positions, [&edge], Transform::IDENTITY, Viewport::new(800.0, 400.0)).unwrap();

        assert_eq!(map.size, 80.0);
        assert_eq!(map.origin, Position::new(680.0, 340.0 - 20.0));
        for (_, p) in &map.nodes {
            assert!(p.x > 0.0 && p.x < map.size && p.y > 0.0 && p.y < map.size);
        }
        assert_eq!(map.edges.len(), 1);
        assert!((map.window.x - 20.0 / 140.0 * 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_zooming_in_shrinks_window() {
        let a = TaskId::from("a");
        let b = TaskId::from("b");
        let positions = || vec![(&a, Position::new(0.0, 0.0)), (&b, Position::new(400.0, 200.0))];
        let viewport = Viewport::new(800.0, 400.0);
        let wide = project(positions(), [], Transform::IDENTITY, viewport).unwrap();
        let close = project(positions(), [], Transform::new(0.0, 0.0, 2.0), viewport).unwrap();
        assert!((close.window.width - wide.window.width / 2.0).abs() < 1e-3);
    }
}
