//! Barnes-Hut quadtree for O(n log n) many-body repulsion.
//!
//! The quadtree recursively subdivides space and computes center of mass
//! for each cell. Distant cells can be approximated as single points,
//! reducing the O(n²) pairwise force calculation to O(n log n).

use crate::{Position, Velocity};

/// Minimum squared distance used when two bodies get very close.
const DISTANCE_MIN2: f32 = 1.0;

/// A flattened quadtree cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadTreeNode {
    /// Center of mass X
    pub center_x: f32,
    /// Center of mass Y
    pub center_y: f32,
    /// Total mass (number of bodies in this cell)
    pub mass: f32,
    /// Cell width (for Barnes-Hut theta criterion)
    pub width: f32,
    /// Child cells (NW, NE, SW, SE), -1 if absent
    pub children: [i32; 4],
    /// Offset of this leaf's bodies in the point list
    pub first_point: u32,
    /// Number of bodies stored directly in this leaf (0 for inner cells)
    pub point_count: u32,
}

impl QuadTreeNode {
    fn is_leaf(&self) -> bool {
        self.children.iter().all(|&c| c < 0)
    }
}

/// A Barnes-Hut quadtree for 2D spatial partitioning.
#[derive(Debug)]
pub struct QuadTree {
    /// Flattened tree cells, root first
    nodes: Vec<QuadTreeNode>,
    /// Body indices referenced by leaves
    points: Vec<usize>,
    /// Bounding box min
    bounds_min: Position,
    /// Bounding box max
    bounds_max: Position,
}

impl QuadTree {
    /// Build a quadtree from node positions.
    ///
    /// # Arguments
    /// * `positions` - Slice of node positions
    /// * `max_depth` - Maximum tree depth (typically 10-15)
    pub fn build(positions: &[Position], max_depth: usize) -> Self {
        if positions.is_empty() {
            return Self {
                nodes: vec![QuadTreeNode {
                    children: [-1; 4],
                    ..Default::default()
                }],
                points: Vec::new(),
                bounds_min: Position::default(),
                bounds_max: Position::default(),
            };
        }

        // Find bounding box with some padding
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;

        for pos in positions {
            min_x = min_x.min(pos.x);
            min_y = min_y.min(pos.y);
            max_x = max_x.max(pos.x);
            max_y = max_y.max(pos.y);
        }

        let padding = ((max_x - min_x).max(max_y - min_y) * 0.1).max(1.0);
        min_x -= padding;
        min_y -= padding;
        max_x += padding;
        max_y += padding;

        // Make it square
        let width = (max_x - min_x).max(max_y - min_y);
        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;

        let bounds_min = Position::new(center_x - width / 2.0, center_y - width / 2.0);
        let bounds_max = Position::new(center_x + width / 2.0, center_y + width / 2.0);

        let mut nodes = Vec::with_capacity(positions.len() * 2);
        let mut points = Vec::with_capacity(positions.len());
        let mut builder = TreeBuilder {
            positions,
            nodes: &mut nodes,
            points: &mut points,
            max_depth,
        };

        let indices: Vec<usize> = (0..positions.len()).collect();
        builder.build_node(&indices, bounds_min.x, bounds_min.y, width, 0);

        Self {
            nodes,
            points,
            bounds_min,
            bounds_max,
        }
    }

    /// Get the flattened tree cells.
    pub fn nodes(&self) -> &[QuadTreeNode] {
        &self.nodes
    }

    /// Get the bounding box.
    pub fn bounds(&self) -> (Position, Position) {
        (self.bounds_min, self.bounds_max)
    }

    /// Velocity change on body `index` from every other body, each of charge
    /// `strength` (negative repels). Cells whose `width / distance` is below
    /// `theta` are treated as a single body at their center of mass.
    pub fn repulsion(&self, positions: &[Position], index: usize, strength: f32, theta: f32) -> Velocity {
        let mut acc = Velocity::default();
        let Some(root) = self.nodes.first() else {
            return acc;
        };
        if root.mass == 0.0 {
            return acc;
        }

        let theta2 = theta * theta;
        let p = positions[index];
        let mut stack = vec![0usize];

        while let Some(cell_idx) = stack.pop() {
            let cell = &self.nodes[cell_idx];

            if !cell.is_leaf() {
                let dx = cell.center_x - p.x;
                let dy = cell.center_y - p.y;
                let l = dx * dx + dy * dy;
                if l > 0.0 && cell.width * cell.width / theta2 < l {
                    let l = soften(l);
                    acc.x += dx * strength * cell.mass / l;
                    acc.y += dy * strength * cell.mass / l;
                    continue;
                }
                stack.extend(cell.children.iter().filter(|&&c| c >= 0).map(|&c| c as usize));
                continue;
            }

            let start = cell.first_point as usize;
            let end = start + cell.point_count as usize;
            for &other in &self.points[start..end] {
                if other == index {
                    continue;
                }
                let q = positions[other];
                let (mut dx, mut dy) = (q.x - p.x, q.y - p.y);
                if dx == 0.0 && dy == 0.0 {
                    // Coincident bodies: separate along x, ordered by index.
                    dx = if other > index { 1e-3 } else { -1e-3 };
                    dy = 0.0;
                }
                let l = soften(dx * dx + dy * dy);
                acc.x += dx * strength / l;
                acc.y += dy * strength / l;
            }
        }

        acc
    }
}

fn soften(l: f32) -> f32 {
    if l < DISTANCE_MIN2 {
        (DISTANCE_MIN2 * l).sqrt()
    } else {
        l
    }
}

struct TreeBuilder<'a> {
    positions: &'a [Position],
    nodes: &'a mut Vec<QuadTreeNode>,
    points: &'a mut Vec<usize>,
    max_depth: usize,
}

impl<'a> TreeBuilder<'a> {
    fn build_node(&mut self, indices: &[usize], x: f32, y: f32, width: f32, depth: usize) -> i32 {
        if indices.is_empty() {
            return -1;
        }

        let node_idx = self.nodes.len() as i32;
        self.nodes.push(QuadTreeNode::default());

        // Compute center of mass
        let mut com_x = 0.0;
        let mut com_y = 0.0;
        let mass = indices.len() as f32;

        for &i in indices {
            com_x += self.positions[i].x;
            com_y += self.positions[i].y;
        }
        com_x /= mass;
        com_y /= mass;

        if indices.len() == 1 || depth >= self.max_depth {
            let first_point = self.points.len() as u32;
            self.points.extend_from_slice(indices);
            self.nodes[node_idx as usize] = QuadTreeNode {
                center_x: com_x,
                center_y: com_y,
                mass,
                width,
                children: [-1; 4],
                first_point,
                point_count: indices.len() as u32,
            };
            return node_idx;
        }

        // Subdivide into quadrants
        let half_width = width / 2.0;
        let mid_x = x + half_width;
        let mid_y = y + half_width;

        let mut nw_indices = Vec::new();
        let mut ne_indices = Vec::new();
        let mut sw_indices = Vec::new();
        let mut se_indices = Vec::new();

        for &i in indices {
            let pos = &self.positions[i];
            if pos.x < mid_x {
                if pos.y < mid_y {
                    sw_indices.push(i);
                } else {
                    nw_indices.push(i);
                }
            } else if pos.y < mid_y {
                se_indices.push(i);
            } else {
                ne_indices.push(i);
            }
        }

        let child_nw = self.build_node(&nw_indices, x, mid_y, half_width, depth + 1);
        let child_ne = self.build_node(&ne_indices, mid_x, mid_y, half_width, depth + 1);
        let child_sw = self.build_node(&sw_indices, x, y, half_width, depth + 1);
        let child_se = self.build_node(&se_indices, mid_x, y, half_width, depth + 1);

        self.nodes[node_idx as usize] = QuadTreeNode {
            center_x: com_x,
            center_y: com_y,
            mass,
            width,
            children: [child_nw, child_ne, child_sw, child_se],
            first_point: 0,
            point_count: 0,
        };

        node_idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree() {
        let tree = QuadTree::build(&[], 10);
        assert_eq!(tree.nodes().len(), 1);
        let acc = tree.repulsion(&[Position::default()], 0, -300.0, 0.9);
        assert_eq!(acc, Velocity::default());
    }

    #[test]
    fn test_single_node() {
        let positions = vec![Position::new(0.0, 0.0)];
        let tree = QuadTree::build(&positions, 10);
        assert_eq!(tree.nodes()[0].mass, 1.0);
        assert_eq!(tree.repulsion(&positions, 0, -300.0, 0.9), Velocity::default());
    }

    #[test]
    fn test_multiple_nodes() {
        let positions = vec![
            Position::new(0.0, 0.0),
            Position::new(100.0, 0.0),
            Position::new(0.0, 100.0),
            Position::new(100.0, 100.0),
        ];
        let tree = QuadTree::build(&positions, 10);
        assert!(tree.nodes().len() > 1);
    }

    #[test]
    fn test_repulsion_pushes_apart() {
        let positions = vec![Position::new(0.0, 0.0), Position::new(10.0, 0.0)];
        let tree = QuadTree::build(&positions, 10);
        let left = tree.repulsion(&positions, 0, -300.0, 0.9);
        let right = tree.repulsion(&positions, 1, -300.0, 0.9);
        assert!(left.x < 0.0);
        assert!(right.x > 0.0);
        assert!((left.x + right.x).abs() < 1e-3);
    }

    #[test]
    fn test_approximation_close_to_exact() {
        let positions: Vec<Position> = (0..40)
            .map(|i| {
                let a = i as f32 * 0.7;
                Position::new(a.cos() * (20.0 + i as f32 * 3.0), a.sin() * (20.0 + i as f32 * 3.0))
            })
            .collect();
        let tree = QuadTree::build(&positions, 12);
        let exact = tree.repulsion(&positions, 39, -300.0, 0.0001);
        let approx = tree.repulsion(&positions, 39, -300.0, 0.5);
        let err = ((exact.x - approx.x).powi(2) + (exact.y - approx.y).powi(2)).sqrt();
        let mag = (exact.x.powi(2) + exact.y.powi(2)).sqrt();
        assert!(err <= mag * 0.25 + 1e-3);
    }

    #[test]
    fn test_coincident_bodies_separate() {
        let positions = vec![Position::new(5.0, 5.0), Position::new(5.0, 5.0)];
        let tree = QuadTree::build(&positions, 4);
        let a = tree.repulsion(&positions, 0, -300.0, 0.9);
        let b = tree.repulsion(&positions, 1, -300.0, 0.9);
        assert!(a.x < 0.0 && b.x > 0.0);
    }
}
