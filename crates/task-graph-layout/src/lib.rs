//! Force-directed layout for task dependency graphs.
//!
//! This crate provides the force simulation that positions task nodes and the
//! stabilizer that settles newly introduced nodes before they are shown.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Live Simulation                         │
//! │  ┌────────────┐   ┌────────────┐   ┌────────────────────┐    │
//! │  │ Link force │──▶│ Many-body  │──▶│ Center / Collide / │──▶ integrate
//! │  │ (distance) │   │(Barnes-Hut)│   │ degree targets x,y │    │
//! │  └────────────┘   └────────────┘   └────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//!        ▲                                   │
//!        │ seeds for new nodes               │ positions per tick
//! ┌──────┴───────────────┐                   ▼
//! │ Stabilizer (shadow   │             renderer frames
//! │ copy, N warm-up ticks│
//! │ never rendered)      │
//! └──────────────────────┘
//! ```
//!
//! Positions are owned by the simulation and only change inside
//! [`Simulation::tick`]. Pins (user-fixed positions) are owned by the
//! interaction layer and only change through the `pin`/`unpin`/`drag_*`
//! methods.

mod error;
mod force;
mod quadtree;
mod simulation;
mod stabilizer;

pub use error::LayoutError;
pub use force::{ForceConfig, Role};
pub use quadtree::QuadTree;
pub use simulation::{LayoutState, Simulation};
pub use stabilizer::{Stabilizer, StabilizerConfig};

/// Result type for layout operations.
pub type LayoutResult<T> = std::result::Result<T, LayoutError>;

/// A 2D position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Position) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A 2D velocity.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

/// Size of the drawing area the layout targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 400.0,
        }
    }
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Position {
        Position::new(self.width / 2.0, self.height / 2.0)
    }
}
