//! Error types for layout operations.

use thiserror::Error;

/// Errors that can occur while laying out a graph.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// A node referenced by id is not part of the simulation.
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// Invalid graph data.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// The simulation produced a NaN or infinite coordinate.
    #[error("Non-finite position for node {id}")]
    NonFinite { id: String },
}
