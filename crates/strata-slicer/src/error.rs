//! Error types for the slicer.

use thiserror::Error;

/// Errors that can occur during slicing.
#[derive(Error, Debug)]
pub enum SlicerError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Invalid slicer configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A layer lost its outline or first perimeter during offsetting.
    ///
    /// Caught inside the sliced model, which drops the layer and goes on.
    #[error("layer {0} is empty after offsetting")]
    EmptyLayer(usize),

    /// The progress callback requested cancellation.
    #[error("slicing cancelled")]
    Cancelled,
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;
