//! Error types for voxelfield.

use thiserror::Error;

/// The main error type for voxelfield operations.
#[derive(Error, Debug)]
pub enum TerrainError {
    /// The grid side length is unusable for the 8x8x8 dispatch tiling.
    #[error("invalid grid side {0}: must be >= 8 and divisible by 8")]
    InvalidGrid(u32),

    /// The isosurface threshold is outside [0, 1].
    #[error("invalid threshold {0}: must be in [0, 1]")]
    InvalidThreshold(f32),

    /// The triangulator emitted more triangles than the buffer can hold.
    #[error("triangle capacity exceeded: emitted {emitted}, capacity {capacity}")]
    CapacityExceeded { emitted: usize, capacity: usize },

    /// Data size mismatch between a declared count and the backing slice.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A required external resource (density function, lookup table) is unset
    /// or unusable at initialization.
    #[error("missing resource: {0}")]
    MissingResource(String),

    /// The pipeline's resources were already released by `shutdown()`.
    #[error("pipeline resources already released")]
    Released,

    /// An error surfaced from the GPU backend.
    #[error("GPU backend error: {0}")]
    Gpu(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for voxelfield operations.
pub type Result<T> = std::result::Result<T, TerrainError>;
