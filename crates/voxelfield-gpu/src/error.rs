//! GPU backend error types.

use thiserror::Error;
use voxelfield_core::TerrainError;

/// Errors that can occur in the GPU compute backend.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// A custom density module does not define the required entry function.
    #[error("density shader source does not define `fn density_at`")]
    MissingDensityFunction,

    /// Mapping a readback buffer failed.
    #[error("failed to map readback buffer: {0}")]
    BufferMapFailed(String),

    /// Triangle output overran the append buffer.
    #[error("triangle output overran capacity: {emitted} emitted, capacity {capacity}")]
    CapacityExceeded { emitted: usize, capacity: usize },

    /// The pipeline's resources were already released.
    #[error("pipeline resources already released")]
    Released,
}

impl From<GpuError> for TerrainError {
    fn from(err: GpuError) -> Self {
        match err {
            GpuError::CapacityExceeded { emitted, capacity } => {
                TerrainError::CapacityExceeded { emitted, capacity }
            }
            GpuError::Released => TerrainError::Released,
            GpuError::MissingDensityFunction => {
                TerrainError::MissingResource("density function `fn density_at`".into())
            }
            other => TerrainError::Gpu(other.to_string()),
        }
    }
}

/// A specialized Result type for GPU backend operations.
pub type GpuResult<T> = std::result::Result<T, GpuError>;
