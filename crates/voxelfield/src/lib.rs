//! voxelfield: procedural voxel terrain via marching cubes.
//!
//! The pipeline samples a density field over a cubic grid, triangulates the
//! isosurface at a threshold, and assembles an unshared triangle-soup mesh
//! with grayscale density colors. Sampling and triangulation run either on
//! the GPU as compute kernels or on a CPU reference backend with identical
//! output semantics.
//!
//! # Quick Start
//!
//! ```no_run
//! use voxelfield::*;
//!
//! fn main() -> Result<()> {
//!     let mut generator = TerrainGenerator::new(GeneratorConfig::default())?;
//!
//!     let params = PipelineParams::default();
//!     generator.tick(&params)?;
//!     println!("{} triangles", generator.mesh().triangle_count());
//!
//!     generator.shutdown();
//!     Ok(())
//! }
//! ```

pub mod generator;

pub use generator::{TerrainGenerator, TickOutcome};

pub use voxelfield_core::{
    assemble_mesh, sample_field, triangulate_field, Backend, DensityField, GeneratorConfig,
    GridSample, GridSpec, NoiseField, PipelineParams, Result, TerrainError, TerrainMesh, Triangle,
};
pub use voxelfield_gpu::{GpuContext, GpuError, IsosurfacePipeline};

// Re-export glam types for convenience
pub use glam::{IVec3, Vec3, Vec4};
