//! Core abstractions for voxelfield.
//!
//! This crate holds the CPU side of the terrain pipeline:
//! - [`DensityField`] trait and the built-in fractal noise field
//! - Grid sampling into the shared [`GridSample`] record layout
//! - Marching-cubes lookup tables and the reference triangulator
//! - Mesh assembly from appended triangle records
//! - Pipeline parameters, grid geometry, and configuration

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod error;
pub mod field;
pub mod mesh;
pub mod params;
pub mod tables;
pub mod triangulate;

pub use error::{Result, TerrainError};
pub use field::{sample_field, DensityField, GridSample, NoiseField};
pub use mesh::{assemble_mesh, TerrainMesh};
pub use params::{
    Backend, GeneratorConfig, GridSpec, PipelineParams, MAX_TRIANGLES_PER_CELL, WORKGROUP_SIDE,
};
pub use tables::{unpack_gpu_table, GPU_TABLE_STRIDE, TABLE_CONFIGS};
pub use triangulate::{triangulate_field, Triangle};

// Re-export glam types for convenience
pub use glam::{IVec3, Vec3, Vec4};
