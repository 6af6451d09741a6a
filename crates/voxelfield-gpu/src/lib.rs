//! GPU backend for voxelfield.
//!
//! Runs the density sampling and triangulation stages as wgpu compute
//! kernels over 8x8x8 workgroups, with synchronous readback of the
//! appended triangle buffer. Works headless; requires only a compute
//! capable adapter.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Buffer sizes and counts cross the u32/usize boundary at the wgpu API
#![allow(clippy::cast_possible_truncation)]

pub mod context;
pub mod error;
pub mod pipeline;

pub use context::GpuContext;
pub use error::{GpuError, GpuResult};
pub use pipeline::IsosurfacePipeline;
