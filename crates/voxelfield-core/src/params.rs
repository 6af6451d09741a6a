//! Pipeline parameters and grid configuration.

use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};

/// Side length of a compute workgroup along each axis. Grid sides must be a
/// multiple of this so the dispatch tiles the grid exactly.
pub const WORKGROUP_SIDE: u32 = 8;

/// Worst-case number of triangles a single marching-cubes cell can emit.
pub const MAX_TRIANGLES_PER_CELL: usize = 5;

/// The tunable generation inputs, checked for changes every tick.
///
/// A shadow copy of the last-applied value is kept by the generator; any
/// difference between the two triggers a full pipeline re-run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Spatial frequency of the density field.
    pub scale: f32,
    /// Isosurface threshold in [0, 1].
    pub threshold: f32,
    /// Integer offset into the density field, in grid cells.
    pub offset: IVec3,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            scale: 0.1,
            threshold: 0.5,
            offset: IVec3::ZERO,
        }
    }
}

impl PipelineParams {
    /// Checks that the parameters are usable by the pipeline.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) || !self.threshold.is_finite() {
            return Err(TerrainError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// The fixed shape of the sampling grid, set once at initialization.
///
/// Buffer capacities are derived from this and never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    side: u32,
}

impl GridSpec {
    /// Creates a grid spec, validating the side against the dispatch tiling.
    pub fn new(side: u32) -> Result<Self> {
        if side < WORKGROUP_SIDE || side % WORKGROUP_SIDE != 0 {
            return Err(TerrainError::InvalidGrid(side));
        }
        Ok(Self { side })
    }

    /// Grid side length in cells.
    #[must_use]
    pub fn side(&self) -> u32 {
        self.side
    }

    /// Total number of grid samples (`side^3`).
    #[must_use]
    pub fn cell_count(&self) -> usize {
        (self.side as usize).pow(3)
    }

    /// Fixed capacity of the appended-triangle buffer (`side^3 * 5`).
    ///
    /// A marching-cubes cell emits at most [`MAX_TRIANGLES_PER_CELL`]
    /// triangles and only interior cells emit at all, so this capacity
    /// cannot be exceeded by construction.
    #[must_use]
    pub fn triangle_capacity(&self) -> usize {
        self.cell_count() * MAX_TRIANGLES_PER_CELL
    }

    /// Number of workgroups along each axis for an 8x8x8 dispatch.
    #[must_use]
    pub fn workgroups_per_axis(&self) -> u32 {
        self.side / WORKGROUP_SIDE
    }

    /// Flattens grid coordinates to a sample index (`x + y*side + z*side^2`).
    #[must_use]
    pub fn sample_index(&self, x: u32, y: u32, z: u32) -> usize {
        let s = self.side as usize;
        (x as usize) + (y as usize) * s + (z as usize) * s * s
    }
}

/// Which backend executes the sampling and triangulation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Backend {
    /// Pure-CPU reference pipeline.
    #[default]
    Cpu,
    /// wgpu compute pipeline with synchronous readback.
    Gpu,
}

/// Configuration fixed at generator initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Grid side length; must be >= 8 and divisible by 8.
    pub chunk_side: u32,

    /// Backend to run the pipeline on.
    pub backend: Backend,

    /// Upper bound on positions returned by the diagnostic marker overlay.
    pub max_debug_markers: usize,

    /// Optional WGSL source overriding the built-in density function on the
    /// GPU backend. Must define `fn density_at(p: vec3<f32>) -> f32`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_wgsl: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            chunk_side: 32,
            backend: Backend::Cpu,
            max_debug_markers: 100,
            density_wgsl: None,
        }
    }
}

impl GeneratorConfig {
    /// Parses a configuration from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_spec_valid_sides() {
        for side in [8, 16, 32, 64] {
            let spec = GridSpec::new(side).expect("side divisible by 8");
            assert_eq!(spec.cell_count(), (side as usize).pow(3));
            assert_eq!(spec.triangle_capacity(), (side as usize).pow(3) * 5);
            assert_eq!(spec.workgroups_per_axis(), side / 8);
        }
    }

    #[test]
    fn test_grid_spec_rejects_bad_sides() {
        for side in [0, 1, 7, 12, 20] {
            assert!(matches!(
                GridSpec::new(side),
                Err(TerrainError::InvalidGrid(s)) if s == side
            ));
        }
    }

    #[test]
    fn test_sample_index_layout() {
        let spec = GridSpec::new(8).unwrap();
        assert_eq!(spec.sample_index(0, 0, 0), 0);
        assert_eq!(spec.sample_index(1, 0, 0), 1);
        assert_eq!(spec.sample_index(0, 1, 0), 8);
        assert_eq!(spec.sample_index(0, 0, 1), 64);
        assert_eq!(spec.sample_index(7, 7, 7), 511);
    }

    #[test]
    fn test_threshold_validation() {
        let mut params = PipelineParams::default();
        assert!(params.validate().is_ok());

        params.threshold = 1.0;
        assert!(params.validate().is_ok());

        params.threshold = -0.01;
        assert!(params.validate().is_err());

        params.threshold = f32::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_params_change_detection_per_field() {
        let base = PipelineParams::default();

        let mut changed = base;
        changed.scale += 0.001;
        assert_ne!(base, changed);

        let mut changed = base;
        changed.threshold += 0.001;
        assert_ne!(base, changed);

        let mut changed = base;
        changed.offset.x += 1;
        assert_ne!(base, changed);

        let mut changed = base;
        changed.offset.y += 1;
        assert_ne!(base, changed);

        let mut changed = base;
        changed.offset.z += 1;
        assert_ne!(base, changed);

        assert_eq!(base, base);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = GeneratorConfig {
            chunk_side: 16,
            backend: Backend::Gpu,
            max_debug_markers: 50,
            density_wgsl: None,
        };
        let json = config.to_json().unwrap();
        let back = GeneratorConfig::from_json(&json).unwrap();
        assert_eq!(back.chunk_side, 16);
        assert_eq!(back.backend, Backend::Gpu);
        assert_eq!(back.max_debug_markers, 50);

        assert!(GeneratorConfig::from_json("not json").is_err());
    }
}
