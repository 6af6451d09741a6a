//! The density-field contract and the CPU sampling stage.
//!
//! The actual density function is a pluggable collaborator: the pipeline
//! only requires something that maps a point to a scalar. A deterministic
//! fractal value-noise field is provided as the default.

use glam::Vec3;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::params::{GridSpec, PipelineParams};

/// One evaluated density-field point: position in grid space, scalar
/// density, and a grayscale visualization color.
///
/// Layout matches the 32-byte GPU buffer stride (`vec4` position+value,
/// `vec4` color).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GridSample {
    /// Grid-space position of the sample.
    pub position: [f32; 3],
    /// Density value, nominally in [0, 1].
    pub value: f32,
    /// RGBA color derived from the density.
    pub color: [f32; 4],
}

impl GridSample {
    /// The sample position as a vector.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// A scalar density function over 3D space.
///
/// Implementations must be deterministic: the pipeline's change detection
/// assumes that identical parameters produce an identical field.
pub trait DensityField: Send + Sync {
    /// Evaluates the density at a point. Values are expected in [0, 1] so
    /// they can be thresholded directly.
    fn value(&self, p: Vec3) -> f32;
}

/// Default density field: fractal Perlin noise remapped to [0, 1].
pub struct NoiseField {
    fbm: Fbm<Perlin>,
}

impl NoiseField {
    /// Creates a noise field from a seed.
    #[must_use]
    pub fn new(seed: u32) -> Self {
        Self {
            fbm: Fbm::<Perlin>::new(seed).set_octaves(4),
        }
    }
}

impl Default for NoiseField {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DensityField for NoiseField {
    fn value(&self, p: Vec3) -> f32 {
        let raw = self.fbm.get([f64::from(p.x), f64::from(p.y), f64::from(p.z)]);
        (raw as f32).mul_add(0.5, 0.5).clamp(0.0, 1.0)
    }
}

/// Evaluates the density field at every grid point, producing exactly
/// `side^3` samples in `x + y*side + z*side^2` order.
///
/// The sample position is the grid coordinate; the field is evaluated at
/// `(position + offset) * scale`, matching the kernel's uniform contract.
#[must_use]
pub fn sample_field(
    spec: &GridSpec,
    params: &PipelineParams,
    field: &dyn DensityField,
) -> Vec<GridSample> {
    let side = spec.side();
    let offset = params.offset.as_vec3();
    let mut samples = Vec::with_capacity(spec.cell_count());

    for z in 0..side {
        for y in 0..side {
            for x in 0..side {
                let position = Vec3::new(x as f32, y as f32, z as f32);
                let value = field.value((position + offset) * params.scale);
                samples.push(GridSample {
                    position: position.to_array(),
                    value,
                    color: [value, value, value, 1.0],
                });
            }
        }
    }

    debug_assert_eq!(samples.len(), spec.cell_count());
    samples
}
