//! CPU isosurface triangulation.
//!
//! Reference implementation of the triangulation stage: consumes a sampled
//! density field and the lookup table, emits appended triangle records in
//! the same format the GPU kernel writes. No vertex sharing — every
//! triangle carries its own three vertices.

use glam::{Vec3, Vec4};

use crate::error::{Result, TerrainError};
use crate::field::GridSample;
use crate::params::GridSpec;
use crate::tables::{self, CORNER_OFFSETS, EDGE_CORNERS};

/// One emitted surface triangle: three 4-component vertices where `xyz` is
/// the grid-space position and `w` carries the cell's density value.
///
/// Layout matches the 48-byte GPU buffer stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Triangle {
    pub a: [f32; 4],
    pub b: [f32; 4],
    pub c: [f32; 4],
}

/// Triangulates a sampled density field against a threshold.
///
/// Walks every interior cell (cells touching the `side - 1` boundary have
/// no +1 neighbors and emit nothing), builds the 8-bit corner configuration,
/// and emits the table-driven triangles with vertices interpolated along
/// crossing edges.
///
/// # Errors
///
/// Returns [`TerrainError::SizeMismatch`] if `samples` does not hold exactly
/// `side^3` entries, and [`TerrainError::CapacityExceeded`] if the emitted
/// count would overrun the fixed `side^3 * 5` capacity.
pub fn triangulate_field(
    spec: &GridSpec,
    threshold: f32,
    samples: &[GridSample],
) -> Result<Vec<Triangle>> {
    triangulate_bounded(spec, threshold, samples, spec.triangle_capacity())
}

/// Triangulation against an explicit capacity. On overflow the walk keeps
/// counting (without interpolating) so the error reports the true total,
/// exactly like the GPU kernel's atomic counter.
fn triangulate_bounded(
    spec: &GridSpec,
    threshold: f32,
    samples: &[GridSample],
    capacity: usize,
) -> Result<Vec<Triangle>> {
    if samples.len() != spec.cell_count() {
        return Err(TerrainError::SizeMismatch {
            expected: spec.cell_count(),
            actual: samples.len(),
        });
    }

    let side = spec.side();
    let mut emitted = 0_usize;
    let mut triangles = Vec::new();

    let mut corner_pos = [Vec3::ZERO; 8];
    let mut corner_val = [0.0_f32; 8];

    for z in 0..side - 1 {
        for y in 0..side - 1 {
            for x in 0..side - 1 {
                for (corner, &(dx, dy, dz)) in CORNER_OFFSETS.iter().enumerate() {
                    let sample = &samples[spec.sample_index(x + dx, y + dy, z + dz)];
                    corner_pos[corner] = sample.position();
                    corner_val[corner] = sample.value;
                }

                let mut config = 0_u8;
                for (corner, &val) in corner_val.iter().enumerate() {
                    if val < threshold {
                        config |= 1 << corner;
                    }
                }
                if config == 0 || config == 255 {
                    continue;
                }

                // w carries the cell-origin density, clamped for grayscale use.
                let w = corner_val[0].clamp(0.0, 1.0);
                let count = tables::triangle_count(config);
                for tri in 0..count {
                    emitted += 1;
                    if emitted > capacity {
                        continue;
                    }
                    let a = edge_vertex(config, tri * 3, threshold, &corner_pos, &corner_val);
                    let b = edge_vertex(config, tri * 3 + 1, threshold, &corner_pos, &corner_val);
                    let c = edge_vertex(config, tri * 3 + 2, threshold, &corner_pos, &corner_val);
                    triangles.push(Triangle {
                        a: Vec4::new(a.x, a.y, a.z, w).to_array(),
                        b: Vec4::new(b.x, b.y, b.z, w).to_array(),
                        c: Vec4::new(c.x, c.y, c.z, w).to_array(),
                    });
                }
            }
        }
    }

    if emitted > capacity {
        return Err(TerrainError::CapacityExceeded { emitted, capacity });
    }
    Ok(triangles)
}

/// Interpolates the position where the density crosses the threshold along
/// the edge of the `i`-th emitted vertex.
fn edge_vertex(
    config: u8,
    i: usize,
    threshold: f32,
    corner_pos: &[Vec3; 8],
    corner_val: &[f32; 8],
) -> Vec3 {
    let edge = tables::edge_of(config, i);
    let (ca, cb) = EDGE_CORNERS[edge];
    let va = corner_val[ca];
    let vb = corner_val[cb];
    let denom = vb - va;
    let t = if denom.abs() < 1e-10 {
        0.5
    } else {
        ((threshold - va) / denom).clamp(0.0, 1.0)
    };
    corner_pos[ca].lerp(corner_pos[cb], t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{sample_field, DensityField};
    use crate::params::PipelineParams;

    /// Spherical bump: 1 at the grid center, falling off with distance.
    struct SphereField {
        center: Vec3,
        radius: f32,
    }

    impl DensityField for SphereField {
        fn value(&self, p: Vec3) -> f32 {
            (1.0 - (p - self.center).length() / self.radius).clamp(0.0, 1.0)
        }
    }

    fn sphere_params() -> (GridSpec, PipelineParams, SphereField) {
        let spec = GridSpec::new(16).unwrap();
        // scale 1 / offset 0 so field space equals grid space.
        let params = PipelineParams {
            scale: 1.0,
            threshold: 0.5,
            offset: glam::IVec3::ZERO,
        };
        let field = SphereField {
            center: Vec3::splat(8.0),
            radius: 6.0,
        };
        (spec, params, field)
    }

    #[test]
    fn test_uniform_field_emits_nothing() {
        let spec = GridSpec::new(8).unwrap();
        let params = PipelineParams::default();

        struct Constant(f32);
        impl DensityField for Constant {
            fn value(&self, _: Vec3) -> f32 {
                self.0
            }
        }

        for value in [0.0, 1.0] {
            let samples = sample_field(&spec, &params, &Constant(value));
            let tris = triangulate_field(&spec, params.threshold, &samples).unwrap();
            assert!(tris.is_empty(), "constant field {value} emitted triangles");
        }
    }

    #[test]
    fn test_sphere_produces_bounded_surface() {
        let (spec, params, field) = sphere_params();
        let samples = sample_field(&spec, &params, &field);
        let tris = triangulate_field(&spec, params.threshold, &samples).unwrap();

        assert!(tris.len() > 100, "expected a closed surface, got {}", tris.len());
        assert!(tris.len() <= spec.triangle_capacity());

        // Every vertex sits near the implicit sphere of radius 3
        // (value 0.5 crossing at distance radius/2 from center).
        let surface_r = 3.0;
        for tri in &tris {
            for v in [tri.a, tri.b, tri.c] {
                let p = Vec3::new(v[0], v[1], v[2]);
                let dist = (p - Vec3::splat(8.0)).length();
                assert!(
                    (dist - surface_r).abs() < 1.0,
                    "vertex {p:?} at distance {dist} from center"
                );
            }
        }
    }

    #[test]
    fn test_vertices_stay_inside_grid() {
        let (spec, params, field) = sphere_params();
        let samples = sample_field(&spec, &params, &field);
        let tris = triangulate_field(&spec, params.threshold, &samples).unwrap();
        let max = (spec.side() - 1) as f32;
        for tri in &tris {
            for v in [tri.a, tri.b, tri.c] {
                for coord in &v[0..3] {
                    assert!((0.0..=max).contains(coord));
                }
            }
        }
    }

    #[test]
    fn test_determinism() {
        let (spec, params, field) = sphere_params();
        let samples = sample_field(&spec, &params, &field);
        let a = triangulate_field(&spec, params.threshold, &samples).unwrap();
        let b = triangulate_field(&spec, params.threshold, &samples).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_sample_count_rejected() {
        use bytemuck::Zeroable;
        let spec = GridSpec::new(8).unwrap();
        let samples = vec![GridSample::zeroed(); 10];
        assert!(matches!(
            triangulate_field(&spec, 0.5, &samples),
            Err(TerrainError::SizeMismatch { expected: 512, actual: 10 })
        ));
    }

    #[test]
    fn test_capacity_error_reports_true_total() {
        let (spec, params, field) = sphere_params();
        let samples = sample_field(&spec, &params, &field);
        let full = triangulate_field(&spec, params.threshold, &samples)
            .unwrap()
            .len();
        assert!(full > 3);

        // With a squeezed capacity the walk still counts every triangle the
        // surface would emit, matching the GPU counter's payload.
        match triangulate_bounded(&spec, params.threshold, &samples, 3) {
            Err(TerrainError::CapacityExceeded { emitted, capacity }) => {
                assert_eq!(emitted, full);
                assert_eq!(capacity, 3);
            }
            other => panic!("expected capacity error, got {other:?}"),
        }
    }

    #[test]
    fn test_w_component_is_shared_per_triangle() {
        let (spec, params, field) = sphere_params();
        let samples = sample_field(&spec, &params, &field);
        let tris = triangulate_field(&spec, params.threshold, &samples).unwrap();
        for tri in &tris {
            assert_eq!(tri.a[3], tri.b[3]);
            assert_eq!(tri.b[3], tri.c[3]);
            assert!((0.0..=1.0).contains(&tri.a[3]));
        }
    }
}
