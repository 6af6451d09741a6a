//! End-to-end pipeline tests on the CPU backend.
//!
//! The CPU backend shares output semantics with the GPU kernels, so these
//! cover the full generate / tick / shutdown lifecycle without needing an
//! adapter. GPU-specific coverage lives in `gpu_backend_test.rs`.

use voxelfield::*;

fn cpu_config(side: u32) -> GeneratorConfig {
    GeneratorConfig {
        chunk_side: side,
        backend: Backend::Cpu,
        ..GeneratorConfig::default()
    }
}

/// Density field with a single flat interface at `y = level`.
struct PlaneField {
    level: f32,
}

impl DensityField for PlaneField {
    fn value(&self, p: Vec3) -> f32 {
        if p.y < self.level {
            1.0
        } else {
            0.0
        }
    }
}

#[test]
fn test_invalid_chunk_side_rejected() {
    for side in [0, 4, 7, 12] {
        let result = TerrainGenerator::new(cpu_config(side));
        assert!(
            matches!(result, Err(TerrainError::InvalidGrid(s)) if s == side),
            "side {side} should be rejected"
        );
    }
}

#[test]
fn test_first_tick_regenerates_then_idles() {
    let mut generator = TerrainGenerator::new(cpu_config(16)).unwrap();
    let params = PipelineParams::default();

    assert_eq!(generator.tick(&params).unwrap(), TickOutcome::Regenerated);
    assert_eq!(generator.regeneration_count(), 1);

    // Identical parameters are a no-op.
    for _ in 0..3 {
        assert_eq!(generator.tick(&params).unwrap(), TickOutcome::Idle);
    }
    assert_eq!(generator.regeneration_count(), 1);
}

#[test]
fn test_each_parameter_field_triggers_regeneration() {
    let mut generator = TerrainGenerator::new(cpu_config(16)).unwrap();
    let base = PipelineParams::default();
    generator.tick(&base).unwrap();

    let variants = [
        PipelineParams { scale: 0.2, ..base },
        PipelineParams { threshold: 0.4, ..base },
        PipelineParams {
            offset: IVec3::new(16, 0, 0),
            ..base
        },
    ];
    let mut expected = 1;
    for params in variants {
        assert_eq!(generator.tick(&params).unwrap(), TickOutcome::Regenerated);
        expected += 1;
        assert_eq!(generator.regeneration_count(), expected);
        assert_eq!(generator.applied_params(), Some(&params));
    }
}

#[test]
fn test_failed_tick_keeps_previous_state() {
    let mut generator = TerrainGenerator::new(cpu_config(16)).unwrap();
    let good = PipelineParams::default();
    generator.tick(&good).unwrap();
    let triangles_before = generator.mesh().triangle_count();

    let bad = PipelineParams {
        threshold: f32::NAN,
        ..good
    };
    assert!(generator.tick(&bad).is_err());

    // The shadow copy and mesh still reflect the last good run.
    assert_eq!(generator.applied_params(), Some(&good));
    assert_eq!(generator.mesh().triangle_count(), triangles_before);
    assert_eq!(generator.tick(&good).unwrap(), TickOutcome::Idle);
}

#[test]
fn test_plane_field_mesh_shape() {
    let config = cpu_config(16);
    let mut generator =
        TerrainGenerator::with_field(config, Box::new(PlaneField { level: 5.25 })).unwrap();
    let params = PipelineParams {
        scale: 1.0,
        threshold: 0.5,
        offset: IVec3::ZERO,
    };
    generator.tick(&params).unwrap();

    let mesh = generator.mesh();
    assert!(!mesh.is_empty());
    assert_eq!(mesh.vertex_count(), mesh.triangle_count() * 3);
    assert_eq!(
        mesh.indices,
        (0..mesh.vertex_count() as u32).collect::<Vec<_>>()
    );

    // All crossings sit between the sample rows around y = 5.25.
    for p in &mesh.positions {
        assert!(
            (5.0..=6.0).contains(&p.y),
            "vertex {p:?} off the interface"
        );
    }
    // Grayscale colors from clamped density values.
    for c in &mesh.colors {
        assert_eq!(c.x, c.y);
        assert_eq!(c.y, c.z);
        assert_eq!(c.w, 1.0);
        assert!((0.0..=1.0).contains(&c.x));
    }
    assert!(mesh.triangle_count() <= generator.grid().triangle_capacity());
}

#[test]
fn test_regeneration_is_deterministic() {
    let params = PipelineParams::default();

    let mut a = TerrainGenerator::new(cpu_config(16)).unwrap();
    a.tick(&params).unwrap();
    let mut b = TerrainGenerator::new(cpu_config(16)).unwrap();
    b.tick(&params).unwrap();

    assert_eq!(a.mesh().positions, b.mesh().positions);
    assert_eq!(a.mesh().colors, b.mesh().colors);

    // Force a rebuild on the same generator; output must not drift.
    let before = a.mesh().positions.clone();
    a.regenerate(&params).unwrap();
    assert_eq!(a.mesh().positions, before);
}

#[test]
fn test_offset_shifts_the_field_not_the_grid() {
    let field = |level| Box::new(PlaneField { level });
    let params = PipelineParams {
        scale: 1.0,
        threshold: 0.5,
        offset: IVec3::new(0, 2, 0),
    };
    // Grid y + offset 2 hits level 5.25 at grid y ~ 3.25.
    let mut generator = TerrainGenerator::with_field(cpu_config(16), field(5.25)).unwrap();
    generator.tick(&params).unwrap();
    for p in &generator.mesh().positions {
        assert!((3.0..=4.0).contains(&p.y), "vertex {p:?}");
    }
}

#[test]
fn test_debug_markers_respect_cap() {
    let mut config = cpu_config(16);
    config.max_debug_markers = 7;
    let mut generator =
        TerrainGenerator::with_field(config, Box::new(PlaneField { level: 5.25 })).unwrap();

    // Before any tick: empty mesh, no markers.
    assert!(generator.debug_markers().is_empty());

    let params = PipelineParams {
        scale: 1.0,
        ..PipelineParams::default()
    };
    generator.tick(&params).unwrap();
    assert!(generator.mesh().vertex_count() > 7);
    assert_eq!(generator.debug_markers().len(), 7);
    assert_eq!(generator.debug_markers(), &generator.mesh().positions[..7]);
}

#[test]
fn test_with_field_overrides_backend_config() {
    // A caller-supplied field always runs on the CPU: a config asking for
    // the GPU (plus a shader that would fail validation there) must not
    // require an adapter or reject construction.
    let config = GeneratorConfig {
        chunk_side: 16,
        backend: Backend::Gpu,
        density_wgsl: Some("not wgsl at all".to_owned()),
        ..GeneratorConfig::default()
    };
    let mut generator =
        TerrainGenerator::with_field(config, Box::new(PlaneField { level: 5.25 })).unwrap();
    let params = PipelineParams {
        scale: 1.0,
        ..PipelineParams::default()
    };
    assert_eq!(generator.tick(&params).unwrap(), TickOutcome::Regenerated);
    assert!(!generator.mesh().is_empty());
}

#[test]
fn test_shutdown_is_idempotent() {
    let mut generator = TerrainGenerator::new(cpu_config(16)).unwrap();
    generator.tick(&PipelineParams::default()).unwrap();
    assert!(!generator.mesh().is_empty());

    generator.shutdown();
    assert!(generator.is_released());
    assert!(generator.mesh().is_empty());
    assert!(generator.applied_params().is_none());

    // Further shutdowns are no-ops, further ticks fail.
    generator.shutdown();
    assert!(generator.is_released());
    assert!(matches!(
        generator.tick(&PipelineParams::default()),
        Err(TerrainError::Released)
    ));
}
