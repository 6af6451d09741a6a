//! Generates a terrain chunk and prints mesh statistics.
//!
//! Run with: cargo run --example `terrain_demo`
//!
//! Uses the GPU backend when an adapter is available and falls back to the
//! CPU reference backend otherwise.

use voxelfield::*;

fn main() -> Result<()> {
    env_logger::init();

    let mut generator = match TerrainGenerator::new(GeneratorConfig {
        chunk_side: 32,
        backend: Backend::Gpu,
        ..GeneratorConfig::default()
    }) {
        Ok(g) => g,
        Err(e) => {
            log::warn!("GPU backend unavailable ({e}), using CPU backend");
            TerrainGenerator::new(GeneratorConfig {
                chunk_side: 32,
                backend: Backend::Cpu,
                ..GeneratorConfig::default()
            })?
        }
    };

    let mut params = PipelineParams {
        scale: 0.08,
        threshold: 0.5,
        offset: IVec3::ZERO,
    };
    generator.tick(&params)?;
    print_stats(&generator);

    // A second tick with the same parameters is a no-op.
    assert_eq!(generator.tick(&params)?, TickOutcome::Idle);

    // Move one chunk along x and regenerate.
    params.offset.x += 32;
    generator.tick(&params)?;
    print_stats(&generator);

    generator.shutdown();
    Ok(())
}

fn print_stats(generator: &TerrainGenerator) {
    let mesh = generator.mesh();
    println!(
        "chunk at {:?}: {} triangles, {} vertices, {} debug markers",
        generator.applied_params().map(|p| p.offset),
        mesh.triangle_count(),
        mesh.vertex_count(),
        generator.debug_markers().len()
    );
}
