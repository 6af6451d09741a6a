//! Terrain generator lifecycle: initialization, per-tick change detection,
//! regeneration, and teardown.

use glam::Vec3;

use voxelfield_core::{
    assemble_mesh, sample_field, triangulate_field, Backend, DensityField, GeneratorConfig,
    GridSpec, NoiseField, PipelineParams, Result, TerrainError, TerrainMesh, Triangle,
};
use voxelfield_gpu::{GpuContext, IsosurfacePipeline};

/// What a call to [`TerrainGenerator::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Parameters changed (or this was the first tick); the mesh was rebuilt.
    Regenerated,
    /// Parameters match the last applied set; nothing ran.
    Idle,
}

enum BackendState {
    Cpu { field: Box<dyn DensityField> },
    Gpu { pipeline: IsosurfacePipeline },
}

/// Drives the full pipeline for one terrain chunk.
///
/// The generator holds the last applied parameter set; [`Self::tick`] only
/// regenerates when the incoming parameters differ from it, so it is cheap
/// to call every frame. [`Self::shutdown`] releases backend resources and
/// is idempotent; a released generator rejects further ticks.
pub struct TerrainGenerator {
    config: GeneratorConfig,
    spec: GridSpec,
    backend: BackendState,
    applied: Option<PipelineParams>,
    mesh: TerrainMesh,
    regeneration_count: u64,
    released: bool,
}

impl TerrainGenerator {
    /// Creates a generator with the built-in density field.
    ///
    /// The GPU backend acquires a headless device; the CPU backend uses the
    /// fractal noise reference field.
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let _ = env_logger::try_init();
        let spec = GridSpec::new(config.chunk_side)?;
        let backend = match config.backend {
            Backend::Cpu => {
                if config.density_wgsl.is_some() {
                    log::warn!("custom density shader ignored on the CPU backend");
                }
                BackendState::Cpu {
                    field: Box::new(NoiseField::default()),
                }
            }
            Backend::Gpu => {
                let context = GpuContext::new_blocking().map_err(TerrainError::from)?;
                let pipeline =
                    IsosurfacePipeline::new(context, spec, config.density_wgsl.as_deref())
                        .map_err(TerrainError::from)?;
                BackendState::Gpu { pipeline }
            }
        };
        log::info!(
            "terrain generator initialized: side {}, backend {:?}",
            spec.side(),
            config.backend
        );
        Ok(Self {
            config,
            spec,
            backend,
            applied: None,
            mesh: TerrainMesh::new(),
            regeneration_count: 0,
            released: false,
        })
    }

    /// Creates a CPU-backed generator over a caller-supplied density field.
    pub fn with_field(config: GeneratorConfig, field: Box<dyn DensityField>) -> Result<Self> {
        let _ = env_logger::try_init();
        let spec = GridSpec::new(config.chunk_side)?;
        if config.backend == Backend::Gpu {
            log::warn!("caller-supplied density field forces the CPU backend");
        }
        if config.density_wgsl.is_some() {
            log::warn!("custom density shader ignored with a caller-supplied field");
        }
        log::info!(
            "terrain generator initialized: side {}, backend Cpu (custom field)",
            spec.side()
        );
        Ok(Self {
            config,
            spec,
            backend: BackendState::Cpu { field },
            applied: None,
            mesh: TerrainMesh::new(),
            regeneration_count: 0,
            released: false,
        })
    }

    /// Compares `params` against the last applied set and regenerates the
    /// mesh if they differ. The first tick always regenerates.
    pub fn tick(&mut self, params: &PipelineParams) -> Result<TickOutcome> {
        if self.released {
            return Err(TerrainError::Released);
        }
        if self.applied.as_ref() == Some(params) {
            return Ok(TickOutcome::Idle);
        }
        params.validate()?;

        let triangles = self.run_pipeline(params)?;
        assemble_mesh(&mut self.mesh, &triangles);
        self.applied = Some(*params);
        self.regeneration_count += 1;
        log::debug!(
            "regenerated terrain: {} triangles (run {})",
            triangles.len(),
            self.regeneration_count
        );
        Ok(TickOutcome::Regenerated)
    }

    /// Forces a rebuild even when the parameters have not changed.
    pub fn regenerate(&mut self, params: &PipelineParams) -> Result<()> {
        self.applied = None;
        self.tick(params)?;
        Ok(())
    }

    fn run_pipeline(&mut self, params: &PipelineParams) -> Result<Vec<Triangle>> {
        match &mut self.backend {
            BackendState::Cpu { field } => {
                let samples = sample_field(&self.spec, params, field.as_ref());
                triangulate_field(&self.spec, params.threshold, &samples)
            }
            BackendState::Gpu { pipeline } => {
                pipeline.run(params).map_err(TerrainError::from)
            }
        }
    }

    /// The current assembled mesh. Empty until the first successful tick.
    #[must_use]
    pub fn mesh(&self) -> &TerrainMesh {
        &self.mesh
    }

    /// Leading mesh vertices for debug visualization, capped by
    /// `max_debug_markers` from the configuration.
    #[must_use]
    pub fn debug_markers(&self) -> &[Vec3] {
        let bound = self.config.max_debug_markers.min(self.mesh.positions.len());
        &self.mesh.positions[..bound]
    }

    /// The last applied parameter set, if any tick has run.
    #[must_use]
    pub fn applied_params(&self) -> Option<&PipelineParams> {
        self.applied.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    #[must_use]
    pub fn grid(&self) -> &GridSpec {
        &self.spec
    }

    #[must_use]
    pub fn regeneration_count(&self) -> u64 {
        self.regeneration_count
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Releases backend resources and clears the mesh. Safe to call more
    /// than once; later calls do nothing.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let BackendState::Gpu { pipeline } = &mut self.backend {
            pipeline.release();
        }
        self.mesh.clear();
        self.applied = None;
        log::info!("terrain generator shut down");
    }
}

impl Drop for TerrainGenerator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
