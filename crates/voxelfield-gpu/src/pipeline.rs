//! wgpu compute pipeline for the terrain stages.

use voxelfield_core::params::{GridSpec, PipelineParams};
use voxelfield_core::tables;
use voxelfield_core::triangulate::Triangle;

use wgpu::util::DeviceExt;

use crate::context::GpuContext;
use crate::error::{GpuError, GpuResult};

const SHADER_SOURCE: &str = include_str!("shaders/terrain.wgsl");
const DENSITY_BEGIN: &str = "//--- density-begin";
const DENSITY_END: &str = "//--- density-end";

const SAMPLE_STRIDE: u64 = 32;
const TRIANGLE_STRIDE: u64 = 48;

/// Uniform block shared by both kernels. Must match `Params` in the shader.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ParamsUniform {
    scale: f32,
    threshold: f32,
    chunk_side: u32,
    capacity: u32,
    offset: [i32; 4],
}

impl ParamsUniform {
    fn new(spec: &GridSpec, params: &PipelineParams) -> Self {
        Self {
            scale: params.scale,
            threshold: params.threshold,
            chunk_side: spec.side(),
            capacity: spec.triangle_capacity() as u32,
            offset: [params.offset.x, params.offset.y, params.offset.z, 0],
        }
    }
}

/// Total lexicographic order over a triangle's twelve components.
fn triangle_order(x: &Triangle, y: &Triangle) -> std::cmp::Ordering {
    let xs = x.a.iter().chain(&x.b).chain(&x.c);
    let ys = y.a.iter().chain(&y.b).chain(&y.c);
    for (a, b) in xs.zip(ys) {
        let ord = a.total_cmp(b);
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }
    std::cmp::Ordering::Equal
}

/// Splices a custom density module into the shader source.
///
/// The region between the density markers is replaced wholesale; the
/// custom source must define `fn density_at(p: vec3<f32>) -> f32` and may
/// call the built-in noise helpers.
fn compose_shader(custom_density: Option<&str>) -> GpuResult<String> {
    let Some(custom) = custom_density else {
        return Ok(SHADER_SOURCE.to_owned());
    };
    if !custom.contains("fn density_at(") {
        return Err(GpuError::MissingDensityFunction);
    }
    let begin = SHADER_SOURCE
        .find(DENSITY_BEGIN)
        .ok_or_else(|| GpuError::ShaderCompilationFailed("density markers missing".into()))?;
    let end = SHADER_SOURCE
        .find(DENSITY_END)
        .ok_or_else(|| GpuError::ShaderCompilationFailed("density markers missing".into()))?;
    let mut source = String::with_capacity(SHADER_SOURCE.len() + custom.len());
    source.push_str(&SHADER_SOURCE[..begin]);
    source.push_str(custom);
    source.push('\n');
    source.push_str(&SHADER_SOURCE[end + DENSITY_END.len()..]);
    Ok(source)
}

/// GPU implementation of the sampling and triangulation stages.
///
/// Owns every buffer for one chunk size; [`Self::run`] can be called
/// repeatedly with different parameters without reallocating.
pub struct IsosurfacePipeline {
    context: GpuContext,
    spec: GridSpec,

    params_buffer: wgpu::Buffer,
    sample_buffer: wgpu::Buffer,
    triangle_buffer: wgpu::Buffer,
    counter_buffer: wgpu::Buffer,
    table_buffer: wgpu::Buffer,
    counter_staging: wgpu::Buffer,
    triangle_staging: wgpu::Buffer,

    bind_group: wgpu::BindGroup,
    sample_pipeline: wgpu::ComputePipeline,
    triangulate_pipeline: wgpu::ComputePipeline,

    released: bool,
}

impl IsosurfacePipeline {
    pub fn new(
        context: GpuContext,
        spec: GridSpec,
        custom_density: Option<&str>,
    ) -> GpuResult<Self> {
        let device = &context.device;
        let source = compose_shader(custom_density)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("terrain compute shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::ShaderCompilationFailed(err.to_string()));
        }

        let sample_bytes = spec.cell_count() as u64 * SAMPLE_STRIDE;
        let triangle_bytes = spec.triangle_capacity() as u64 * TRIANGLE_STRIDE;

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terrain params"),
            size: std::mem::size_of::<ParamsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sample_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("density samples"),
            size: sample_bytes,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let triangle_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("triangle append buffer"),
            size: triangle_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let counter_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("triangle counter"),
            size: 4,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let table_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("marching cubes table"),
            contents: bytemuck::cast_slice(&tables::unpack_gpu_table()),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let counter_staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("counter staging"),
            size: 4,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let triangle_staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("triangle staging"),
            size: triangle_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("terrain bind group layout"),
            entries: &[
                // Params
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<ParamsUniform>() as u64,
                        ),
                    },
                    count: None,
                },
                // Samples
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Triangles
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Counter
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(4),
                    },
                    count: None,
                },
                // Lookup table
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terrain bind group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: sample_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: triangle_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: counter_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: table_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("terrain pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let sample_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("density sampling pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("sample_density"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });
        let triangulate_pipeline =
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("triangulation pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some("triangulate"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });

        log::debug!(
            "isosurface pipeline ready: side {}, capacity {} triangles",
            spec.side(),
            spec.triangle_capacity()
        );

        Ok(Self {
            context,
            spec,
            params_buffer,
            sample_buffer,
            triangle_buffer,
            counter_buffer,
            table_buffer,
            counter_staging,
            triangle_staging,
            bind_group,
            sample_pipeline,
            triangulate_pipeline,
            released: false,
        })
    }

    /// Runs both stages and reads the appended triangles back.
    pub fn run(&self, params: &PipelineParams) -> GpuResult<Vec<Triangle>> {
        if self.released {
            return Err(GpuError::Released);
        }

        let device = &self.context.device;
        let queue = &self.context.queue;

        let uniform = ParamsUniform::new(&self.spec, params);
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&uniform));
        // Counter reset must land before the triangulation dispatch.
        queue.write_buffer(&self.counter_buffer, 0, bytemuck::bytes_of(&0_u32));

        let groups = self.spec.workgroups_per_axis();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("terrain dispatch encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("density sampling pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.sample_pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(groups, groups, groups);
        }
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("triangulation pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.triangulate_pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(groups, groups, groups);
        }
        encoder.copy_buffer_to_buffer(&self.counter_buffer, 0, &self.counter_staging, 0, 4);
        queue.submit(std::iter::once(encoder.finish()));

        let count = {
            let bytes = self.read_staging(&self.counter_staging, 4)?;
            u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
        };

        let capacity = self.spec.triangle_capacity();
        if count > capacity {
            log::warn!("triangle output clamped at capacity ({count} > {capacity})");
            return Err(GpuError::CapacityExceeded {
                emitted: count,
                capacity,
            });
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        let byte_count = count as u64 * TRIANGLE_STRIDE;
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("triangle readback encoder"),
        });
        encoder.copy_buffer_to_buffer(
            &self.triangle_buffer,
            0,
            &self.triangle_staging,
            0,
            byte_count,
        );
        queue.submit(std::iter::once(encoder.finish()));

        let bytes = self.read_staging(&self.triangle_staging, byte_count)?;
        let mut triangles: Vec<Triangle> = bytemuck::pod_collect_to_vec(&bytes);
        // Append slots come from atomicAdd, whose cross-invocation order the
        // scheduler decides. Sort into a canonical order so identical runs
        // return identical vectors.
        triangles.sort_unstable_by(triangle_order);
        Ok(triangles)
    }

    /// Maps `size` bytes of a staging buffer, copies them out and unmaps.
    fn read_staging(&self, buffer: &wgpu::Buffer, size: u64) -> GpuResult<Vec<u8>> {
        let buffer_slice = buffer.slice(..size);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.context.device.poll(wgpu::PollType::wait_indefinitely());
        rx.recv()
            .map_err(|_| GpuError::BufferMapFailed("map callback dropped".into()))?
            .map_err(|e| GpuError::BufferMapFailed(e.to_string()))?;

        let data = buffer_slice.get_mapped_range().to_vec();
        buffer.unmap();
        Ok(data)
    }

    #[must_use]
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    #[must_use]
    pub fn adapter_name(&self) -> &str {
        &self.context.adapter_name
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Destroys the GPU buffers. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.params_buffer.destroy();
        self.sample_buffer.destroy();
        self.triangle_buffer.destroy();
        self.counter_buffer.destroy();
        self.table_buffer.destroy();
        self.counter_staging.destroy();
        self.triangle_staging.destroy();
        log::debug!("isosurface pipeline released");
    }
}

impl Drop for IsosurfacePipeline {
    fn drop(&mut self) {
        self.release();
    }
}
