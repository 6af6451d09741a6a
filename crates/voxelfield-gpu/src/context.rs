//! Headless GPU context.

use crate::error::{GpuError, GpuResult};

/// Owns the wgpu device and queue used by the compute pipeline.
///
/// The context is headless: no surface is created and no window is needed,
/// so it works in offscreen and CI environments as long as an adapter
/// exists.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
}

impl GpuContext {
    /// Creates a context on the highest-performance available adapter.
    pub async fn new_headless() -> GpuResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| GpuError::AdapterCreationFailed)?;

        let info = adapter.get_info();
        log::info!("using adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("voxelfield device (headless)"),
                required_features: wgpu::Features::empty(),
                // The 8x8x8 compute workgroups need 512 invocations, above
                // the 256 allowed by the WebGPU default limits.
                required_limits: wgpu::Limits {
                    max_compute_invocations_per_workgroup: 512,
                    ..wgpu::Limits::default()
                },
                ..wgpu::DeviceDescriptor::default()
            })
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_name: info.name,
        })
    }

    /// Blocking wrapper around [`Self::new_headless`] for non-async callers.
    pub fn new_blocking() -> GpuResult<Self> {
        pollster::block_on(Self::new_headless())
    }
}
