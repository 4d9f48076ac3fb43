//! GPU Context
//!
//! Headless device and queue for the compute world. No surface is created:
//! the world only produces buffers, and whoever draws them brings their own.

use wgpu::util::DeviceExt;

use crate::error::{WorldError, WorldResult};

/// Shared GPU resources
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

/// Configuration for GPU context creation
#[derive(Clone, Debug)]
pub struct GpuContextConfig {
    /// Prefer high-performance GPU
    pub high_performance: bool,
    /// Accept a software adapter when no hardware one is present
    pub allow_fallback: bool,
}

impl Default for GpuContextConfig {
    fn default() -> Self {
        Self {
            high_performance: true,
            allow_fallback: false,
        }
    }
}

impl GpuContext {
    /// Acquire an adapter and device. Fails if the machine has no usable GPU.
    pub fn new(config: GpuContextConfig) -> WorldResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: if config.high_performance {
                wgpu::PowerPreference::HighPerformance
            } else {
                wgpu::PowerPreference::LowPower
            },
            compatible_surface: None,
            force_fallback_adapter: config.allow_fallback,
        }))
        .map_err(|e| WorldError::AdapterUnavailable(e.to_string()))?;

        let adapter_info = adapter.get_info();
        let adapter_limits = adapter.limits();

        // Large grids need the adapter's real storage limits, not the portable defaults
        let required_limits = wgpu::Limits {
            max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
            max_buffer_size: adapter_limits.max_buffer_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Sandfall Device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        }))?;

        log::info!(
            "[GpuContext] Using {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Device limits the world's buffers are checked against.
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Create a uniform buffer with initial data
    pub fn create_uniform_buffer<T: bytemuck::Pod>(&self, label: &str, data: &T) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(data),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Create a uniform buffer holding a slice (paint request arrays)
    pub fn create_uniform_array<T: bytemuck::Pod>(&self, label: &str, data: &[T]) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Create a zeroed storage buffer
    pub fn create_storage_buffer(&self, label: &str, size: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Create a storage buffer with initial contents and extra usages (indirect, vertex)
    pub fn create_storage_buffer_init(
        &self,
        label: &str,
        contents: &[u8],
        extra_usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | extra_usage,
            })
    }

    /// Write data to a buffer
    pub fn write_buffer<T: bytemuck::Pod>(&self, buffer: &wgpu::Buffer, data: &[T]) {
        self.queue
            .write_buffer(buffer, 0, bytemuck::cast_slice(data));
    }
}
