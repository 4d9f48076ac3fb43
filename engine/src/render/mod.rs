//! Render Module
//!
//! GPU side of the world: a headless wgpu context, the per-world buffers,
//! one compute pipeline per kernel and the [`GpuWorld`] that records a frame.
//! Drawing the resulting instance lists is left to the embedding renderer.

pub mod binding_validator;
pub mod buffers;
pub mod compute_pipelines;
pub mod gpu_context;
pub mod gpu_world;
pub mod shader_loader;

pub use binding_validator::{ExpectedBinding, ExpectedBindingType, expected_bindings};
pub use buffers::{BufferSizes, FrameUniforms, WorldBuffers};
pub use compute_pipelines::{ComputePipelines, KernelPipeline, dispatch_size, layout_entries};
pub use gpu_context::{GpuContext, GpuContextConfig};
pub use gpu_world::GpuWorld;
pub use shader_loader::{ShaderSource, compose, create_shader_module};
