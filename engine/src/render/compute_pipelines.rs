//! Compute Pipeline Infrastructure
//!
//! Creates one compute pipeline per kernel of the frame schedule, each with an
//! explicit bind group layout:
//! - paint: raises paint discs
//! - sand_setup / sand_step: one gravity sweep
//! - explosion_step / explosion_mesh: ages explosions, emits debris
//! - projectile_step / projectile_collide: projectile state machine and terrain hits
//! - mesher: exposed voxel faces
//!
//! Layouts are checked against the binding validator's tables on creation.

use std::num::NonZeroU64;

use crate::config::WorldConfig;
use crate::orchestrator::FrameStage;
use crate::render::binding_validator;
use crate::render::buffers::FrameUniforms;
use crate::render::shader_loader::{compose, create_shader_module};

/// Workgroup shape of `sand_step` (must match shader).
pub const SAND_WORKGROUP: [u32; 3] = [8, 1, 8];

/// Workgroup shape of `mesher` (must match shader).
pub const MESHER_WORKGROUP: [u32; 3] = [64, 4, 1];

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, min_size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(min_size),
        },
        count: None,
    }
}

/// Bind group 0 layout of a kernel.
pub fn layout_entries(config: &WorldConfig, stage: FrameStage) -> Vec<wgpu::BindGroupLayoutEntry> {
    let frame_size = std::mem::size_of::<FrameUniforms>() as u64;
    match stage {
        // @binding(0): storage<read_write> voxels
        // @binding(1): uniform PaintRequests
        FrameStage::Paint => vec![
            storage_entry(0, false),
            uniform_entry(1, u64::from(config.paint_slots) * 16),
        ],
        // @binding(0): storage<read_write> SandUniforms
        FrameStage::SandSetup => vec![storage_entry(0, false)],
        // @binding(0): storage<read_write> voxels
        // @binding(1): storage<read_write> SandUniforms
        FrameStage::SandStep => vec![storage_entry(0, false), storage_entry(1, false)],
        // @binding(0): uniform FrameUniforms
        // @binding(1..=3): storage<read_write> explosions, meshes, workgroups
        FrameStage::ExplosionStep => vec![
            uniform_entry(0, frame_size),
            storage_entry(1, false),
            storage_entry(2, false),
            storage_entry(3, false),
        ],
        // @binding(0): storage<read> meshes
        // @binding(1): storage<read_write> debris list
        FrameStage::ExplosionMesh => vec![storage_entry(0, true), storage_entry(1, false)],
        // @binding(0): uniform FrameUniforms
        // @binding(1..=4): storage<read_write> projectiles, mailbox, explosions, trail list
        FrameStage::ProjectileStep => vec![
            uniform_entry(0, frame_size),
            storage_entry(1, false),
            storage_entry(2, false),
            storage_entry(3, false),
            storage_entry(4, false),
        ],
        // @binding(0): storage<read_write> voxels
        // @binding(1): storage<read_write> projectiles
        FrameStage::ProjectileCollide => vec![storage_entry(0, false), storage_entry(1, false)],
        // @binding(0): storage<read_write> voxels
        // @binding(1): storage<read_write> face list
        FrameStage::Mesher => vec![storage_entry(0, false), storage_entry(1, false)],
    }
}

/// Direct dispatch size of a kernel; `None` for the indirectly dispatched explosion mesh.
pub fn dispatch_size(config: &WorldConfig, stage: FrameStage) -> Option<[u32; 3]> {
    let size = config.grid_size();
    let slots = |count: u32| count.div_ceil(WorldConfig::slot_workgroup_size(count));
    match stage {
        FrameStage::Paint => Some([slots(config.paint_slots), 1, 1]),
        FrameStage::SandSetup => Some([1, 1, 1]),
        FrameStage::SandStep => Some([
            size.x.div_ceil(SAND_WORKGROUP[0]),
            1,
            size.z.div_ceil(SAND_WORKGROUP[2]),
        ]),
        FrameStage::ExplosionStep | FrameStage::ProjectileStep | FrameStage::ProjectileCollide => {
            Some([slots(config.projectile_capacity), 1, 1])
        }
        FrameStage::ExplosionMesh => None,
        FrameStage::Mesher => Some([
            size.x.div_ceil(MESHER_WORKGROUP[0]),
            size.y.div_ceil(MESHER_WORKGROUP[1]),
            size.z.div_ceil(MESHER_WORKGROUP[2]),
        ]),
    }
}

/// One kernel's pipeline and the layout its bind groups are built against.
pub struct KernelPipeline {
    pub stage: FrameStage,
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Holds every compute pipeline of one world.
pub struct ComputePipelines {
    kernels: Vec<KernelPipeline>,
}

impl ComputePipelines {
    /// Compose, compile and lay out every kernel for `config`.
    pub fn new(device: &wgpu::Device, config: &WorldConfig) -> Self {
        let mut layouts = Vec::with_capacity(FrameStage::ALL.len());
        let kernels = FrameStage::ALL
            .iter()
            .map(|&stage| {
                let name = stage.name();
                let entries = layout_entries(config, stage);
                let module = create_shader_module(device, name, &compose(config, stage));

                let bind_group_layout =
                    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: Some(&format!("{name}_bind_group_layout")),
                        entries: &entries,
                    });

                let pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some(&format!("{name}_pipeline_layout")),
                        bind_group_layouts: &[&bind_group_layout],
                        push_constant_ranges: &[],
                    });

                let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(&format!("{name}_pipeline")),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: Some("main"),
                    compilation_options: Default::default(),
                    cache: None,
                });

                layouts.push((stage, entries));
                KernelPipeline {
                    stage,
                    pipeline,
                    bind_group_layout,
                }
            })
            .collect();

        let borrowed: Vec<(FrameStage, &[wgpu::BindGroupLayoutEntry])> = layouts
            .iter()
            .map(|(stage, entries)| (*stage, entries.as_slice()))
            .collect();
        binding_validator::validate_compute_bindings(&borrowed);

        Self { kernels }
    }

    /// Pipeline of one kernel.
    pub fn get(&self, stage: FrameStage) -> &KernelPipeline {
        // Built in `FrameStage::ALL` order, which is declaration order
        &self.kernels[stage as usize]
    }
}
