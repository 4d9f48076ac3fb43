//! GPU World
//!
//! Owns the device-side state of a world and records one frame as a single
//! compute pass following [`frame_schedule`]. The host only ever writes:
//! frame uniforms, paint requests and the spawn mailbox go up before the
//! pass, and nothing is read back.

use glam::Vec3;

use crate::config::WorldConfig;
use crate::error::{WorldError, WorldResult};
use crate::orchestrator::{FrameStage, PaintQueue, Simulation, clamp_delta, frame_schedule};
use crate::physics::projectiles::GpuSpawnMailbox;
use crate::render::buffers::{FrameUniforms, WorldBuffers};
use crate::render::compute_pipelines::{ComputePipelines, dispatch_size};
use crate::render::gpu_context::GpuContext;
use crate::world::instances::INSTANCE_COUNT_OFFSET;
use crate::world::painter::PaintRequest;

/// A world simulated on the GPU.
pub struct GpuWorld {
    context: GpuContext,
    config: WorldConfig,
    schedule: Vec<FrameStage>,
    pipelines: ComputePipelines,
    buffers: WorldBuffers,
    bind_groups: Vec<wgpu::BindGroup>,
    paint: PaintQueue,
    pending_shot: Option<GpuSpawnMailbox>,
    frame_index: u64,
}

impl GpuWorld {
    /// Build pipelines and buffers for `config` on an existing context.
    pub fn new(context: GpuContext, config: WorldConfig) -> WorldResult<Self> {
        config.validate()?;

        let max_groups = context.limits().max_compute_workgroups_per_dimension;
        for stage in FrameStage::ALL {
            if let Some(groups) = dispatch_size(&config, stage)
                && groups.iter().any(|&g| g > max_groups)
            {
                return Err(WorldError::InvalidConfig(format!(
                    "{} needs {:?} workgroups, device allows {} per dimension",
                    stage.name(),
                    groups,
                    max_groups
                )));
            }
        }
        // One explosion mesh workgroup row per live explosion
        if config.projectile_capacity > max_groups {
            return Err(WorldError::InvalidConfig(format!(
                "projectile_capacity {} exceeds the {} workgroups the explosion mesh dispatch allows",
                config.projectile_capacity, max_groups
            )));
        }

        let buffers = WorldBuffers::new(&context, &config)?;
        let pipelines = ComputePipelines::new(&context.device, &config);
        let bind_groups = FrameStage::ALL
            .iter()
            .map(|&stage| create_bind_group(&context.device, &pipelines, &buffers, stage))
            .collect();

        let size = config.grid_size();
        log::info!(
            "[GpuWorld] {}x{}x{} grid, {} projectile slots, {} face capacity",
            size.x,
            size.y,
            size.z,
            config.projectile_capacity,
            config.face_capacity()
        );

        Ok(Self {
            schedule: frame_schedule(size.y),
            paint: PaintQueue::new(&config),
            pending_shot: None,
            frame_index: 0,
            context,
            config,
            pipelines,
            buffers,
            bind_groups,
        })
    }

    /// Buffers for a renderer to draw from.
    pub fn buffers(&self) -> &WorldBuffers {
        &self.buffers
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Upload the frame's host inputs.
    fn upload(&mut self, delta: f32) {
        let ctx = &self.context;
        ctx.write_buffer(&self.buffers.frame, &[FrameUniforms::new(delta)]);
        ctx.write_buffer(&self.buffers.paint, self.paint.slots());
        if let Some(mailbox) = self.pending_shot.take() {
            ctx.write_buffer(&self.buffers.mailbox, &[mailbox]);
        }
    }

    /// Record the counter clears and the frame's compute pass.
    fn encode(&self, encoder: &mut wgpu::CommandEncoder) {
        let count = Some(4);
        encoder.clear_buffer(&self.buffers.faces, INSTANCE_COUNT_OFFSET, count);
        encoder.clear_buffer(&self.buffers.trails, INSTANCE_COUNT_OFFSET, count);
        encoder.clear_buffer(&self.buffers.debris, INSTANCE_COUNT_OFFSET, count);
        encoder.clear_buffer(&self.buffers.explosion_workgroups, 4, count);

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("world_frame_pass"),
            timestamp_writes: None,
        });
        for &stage in &self.schedule {
            pass.set_pipeline(&self.pipelines.get(stage).pipeline);
            pass.set_bind_group(0, &self.bind_groups[stage as usize], &[]);
            match dispatch_size(&self.config, stage) {
                Some([x, y, z]) => pass.dispatch_workgroups(x, y, z),
                None => pass.dispatch_workgroups_indirect(&self.buffers.explosion_workgroups, 0),
            }
        }
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    pipelines: &ComputePipelines,
    buffers: &WorldBuffers,
    stage: FrameStage,
) -> wgpu::BindGroup {
    let resources: Vec<&wgpu::Buffer> = match stage {
        FrameStage::Paint => vec![&buffers.voxels, &buffers.paint],
        FrameStage::SandSetup => vec![&buffers.sand],
        FrameStage::SandStep => vec![&buffers.voxels, &buffers.sand],
        FrameStage::ExplosionStep => vec![
            &buffers.frame,
            &buffers.explosions,
            &buffers.explosion_meshes,
            &buffers.explosion_workgroups,
        ],
        FrameStage::ExplosionMesh => vec![&buffers.explosion_meshes, &buffers.debris],
        FrameStage::ProjectileStep => vec![
            &buffers.frame,
            &buffers.projectiles,
            &buffers.mailbox,
            &buffers.explosions,
            &buffers.trails,
        ],
        FrameStage::ProjectileCollide => vec![&buffers.voxels, &buffers.projectiles],
        FrameStage::Mesher => vec![&buffers.voxels, &buffers.faces],
    };
    let entries: Vec<wgpu::BindGroupEntry> = resources
        .iter()
        .enumerate()
        .map(|(binding, buffer)| wgpu::BindGroupEntry {
            binding: binding as u32,
            resource: buffer.as_entire_binding(),
        })
        .collect();

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(&format!("{}_bind_group", stage.name())),
        layout: &pipelines.get(stage).bind_group_layout,
        entries: &entries,
    })
}

impl Simulation for GpuWorld {
    fn config(&self) -> &WorldConfig {
        &self.config
    }

    fn queue_paint(&mut self, requests: &[PaintRequest]) -> WorldResult<()> {
        self.paint.stage(requests)
    }

    fn shoot(&mut self, origin: Vec3, direction: Vec3) {
        self.pending_shot = Some(GpuSpawnMailbox::request(origin, direction));
    }

    fn frame(&mut self, delta: f32) {
        self.upload(clamp_delta(delta));

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("world_frame_encoder"),
                });
        self.encode(&mut encoder);
        self.context.queue.submit(Some(encoder.finish()));

        self.paint.consume();
        self.frame_index += 1;
        log::debug!("[GpuWorld] Submitted frame {}", self.frame_index);
    }

    fn frame_index(&self) -> u64 {
        self.frame_index
    }
}
