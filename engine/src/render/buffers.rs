//! World Buffers
//!
//! Every GPU buffer a world owns, allocated once at construction and sized
//! from the [`WorldConfig`]. Sizes are checked against the device limits
//! before anything is allocated, so an oversized world fails with an error
//! instead of a validation panic.
//!
//! Buffers the renderer consumes (faces, trails, debris) carry their draw
//! header at offset 0 and instance data right after it; they are usable as
//! `INDIRECT` and `VERTEX` buffers directly.

use bytemuck::{Pod, Zeroable};

use crate::config::WorldConfig;
use crate::error::{WorldError, WorldResult};
use crate::physics::explosions::{DebrisInstance, ExplosionMesh, GpuExplosion};
use crate::physics::projectiles::{GpuProjectile, GpuSpawnMailbox, TrailInstance};
use crate::render::gpu_context::GpuContext;
use crate::world::instances::{DispatchArgs, DrawIndexedHeader, DrawIndirectHeader};
use crate::world::mesher::QuadInstance;
use crate::world::painter::PaintRequest;
use crate::world::sand::SandUniforms;

/// Per-frame uniforms (WGSL `FrameUniforms`, padded to 16 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    /// Elapsed time in seconds, already clamped.
    pub delta: f32,
    pub _pad: [f32; 3],
}

impl FrameUniforms {
    pub fn new(delta: f32) -> Self {
        Self {
            delta,
            _pad: [0.0; 3],
        }
    }
}

static_assertions::assert_eq_size!(FrameUniforms, [u8; 16]);

fn bytes<T>(count: u32) -> u64 {
    u64::from(count) * std::mem::size_of::<T>() as u64
}

/// Byte sizes of the buffers that scale with the config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferSizes {
    pub voxels: u64,
    pub paint: u64,
    pub projectiles: u64,
    pub explosions: u64,
    pub explosion_meshes: u64,
    pub faces: u64,
    pub trails: u64,
    pub debris: u64,
}

impl BufferSizes {
    pub fn new(config: &WorldConfig) -> Self {
        let cap = config.projectile_capacity;
        Self {
            voxels: config.volume() * 4,
            paint: bytes::<PaintRequest>(config.paint_slots),
            projectiles: bytes::<GpuProjectile>(cap),
            explosions: bytes::<GpuExplosion>(cap),
            explosion_meshes: bytes::<ExplosionMesh>(cap),
            faces: std::mem::size_of::<DrawIndirectHeader>() as u64
                + bytes::<QuadInstance>(config.face_capacity()),
            trails: std::mem::size_of::<DrawIndexedHeader>() as u64
                + bytes::<TrailInstance>(cap),
            debris: std::mem::size_of::<DrawIndexedHeader>() as u64
                + bytes::<DebrisInstance>(config.debris_capacity()),
        }
    }

    /// Storage buffers with their labels.
    pub fn storage(&self) -> [(&'static str, u64); 7] {
        [
            ("voxels", self.voxels),
            ("projectiles", self.projectiles),
            ("explosions", self.explosions),
            ("explosion_meshes", self.explosion_meshes),
            ("face_list", self.faces),
            ("trail_list", self.trails),
            ("debris_list", self.debris),
        ]
    }

    /// Fail with [`WorldError::BufferTooLarge`] if any buffer exceeds the device limits.
    pub fn check(&self, limits: &wgpu::Limits) -> WorldResult<()> {
        let storage_limit =
            u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        for (label, size) in self.storage() {
            if size > storage_limit {
                return Err(WorldError::BufferTooLarge {
                    label,
                    size,
                    limit: storage_limit,
                });
            }
        }
        let uniform_limit = u64::from(limits.max_uniform_buffer_binding_size);
        if self.paint > uniform_limit {
            return Err(WorldError::BufferTooLarge {
                label: "paint_requests",
                size: self.paint,
                limit: uniform_limit,
            });
        }
        Ok(())
    }

    /// Sum of every buffer, for logging.
    pub fn total(&self) -> u64 {
        self.storage().iter().map(|(_, size)| size).sum::<u64>() + self.paint
    }
}

/// All GPU buffers of one world.
pub struct WorldBuffers {
    pub sizes: BufferSizes,
    pub voxels: wgpu::Buffer,
    pub sand: wgpu::Buffer,
    pub frame: wgpu::Buffer,
    pub paint: wgpu::Buffer,
    pub projectiles: wgpu::Buffer,
    pub mailbox: wgpu::Buffer,
    pub explosions: wgpu::Buffer,
    pub explosion_meshes: wgpu::Buffer,
    /// `dispatch_workgroups_indirect` arguments of the explosion mesh kernel.
    pub explosion_workgroups: wgpu::Buffer,
    pub faces: wgpu::Buffer,
    pub trails: wgpu::Buffer,
    pub debris: wgpu::Buffer,
}

impl WorldBuffers {
    pub fn new(ctx: &GpuContext, config: &WorldConfig) -> WorldResult<Self> {
        let sizes = BufferSizes::new(config);
        sizes.check(&ctx.limits())?;

        let draw_usage = wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::VERTEX;
        let instance_list = |label: &str, size: u64, header: &[u8]| {
            let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | draw_usage,
                mapped_at_creation: false,
            });
            ctx.queue.write_buffer(&buffer, 0, header);
            buffer
        };

        let buffers = Self {
            voxels: ctx.create_storage_buffer("voxels", sizes.voxels),
            sand: ctx.create_storage_buffer_init(
                "sand_uniforms",
                bytemuck::bytes_of(&SandUniforms::default()),
                wgpu::BufferUsages::empty(),
            ),
            frame: ctx.create_uniform_buffer("frame_uniforms", &FrameUniforms::default()),
            paint: ctx.create_uniform_array(
                "paint_requests",
                &vec![PaintRequest::NONE; config.paint_slots as usize],
            ),
            projectiles: ctx.create_storage_buffer("projectiles", sizes.projectiles),
            mailbox: ctx.create_storage_buffer_init(
                "spawn_mailbox",
                bytemuck::bytes_of(&GpuSpawnMailbox::default()),
                wgpu::BufferUsages::empty(),
            ),
            explosions: ctx.create_storage_buffer("explosions", sizes.explosions),
            explosion_meshes: ctx.create_storage_buffer("explosion_meshes", sizes.explosion_meshes),
            explosion_workgroups: ctx.create_storage_buffer_init(
                "explosion_workgroups",
                bytemuck::bytes_of(&DispatchArgs { x: 1, y: 0, z: 1 }),
                wgpu::BufferUsages::INDIRECT,
            ),
            faces: instance_list(
                "face_list",
                sizes.faces,
                bytemuck::bytes_of(&DrawIndirectHeader::faces()),
            ),
            trails: instance_list(
                "trail_list",
                sizes.trails,
                bytemuck::bytes_of(&DrawIndexedHeader::cubes()),
            ),
            debris: instance_list(
                "debris_list",
                sizes.debris,
                bytemuck::bytes_of(&DrawIndexedHeader::cubes()),
            ),
            sizes,
        };

        log::info!(
            "[WorldBuffers] Allocated {:.1} MiB",
            buffers.sizes.total() as f64 / (1024.0 * 1024.0)
        );
        Ok(buffers)
    }
}
