//! Host Emulation World
//!
//! Runs the frame schedule on the CPU. Every kernel is the Rust form of its
//! WGSL counterpart and touches shared state through the same atomics
//! (compare-exchange claims, exchange-with-zero clears, counted appends), with
//! invocations spread over [`Lanes`].
//!
//! Unlike the GPU world this one can be inspected: the grid, slot pools and
//! instance lists are all readable between frames.

use glam::Vec3;

use crate::config::WorldConfig;
use crate::error::WorldResult;
use crate::orchestrator::{FrameStage, PaintQueue, Simulation, clamp_delta, frame_schedule};
use crate::physics::explosions::{DebrisInstance, ExplosionPool};
use crate::physics::projectiles::{ProjectilePool, TrailInstance};
use crate::world::grid::VoxelGrid;
use crate::world::instances::InstanceList;
use crate::world::lanes::Lanes;
use crate::world::mesher::{self, QuadInstance};
use crate::world::painter;
use crate::world::sand::{self, SandState};

/// A world simulated on the host.
pub struct CpuWorld {
    config: WorldConfig,
    schedule: Vec<FrameStage>,
    lanes: Lanes,
    grid: VoxelGrid,
    sand: SandState,
    projectiles: ProjectilePool,
    explosions: ExplosionPool,
    faces: InstanceList<QuadInstance>,
    trails: InstanceList<TrailInstance>,
    debris: InstanceList<DebrisInstance>,
    paint: PaintQueue,
    frame_index: u64,
}

impl CpuWorld {
    pub fn new(config: WorldConfig) -> WorldResult<Self> {
        config.validate()?;
        let lanes = Lanes::new(config.emulation_lanes);
        let size = config.grid_size();

        log::info!(
            "[CpuWorld] {}x{}x{} grid, {} projectile slots, {} lanes",
            size.x,
            size.y,
            size.z,
            config.projectile_capacity,
            lanes.count()
        );

        Ok(Self {
            schedule: frame_schedule(size.y),
            grid: VoxelGrid::new(size),
            sand: SandState::new(),
            projectiles: ProjectilePool::new(config.projectile_capacity),
            explosions: ExplosionPool::new(config.projectile_capacity, config.explosion_lifetime),
            faces: InstanceList::new(config.face_capacity()),
            trails: InstanceList::new(config.projectile_capacity),
            debris: InstanceList::new(config.debris_capacity()),
            paint: PaintQueue::new(&config),
            frame_index: 0,
            lanes,
            config,
        })
    }

    /// Replace the lane executor (tests pin this to force or avoid contention).
    pub fn with_lanes(mut self, lanes: Lanes) -> Self {
        self.lanes = lanes;
        self
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn projectiles(&self) -> &ProjectilePool {
        &self.projectiles
    }

    pub fn explosions(&self) -> &ExplosionPool {
        &self.explosions
    }

    pub fn faces(&self) -> &InstanceList<QuadInstance> {
        &self.faces
    }

    pub fn trails(&self) -> &InstanceList<TrailInstance> {
        &self.trails
    }

    pub fn debris(&self) -> &InstanceList<DebrisInstance> {
        &self.debris
    }

    pub fn sand(&self) -> &SandState {
        &self.sand
    }

    /// Paint requests staged for the next frame.
    pub fn pending_paint(&self) -> &PaintQueue {
        &self.paint
    }

    fn run_stage(&self, stage: FrameStage, delta: f32) {
        let lanes = &self.lanes;
        match stage {
            FrameStage::Paint => painter::paint(&self.grid, self.paint.slots(), lanes),
            FrameStage::SandSetup => sand::setup(&self.sand, self.grid.size()),
            FrameStage::SandStep => sand::step(&self.grid, &self.sand, lanes),
            FrameStage::ExplosionStep => self.explosions.step(delta, lanes),
            FrameStage::ExplosionMesh => self.explosions.mesh(&self.debris, lanes),
            FrameStage::ProjectileStep => {
                self.projectiles
                    .step(delta, &self.explosions, &self.trails, lanes)
            }
            FrameStage::ProjectileCollide => self.projectiles.collide(&self.grid, lanes),
            FrameStage::Mesher => mesher::mesh(&self.grid, &self.faces, lanes),
        }
    }
}

impl Simulation for CpuWorld {
    fn config(&self) -> &WorldConfig {
        &self.config
    }

    fn queue_paint(&mut self, requests: &[painter::PaintRequest]) -> WorldResult<()> {
        self.paint.stage(requests)
    }

    fn shoot(&mut self, origin: Vec3, direction: Vec3) {
        self.projectiles.mailbox_mut().post(origin, direction);
    }

    fn frame(&mut self, delta: f32) {
        let delta = clamp_delta(delta);

        self.faces.reset();
        self.trails.reset();
        self.debris.reset();
        self.explosions.reset_meshes();

        for &stage in &self.schedule {
            self.run_stage(stage, delta);
        }

        self.paint.consume();
        self.frame_index += 1;

        log::debug!(
            "[CpuWorld] Frame {}: {} faces, {} trails, {} debris",
            self.frame_index,
            self.faces.count(),
            self.trails.count(),
            self.debris.count()
        );
    }

    fn frame_index(&self) -> u64 {
        self.frame_index
    }
}
