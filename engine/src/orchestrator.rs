//! Frame Orchestration
//!
//! The fixed order in which one frame's kernels run, and the host-facing
//! [`Simulation`] interface both backends implement.
//!
//! ```text
//! Paint
//! (SandSetup, SandStep) x (size_y - 1)
//! ExplosionStep, ExplosionMesh
//! ProjectileStep, ProjectileCollide
//! Mesher
//! ```
//!
//! Each stage sees every write of the stages before it. Before the first stage
//! the host clears the instance counters and the explosion workgroup count;
//! after the last one the frame's paint requests are consumed.

use glam::Vec3;

use crate::config::{MAX_FRAME_DELTA, WorldConfig};
use crate::error::WorldResult;
use crate::world::painter::{self, PaintRequest};

/// One kernel dispatch in the frame schedule.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameStage {
    Paint,
    SandSetup,
    SandStep,
    ExplosionStep,
    ExplosionMesh,
    ProjectileStep,
    ProjectileCollide,
    Mesher,
}

impl FrameStage {
    /// Every stage, in pipeline-creation order.
    pub const ALL: [FrameStage; 8] = [
        FrameStage::Paint,
        FrameStage::SandSetup,
        FrameStage::SandStep,
        FrameStage::ExplosionStep,
        FrameStage::ExplosionMesh,
        FrameStage::ProjectileStep,
        FrameStage::ProjectileCollide,
        FrameStage::Mesher,
    ];

    /// Kernel name; also the shader file stem and pipeline label.
    pub fn name(self) -> &'static str {
        match self {
            FrameStage::Paint => "paint",
            FrameStage::SandSetup => "sand_setup",
            FrameStage::SandStep => "sand_step",
            FrameStage::ExplosionStep => "explosion_step",
            FrameStage::ExplosionMesh => "explosion_mesh",
            FrameStage::ProjectileStep => "projectile_step",
            FrameStage::ProjectileCollide => "projectile_collide",
            FrameStage::Mesher => "mesher",
        }
    }
}

/// Ordered stages of one frame for a grid `size_y` voxels tall.
pub fn frame_schedule(size_y: u32) -> Vec<FrameStage> {
    let sweeps = size_y.saturating_sub(1) as usize;
    let mut stages = Vec::with_capacity(6 + 2 * sweeps);
    stages.push(FrameStage::Paint);
    for _ in 0..sweeps {
        stages.push(FrameStage::SandSetup);
        stages.push(FrameStage::SandStep);
    }
    stages.extend([
        FrameStage::ExplosionStep,
        FrameStage::ExplosionMesh,
        FrameStage::ProjectileStep,
        FrameStage::ProjectileCollide,
        FrameStage::Mesher,
    ]);
    stages
}

/// Frame delta in seconds, clamped to `[0, MAX_FRAME_DELTA]`. Non-finite deltas become 0.
pub fn clamp_delta(delta: f32) -> f32 {
    if delta.is_finite() {
        delta.clamp(0.0, MAX_FRAME_DELTA)
    } else {
        0.0
    }
}

/// Paint requests staged for the next frame, padded to the painter's slot count.
#[derive(Clone, Debug)]
pub struct PaintQueue {
    slots: Vec<PaintRequest>,
    material_count: u32,
}

impl PaintQueue {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            slots: vec![PaintRequest::NONE; config.paint_slots as usize],
            material_count: config.material_count,
        }
    }

    /// Replace the staged requests. Rejected batches leave the queue unchanged.
    pub fn stage(&mut self, requests: &[PaintRequest]) -> WorldResult<()> {
        painter::validate_requests(requests, self.slots.len() as u32, self.material_count)?;
        self.slots.fill(PaintRequest::NONE);
        self.slots[..requests.len()].copy_from_slice(requests);
        Ok(())
    }

    /// Staged requests, one per painter slot.
    pub fn slots(&self) -> &[PaintRequest] {
        &self.slots
    }

    /// Number of slots holding a request.
    pub fn pending(&self) -> usize {
        self.slots.iter().filter(|r| r.value != 0).count()
    }

    /// Drop everything staged (after the frame has painted it).
    pub fn consume(&mut self) {
        self.slots.fill(PaintRequest::NONE);
    }
}

/// Host-facing operations of a world, shared by the GPU and emulation backends.
pub trait Simulation {
    /// Construction-time configuration of this world.
    fn config(&self) -> &WorldConfig;

    /// Stage up to `paint_slots` paint requests for the next frame.
    ///
    /// Replaces anything staged earlier in the same frame.
    fn queue_paint(&mut self, requests: &[PaintRequest]) -> WorldResult<()>;

    /// Request a projectile from `origin` moving `direction` per tick.
    ///
    /// The direction is stored as given; its length is the projectile's speed.
    /// Overwrites any request the world has not admitted yet.
    fn shoot(&mut self, origin: Vec3, direction: Vec3);

    /// Run one frame with `delta` seconds of elapsed time.
    fn frame(&mut self, delta: f32);

    /// Number of frames run so far.
    fn frame_index(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    #[test]
    fn test_schedule_for_four_layers() {
        use FrameStage::*;
        assert_eq!(
            frame_schedule(4),
            vec![
                Paint,
                SandSetup,
                SandStep,
                SandSetup,
                SandStep,
                SandSetup,
                SandStep,
                ExplosionStep,
                ExplosionMesh,
                ProjectileStep,
                ProjectileCollide,
                Mesher,
            ]
        );
    }

    #[test]
    fn test_schedule_length() {
        assert_eq!(frame_schedule(64).len(), 6 + 2 * 63);
    }

    #[test]
    fn test_clamp_delta() {
        assert_eq!(clamp_delta(0.016), 0.016);
        assert_eq!(clamp_delta(-1.0), 0.0);
        assert_eq!(clamp_delta(5.0), MAX_FRAME_DELTA);
        assert_eq!(clamp_delta(f32::NAN), 0.0);
    }

    #[test]
    fn test_paint_queue_pads_and_consumes() {
        let mut queue = PaintQueue::new(&WorldConfig::default());
        queue
            .stage(&[PaintRequest::new(IVec3::new(1, 2, 3), 0)])
            .unwrap();
        assert_eq!(queue.slots().len(), 4);
        assert_eq!(queue.pending(), 1);
        queue.consume();
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn test_rejected_batch_keeps_previous() {
        let mut queue = PaintQueue::new(&WorldConfig::default());
        let request = PaintRequest::new(IVec3::ZERO, 1);
        queue.stage(&[request]).unwrap();
        assert!(queue.stage(&[request; 5]).is_err());
        assert_eq!(queue.slots()[0], request);
    }

    #[test]
    fn test_stage_names_are_unique() {
        let mut names: Vec<_> = FrameStage::ALL.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FrameStage::ALL.len());
    }
}
