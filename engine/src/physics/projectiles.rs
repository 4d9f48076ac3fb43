//! Projectiles
//!
//! Fixed pool of projectile slots driven by two kernels per frame.
//!
//! `step` advances each slot's state machine:
//!
//! | state        | step                                                        |
//! |--------------|-------------------------------------------------------------|
//! | `Idle`       | try to take the spawn mailbox                               |
//! | `Active`     | tick; fizzle past the iteration limit, else move + trail    |
//! | `Grounded`   | become `Detonating`, ignite this slot's explosion           |
//! | `Detonating` | become `Idle`, then try the mailbox like any idle slot      |
//!
//! `collide` runs after `step`: an `Active` projectile that enters a solid cell
//! destroys it and grounds itself; a `Detonating` one carves a sphere.
//!
//! Both terrain writes are exchange-with-zero, so a cell hit by two projectiles
//! (or by a projectile and an overlapping blast) is only consumed once.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::{IVec3, Vec3};

use crate::config::{DETONATION_RADIUS, MAX_PROJECTILE_ITERATIONS, PHYSICS_RATE};
use crate::physics::explosions::ExplosionPool;
use crate::world::grid::VoxelGrid;
use crate::world::instances::InstanceList;
use crate::world::lanes::{Lanes, lock};

/// Lifecycle of a projectile slot. Discriminants are the values stored on the GPU.
#[repr(u32)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ProjectileState {
    #[default]
    Idle = 0,
    Active = 1,
    Grounded = 2,
    Detonating = 3,
}

impl ProjectileState {
    /// Decode a stored state; unknown values read as `Idle`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Active,
            2 => Self::Grounded,
            3 => Self::Detonating,
            _ => Self::Idle,
        }
    }
}

/// A projectile slot.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Projectile {
    /// Position in voxel units.
    pub position: Vec3,
    /// Unit direction; speed is one voxel per 60 Hz tick.
    pub direction: Vec3,
    /// Ticks spent `Active` since spawn.
    pub iteration: u32,
    pub state: ProjectileState,
}

impl Projectile {
    /// A freshly admitted projectile.
    pub fn spawn(position: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            direction,
            iteration: 0,
            state: ProjectileState::Active,
        }
    }

    /// Voxel the projectile currently occupies.
    pub fn cell(&self) -> IVec3 {
        self.position.floor().as_ivec3()
    }
}

/// GPU layout of [`Projectile`] (WGSL `Projectile`, 48 bytes).
///
/// Layout:
///   offset  0: position   (vec3<f32>)
///   offset 16: direction  (vec3<f32>)
///   offset 28: iteration  (u32)
///   offset 32: state      (u32)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuProjectile {
    pub position: [f32; 3],
    pub _pad0: u32,
    pub direction: [f32; 3],
    pub iteration: u32,
    pub state: u32,
    pub _pad1: [u32; 3],
}

impl From<&Projectile> for GpuProjectile {
    fn from(p: &Projectile) -> Self {
        Self {
            position: p.position.to_array(),
            direction: p.direction.to_array(),
            iteration: p.iteration,
            state: p.state as u32,
            ..Self::zeroed()
        }
    }
}

impl From<&GpuProjectile> for Projectile {
    fn from(p: &GpuProjectile) -> Self {
        Self {
            position: Vec3::from_array(p.position),
            direction: Vec3::from_array(p.direction),
            iteration: p.iteration,
            state: ProjectileState::from_raw(p.state),
        }
    }
}

/// GPU layout of the spawn mailbox (WGSL `SpawnMailbox`, 32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuSpawnMailbox {
    pub position: [f32; 3],
    pub _pad: u32,
    pub direction: [f32; 3],
    pub enabled: u32,
}

impl GpuSpawnMailbox {
    /// A pending spawn request.
    pub fn request(position: Vec3, direction: Vec3) -> Self {
        Self {
            position: position.to_array(),
            direction: direction.to_array(),
            enabled: 1,
            ..Self::zeroed()
        }
    }
}

/// Trail instance appended by every moving projectile.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TrailInstance {
    pub position: [f32; 3],
    pub direction: [f32; 3],
}

static_assertions::assert_eq_size!(GpuProjectile, [u8; 48]);
static_assertions::assert_eq_size!(GpuSpawnMailbox, [u8; 32]);
static_assertions::assert_eq_size!(TrailInstance, [u8; 24]);

/// Single pending spawn. The host overwrites it; exactly one idle slot takes it.
#[derive(Debug, Default)]
pub struct SpawnMailbox {
    position: Vec3,
    direction: Vec3,
    enabled: AtomicU32,
}

impl SpawnMailbox {
    /// Replace whatever is pending with a new request.
    pub fn post(&mut self, position: Vec3, direction: Vec3) {
        self.position = position;
        self.direction = direction;
        *self.enabled.get_mut() = 1;
    }

    pub fn is_pending(&self) -> bool {
        self.enabled.load(Ordering::Relaxed) == 1
    }

    /// Take the request if it is still pending. Exactly one caller wins.
    pub fn take(&self) -> Option<(Vec3, Vec3)> {
        self.enabled
            .compare_exchange(1, 0, Ordering::Relaxed, Ordering::Relaxed)
            .ok()
            .map(|_| (self.position, self.direction))
    }

    /// Current GPU-layout view.
    pub fn to_gpu(&self) -> GpuSpawnMailbox {
        GpuSpawnMailbox {
            position: self.position.to_array(),
            direction: self.direction.to_array(),
            enabled: self.enabled.load(Ordering::Relaxed),
            ..GpuSpawnMailbox::zeroed()
        }
    }
}

/// The projectile slots and their spawn mailbox.
pub struct ProjectilePool {
    slots: Vec<Mutex<Projectile>>,
    mailbox: SpawnMailbox,
}

impl ProjectilePool {
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: (0..capacity).map(|_| Mutex::new(Projectile::default())).collect(),
            mailbox: SpawnMailbox::default(),
        }
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn mailbox(&self) -> &SpawnMailbox {
        &self.mailbox
    }

    pub fn mailbox_mut(&mut self) -> &mut SpawnMailbox {
        &mut self.mailbox
    }

    /// Snapshot of one slot.
    pub fn slot(&self, slot: u32) -> Option<Projectile> {
        self.slots.get(slot as usize).map(|cell| *lock(cell))
    }

    /// Snapshot of every slot.
    pub fn slots(&self) -> Vec<Projectile> {
        self.slots.iter().map(|cell| *lock(cell)).collect()
    }

    /// Overwrite a slot (scenario setup).
    pub fn set_slot(&self, slot: u32, projectile: Projectile) {
        if let Some(cell) = self.slots.get(slot as usize) {
            *lock(cell) = projectile;
        }
    }

    /// Slots that are anything but `Idle`.
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|cell| lock(cell).state != ProjectileState::Idle)
            .count()
    }

    /// Emulated `projectile_step` kernel: one invocation per slot.
    pub fn step(
        &self,
        delta: f32,
        explosions: &ExplosionPool,
        trails: &InstanceList<TrailInstance>,
        lanes: &Lanes,
    ) {
        lanes.dispatch(self.capacity(), |id| {
            let mut p = lock(&self.slots[id as usize]);
            match p.state {
                ProjectileState::Active => {
                    p.iteration += 1;
                    if p.iteration > MAX_PROJECTILE_ITERATIONS {
                        p.state = ProjectileState::Idle;
                        return;
                    }
                    let direction = p.direction;
                    p.position += direction * delta * PHYSICS_RATE;
                    trails.push(TrailInstance {
                        position: p.position.to_array(),
                        direction: direction.to_array(),
                    });
                    if p.position.y <= 0.0 {
                        p.state = ProjectileState::Grounded;
                    }
                    return;
                }
                ProjectileState::Grounded => {
                    p.state = ProjectileState::Detonating;
                    explosions.ignite(id, p.position, p.direction);
                    return;
                }
                ProjectileState::Detonating => p.state = ProjectileState::Idle,
                ProjectileState::Idle => {}
            }
            if let Some((position, direction)) = self.mailbox.take() {
                *p = Projectile::spawn(position, direction);
            }
        });
    }

    /// Emulated `projectile_collide` kernel: one invocation per slot.
    pub fn collide(&self, grid: &VoxelGrid, lanes: &Lanes) {
        let size = grid.size();
        lanes.dispatch(self.capacity(), |id| {
            let mut p = lock(&self.slots[id as usize]);
            match p.state {
                ProjectileState::Active => {
                    let cell = p.cell();
                    if size.contains(cell) && grid.take(size.index(cell)) != 0 {
                        p.state = ProjectileState::Grounded;
                    }
                }
                ProjectileState::Detonating => detonate(grid, p.cell()),
                _ => {}
            }
        });
    }
}

/// Clear every cell within `DETONATION_RADIUS - 0.5` of `center`.
pub fn detonate(grid: &VoxelGrid, center: IVec3) {
    let size = grid.size();
    let limit = DETONATION_RADIUS as f32 - 0.5;
    let r = DETONATION_RADIUS;
    for z in -r..=r {
        for y in -r..=r {
            for x in -r..=r {
                let offset = IVec3::new(x, y, z);
                let pos = center + offset;
                if size.contains(pos) && offset.as_vec3().length() <= limit {
                    grid.take(size.index(pos));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::grid::GridSize;

    #[test]
    fn test_mailbox_single_winner() {
        let mut mailbox = SpawnMailbox::default();
        mailbox.post(Vec3::ONE, Vec3::Y);
        assert!(mailbox.is_pending());
        assert_eq!(mailbox.take(), Some((Vec3::ONE, Vec3::Y)));
        assert_eq!(mailbox.take(), None);
        assert!(!mailbox.is_pending());
    }

    #[test]
    fn test_one_spawn_per_frame_across_idle_slots() {
        let mut pool = ProjectilePool::new(64);
        pool.mailbox_mut().post(Vec3::new(1.0, 5.0, 1.0), Vec3::X);
        let explosions = ExplosionPool::new(64, 30.0);
        let trails = InstanceList::new(64);
        pool.step(
            1.0 / 60.0,
            &explosions,
            &trails,
            &Lanes::new(Some(8)).with_min_parallel(1),
        );
        assert_eq!(pool.live_count(), 1);
        assert_eq!(trails.count(), 0);
    }

    #[test]
    fn test_spawned_projectile_moves_next_frame() {
        let mut pool = ProjectilePool::new(2);
        pool.mailbox_mut().post(Vec3::new(1.0, 5.0, 1.0), Vec3::X);
        let explosions = ExplosionPool::new(2, 30.0);
        let trails = InstanceList::new(2);
        let lanes = Lanes::sequential();
        pool.step(0.0625, &explosions, &trails, &lanes);
        assert_eq!(pool.slot(0).map(|p| p.state), Some(ProjectileState::Active));

        pool.step(0.0625, &explosions, &trails, &lanes);
        let p = pool.slot(0).unwrap_or_default();
        assert_eq!(p.iteration, 1);
        assert_eq!(p.position, Vec3::new(4.75, 5.0, 1.0));
        assert_eq!(trails.records()[0].position, [4.75, 5.0, 1.0]);
    }

    #[test]
    fn test_collide_grounds_on_solid_and_clears_cell() {
        let grid = VoxelGrid::new(GridSize::new(8, 8, 8));
        grid.set(IVec3::new(3, 3, 3), 5);
        let pool = ProjectilePool::new(1);
        pool.set_slot(0, Projectile::spawn(Vec3::new(3.5, 3.2, 3.9), Vec3::NEG_Y));
        pool.collide(&grid, &Lanes::sequential());
        assert_eq!(
            pool.slot(0).map(|p| p.state),
            Some(ProjectileState::Grounded)
        );
        assert_eq!(grid.get(IVec3::new(3, 3, 3)), Some(0));
    }

    #[test]
    fn test_collide_outside_grid_is_ignored() {
        let grid = VoxelGrid::new(GridSize::new(4, 4, 4));
        let pool = ProjectilePool::new(1);
        pool.set_slot(0, Projectile::spawn(Vec3::new(-3.0, 20.0, 1.0), Vec3::X));
        pool.collide(&grid, &Lanes::sequential());
        assert_eq!(pool.slot(0).map(|p| p.state), Some(ProjectileState::Active));
    }

    #[test]
    fn test_grounded_ignites_own_explosion_slot() {
        let pool = ProjectilePool::new(4);
        pool.set_slot(
            2,
            Projectile {
                state: ProjectileState::Grounded,
                ..Projectile::spawn(Vec3::new(1.0, 0.0, 1.0), Vec3::NEG_Y)
            },
        );
        let explosions = ExplosionPool::new(4, 30.0);
        pool.step(
            1.0 / 60.0,
            &explosions,
            &InstanceList::new(4),
            &Lanes::sequential(),
        );
        assert_eq!(
            pool.slot(2).map(|p| p.state),
            Some(ProjectileState::Detonating)
        );
        assert_eq!(explosions.active_count(), 1);
        assert_eq!(
            explosions.slot(2).map(|e| e.position),
            Some(Vec3::new(1.0, 0.0, 1.0))
        );
    }

    #[test]
    fn test_gpu_round_trip_keeps_state() {
        let p = Projectile {
            position: Vec3::new(1.0, 2.0, 3.0),
            direction: Vec3::NEG_Y,
            iteration: 17,
            state: ProjectileState::Detonating,
        };
        let gpu = GpuProjectile::from(&p);
        assert_eq!(gpu.state, 3);
        assert_eq!(Projectile::from(&gpu), p);
    }

    #[test]
    fn test_unknown_state_reads_idle() {
        assert_eq!(ProjectileState::from_raw(42), ProjectileState::Idle);
    }

    #[test]
    fn test_mailbox_gpu_view() {
        let mut mailbox = SpawnMailbox::default();
        mailbox.post(Vec3::ONE, Vec3::Y);
        assert_eq!(mailbox.to_gpu(), GpuSpawnMailbox::request(Vec3::ONE, Vec3::Y));
    }
}
