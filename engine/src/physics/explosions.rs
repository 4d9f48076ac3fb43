//! Explosions
//!
//! Debris bursts left behind by detonating projectiles. Explosion slot `i`
//! belongs to projectile slot `i`: the projectile writes it when it starts
//! detonating, so spawning needs neither allocation nor atomics.
//!
//! Each frame the step kernel ages live explosions and appends one mesh record
//! per visible explosion. The number of records is also the `y` workgroup count
//! of the mesh dispatch, which therefore sizes itself without the host:
//! `DEBRIS_PER_EXPLOSION` invocations per record, one debris cube each.
//!
//! Debris motion is a closed-form function of the record (centre, age, incoming
//! direction, seed), so nothing per-particle is stored between frames.

use std::sync::Mutex;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::config::{DEBRIS_PER_EXPLOSION, PHYSICS_RATE};
use crate::world::instances::InstanceList;
use crate::world::lanes::{Lanes, lock};

/// Downward acceleration of debris in voxels per tick².
pub const DEBRIS_GRAVITY: f32 = 0.02;

/// Distance a debris cube covers per tick at full speed.
pub const DEBRIS_SPEED: f32 = 0.6;

/// Edge length of a fresh debris cube; shrinks to 0 over the lifetime.
pub const DEBRIS_SCALE: f32 = 0.5;

#[repr(u32)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ExplosionState {
    #[default]
    Idle = 0,
    Active = 1,
}

/// One explosion slot.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Explosion {
    pub position: Vec3,
    /// Age in 60 Hz ticks.
    pub time: f32,
    /// Direction of the projectile that caused it.
    pub direction: Vec3,
    pub state: ExplosionState,
}

/// GPU layout of [`Explosion`] (WGSL `Explosion`, 32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuExplosion {
    pub position: [f32; 3],
    pub time: f32,
    pub direction: [f32; 3],
    pub state: u32,
}

/// Per-frame mesh record; `seed` is the owning slot.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ExplosionMesh {
    pub center: [f32; 3],
    pub time: f32,
    pub direction: [f32; 3],
    pub seed: u32,
}

/// Debris cube instance: centre and edge length.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DebrisInstance {
    pub position: [f32; 3],
    pub scale: f32,
}

static_assertions::assert_eq_size!(GpuExplosion, [u8; 32]);
static_assertions::assert_eq_size!(ExplosionMesh, [u8; 32]);
static_assertions::assert_eq_size!(DebrisInstance, [u8; 16]);

impl From<&Explosion> for GpuExplosion {
    fn from(e: &Explosion) -> Self {
        Self {
            position: e.position.to_array(),
            time: e.time,
            direction: e.direction.to_array(),
            state: e.state as u32,
        }
    }
}

/// PCG output hash; the kernels use the same function.
#[inline]
pub fn hash(v: u32) -> u32 {
    let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Uniform float in `[0, 1)` from the top 24 bits of a hash.
#[inline]
pub fn unit(h: u32) -> f32 {
    (h >> 8) as f32 / 16_777_216.0
}

/// Position and scale of debris `j` of an explosion mesh.
pub fn debris(mesh: &ExplosionMesh, j: u32, lifetime: f32) -> DebrisInstance {
    let h0 = hash(mesh.seed.wrapping_mul(DEBRIS_PER_EXPLOSION).wrapping_add(j));
    let h1 = hash(h0);
    let h2 = hash(h1);
    let h3 = hash(h2);

    let scatter = Vec3::new(unit(h0), unit(h1), unit(h2)) * 2.0 - Vec3::ONE;
    let incoming = Vec3::from_array(mesh.direction);
    let heading = (scatter + Vec3::new(0.0, 1.5, 0.0) - incoming * 0.5).normalize_or(Vec3::Y);
    let speed = DEBRIS_SPEED * (0.4 + 0.6 * unit(h3));

    let t = mesh.time;
    let position = Vec3::from_array(mesh.center) + heading * speed * t
        - Vec3::new(0.0, 0.5 * DEBRIS_GRAVITY * t * t, 0.0);
    let scale = DEBRIS_SCALE * (1.0 - t / lifetime).max(0.0);

    DebrisInstance {
        position: position.to_array(),
        scale,
    }
}

/// Explosion slots plus the per-frame mesh records.
pub struct ExplosionPool {
    slots: Vec<Mutex<Explosion>>,
    meshes: InstanceList<ExplosionMesh>,
    lifetime: f32,
}

impl ExplosionPool {
    pub fn new(capacity: u32, lifetime: f32) -> Self {
        Self {
            slots: (0..capacity).map(|_| Mutex::new(Explosion::default())).collect(),
            meshes: InstanceList::new(capacity),
            lifetime,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }

    /// Start the explosion owned by projectile `slot`.
    pub fn ignite(&self, slot: u32, position: Vec3, direction: Vec3) {
        if let Some(cell) = self.slots.get(slot as usize) {
            *lock(cell) = Explosion {
                position,
                time: 0.0,
                direction,
                state: ExplosionState::Active,
            };
        }
    }

    /// Snapshot of one slot.
    pub fn slot(&self, slot: u32) -> Option<Explosion> {
        self.slots.get(slot as usize).map(|cell| *lock(cell))
    }

    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|cell| lock(cell).state == ExplosionState::Active)
            .count()
    }

    /// Mesh records written by the last step; their count is the mesh dispatch height.
    pub fn meshes(&self) -> &InstanceList<ExplosionMesh> {
        &self.meshes
    }

    /// Host-side clear of the mesh workgroup count.
    pub fn reset_meshes(&self) {
        self.meshes.reset();
    }

    /// Emulated `explosion_step` kernel: one invocation per slot.
    pub fn step(&self, delta: f32, lanes: &Lanes) {
        lanes.dispatch(self.capacity(), |id| {
            let mut e = lock(&self.slots[id as usize]);
            if e.state != ExplosionState::Active {
                return;
            }
            if e.time >= self.lifetime {
                e.state = ExplosionState::Idle;
                return;
            }
            self.meshes.push(ExplosionMesh {
                center: e.position.to_array(),
                time: e.time,
                direction: e.direction.to_array(),
                seed: id,
            });
            e.time += delta * PHYSICS_RATE;
        });
    }

    /// Emulated `explosion_mesh` kernel, dispatched as `(1, mesh count, 1)` groups of debris.
    pub fn mesh(&self, debris_out: &InstanceList<DebrisInstance>, lanes: &Lanes) {
        let meshes = self.meshes.records();
        lanes.dispatch(meshes.len() as u32 * DEBRIS_PER_EXPLOSION, |id| {
            let mesh = &meshes[(id / DEBRIS_PER_EXPLOSION) as usize];
            debris_out.push(debris(mesh, id % DEBRIS_PER_EXPLOSION, self.lifetime));
        });
    }
}
