//! Physics module for the sandfall world
//!
//! Projectiles and the explosions they leave behind. Everything here runs as
//! kernels over fixed slot pools: no allocation after construction, and every
//! write shared between invocations goes through an atomic.
//!
//! # Units
//!
//! **1 unit = 1 voxel**, time in 60 Hz ticks. Host deltas (seconds) are scaled
//! by [`PHYSICS_RATE`](crate::config::PHYSICS_RATE) before integration.
//!
//! # Submodules
//!
//! - [`projectiles`] - Projectile state machine, spawn mailbox, terrain collision and detonation
//! - [`explosions`] - Explosion slots and procedural debris

pub mod explosions;
pub mod projectiles;

pub use explosions::{DebrisInstance, Explosion, ExplosionMesh, ExplosionPool, ExplosionState};
pub use projectiles::{
    Projectile, ProjectilePool, ProjectileState, SpawnMailbox, TrailInstance, detonate,
};
