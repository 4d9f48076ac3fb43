//! Demo Driver
//!
//! The default scene: four painters orbiting the grid centre on the top layer,
//! dropping discs whose material cycles every frame, while one projectile per
//! frame is fired from above the grid at a random point on the ground.
//!
//! Works against any [`Simulation`], so the same scene runs on the GPU and on
//! the host emulation backend.

use std::f32::consts::FRAC_PI_2;

use glam::{IVec3, Vec3};

use crate::config::WorldConfig;
use crate::error::WorldResult;
use crate::orchestrator::{Simulation, clamp_delta};
use crate::world::painter::PaintRequest;

/// Number of orbiting painters.
pub const PAINTERS: usize = 4;

/// Grid width the orbit radii below are tuned for.
const REFERENCE_WIDTH: f32 = 128.0;
const ORBIT_RADIUS: f32 = 32.0;
const ORBIT_SWING: f32 = 16.0;
/// Share of the grid footprint shots aim into.
const TARGET_SPREAD: f32 = 112.0 / REFERENCE_WIDTH;

// ============================================================================
// SIMPLE RNG (xorshift32)
// ============================================================================

/// Deterministic xorshift32 generator. Same seed, same scene.
#[derive(Clone, Debug)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    /// A seed of 0 is bumped to 1; xorshift32 needs a non-zero state.
    pub fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Pseudo-random `f32` in `[0.0, 1.0]`.
    pub fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }
}

// ============================================================================
// DRIVER
// ============================================================================

/// Feeds paint and shots into a world every frame.
#[derive(Clone, Debug)]
pub struct DemoDriver {
    size: Vec3,
    material_count: u32,
    painters: usize,
    hues: [u32; PAINTERS],
    time: f32,
    rng: SimpleRng,
}

impl DemoDriver {
    pub fn new(config: &WorldConfig, seed: u32) -> Self {
        let size = config.grid_size();
        let painters = PAINTERS.min(config.paint_slots as usize);
        log::info!(
            "[DemoDriver] {} painters, seed {}, {} materials",
            painters,
            seed,
            config.material_count
        );
        Self {
            size: Vec3::new(size.x as f32, size.y as f32, size.z as f32),
            material_count: config.material_count,
            painters,
            hues: [0, 600, 1200, 1800],
            time: 0.0,
            rng: SimpleRng::new(seed),
        }
    }

    /// Seconds of scene time driven so far.
    pub fn time(&self) -> f32 {
        self.time
    }

    fn center(&self) -> Vec3 {
        Vec3::new(self.size.x * 0.5, 0.0, self.size.z * 0.5)
    }

    /// Paint requests for the current scene time. Advances each painter's hue.
    pub fn paint_requests(&mut self) -> Vec<PaintRequest> {
        let center = self.center();
        let scale = self.size.x / REFERENCE_WIDTH;
        let distance = (ORBIT_RADIUS + self.time.sin() * ORBIT_SWING) * scale;
        let top = self.size.y as i32 - 1;

        (0..self.painters)
            .map(|i| {
                let angle = self.time + i as f32 * FRAC_PI_2;
                let cell = IVec3::new(
                    (center.x + angle.cos() * distance).floor() as i32,
                    top,
                    (center.z + angle.sin() * distance).floor() as i32,
                );
                let material = self.hues[i] % self.material_count;
                self.hues[i] = self.hues[i].wrapping_add(1);
                PaintRequest::new(cell, material)
            })
            .collect()
    }

    /// A shot from just above the grid towards a random ground cell.
    /// Returns `(origin, direction)`.
    pub fn next_shot(&mut self) -> (Vec3, Vec3) {
        let center = self.center();
        let origin = center
            + Vec3::new(
                (self.rng.next_f32() - 0.5) * self.size.x,
                self.size.y,
                (self.rng.next_f32() - 0.5) * self.size.z,
            );
        let target = center
            + Vec3::new(
                (self.rng.next_f32() - 0.5) * self.size.x * TARGET_SPREAD,
                0.0,
                (self.rng.next_f32() - 0.5) * self.size.z * TARGET_SPREAD,
            );
        (origin, (target - origin).normalize_or_zero())
    }

    /// Queue this frame's paint and shot, then run the frame.
    pub fn drive<S: Simulation + ?Sized>(&mut self, world: &mut S, delta: f32) -> WorldResult<()> {
        let delta = clamp_delta(delta);
        self.time += delta;

        let requests = self.paint_requests();
        world.queue_paint(&requests)?;
        let (origin, direction) = self.next_shot();
        world.shoot(origin, direction);
        world.frame(delta);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::CpuWorld;

    #[test]
    fn test_rng_is_deterministic() {
        let mut a = SimpleRng::new(42);
        let mut b = SimpleRng::new(42);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        assert_ne!(SimpleRng::new(0).next_u32(), 0);
    }

    #[test]
    fn test_painters_sit_on_top_layer() {
        let config = WorldConfig::default();
        let mut demo = DemoDriver::new(&config, 1);
        let requests = demo.paint_requests();
        assert_eq!(requests.len(), PAINTERS);
        for request in &requests {
            assert_eq!(request.y, 63);
            assert!(request.material().unwrap() < config.material_count);
        }
        // t = 0: first painter at centre + (32, 0)
        assert_eq!(requests[0].center(), IVec3::new(96, 63, 64));
    }

    #[test]
    fn test_hues_cycle_per_frame() {
        let config = WorldConfig::default();
        let mut demo = DemoDriver::new(&config, 1);
        let first = demo.paint_requests();
        let second = demo.paint_requests();
        assert_eq!(first[1].material(), Some(600 % 361));
        assert_eq!(second[1].material(), Some(601 % 361));
    }

    #[test]
    fn test_painters_limited_by_slots() {
        let config = WorldConfig {
            paint_slots: 2,
            ..WorldConfig::default()
        };
        let mut demo = DemoDriver::new(&config, 1);
        assert_eq!(demo.paint_requests().len(), 2);
    }

    #[test]
    fn test_shots_come_from_above_and_aim_down() {
        let config = WorldConfig::default();
        let mut demo = DemoDriver::new(&config, 9);
        for _ in 0..32 {
            let (origin, direction) = demo.next_shot();
            assert_eq!(origin.y, 64.0);
            assert!(direction.y < 0.0);
            assert!((direction.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_drive_builds_terrain() {
        let config = WorldConfig::with_size([32, 8, 32]);
        let mut world = CpuWorld::new(config.clone()).unwrap();
        let mut demo = DemoDriver::new(&config, 3);
        for _ in 0..4 {
            demo.drive(&mut world, 1.0 / 60.0).unwrap();
        }
        assert_eq!(world.frame_index(), 4);
        assert!(world.grid().solid_count() > 0);
        assert!(world.faces().count() > 0);
    }
}
