//! World Configuration
//!
//! Everything that is baked into the kernels at construction time: grid
//! dimensions, slot counts and buffer capacities. Changing any of these means
//! building a new world (new kernel sources, new buffers); nothing here is a
//! per-frame parameter.
//!
//! Configs are plain JSON, every field optional:
//!
//! ```json
//! { "size": [128, 64, 128], "paint_slots": 4, "projectile_capacity": 128 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{WorldError, WorldResult};
use crate::world::grid::GridSize;

/// Integer scan bound of a paint disc. Cells count when `length <= radius - 0.5`.
pub const PAINT_RADIUS: i32 = 3;

/// Integer scan bound of a detonation sphere. Cells count when `length <= radius - 0.5`.
pub const DETONATION_RADIUS: i32 = 4;

/// A projectile still flying after this many ticks fizzles out.
pub const MAX_PROJECTILE_ITERATIONS: u32 = 128;

/// Simulation rate the per-frame delta is normalized to (updates per second).
pub const PHYSICS_RATE: f32 = 60.0;

/// Debris particles per explosion; also the explosion mesh workgroup size.
pub const DEBRIS_PER_EXPLOSION: u32 = 64;

/// Frame deltas are clamped to this many seconds (tab switches, debugger stops).
pub const MAX_FRAME_DELTA: f32 = 1.0;

/// Largest face id that still round-trips through an `f32` instance attribute.
const MAX_EXACT_F32_INT: u64 = 1 << 24;

/// Largest 1D dispatch we size (65535 workgroups of 256 invocations).
const MAX_1D_INVOCATIONS: u32 = 65_535 * 256;

/// Construction-time description of a world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Grid dimensions `[sx, sy, sz]` in voxels.
    pub size: [u32; 3],
    /// Number of paint requests the painter accepts per frame (K).
    pub paint_slots: u32,
    /// Projectile slot count. Explosion slots mirror projectile slots one to one.
    pub projectile_capacity: u32,
    /// Number of distinct materials; stored voxel values range over `0..=material_count`.
    pub material_count: u32,
    /// Face instance capacity. Defaults to half the grid volume.
    pub face_capacity: Option<u32>,
    /// How long an explosion stays visible, in 60 Hz ticks.
    pub explosion_lifetime: f32,
    /// Parallel lanes used by the host emulation backend. Defaults to the core count.
    pub emulation_lanes: Option<usize>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            size: [128, 64, 128],
            paint_slots: 4,
            projectile_capacity: 128,
            material_count: 361,
            face_capacity: None,
            explosion_lifetime: 30.0,
            emulation_lanes: None,
        }
    }
}

impl WorldConfig {
    /// Config for a grid of the given size with every other field at its default.
    pub fn with_size(size: [u32; 3]) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    /// Load and validate a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> WorldResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&text)?;
        log::info!(
            "[WorldConfig] Loaded {} ({}x{}x{})",
            path.as_ref().display(),
            config.size[0],
            config.size[1],
            config.size[2]
        );
        Ok(config)
    }

    /// Parse and validate a config from JSON text.
    pub fn from_json(text: &str) -> WorldResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the kernels generated from this config are well formed.
    pub fn validate(&self) -> WorldResult<()> {
        let invalid = |msg: String| Err(WorldError::InvalidConfig(msg));

        if self.size.iter().any(|&d| d < 2) {
            return invalid(format!(
                "every grid dimension must be at least 2, got {:?}",
                self.size
            ));
        }
        if self.volume() > i32::MAX as u64 {
            return invalid(format!(
                "grid volume {} exceeds the i32 index space",
                self.volume()
            ));
        }
        if !(1..=256).contains(&self.paint_slots) {
            return invalid(format!(
                "paint_slots must be within 1..=256, got {}",
                self.paint_slots
            ));
        }
        if self.projectile_capacity == 0 || self.projectile_capacity > MAX_1D_INVOCATIONS {
            return invalid(format!(
                "projectile_capacity must be within 1..={}, got {}",
                MAX_1D_INVOCATIONS, self.projectile_capacity
            ));
        }
        if self.material_count == 0 {
            return invalid("material_count must be at least 1".to_string());
        }
        if u64::from(self.material_count) * 6 > MAX_EXACT_F32_INT {
            return invalid(format!(
                "material_count {} produces face ids that do not fit an f32 exactly",
                self.material_count
            ));
        }
        if self.face_capacity == Some(0) {
            return invalid("face_capacity must be at least 1".to_string());
        }
        if !self.explosion_lifetime.is_finite() || self.explosion_lifetime <= 0.0 {
            return invalid(format!(
                "explosion_lifetime must be a positive number of ticks, got {}",
                self.explosion_lifetime
            ));
        }
        if self.emulation_lanes == Some(0) {
            return invalid("emulation_lanes must be at least 1".to_string());
        }
        Ok(())
    }

    /// Grid dimensions as a [`GridSize`].
    pub fn grid_size(&self) -> GridSize {
        GridSize::new(self.size[0], self.size[1], self.size[2])
    }

    /// Total voxel count.
    pub fn volume(&self) -> u64 {
        self.size.iter().map(|&d| u64::from(d)).product()
    }

    /// Face instance capacity, defaulting to half the grid volume (rounded up).
    pub fn face_capacity(&self) -> u32 {
        self.face_capacity
            .unwrap_or_else(|| self.volume().div_ceil(2).min(u64::from(u32::MAX)) as u32)
    }

    /// Debris instance capacity: every explosion slot fully populated.
    pub fn debris_capacity(&self) -> u32 {
        self.projectile_capacity.saturating_mul(DEBRIS_PER_EXPLOSION)
    }

    /// Workgroup width of the 1D slot kernels (paint, projectiles, explosion step).
    pub fn slot_workgroup_size(count: u32) -> u32 {
        count.clamp(1, 256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.size, [128, 64, 128]);
        assert_eq!(config.paint_slots, 4);
        assert_eq!(config.projectile_capacity, 128);
    }

    #[test]
    fn test_default_face_capacity_is_half_volume() {
        let config = WorldConfig::with_size([3, 3, 3]);
        assert_eq!(config.face_capacity(), 14);
        let config = WorldConfig::default();
        assert_eq!(config.face_capacity(), 128 * 64 * 128 / 2);
    }

    #[test]
    fn test_rejects_flat_grid() {
        let config = WorldConfig::with_size([16, 1, 16]);
        assert!(matches!(
            config.validate(),
            Err(WorldError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_paint_slots() {
        let config = WorldConfig {
            paint_slots: 300,
            ..WorldConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_lifetime() {
        let config = WorldConfig {
            explosion_lifetime: 0.0,
            ..WorldConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = WorldConfig::from_json(r#"{ "size": [32, 16, 32] }"#).unwrap();
        assert_eq!(config.size, [32, 16, 32]);
        assert_eq!(config.projectile_capacity, 128);
        assert_eq!(config.material_count, 361);
    }

    #[test]
    fn test_json_with_invalid_values_is_rejected() {
        let result = WorldConfig::from_json(r#"{ "projectile_capacity": 0 }"#);
        assert!(matches!(result, Err(WorldError::InvalidConfig(_))));
    }

    #[test]
    fn test_slot_workgroup_size_is_capped() {
        assert_eq!(WorldConfig::slot_workgroup_size(4), 4);
        assert_eq!(WorldConfig::slot_workgroup_size(128), 128);
        assert_eq!(WorldConfig::slot_workgroup_size(1000), 256);
    }
}
