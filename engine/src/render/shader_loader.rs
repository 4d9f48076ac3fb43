//! Shader Loading Utilities
//!
//! Kernels are compiled per world: every source is prefixed with a constants
//! preamble generated from the [`WorldConfig`] (grid size, capacities, radii,
//! workgroup widths), followed by the shared type declarations, the grid
//! helpers for kernels that touch voxels, and finally the kernel itself.
//! A world with different dimensions gets different modules.

use crate::config::{
    DEBRIS_PER_EXPLOSION, DETONATION_RADIUS, MAX_PROJECTILE_ITERATIONS, PAINT_RADIUS,
    PHYSICS_RATE, WorldConfig,
};
use crate::orchestrator::FrameStage;
use crate::physics::explosions::{DEBRIS_GRAVITY, DEBRIS_SCALE, DEBRIS_SPEED};

/// Shader source that can be either embedded at compile time or composed at runtime.
pub enum ShaderSource {
    /// Embedded shader source
    Embedded(&'static str),
    /// Source assembled for a particular world
    Composed(String),
}

impl ShaderSource {
    /// Get the shader source as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            ShaderSource::Embedded(s) => s,
            ShaderSource::Composed(s) => s.as_str(),
        }
    }
}

/// Embedded kernel sources, compiled into the binary.
pub mod embedded {
    pub const TYPES: &str = include_str!("../../shaders/types.wgsl");
    pub const GRID: &str = include_str!("../../shaders/grid.wgsl");

    pub const PAINT: &str = include_str!("../../shaders/paint.wgsl");
    pub const SAND_SETUP: &str = include_str!("../../shaders/sand_setup.wgsl");
    pub const SAND_STEP: &str = include_str!("../../shaders/sand_step.wgsl");
    pub const EXPLOSION_STEP: &str = include_str!("../../shaders/explosion_step.wgsl");
    pub const EXPLOSION_MESH: &str = include_str!("../../shaders/explosion_mesh.wgsl");
    pub const PROJECTILE_STEP: &str = include_str!("../../shaders/projectile_step.wgsl");
    pub const PROJECTILE_COLLIDE: &str = include_str!("../../shaders/projectile_collide.wgsl");
    pub const MESHER: &str = include_str!("../../shaders/mesher.wgsl");
}

/// Body of a kernel, without preamble or shared declarations.
pub fn kernel_source(stage: FrameStage) -> ShaderSource {
    ShaderSource::Embedded(match stage {
        FrameStage::Paint => embedded::PAINT,
        FrameStage::SandSetup => embedded::SAND_SETUP,
        FrameStage::SandStep => embedded::SAND_STEP,
        FrameStage::ExplosionStep => embedded::EXPLOSION_STEP,
        FrameStage::ExplosionMesh => embedded::EXPLOSION_MESH,
        FrameStage::ProjectileStep => embedded::PROJECTILE_STEP,
        FrameStage::ProjectileCollide => embedded::PROJECTILE_COLLIDE,
        FrameStage::Mesher => embedded::MESHER,
    })
}

/// Kernels that bind the voxel grid at `@binding(0)`.
pub fn uses_grid(stage: FrameStage) -> bool {
    matches!(
        stage,
        FrameStage::Paint
            | FrameStage::SandStep
            | FrameStage::ProjectileCollide
            | FrameStage::Mesher
    )
}

/// WGSL `const` declarations for one world.
pub fn constants_preamble(config: &WorldConfig) -> String {
    let size = config.grid_size();
    format!(
        "// Generated for a {sx}x{sy}x{sz} world\n\
         const SIZE_X: u32 = {sx}u;\n\
         const SIZE_Y: u32 = {sy}u;\n\
         const SIZE_Z: u32 = {sz}u;\n\
         const PAINT_SLOTS: u32 = {paint_slots}u;\n\
         const PAINT_WORKGROUP: u32 = {paint_workgroup}u;\n\
         const PAINT_RADIUS: i32 = {paint_radius};\n\
         const PROJECTILE_CAPACITY: u32 = {projectiles}u;\n\
         const PROJECTILE_WORKGROUP: u32 = {projectile_workgroup}u;\n\
         const MAX_ITERATIONS: u32 = {max_iterations}u;\n\
         const DETONATION_RADIUS: i32 = {detonation_radius};\n\
         const PHYSICS_RATE: f32 = {physics_rate:?};\n\
         const FACE_CAPACITY: u32 = {faces}u;\n\
         const TRAIL_CAPACITY: u32 = {projectiles}u;\n\
         const DEBRIS_CAPACITY: u32 = {debris}u;\n\
         const DEBRIS_PER_EXPLOSION: u32 = {debris_per}u;\n\
         const EXPLOSION_LIFETIME: f32 = {lifetime:?};\n\
         const DEBRIS_SPEED: f32 = {debris_speed:?};\n\
         const DEBRIS_GRAVITY: f32 = {debris_gravity:?};\n\
         const DEBRIS_SCALE: f32 = {debris_scale:?};\n",
        sx = size.x,
        sy = size.y,
        sz = size.z,
        paint_slots = config.paint_slots,
        paint_workgroup = WorldConfig::slot_workgroup_size(config.paint_slots),
        paint_radius = PAINT_RADIUS,
        projectiles = config.projectile_capacity,
        projectile_workgroup = WorldConfig::slot_workgroup_size(config.projectile_capacity),
        max_iterations = MAX_PROJECTILE_ITERATIONS,
        detonation_radius = DETONATION_RADIUS,
        physics_rate = PHYSICS_RATE,
        faces = config.face_capacity(),
        debris = config.debris_capacity(),
        debris_per = DEBRIS_PER_EXPLOSION,
        lifetime = config.explosion_lifetime,
        debris_speed = DEBRIS_SPEED,
        debris_gravity = DEBRIS_GRAVITY,
        debris_scale = DEBRIS_SCALE,
    )
}

/// Full source of one kernel for one world.
pub fn compose(config: &WorldConfig, stage: FrameStage) -> ShaderSource {
    let mut source = constants_preamble(config);
    source.push('\n');
    source.push_str(embedded::TYPES);
    if uses_grid(stage) {
        source.push('\n');
        source.push_str(embedded::GRID);
    }
    source.push('\n');
    source.push_str(kernel_source(stage).as_str());
    ShaderSource::Composed(source)
}

/// Create a wgpu shader module from the given source.
///
/// # Arguments
/// * `device` - The wgpu device to create the shader module on
/// * `label` - Label for debugging
/// * `source` - The WGSL shader source
pub fn create_shader_module(
    device: &wgpu::Device,
    label: &str,
    source: &ShaderSource,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.as_str().into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_source_embedded() {
        let source = ShaderSource::Embedded("fn main() {}");
        assert_eq!(source.as_str(), "fn main() {}");
    }

    #[test]
    fn test_preamble_injects_grid_size() {
        let preamble = constants_preamble(&WorldConfig::with_size([32, 16, 8]));
        assert!(preamble.contains("const SIZE_X: u32 = 32u;"));
        assert!(preamble.contains("const SIZE_Y: u32 = 16u;"));
        assert!(preamble.contains("const SIZE_Z: u32 = 8u;"));
    }

    #[test]
    fn test_preamble_floats_have_decimal_point() {
        let preamble = constants_preamble(&WorldConfig::default());
        assert!(preamble.contains("const PHYSICS_RATE: f32 = 60.0;"));
        assert!(preamble.contains("const EXPLOSION_LIFETIME: f32 = 30.0;"));
    }

    #[test]
    fn test_grid_helpers_only_where_needed() {
        let config = WorldConfig::default();
        assert!(compose(&config, FrameStage::Mesher).as_str().contains("fn claim_voxel"));
        assert!(!compose(&config, FrameStage::SandSetup).as_str().contains("fn claim_voxel"));
    }

    #[test]
    fn test_every_kernel_has_main() {
        for stage in FrameStage::ALL {
            assert!(kernel_source(stage).as_str().contains("fn main("), "{}", stage.name());
        }
    }
}
