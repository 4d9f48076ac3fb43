//! Frame Tests - Orchestration Through Whole Frames
//!
//! Stage ordering effects, per-frame counter resets, delta clamping and the
//! paint queue, all observed through the host emulation world.

use glam::{IVec3, Vec3};
use sandfall_engine::orchestrator::{FrameStage, frame_schedule};
use sandfall_engine::physics::{ExplosionState, ProjectileState};
use sandfall_engine::world::Lanes;
use sandfall_engine::{CpuWorld, PaintRequest, Simulation, WorldConfig, WorldError};

fn world(size: [u32; 3]) -> CpuWorld {
    let config = WorldConfig {
        projectile_capacity: 4,
        ..WorldConfig::with_size(size)
    };
    CpuWorld::new(config).unwrap().with_lanes(Lanes::sequential())
}

// ============================================================================
// Schedule
// ============================================================================

#[test]
fn test_schedule_brackets_sand_between_paint_and_physics() {
    let schedule = frame_schedule(64);
    assert_eq!(schedule.first(), Some(&FrameStage::Paint));
    assert_eq!(schedule.last(), Some(&FrameStage::Mesher));
    let sand_steps = schedule
        .iter()
        .filter(|&&s| s == FrameStage::SandStep)
        .count();
    assert_eq!(sand_steps, 63);

    let explosion = schedule
        .iter()
        .position(|&s| s == FrameStage::ExplosionStep)
        .unwrap();
    let projectile = schedule
        .iter()
        .position(|&s| s == FrameStage::ProjectileStep)
        .unwrap();
    assert!(explosion < projectile);
}

#[test]
fn test_paint_settles_and_meshes_in_the_same_frame() {
    let mut world = world([16, 12, 16]);
    world
        .queue_paint(&[
            PaintRequest::new(IVec3::new(4, 11, 4), 0),
            PaintRequest::new(IVec3::new(11, 11, 11), 5),
        ])
        .unwrap();
    world.frame(1.0 / 60.0);

    assert_eq!(world.grid().solid_count(), 42);
    // Both discs flat on the floor: bottom layer only
    let size = world.grid().size();
    for (index, value) in world.grid().snapshot().into_iter().enumerate() {
        if value != 0 {
            assert_eq!(size.position(index).y, 0);
        }
    }
    // Settled terrain meshes identically frame after frame
    let faces = world.faces().count();
    assert!(faces > 42);
    world.frame(1.0 / 60.0);
    assert_eq!(world.faces().count(), faces);
}

#[test]
fn test_paint_is_ignored_where_cells_are_taken() {
    let mut world = world([8, 4, 8]);
    world.grid().set(IVec3::new(4, 3, 4), 9);
    world
        .queue_paint(&[PaintRequest::new(IVec3::new(4, 3, 4), 0)])
        .unwrap();
    world.frame(0.0);
    assert_eq!(world.grid().solid_count(), 21);
    assert_eq!(world.grid().get(IVec3::new(4, 0, 4)), Some(9));
}

// ============================================================================
// Paint queue
// ============================================================================

#[test]
fn test_too_many_paint_requests_rejected() {
    let mut world = world([8, 4, 8]);
    let request = PaintRequest::new(IVec3::new(4, 3, 4), 0);
    let result = world.queue_paint(&[request; 5]);
    assert!(matches!(
        result,
        Err(WorldError::TooManyPaintRequests { given: 5, slots: 4 })
    ));
    world.frame(0.0);
    assert_eq!(world.grid().solid_count(), 0);
}

#[test]
fn test_unknown_material_rejected() {
    let mut world = world([8, 4, 8]);
    let result = world.queue_paint(&[PaintRequest::new(IVec3::ZERO, 361)]);
    assert!(matches!(
        result,
        Err(WorldError::MaterialOutOfRange { material: 361, count: 361 })
    ));
}

#[test]
fn test_requeue_replaces_pending_paint() {
    let mut world = world([16, 4, 16]);
    world
        .queue_paint(&[
            PaintRequest::new(IVec3::new(4, 3, 4), 0),
            PaintRequest::new(IVec3::new(11, 3, 11), 0),
        ])
        .unwrap();
    world
        .queue_paint(&[PaintRequest::new(IVec3::new(8, 3, 8), 1)])
        .unwrap();
    assert_eq!(world.pending_paint().pending(), 1);
    world.frame(0.0);
    assert_eq!(world.grid().solid_count(), 21);
}

// ============================================================================
// Delta handling
// ============================================================================

#[test]
fn test_large_delta_is_clamped_to_one_second() {
    let mut world = world([8, 8, 8]);
    world.shoot(Vec3::new(4.0, 6.0, 4.0), Vec3::X);
    world.frame(0.0);
    world.frame(30.0);
    let p = world.projectiles().slot(0).unwrap_or_default();
    // one second is 60 ticks of motion
    assert_eq!(p.position, Vec3::new(64.0, 6.0, 4.0));
}

#[test]
fn test_non_finite_delta_does_not_move_anything() {
    let mut world = world([8, 8, 8]);
    world.shoot(Vec3::new(4.0, 6.0, 4.0), Vec3::X);
    world.frame(0.0);
    world.frame(f32::NAN);
    world.frame(f32::INFINITY);
    world.frame(-1.0);
    let p = world.projectiles().slot(0).unwrap_or_default();
    assert_eq!(p.position, Vec3::new(4.0, 6.0, 4.0));
    assert_eq!(p.iteration, 3);
}

// ============================================================================
// Explosions through frames
// ============================================================================

#[test]
fn test_explosion_visible_for_bounded_frames() {
    let mut world = world([16, 8, 16]);
    world.shoot(Vec3::new(8.5, 2.0, 8.5), Vec3::NEG_Y);
    world.frame(0.0625); // admitted
    world.frame(0.0625); // grounded
    world.frame(0.0625); // detonating, explosion ignited after the explosion step
    assert_eq!(
        world.projectiles().slot(0).unwrap_or_default().state,
        ProjectileState::Detonating
    );
    assert_eq!(world.debris().count(), 0);

    // lifetime 30 ticks at 3.75 ticks per frame: 8 visible frames
    let mut visible = 0;
    for _ in 0..12 {
        world.frame(0.0625);
        let debris = world.debris().count();
        assert!(debris == 0 || debris == 64, "debris {debris}");
        if debris == 64 {
            visible += 1;
        }
    }
    assert_eq!(visible, 8);
    assert_eq!(
        world.explosions().slot(0).unwrap_or_default().state,
        ExplosionState::Idle
    );
}

#[test]
fn test_debris_starts_at_explosion_centre() {
    let mut world = world([16, 8, 16]);
    world.shoot(Vec3::new(8.5, 2.0, 8.5), Vec3::NEG_Y);
    world.frame(0.0625);
    world.frame(0.0625);
    world.frame(0.0625);
    world.frame(0.0625);
    let centre = world.explosions().slot(0).unwrap_or_default().position;
    for debris in world.debris().records() {
        assert_eq!(Vec3::from_array(debris.position), centre);
        assert_eq!(debris.scale, 0.5);
    }
}

#[test]
fn test_frame_index_counts_frames() {
    let mut world = world([8, 4, 8]);
    for expected in 1..=5 {
        world.frame(1.0 / 60.0);
        assert_eq!(world.frame_index(), expected);
    }
}
