//! Sandfall Engine Library
//!
//! A falling-sand voxel world simulated entirely in compute kernels. One frame
//! raises painted terrain, lets it settle layer by layer, advances projectiles
//! and their explosions, and extracts the exposed voxel faces for drawing.
//!
//! # Modules
//!
//! - [`config`] - Construction-time world description, loaded from JSON
//! - [`orchestrator`] - Frame schedule and the [`Simulation`] interface
//! - [`world`] - Voxel grid, painter, sand automaton, mesher and the host emulation backend
//! - [`physics`] - Projectiles and explosions
//! - [`render`] - Headless wgpu backend: buffers, kernels, compute pipelines
//! - [`demo`] - The orbiting-painters-and-random-shots driver
//!
//! # Example
//!
//! ```no_run
//! use sandfall_engine::{CpuWorld, DemoDriver, Simulation, WorldConfig};
//!
//! let mut world = CpuWorld::new(WorldConfig::with_size([64, 32, 64]))?;
//! let mut demo = DemoDriver::new(world.config(), 7);
//! for _ in 0..60 {
//!     demo.drive(&mut world, 1.0 / 60.0)?;
//! }
//! println!("{} faces", world.faces().count());
//! # Ok::<(), sandfall_engine::WorldError>(())
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod orchestrator;
pub mod physics;
pub mod render;
pub mod world;

pub use config::WorldConfig;
pub use demo::DemoDriver;
pub use error::{WorldError, WorldResult};
pub use orchestrator::{FrameStage, PaintQueue, Simulation, frame_schedule};
pub use render::{GpuContext, GpuContextConfig, GpuWorld};
pub use world::{CpuWorld, GridSize, PaintRequest, VoxelGrid};
