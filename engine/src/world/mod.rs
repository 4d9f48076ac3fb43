//! World Module
//!
//! The voxel grid and the kernels that rewrite it every frame, in their host
//! emulation form. The GPU versions live in `engine/shaders/` and mirror these
//! one to one.
//!
//! ## Grid convention
//! Index `z * sx * sy + y * sx + x`, value `0` empty, `n > 0` material `n - 1`.
//! Below `y = 0` is bedrock.

pub mod cpu_world;
pub mod grid;
pub mod instances;
pub mod lanes;
pub mod mesher;
pub mod painter;
pub mod sand;

pub use cpu_world::CpuWorld;
pub use grid::{GridSize, VoxelGrid};
pub use instances::{DispatchArgs, DrawIndexedHeader, DrawIndirectHeader, InstanceList};
pub use lanes::Lanes;
pub use mesher::{FACE_NORMALS, QuadInstance};
pub use painter::PaintRequest;
pub use sand::{SandState, SandUniforms};
