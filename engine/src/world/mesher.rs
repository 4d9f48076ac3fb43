//! Face Mesher
//!
//! Emits one quad instance per exposed voxel face. A face is exposed when the
//! neighbouring cell in its direction is empty; below the grid counts as solid,
//! so the floor of the world never shows its underside.
//!
//! The face list is rebuilt from scratch every frame; only the set of faces is
//! meaningful, not their order.

use bytemuck::{Pod, Zeroable};
use glam::{IVec3, Vec3};

use crate::world::grid::VoxelGrid;
use crate::world::instances::InstanceList;
use crate::world::lanes::Lanes;

/// Face directions in face-id order.
pub const FACE_NORMALS: [IVec3; 6] = [
    IVec3::new(0, 0, 1),
    IVec3::new(0, 1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(0, 0, -1),
];

/// Index of the downward face in [`FACE_NORMALS`].
pub const FACE_DOWN: u32 = 2;

/// Face instance: voxel centre plus `material * 6 + face`, all as floats.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuadInstance {
    pub position: [f32; 3],
    pub face_id: f32,
}

static_assertions::assert_eq_size!(QuadInstance, [u8; 16]);

impl QuadInstance {
    pub fn new(voxel: IVec3, material: u32, face: u32) -> Self {
        Self {
            position: (voxel.as_vec3() + Vec3::splat(0.5)).to_array(),
            face_id: (material * 6 + face) as f32,
        }
    }

    /// Integer voxel coordinate this face belongs to.
    pub fn voxel(&self) -> IVec3 {
        Vec3::from_array(self.position).floor().as_ivec3()
    }

    pub fn material(&self) -> u32 {
        self.face_id as u32 / 6
    }

    /// Direction index into [`FACE_NORMALS`].
    pub fn face(&self) -> u32 {
        self.face_id as u32 % 6
    }
}

/// Emulated `mesher` kernel: one invocation per cell.
pub fn mesh(grid: &VoxelGrid, faces: &InstanceList<QuadInstance>, lanes: &Lanes) {
    let size = grid.size();
    lanes.dispatch(size.volume() as u32, |id| {
        let pos = size.position(id as usize);
        let value = grid.sample(pos);
        if value == 0 {
            return;
        }
        for (face, normal) in FACE_NORMALS.iter().enumerate() {
            if grid.sample(pos + *normal) == 0 {
                faces.push(QuadInstance::new(pos, value - 1, face as u32));
            }
        }
    });
}
