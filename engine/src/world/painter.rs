//! Terrain Painter
//!
//! Raises new terrain: each paint request fills the empty cells of a flat disc
//! (radius 2.5 around the request's column) at the request's height. Painted
//! cells are ordinary sand and may fall during the same frame's sweeps.
//!
//! Solid cells are never overwritten, so repainting a covered disc is a no-op.
//! Overlapping discs in the same dispatch race for their shared cells through
//! the same empty-cell claim the sand automaton uses.

use bytemuck::{Pod, Zeroable};
use glam::IVec3;

use crate::config::PAINT_RADIUS;
use crate::error::{WorldError, WorldResult};
use crate::world::grid::VoxelGrid;
use crate::world::lanes::Lanes;

/// One paint request, laid out as a WGSL `vec4<i32>` (xyz = centre, w = voxel value).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PaintRequest {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Stored voxel value (`material + 1`); `0` marks an unused slot.
    pub value: i32,
}

static_assertions::assert_eq_size!(PaintRequest, [u8; 16]);

impl PaintRequest {
    /// An unused paint slot.
    pub const NONE: Self = Self {
        x: 0,
        y: 0,
        z: 0,
        value: 0,
    };

    /// Paint `material` in a disc centred on `center`.
    ///
    /// Materials past the `i32` range saturate; validation rejects them.
    pub fn new(center: IVec3, material: u32) -> Self {
        Self {
            x: center.x,
            y: center.y,
            z: center.z,
            value: i32::try_from(material).map_or(i32::MAX, |m| m.saturating_add(1)),
        }
    }

    pub fn center(&self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }

    /// Material painted by this request, `None` for an unused slot.
    pub fn material(&self) -> Option<u32> {
        (self.value > 0).then(|| self.value as u32 - 1)
    }
}

/// Check a frame's requests against the painter's slot count and material range.
pub fn validate_requests(
    requests: &[PaintRequest],
    slots: u32,
    material_count: u32,
) -> WorldResult<()> {
    if requests.len() > slots as usize {
        return Err(WorldError::TooManyPaintRequests {
            given: requests.len(),
            slots,
        });
    }
    for request in requests {
        if request.value < 0 {
            return Err(WorldError::MaterialOutOfRange {
                material: request.value as u32,
                count: material_count,
            });
        }
        if let Some(material) = request.material()
            && material >= material_count
        {
            return Err(WorldError::MaterialOutOfRange {
                material,
                count: material_count,
            });
        }
    }
    Ok(())
}

/// Emulated `paint` kernel: one invocation per request slot.
pub fn paint(grid: &VoxelGrid, requests: &[PaintRequest], lanes: &Lanes) {
    lanes.dispatch(requests.len() as u32, |id| {
        paint_disc(grid, requests[id as usize]);
    });
}

fn paint_disc(grid: &VoxelGrid, request: PaintRequest) {
    if request.value == 0 {
        return;
    }
    let size = grid.size();
    let center = request.center();
    let limit = PAINT_RADIUS as f32 - 0.5;
    for x in -PAINT_RADIUS..=PAINT_RADIUS {
        for z in -PAINT_RADIUS..=PAINT_RADIUS {
            let pos = center + IVec3::new(x, 0, z);
            if !size.contains(pos) || ((x * x + z * z) as f32).sqrt() > limit {
                continue;
            }
            grid.claim(size.index(pos), request.value as u32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::grid::GridSize;

    fn grid() -> VoxelGrid {
        VoxelGrid::new(GridSize::new(16, 8, 16))
    }

    #[test]
    fn test_disc_has_21_cells() {
        let grid = grid();
        paint(
            &grid,
            &[PaintRequest::new(IVec3::new(8, 4, 8), 0)],
            &Lanes::sequential(),
        );
        // Offsets with dx² + dz² <= 6.25: 1 + 4 + 4 + 4 + 8 = 21
        assert_eq!(grid.solid_count(), 21);
        assert_eq!(grid.get(IVec3::new(8, 4, 8)), Some(1));
        assert_eq!(grid.get(IVec3::new(10, 4, 9)), Some(1));
        assert_eq!(grid.get(IVec3::new(10, 4, 10)), Some(0));
        assert_eq!(grid.get(IVec3::new(11, 4, 8)), Some(0));
    }

    #[test]
    fn test_disc_is_clipped_at_edges() {
        let grid = grid();
        paint(
            &grid,
            &[PaintRequest::new(IVec3::new(0, 0, 0), 2)],
            &Lanes::sequential(),
        );
        // Quarter disc: dx, dz in 0..=2 with dx² + dz² <= 6.25
        assert_eq!(grid.solid_count(), 8);
        assert_eq!(grid.get(IVec3::ZERO), Some(3));
    }

    #[test]
    fn test_never_overwrites_solid() {
        let grid = grid();
        grid.set(IVec3::new(8, 4, 8), 9);
        paint(
            &grid,
            &[PaintRequest::new(IVec3::new(8, 4, 8), 0)],
            &Lanes::sequential(),
        );
        assert_eq!(grid.get(IVec3::new(8, 4, 8)), Some(9));
    }

    #[test]
    fn test_unused_slot_paints_nothing() {
        let grid = grid();
        paint(&grid, &[PaintRequest::NONE; 4], &Lanes::sequential());
        assert_eq!(grid.solid_count(), 0);
    }

    #[test]
    fn test_validate_rejects_excess_and_unknown_material() {
        let req = PaintRequest::new(IVec3::ZERO, 3);
        assert!(validate_requests(&[req; 4], 4, 10).is_ok());
        assert!(matches!(
            validate_requests(&[req; 5], 4, 10),
            Err(WorldError::TooManyPaintRequests { given: 5, slots: 4 })
        ));
        assert!(matches!(
            validate_requests(&[req], 4, 3),
            Err(WorldError::MaterialOutOfRange { material: 3, count: 3 })
        ));
    }

    #[test]
    fn test_huge_material_is_rejected_not_unused() {
        for material in [i32::MAX as u32 - 1, i32::MAX as u32, u32::MAX] {
            let req = PaintRequest::new(IVec3::ZERO, material);
            assert!(req.value > 0);
            assert!(req.material().is_some());
            assert!(matches!(
                validate_requests(&[req], 4, 361),
                Err(WorldError::MaterialOutOfRange { count: 361, .. })
            ));
        }
    }

    #[test]
    fn test_material_round_trip() {
        assert_eq!(PaintRequest::new(IVec3::ZERO, 0).material(), Some(0));
        assert_eq!(PaintRequest::NONE.material(), None);
    }
}
