//! Voxel Grid
//!
//! Dense `u32` material field indexed `z * sx * sy + y * sx + x`.
//! `0` is empty, `n > 0` is solid with material `n - 1`.
//!
//! Outside the stored volume the grid is implicit: anything below `y = 0` is
//! bedrock (solid), anything else outside the bounds is air.
//!
//! Cells are `AtomicU32` so emulated kernels can share the grid across lanes.
//! All accesses are `Relaxed`, matching WGSL atomics; ordering between
//! dispatches comes from joining the lanes.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::IVec3;

/// Grid dimensions in voxels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl GridSize {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Total number of cells.
    pub fn volume(&self) -> usize {
        self.x as usize * self.y as usize * self.z as usize
    }

    /// Dimensions as a signed vector, the form the kernels compare against.
    pub fn as_ivec3(&self) -> IVec3 {
        IVec3::new(self.x as i32, self.y as i32, self.z as i32)
    }

    /// True if `pos` addresses a stored cell.
    #[inline]
    pub fn contains(&self, pos: IVec3) -> bool {
        let size = self.as_ivec3();
        pos.cmpge(IVec3::ZERO).all() && pos.cmplt(size).all()
    }

    /// Linear index of an in-bounds position.
    #[inline]
    pub fn index(&self, pos: IVec3) -> usize {
        debug_assert!(self.contains(pos), "{pos} outside {self:?}");
        (pos.z as usize * self.y as usize + pos.y as usize) * self.x as usize + pos.x as usize
    }

    /// Inverse of [`GridSize::index`].
    pub fn position(&self, index: usize) -> IVec3 {
        let sx = self.x as usize;
        let sy = self.y as usize;
        IVec3::new(
            (index % sx) as i32,
            ((index / sx) % sy) as i32,
            (index / (sx * sy)) as i32,
        )
    }
}

/// Storage for one world's voxels.
pub struct VoxelGrid {
    size: GridSize,
    cells: Vec<AtomicU32>,
}

impl VoxelGrid {
    /// An all-empty grid.
    pub fn new(size: GridSize) -> Self {
        let cells = (0..size.volume()).map(|_| AtomicU32::new(0)).collect();
        Self { size, cells }
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    /// Stored value at `pos`, or `None` outside the grid.
    pub fn get(&self, pos: IVec3) -> Option<u32> {
        self.size
            .contains(pos)
            .then(|| self.cells[self.size.index(pos)].load(Ordering::Relaxed))
    }

    /// Value with the implicit boundary applied: bedrock below, air elsewhere.
    #[inline]
    pub fn sample(&self, pos: IVec3) -> u32 {
        if pos.y < 0 {
            return 1;
        }
        self.get(pos).unwrap_or(0)
    }

    /// Overwrite a cell. Out-of-bounds writes are ignored.
    pub fn set(&self, pos: IVec3, value: u32) {
        if self.size.contains(pos) {
            self.cells[self.size.index(pos)].store(value, Ordering::Relaxed);
        }
    }

    /// Fill the inclusive box `min..=max` (clipped to the grid).
    pub fn fill_box(&self, min: IVec3, max: IVec3, value: u32) {
        for z in min.z..=max.z {
            for y in min.y..=max.y {
                for x in min.x..=max.x {
                    self.set(IVec3::new(x, y, z), value);
                }
            }
        }
    }

    /// Raw cell handle for kernels.
    #[inline]
    pub fn cell(&self, index: usize) -> &AtomicU32 {
        &self.cells[index]
    }

    /// Atomically write `value` into `index` if and only if the cell is empty.
    #[inline]
    pub fn claim(&self, index: usize, value: u32) -> bool {
        self.cells[index]
            .compare_exchange(0, value, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }

    /// Atomically read and clear a cell, returning what it held.
    #[inline]
    pub fn take(&self, index: usize) -> u32 {
        self.cells[index].swap(0, Ordering::Relaxed)
    }

    /// Number of non-empty cells.
    pub fn solid_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.load(Ordering::Relaxed) != 0)
            .count()
    }

    /// Plain copy of the current values, in index order.
    pub fn snapshot(&self) -> Vec<u32> {
        self.cells.iter().map(|c| c.load(Ordering::Relaxed)).collect()
    }

    /// Reset every cell to empty.
    pub fn clear(&self) {
        for cell in &self.cells {
            cell.store(0, Ordering::Relaxed);
        }
    }
}
