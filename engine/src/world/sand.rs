//! Sand Automaton
//!
//! Gravity relaxation by layer sweeps. A sweep looks at one layer `y + 1` and
//! moves each occupied cell into the first free cell among five candidates on
//! layer `y`: straight down, then the four diagonals in an order rotated per
//! cell by a shared counter.
//!
//! The move is a compare-exchange claim on the destination followed by a clear
//! of the source. Sources and destinations live on different layers, so the
//! only contention is between sources racing for the same destination, and
//! exactly one of them wins.
//!
//! The layer cursor walks `size_y - 2 ..= 0` and wraps; `size_y - 1` sweeps per
//! frame take every layer once, so a column of any height settles in a frame.

use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use bytemuck::{Pod, Zeroable};
use glam::IVec3;

use crate::world::grid::{GridSize, VoxelGrid};
use crate::world::lanes::Lanes;

/// Destination offsets relative to the source: down first, then the diagonals.
pub const FALL_CANDIDATES: [IVec3; 5] = [
    IVec3::new(0, -1, 0),
    IVec3::new(0, -1, -1),
    IVec3::new(-1, -1, 0),
    IVec3::new(0, -1, 1),
    IVec3::new(1, -1, 0),
];

/// GPU layout of the sweep state: `{ offset: atomic<u32>, y: i32 }`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct SandUniforms {
    pub offset: u32,
    pub y: i32,
}

static_assertions::assert_eq_size!(SandUniforms, [u8; 8]);

/// Candidate table slot tried `n`-th by a cell that drew `offset`.
#[inline]
pub fn candidate_slot(n: u32, offset: u32) -> usize {
    if n == 0 {
        0
    } else {
        1 + (n.wrapping_add(offset) % 4) as usize
    }
}

/// Emulated sweep state, shared by every invocation of a step dispatch.
#[derive(Debug, Default)]
pub struct SandState {
    offset: AtomicU32,
    y: AtomicI32,
}

impl SandState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destination layer of the next step.
    pub fn layer(&self) -> i32 {
        self.y.load(Ordering::Relaxed)
    }

    /// Current GPU-layout view.
    pub fn uniforms(&self) -> SandUniforms {
        SandUniforms {
            offset: self.offset.load(Ordering::Relaxed),
            y: self.layer(),
        }
    }
}

/// Emulated `sand_setup` kernel (single invocation): reset the offset and step the layer down.
pub fn setup(state: &SandState, size: GridSize) {
    state.offset.store(0, Ordering::Relaxed);
    let y = state.y.load(Ordering::Relaxed) - 1;
    let y = if y < 0 { size.y as i32 - 2 } else { y };
    state.y.store(y, Ordering::Relaxed);
}

/// Emulated `sand_step` kernel: one invocation per `(x, z)` column.
pub fn step(grid: &VoxelGrid, state: &SandState, lanes: &Lanes) {
    let size = grid.size();
    let y = state.layer();
    lanes.dispatch(size.x * size.z, |id| {
        let source = IVec3::new((id % size.x) as i32, y + 1, (id / size.x) as i32);
        fall(grid, state, source);
    });
}

fn fall(grid: &VoxelGrid, state: &SandState, source: IVec3) {
    let size = grid.size();
    if !size.contains(source) {
        return;
    }
    let from = size.index(source);
    let value = grid.cell(from).load(Ordering::Relaxed);
    if value == 0 {
        return;
    }

    let offset = state.offset.fetch_add(1, Ordering::Relaxed);
    for n in 0..FALL_CANDIDATES.len() as u32 {
        let target = source + FALL_CANDIDATES[candidate_slot(n, offset)];
        if !size.contains(target) {
            continue;
        }
        if grid.claim(size.index(target), value) {
            grid.cell(from).store(0, Ordering::Relaxed);
            return;
        }
    }
}

/// One sweep: setup followed by step.
pub fn sweep(grid: &VoxelGrid, state: &SandState, lanes: &Lanes) {
    setup(state, grid.size());
    step(grid, state, lanes);
}

/// A frame's worth of sweeps (`size_y - 1`).
pub fn relax(grid: &VoxelGrid, state: &SandState, lanes: &Lanes) {
    for _ in 0..grid.size().y.saturating_sub(1) {
        sweep(grid, state, lanes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_order_visits_every_diagonal() {
        for offset in 0..8 {
            let mut slots: Vec<usize> = (0..5).map(|n| candidate_slot(n, offset)).collect();
            assert_eq!(slots[0], 0);
            slots.sort_unstable();
            assert_eq!(slots, vec![0, 1, 2, 3, 4]);
        }
    }

    #[test]
    fn test_setup_walks_layers_and_wraps() {
        let state = SandState::new();
        let size = GridSize::new(4, 5, 4);
        let mut layers = Vec::new();
        for _ in 0..5 {
            setup(&state, size);
            layers.push(state.layer());
        }
        assert_eq!(layers, vec![3, 2, 1, 0, 3]);
    }

    #[test]
    fn test_setup_resets_offset() {
        let state = SandState::new();
        state.offset.store(17, Ordering::Relaxed);
        setup(&state, GridSize::new(2, 2, 2));
        assert_eq!(state.uniforms().offset, 0);
    }

    #[test]
    fn test_single_cell_falls_to_floor_in_one_frame() {
        let grid = VoxelGrid::new(GridSize::new(3, 8, 3));
        grid.set(IVec3::new(1, 7, 1), 4);
        relax(&grid, &SandState::new(), &Lanes::sequential());
        assert_eq!(grid.get(IVec3::new(1, 0, 1)), Some(4));
        assert_eq!(grid.solid_count(), 1);
    }

    #[test]
    fn test_blocked_cell_slides_diagonally() {
        let grid = VoxelGrid::new(GridSize::new(3, 2, 3));
        grid.set(IVec3::new(1, 0, 1), 1);
        grid.set(IVec3::new(1, 1, 1), 2);
        let state = SandState::new();
        sweep(&grid, &state, &Lanes::sequential());
        assert_eq!(state.layer(), 0);
        assert_eq!(grid.get(IVec3::new(1, 1, 1)), Some(0));
        let floor: Vec<u32> = [(1, 0), (0, 1), (1, 2), (2, 1)]
            .iter()
            .filter_map(|&(x, z)| grid.get(IVec3::new(x, 0, z)))
            .collect();
        assert_eq!(floor.iter().filter(|&&v| v == 2).count(), 1);
    }

    #[test]
    fn test_supported_cell_stays() {
        let grid = VoxelGrid::new(GridSize::new(1, 2, 1));
        grid.set(IVec3::new(0, 0, 0), 1);
        grid.set(IVec3::new(0, 1, 0), 1);
        sweep(&grid, &SandState::new(), &Lanes::sequential());
        assert_eq!(grid.snapshot(), vec![1, 1]);
    }
}
