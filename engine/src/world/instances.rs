//! Instance Lists
//!
//! Append-only draw records built by kernels. Every list is one buffer: an
//! indirect-draw header whose `instance_count` doubles as the atomic append
//! cursor, followed by tightly packed `f32` instance data.
//!
//! Appends are capacity-guarded: an invocation that draws a slot past the end
//! gives its increment back and drops the record, so after a dispatch the
//! count is `min(requested, capacity)` and nothing is written out of bounds.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use bytemuck::{Pod, Zeroable};

/// Vertices per face quad (two triangles, non-indexed).
pub const FACE_VERTEX_COUNT: u32 = 6;

/// Indices per cube (trail and debris instances are drawn as cubes).
pub const CUBE_INDEX_COUNT: u32 = 36;

/// Header for `draw_indirect`.
///
/// Layout (16 bytes): vertex_count, instance_count, first_vertex, first_instance
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndirectHeader {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

/// Header for `draw_indexed_indirect`.
///
/// Layout (20 bytes): index_count, instance_count, first_index, base_vertex, first_instance
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedHeader {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub first_instance: u32,
}

/// Workgroup counts for `dispatch_workgroups_indirect`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DispatchArgs {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

static_assertions::assert_eq_size!(DrawIndirectHeader, [u8; 16]);
static_assertions::assert_eq_size!(DrawIndexedHeader, [u8; 20]);
static_assertions::assert_eq_size!(DispatchArgs, [u8; 12]);

impl DrawIndirectHeader {
    /// Header for face quads with no instances yet.
    pub fn faces() -> Self {
        Self {
            vertex_count: FACE_VERTEX_COUNT,
            ..Self::default()
        }
    }
}

impl DrawIndexedHeader {
    /// Header for instanced cubes with no instances yet.
    pub fn cubes() -> Self {
        Self {
            index_count: CUBE_INDEX_COUNT,
            ..Self::default()
        }
    }
}

/// Byte offset of `instance_count` in either header; the only word cleared per frame.
pub const INSTANCE_COUNT_OFFSET: u64 = 4;

/// Emulated instance list of `T` records.
pub struct InstanceList<T: Pod> {
    capacity: u32,
    count: AtomicU32,
    words: Vec<AtomicU32>,
    _record: PhantomData<T>,
}

impl<T: Pod> InstanceList<T> {
    const WORDS: usize = std::mem::size_of::<T>() / 4;

    pub fn new(capacity: u32) -> Self {
        let words = (0..capacity as usize * Self::WORDS)
            .map(|_| AtomicU32::new(0))
            .collect();
        Self {
            capacity,
            count: AtomicU32::new(0),
            words,
            _record: PhantomData,
        }
    }

    /// Append a record; `None` if the list is full.
    pub fn push(&self, record: T) -> Option<u32> {
        let slot = self.count.fetch_add(1, Ordering::Relaxed);
        if slot >= self.capacity {
            self.count.fetch_sub(1, Ordering::Relaxed);
            return None;
        }
        let base = slot as usize * Self::WORDS;
        for (i, chunk) in bytemuck::bytes_of(&record).chunks_exact(4).enumerate() {
            let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            self.words[base + i].store(word, Ordering::Relaxed);
        }
        Some(slot)
    }

    /// Host-side counter reset done before each frame.
    pub fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Copy out the records appended so far.
    pub fn records(&self) -> Vec<T> {
        let words: Vec<u32> = self.words[..self.count() as usize * Self::WORDS]
            .iter()
            .map(|w| w.load(Ordering::Relaxed))
            .collect();
        bytemuck::cast_slice::<u32, u8>(&words)
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::lanes::Lanes;

    #[repr(C)]
    #[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
    struct Pair {
        a: f32,
        b: f32,
    }

    #[test]
    fn test_push_and_read_back() {
        let list = InstanceList::<Pair>::new(4);
        assert_eq!(list.push(Pair { a: 1.0, b: 2.0 }), Some(0));
        assert_eq!(list.push(Pair { a: 3.0, b: 4.0 }), Some(1));
        assert_eq!(
            list.records(),
            vec![Pair { a: 1.0, b: 2.0 }, Pair { a: 3.0, b: 4.0 }]
        );
    }

    #[test]
    fn test_overflow_is_dropped_and_count_clamped() {
        let list = InstanceList::<Pair>::new(100);
        Lanes::new(Some(8))
            .with_min_parallel(1)
            .dispatch(1000, |id| {
                list.push(Pair {
                    a: id as f32,
                    b: 0.0,
                });
            });
        assert_eq!(list.count(), 100);
        assert_eq!(list.records().len(), 100);
    }

    #[test]
    fn test_reset_empties_list() {
        let list = InstanceList::<Pair>::new(2);
        list.push(Pair { a: 0.0, b: 0.0 });
        list.reset();
        assert_eq!(list.count(), 0);
        assert!(list.records().is_empty());
    }

    #[test]
    fn test_headers_start_empty() {
        assert_eq!(DrawIndirectHeader::faces().vertex_count, 6);
        assert_eq!(DrawIndirectHeader::faces().instance_count, 0);
        assert_eq!(DrawIndexedHeader::cubes().index_count, 36);
    }
}
