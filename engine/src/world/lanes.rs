//! Emulation Lanes
//!
//! Runs one emulated kernel dispatch across scoped worker threads. Invocation
//! ids are dealt round-robin so neighbouring cells land on different lanes and
//! actually contend on the shared atomics, the way GPU invocations do.
//!
//! A dispatch returns only after every lane has joined, which is what gives
//! successive dispatches their sequential ordering.

use std::sync::{Mutex, MutexGuard};
use std::thread;

/// Dispatches smaller than this run inline on the calling thread.
const DEFAULT_MIN_PARALLEL: u32 = 4096;

/// Parallel executor for emulated kernels.
#[derive(Clone, Debug)]
pub struct Lanes {
    count: usize,
    min_parallel: u32,
}

impl Lanes {
    /// Use `requested` lanes, or one per available core.
    pub fn new(requested: Option<usize>) -> Self {
        let count = requested.unwrap_or_else(Self::available).max(1);
        Self {
            count,
            min_parallel: DEFAULT_MIN_PARALLEL,
        }
    }

    /// Single lane; invocations run in id order.
    pub fn sequential() -> Self {
        Self {
            count: 1,
            min_parallel: u32::MAX,
        }
    }

    /// Lower the size at which dispatches go parallel (tests force contention with 1).
    pub fn with_min_parallel(mut self, invocations: u32) -> Self {
        self.min_parallel = invocations.max(1);
        self
    }

    /// Number of cores we may schedule on.
    pub fn available() -> usize {
        core_affinity::get_core_ids()
            .map(|ids| ids.len())
            .filter(|&n| n > 0)
            .unwrap_or(1)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Invoke `kernel(id)` for every id in `0..invocations`.
    pub fn dispatch<F>(&self, invocations: u32, kernel: F)
    where
        F: Fn(u32) + Sync,
    {
        if self.count == 1 || invocations < self.min_parallel {
            (0..invocations).for_each(kernel);
            return;
        }

        let lanes = self.count.min(invocations as usize) as u32;
        let cores = core_affinity::get_core_ids().unwrap_or_default();
        let kernel = &kernel;
        thread::scope(|scope| {
            for lane in 0..lanes {
                let core = cores.get(lane as usize % cores.len().max(1)).copied();
                scope.spawn(move || {
                    if let Some(core) = core {
                        let _ = core_affinity::set_for_current(core);
                    }
                    let mut id = lane;
                    while id < invocations {
                        kernel(id);
                        id += lanes;
                    }
                });
            }
        });
    }
}

/// Lock a per-slot cell. Each slot belongs to one invocation, so this never blocks.
pub fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Default for Lanes {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_every_invocation_runs_once() {
        let lanes = Lanes::new(Some(4)).with_min_parallel(1);
        let hits: Vec<AtomicU32> = (0..1000).map(|_| AtomicU32::new(0)).collect();
        lanes.dispatch(1000, |id| {
            hits[id as usize].fetch_add(1, Ordering::Relaxed);
        });
        assert!(hits.iter().all(|h| h.load(Ordering::Relaxed) == 1));
    }

    #[test]
    fn test_sequential_runs_in_order() {
        let lanes = Lanes::sequential();
        let order = std::sync::Mutex::new(Vec::new());
        lanes.dispatch(5, |id| order.lock().unwrap().push(id));
        assert_eq!(order.into_inner().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_invocations() {
        let lanes = Lanes::new(Some(3)).with_min_parallel(1);
        lanes.dispatch(0, |_| panic!("no invocation expected"));
    }
}
