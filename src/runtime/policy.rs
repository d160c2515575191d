//! Execution policy passed to the parallel entry points

use super::WorkerPool;
use std::ops::Range;

/// Where an eager operation runs
///
/// `Sequential` runs on the calling thread. `Parallel` splits the work into
/// at most [`WorkerPool::workers`] disjoint tasks on the given pool.
#[derive(Clone, Copy, Debug, Default)]
pub enum ExecutionPolicy<'a> {
    /// Calling thread only
    #[default]
    Sequential,
    /// Tasks on a worker pool
    Parallel(&'a WorkerPool),
}

impl<'a> ExecutionPolicy<'a> {
    /// Upper bound on the number of tasks one operation is split into
    pub fn max_tasks(&self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Parallel(pool) => pool.workers(),
        }
    }

    /// The pool, for `Parallel`
    pub fn pool(&self) -> Option<&'a WorkerPool> {
        match self {
            Self::Sequential => None,
            Self::Parallel(pool) => Some(pool),
        }
    }

    /// Number of tasks for `len` items when each task should get at least
    /// `grain` of them
    pub fn tasks_for(&self, len: usize, grain: usize) -> usize {
        self.max_tasks().min(len.div_ceil(grain.max(1))).max(1)
    }
}

/// Split `0..len` into `parts` contiguous ranges whose lengths differ by at
/// most one, longer ranges first
///
/// ```
/// use ndexpr::runtime::split_range;
///
/// let parts: Vec<_> = split_range(10, 3).collect();
/// assert_eq!(parts, vec![0..4, 4..7, 7..10]);
/// ```
pub fn split_range(len: usize, parts: usize) -> impl Iterator<Item = Range<usize>> {
    let parts = parts.max(1);
    let base = len / parts;
    let extra = len % parts;
    (0..parts).scan(0, move |start, i| {
        let size = base + usize::from(i < extra);
        let range = *start..*start + size;
        *start += size;
        Some(range)
    })
}
