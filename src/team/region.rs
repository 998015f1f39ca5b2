//! Per-worker view of a running parallel region.

use crate::range::Range;
use std::sync::{Barrier, Mutex};

/// State shared by all workers of one `execute` call.
pub(crate) struct RegionShared {
    pub(crate) barrier: Barrier,
    pub(crate) critical: Mutex<()>,
}

impl RegionShared {
    pub(crate) fn new(threads: usize) -> Self {
        Self {
            barrier: Barrier::new(threads),
            critical: Mutex::new(()),
        }
    }
}

/// Handed to the region closure on every worker.
///
/// Loop constructs split a [`Range`] with the same rule as
/// [`Range::subranges`]: worker `k` of `Kt` gets piece `k`. Every worker of
/// the team must reach each barrier, including the implicit one at the end
/// of [`for_loop`](Self::for_loop) and [`for_each`](Self::for_each).
pub struct Region<'a> {
    index: usize,
    count: usize,
    shared: &'a RegionShared,
}

impl<'a> Region<'a> {
    pub(crate) fn new(index: usize, count: usize, shared: &'a RegionShared) -> Self {
        Self {
            index,
            count,
            shared,
        }
    }

    /// This worker's index, `0` for the thread that called `execute`.
    pub fn thread_index(&self) -> usize {
        self.index
    }

    /// Number of workers in the team.
    pub fn thread_count(&self) -> usize {
        self.count
    }

    /// The piece of `range` this worker owns.
    pub fn chunk(&self, range: &Range) -> Range {
        range.piece(self.count, self.index)
    }

    /// Run `body` on this worker's chunk of `range`, then wait for the team.
    ///
    /// `body` is skipped when the chunk is empty.
    pub fn for_loop<F>(&self, range: &Range, body: F)
    where
        F: FnOnce(Range),
    {
        self.for_loop_nowait(range, body);
        self.barrier();
    }

    /// [`for_loop`](Self::for_loop) without the trailing barrier.
    pub fn for_loop_nowait<F>(&self, range: &Range, body: F)
    where
        F: FnOnce(Range),
    {
        let chunk = self.chunk(range);
        if !chunk.is_empty() {
            body(chunk);
        }
    }

    /// Call `f` for each index of this worker's chunk in increasing order,
    /// then wait for the team.
    pub fn for_each<F>(&self, range: &Range, f: F)
    where
        F: FnMut(i64),
    {
        self.chunk(range).iter().for_each(f);
        self.barrier();
    }

    /// Block until every worker has called `barrier`.
    pub fn barrier(&self) {
        if self.count > 1 {
            self.shared.barrier.wait();
        }
    }

    /// Run `f` while holding the team-wide lock.
    pub fn critical<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self
            .shared
            .critical
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f()
    }
}
