//! Fixed-size thread team with parallel regions.
//!
//! A [`WorkTeam`] of `Kt` workers keeps `Kt - 1` threads in a rayon pool and
//! uses the calling thread as worker 0. [`WorkTeam::execute`] runs a region
//! closure once on every worker and returns after all of them are done.

pub mod region;

pub use region::Region;

use crate::config::Config;
use crate::core::error::{Result, SpmdError};
use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};
use region::RegionShared;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

/// Keeps the first panic raised by any worker so it can be re-raised on the
/// calling thread once the region is over.
#[derive(Debug, Default)]
struct PanicSlot {
    payload: Mutex<Option<Box<dyn Any + Send + 'static>>>,
}

impl PanicSlot {
    fn run<F: FnOnce()>(&self, f: F) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
            let mut slot = self
                .payload
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if slot.is_none() {
                *slot = Some(payload);
            }
        }
    }

    fn rethrow(self) {
        let payload = self
            .payload
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(payload) = payload {
            panic::resume_unwind(payload);
        }
    }
}

/// A reusable team of worker threads.
pub struct WorkTeam {
    threads: usize,
    pool: Option<ThreadPool>,
    active: Mutex<()>,
}

impl std::fmt::Debug for WorkTeam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkTeam")
            .field("threads", &self.threads)
            .finish()
    }
}

impl WorkTeam {
    /// Create a team of `threads` workers, the caller included.
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(SpmdError::invalid_argument(
                "threads",
                threads,
                "a team needs at least one worker",
            ));
        }
        let pool = if threads > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads - 1)
                .thread_name(|i| format!("spmd-worker-{}", i + 1))
                .build()
                .map_err(|e| SpmdError::threading(format!("Failed to create thread pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };
        debug!("work team of {} threads", threads);
        Ok(Self {
            threads,
            pool,
            active: Mutex::new(()),
        })
    }

    /// One worker per logical CPU.
    pub fn with_default_threads() -> Result<Self> {
        Self::new(num_cpus::get())
    }

    /// Team sized by `config.effective_num_threads()`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.effective_num_threads())
    }

    pub fn thread_count(&self) -> usize {
        self.threads
    }

    /// Run `region` once on each worker and wait for all of them.
    ///
    /// Calls from different threads are serialized. Calling `execute` from
    /// inside a region of the same team deadlocks. A panic in any worker is
    /// re-raised here after the region ends; if the panicking worker skipped
    /// a barrier the others are waiting on, the region never ends.
    pub fn execute<F>(&self, region: F) -> Result<()>
    where
        F: Fn(&Region<'_>) + Sync,
    {
        let _active = self
            .active
            .lock()
            .map_err(|_| SpmdError::threading("work team poisoned by an earlier region"))?;
        let shared = RegionShared::new(self.threads);
        let panics = PanicSlot::default();
        let run = |index: usize| {
            let ctx = Region::new(index, self.threads, &shared);
            panics.run(|| region(&ctx));
        };

        match &self.pool {
            None => run(0),
            Some(pool) => pool.in_place_scope(|scope| {
                scope.spawn_broadcast(|_, worker| run(worker.index() + 1));
                run(0);
            }),
        }

        drop(_active);
        panics.rethrow();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Range;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_every_worker_runs_once() {
        let team = WorkTeam::new(4).unwrap();
        let seen = Mutex::new(Vec::new());
        team.execute(|r| {
            assert_eq!(r.thread_count(), 4);
            seen.lock().unwrap().push(r.thread_index());
        })
        .unwrap();
        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(
            WorkTeam::new(0),
            Err(SpmdError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_single_worker_runs_on_caller() {
        let team = WorkTeam::new(1).unwrap();
        let caller = std::thread::current().id();
        let range = Range::new(0, 9).unwrap();
        let visited = Mutex::new(Vec::new());
        team.execute(|r| {
            assert_eq!(std::thread::current().id(), caller);
            r.for_each(&range, |i| visited.lock().unwrap().push(i));
        })
        .unwrap();
        assert_eq!(visited.into_inner().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_for_loop_chunks_match_subranges() {
        let team = WorkTeam::new(3).unwrap();
        let range = Range::new(0, 9).unwrap();
        let chunks = Mutex::new(vec![None; 3]);
        team.execute(|r| {
            r.for_loop(&range, |chunk| {
                chunks.lock().unwrap()[r.thread_index()] = Some(chunk);
            });
        })
        .unwrap();
        let expected: Vec<_> = range.subranges(3).unwrap().into_iter().map(Some).collect();
        assert_eq!(chunks.into_inner().unwrap(), expected);
    }

    #[test]
    fn test_barrier_separates_phases() {
        let team = WorkTeam::new(4).unwrap();
        let arrived = AtomicUsize::new(0);
        team.execute(|r| {
            arrived.fetch_add(1, Ordering::SeqCst);
            r.barrier();
            assert_eq!(arrived.load(Ordering::SeqCst), 4);
        })
        .unwrap();
    }

    #[test]
    fn test_critical_is_exclusive() {
        let team = WorkTeam::new(4).unwrap();
        let inside = AtomicUsize::new(0);
        let total = AtomicUsize::new(0);
        team.execute(|r| {
            for _ in 0..50 {
                r.critical(|| {
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    total.fetch_add(1, Ordering::SeqCst);
                    inside.fetch_sub(1, Ordering::SeqCst);
                });
            }
        })
        .unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 200);
    }

    #[test]
    fn test_team_is_reusable() {
        let team = WorkTeam::new(2).unwrap();
        let count = AtomicUsize::new(0);
        for _ in 0..10 {
            team.execute(|_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 20);
    }

    #[test]
    #[should_panic(expected = "worker failure")]
    fn test_worker_panic_reaches_caller() {
        let team = WorkTeam::new(3).unwrap();
        team.execute(|r| {
            if r.thread_index() == 2 {
                panic!("worker failure");
            }
        })
        .unwrap();
    }
}
