//! # hybrid-spmd
//!
//! A substrate for hybrid SPMD programs: a fixed group of processes, each
//! running a fixed team of threads, cooperating on one partitioned index
//! domain.
//!
//! - [`Range`] splits an index domain into near-equal contiguous pieces, one
//!   per rank or per thread.
//! - [`Buf`] views caller-owned slices and matrices (flat, row, column,
//!   strided sub-matrix) and streams them through a bounded byte window.
//! - [`Communicator`] moves buffers between ranks: `send`/`receive`,
//!   `broadcast`, `reduce` and `all_reduce`, over in-process channels or TCP.
//! - [`SharedArray`] gives lock-free per-element reduction between threads.
//! - [`WorkTeam`] runs parallel regions with a work-sharing loop.
//! - [`Op`] is the combiner shared by network and thread reductions.
//!
//! ## Example
//!
//! ```rust,no_run
//! use hybrid_spmd::{Buf, Communicator, Op, Range, WorkTeam};
//!
//! # fn main() -> hybrid_spmd::Result<()> {
//! let ranks = Communicator::local_group(4, 1024)?;
//! std::thread::scope(|s| {
//!     for mut comm in ranks {
//!         s.spawn(move || -> hybrid_spmd::Result<()> {
//!             let mine = Range::new(0, 99)?.subrange(comm.size(), comm.rank())?;
//!             let mut partial = [mine.iter().sum::<i64>()];
//!             comm.all_reduce(&mut Buf::flat(&mut partial), Op::sum())?;
//!             assert_eq!(partial[0], 4950);
//!             Ok(())
//!         });
//!     }
//! });
//! # let _team = WorkTeam::new(2)?;
//! # Ok(())
//! # }
//! ```

pub mod buf;
pub mod comm;
pub mod config;
pub mod core;
pub mod kernels;
pub mod op;
pub mod range;
pub mod shared;
pub mod team;

pub use buf::{Buf, FlatBuf, MatrixBuf, ReductionBuf};
pub use comm::{Channel, Communicator, LocalChannel};
#[cfg(feature = "tcp")]
pub use comm::{ConnectPolicy, TcpChannel};
pub use config::{Config, ConfigBuilder};
pub use core::error::{Result, SpmdError};
pub use core::types::{Element, ElementKind, Rank};
pub use core::utils::byte_window::ByteWindow;
pub use op::Op;
pub use range::Range;
pub use shared::{AtomicElement, SharedArray};
pub use team::{Region, WorkTeam};

pub use core::constants::HYBRID_SPMD_VERSION as VERSION;

use static_assertions::assert_impl_all;

assert_impl_all!(Range: Send, Sync, Copy);
assert_impl_all!(Op<f64>: Send, Sync, Clone);
assert_impl_all!(Buf<'static, f64>: Send);
assert_impl_all!(Communicator: Send);
assert_impl_all!(SharedArray<f64>: Send, Sync);
assert_impl_all!(SharedArray<i32>: Send, Sync);
assert_impl_all!(WorkTeam: Send, Sync);

/// Set up logging at `config.log_level` and check the configuration.
///
/// Call once per process before joining the group.
pub fn init(config: &Config) -> Result<()> {
    config.validate()?;
    core::init_logging(config.log_level_filter()?);
    log::info!(
        "hybrid-spmd {} rank {}/{} with {} threads",
        VERSION,
        config.rank,
        config.group_size,
        config.effective_num_threads()
    );
    Ok(())
}
