//! Lock-free shared state for threads of one process.
//!
//! [`SharedArray`] is the only synchronized structure in the crate; buffer
//! access relies on callers partitioning writes.

pub mod array;
pub mod atomic;

pub use array::SharedArray;
pub use atomic::AtomicElement;
