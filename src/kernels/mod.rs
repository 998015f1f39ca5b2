//! Hybrid process/thread kernels built on the substrate.

pub mod apsp;

pub use apsp::{collect_rows, floyd_warshall, floyd_warshall_sequential, owned_rows};
