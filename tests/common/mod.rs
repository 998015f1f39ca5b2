//! Common test utilities for hybrid-spmd integration tests.
#![allow(dead_code)]

use hybrid_spmd::*;
use ndarray::Array2;
use rand::prelude::*;

/// Run `f` once per rank of an in-process group, each on its own thread,
/// and return the results in rank order.
pub fn run_group<R, F>(size: usize, window_capacity: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(Communicator) -> R + Sync,
{
    let ranks = Communicator::local_group(size, window_capacity).unwrap();
    std::thread::scope(|s| {
        let handles: Vec<_> = ranks
            .into_iter()
            .map(|comm| {
                let f = &f;
                s.spawn(move || f(comm))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

/// Random directed graph as a distance matrix; missing edges are infinite.
pub fn random_graph(n: usize, density: f64, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            0.0
        } else if rng.gen_bool(density) {
            rng.gen_range(1..100) as f64
        } else {
            f64::INFINITY
        }
    })
}
