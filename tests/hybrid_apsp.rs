//! Distributed Floyd-Warshall against the sequential reference.

mod common;

use approx::assert_relative_eq;
use common::{random_graph, run_group};
use hybrid_spmd::kernels::{collect_rows, floyd_warshall, floyd_warshall_sequential};
use hybrid_spmd::*;

fn check(n: usize, ranks: usize, threads: usize, window: usize, seed: u64) {
    let graph = random_graph(n, 0.3, seed);
    let mut expected = graph.clone();
    floyd_warshall_sequential(expected.view_mut()).unwrap();

    let results = run_group(ranks, window, |mut comm| {
        let team = WorkTeam::new(threads).unwrap();
        let mut dist = graph.clone();
        let owned = floyd_warshall(&mut comm, &team, dist.view_mut()).unwrap();
        collect_rows(&mut comm, dist.view_mut(), 0).unwrap();
        (owned, dist)
    });

    let owned: Vec<Range> = results.iter().map(|(o, _)| *o).collect();
    assert_eq!(owned, Range::indices(n).unwrap().subranges(ranks).unwrap());

    let (_, root) = &results[0];
    for ((i, j), &d) in expected.indexed_iter() {
        if d.is_infinite() {
            assert!(root[[i, j]].is_infinite(), "({}, {})", i, j);
        } else {
            assert_relative_eq!(root[[i, j]], d);
        }
    }
}

#[test]
fn test_single_rank_single_thread() {
    check(12, 1, 1, 64, 1);
}

#[test]
fn test_ranks_only() {
    check(20, 3, 1, 64, 2);
}

#[test]
fn test_threads_only() {
    check(20, 1, 4, 64, 3);
}

#[test]
fn test_hybrid_uneven_split() {
    check(23, 4, 3, 40, 4);
}

#[test]
fn test_more_ranks_than_rows() {
    check(3, 5, 2, 16, 5);
}

#[test]
fn test_owned_rows_only_are_final() {
    let graph = random_graph(10, 0.4, 9);
    let mut expected = graph.clone();
    floyd_warshall_sequential(expected.view_mut()).unwrap();

    let results = run_group(2, 128, |mut comm| {
        let team = WorkTeam::new(2).unwrap();
        let mut dist = graph.clone();
        let owned = floyd_warshall(&mut comm, &team, dist.view_mut()).unwrap();
        (owned, dist)
    });
    for (owned, dist) in results {
        for i in owned.iter() {
            let i = i as usize;
            assert_eq!(dist.row(i), expected.row(i));
        }
    }
}
