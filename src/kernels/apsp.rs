//! Distributed all-pairs shortest paths (Floyd-Warshall).
//!
//! Rows of the `n x n` distance matrix are block-distributed over ranks with
//! [`Range::subranges`], and each rank's block is split again over the
//! threads of a [`WorkTeam`]. For every pivot `k` the owner of row `k`
//! broadcasts it, then every rank relaxes its own rows in parallel.

use crate::buf::Buf;
use crate::comm::Communicator;
use crate::core::error::{Result, SpmdError};
use crate::core::types::{Element, Rank};
use crate::range::Range;
use crate::team::WorkTeam;
use log::{debug, info};
use ndarray::{s, ArrayViewMut1, ArrayViewMut2, Axis};
use std::sync::{Mutex, MutexGuard};

fn lock<'m, T>(m: &'m Mutex<T>) -> MutexGuard<'m, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Rows of an `n`-row matrix owned by `rank` in a group of `size`.
pub fn owned_rows(n: usize, size: usize, rank: Rank) -> Result<Range> {
    Range::indices(n)?.subrange(size, rank)
}

#[inline]
fn relax(mut row: ArrayViewMut1<'_, f64>, k: usize, pivot: &[f64]) {
    let dik = row[k];
    if dik == f64::INFINITY {
        return;
    }
    for (d, &dkj) in row.iter_mut().zip(pivot) {
        let via = dik + dkj;
        if via < *d {
            *d = via;
        }
    }
}

/// Run Floyd-Warshall over the group on a square matrix that every rank
/// holds in full. Missing edges are `f64::INFINITY`.
///
/// On return, the rows this rank owns hold final distances; other rows are
/// untouched. Returns the owned row range. Use [`collect_rows`] to assemble
/// the whole result on one rank.
pub fn floyd_warshall(
    comm: &mut Communicator,
    team: &WorkTeam,
    mut dist: ArrayViewMut2<'_, f64>,
) -> Result<Range> {
    let (n, m) = dist.dim();
    if n != m {
        return Err(SpmdError::dimension_mismatch(
            format!("square matrix with {} rows", n),
            format!("{} columns", m),
        ));
    }
    let all = Range::indices(n)?;
    let pieces = all.subranges(comm.size())?;
    let owned = pieces[comm.rank()];
    if n == 0 {
        return Ok(owned);
    }
    info!(
        "rank {} relaxing rows {} of {} with {} threads",
        comm.rank(),
        owned,
        n,
        team.thread_count()
    );

    // Local row indices of the owned block, split per worker.
    let local = Range::indices(owned.length())?;
    let thread_pieces = local.subranges(team.thread_count())?;
    let mut chunks: Vec<Mutex<ArrayViewMut2<'_, f64>>> = Vec::with_capacity(thread_pieces.len());
    if !owned.is_empty() {
        let first = owned.lower() as usize;
        let mut rest = dist.slice_mut(s![first..first + owned.length(), ..]);
        for piece in &thread_pieces {
            let (head, tail) = rest.split_at(Axis(0), piece.length());
            chunks.push(Mutex::new(head));
            rest = tail;
        }
    }

    let cols = Range::indices(n)?;
    let mut pivot = vec![0.0f64; n];
    for k in 0..n {
        let owner = Range::locate(&pieces, k as i64)
            .ok_or_else(|| SpmdError::internal(format!("row {} has no owner", k)))?;
        if owner == comm.rank() {
            let local_row = k - owned.lower() as usize;
            let t = Range::locate(&thread_pieces, local_row as i64)
                .ok_or_else(|| SpmdError::internal(format!("local row {} has no worker", local_row)))?;
            let mut chunk = lock(&chunks[t]);
            let row = Buf::row_slice(chunk.view_mut(), local_row - thread_pieces[t].lower() as usize, cols)?;
            Buf::flat(&mut pivot).copy_from(&row);
        }
        comm.broadcast(owner, &mut Buf::flat(&mut pivot))?;

        let pivot = &pivot;
        let chunks = &chunks;
        team.execute(|region| {
            region.for_loop(&local, |_mine| {
                let mut chunk = lock(&chunks[region.thread_index()]);
                for row in chunk.rows_mut() {
                    relax(row, k, pivot);
                }
            });
        })?;
    }
    debug!("rank {} finished {} pivots", comm.rank(), n);
    Ok(owned)
}

/// Single-threaded reference implementation.
pub fn floyd_warshall_sequential(mut dist: ArrayViewMut2<'_, f64>) -> Result<()> {
    let (n, m) = dist.dim();
    if n != m {
        return Err(SpmdError::dimension_mismatch(
            format!("square matrix with {} rows", n),
            format!("{} columns", m),
        ));
    }
    let mut pivot = vec![0.0f64; n];
    for k in 0..n {
        pivot
            .iter_mut()
            .zip(dist.row(k))
            .for_each(|(p, &d)| *p = d);
        for row in dist.rows_mut() {
            relax(row, k, &pivot);
        }
    }
    Ok(())
}

/// Send every rank's owned row block to `root`, which receives them into the
/// matching rows of its own `matrix`.
pub fn collect_rows<T: Element>(
    comm: &mut Communicator,
    mut matrix: ArrayViewMut2<'_, T>,
    root: Rank,
) -> Result<()> {
    let (n, ncols) = matrix.dim();
    let pieces = Range::indices(n)?.subranges(comm.size())?;
    if root >= comm.size() {
        return Err(SpmdError::invalid_argument(
            "root",
            root,
            format!("must be below group size {}", comm.size()),
        ));
    }
    if n == 0 || ncols == 0 {
        return Ok(());
    }
    let cols = Range::indices(ncols)?;
    if comm.rank() == root {
        for (rank, piece) in pieces.iter().enumerate() {
            if rank == root || piece.is_empty() {
                continue;
            }
            let mut block = Buf::sub_matrix(matrix.view_mut(), *piece, cols)?;
            comm.receive(rank, &mut block)?;
        }
    } else {
        let piece = pieces[comm.rank()];
        if !piece.is_empty() {
            let block = Buf::sub_matrix(matrix.view_mut(), piece, cols)?;
            comm.send(root, &block)?;
        }
    }
    Ok(())
}
