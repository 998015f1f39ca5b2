//! Block partitioning shared by range splitting and the work-sharing loop.
//!
//! Both the process-level partition of an index domain and the per-thread
//! chunking inside a parallel region use the same rule: `count` items are cut
//! into `parts` contiguous blocks whose sizes differ by at most one, and the
//! first `count % parts` blocks receive the extra item.

/// Threading utility namespace.
#[derive(Debug)]
pub struct Threading;

impl Threading {
    /// Size of block `index` when `count` items are split into `parts` blocks.
    #[inline]
    pub fn block_len(count: usize, parts: usize, index: usize) -> usize {
        debug_assert!(parts > 0 && index < parts);
        let base = count / parts;
        if index < count % parts {
            base + 1
        } else {
            base
        }
    }

    /// Offset of the first item of block `index`.
    #[inline]
    pub fn block_start(count: usize, parts: usize, index: usize) -> usize {
        debug_assert!(parts > 0 && index <= parts);
        let base = count / parts;
        let extra = count % parts;
        index * base + index.min(extra)
    }

    /// `(start, len)` of block `index`.
    #[inline]
    pub fn block_info(count: usize, parts: usize, index: usize) -> (usize, usize) {
        (
            Self::block_start(count, parts, index),
            Self::block_len(count, parts, index),
        )
    }
}
