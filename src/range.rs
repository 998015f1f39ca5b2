//! Strided integer index ranges and their deterministic partitioning.
//!
//! A [`Range`] is the unit of decomposition for both processes and threads:
//! the global index domain is split once per run with
//! [`Range::subranges`], and each piece is handed to the rank (or worker)
//! with the same position in the returned vector.

use crate::core::error::{Result, SpmdError};
use crate::core::utils::threading::Threading;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An inclusive, strided interval of integer indices.
///
/// `upper` is normalized to the last index actually reached, so
/// `Range::with_stride(0, 10, 4)` has `upper() == 8` and length 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    lower: i64,
    upper: i64,
    stride: i64,
    length: usize,
}

impl Range {
    /// Unit-stride range `lower..=upper`.
    pub fn new(lower: i64, upper: i64) -> Result<Self> {
        Self::with_stride(lower, upper, 1)
    }

    /// Strided range starting at `lower`, not exceeding `upper`.
    pub fn with_stride(lower: i64, upper: i64, stride: i64) -> Result<Self> {
        if stride < 1 {
            return Err(SpmdError::invalid_argument(
                "stride",
                stride,
                "must be at least 1",
            ));
        }
        if upper < lower {
            return Err(SpmdError::invalid_argument(
                "upper",
                upper,
                format!("must not be below lower bound {}", lower),
            ));
        }
        let steps = (i128::from(upper) - i128::from(lower)) / i128::from(stride);
        let length = usize::try_from(steps + 1).map_err(|_| {
            SpmdError::invalid_argument(
                "upper",
                upper,
                format!("range from {} holds more indices than fit in usize", lower),
            )
        })?;
        // lower + steps * stride never passes upper, so it fits in i64.
        let last = i128::from(lower) + steps * i128::from(stride);
        Ok(Self {
            lower,
            upper: last as i64,
            stride,
            length,
        })
    }

    /// Range covering the indices of a container with `len` elements.
    pub fn indices(len: usize) -> Result<Self> {
        if len == 0 {
            return Ok(Self::empty_at(0, 1));
        }
        let last = i64::try_from(len - 1)
            .map_err(|_| SpmdError::invalid_argument("len", len, "exceeds i64::MAX"))?;
        Self::new(0, last)
    }

    /// An empty range positioned at `lower`. Only produced by splitting.
    fn empty_at(lower: i64, stride: i64) -> Self {
        Self {
            lower,
            upper: lower.saturating_sub(stride),
            stride,
            length: 0,
        }
    }

    /// First index.
    pub fn lower(&self) -> i64 {
        self.lower
    }

    /// Last index (equal to `lower - stride` for an empty range).
    pub fn upper(&self) -> i64 {
        self.upper
    }

    /// Step between consecutive indices.
    pub fn stride(&self) -> i64 {
        self.stride
    }

    /// Number of indices in the range.
    pub fn length(&self) -> usize {
        self.length
    }

    /// True when the range holds no index.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// True if `index` is one of the range's indices.
    pub fn contains(&self, index: i64) -> bool {
        !self.is_empty()
            && index >= self.lower
            && index <= self.upper
            && (i128::from(index) - i128::from(self.lower)) % i128::from(self.stride) == 0
    }

    /// The `k`-th index of the range (no bounds check beyond debug builds).
    #[inline]
    pub fn nth(&self, k: usize) -> i64 {
        debug_assert!(k < self.length);
        self.offset(k) as i64
    }

    /// Position of the `k`-th index, which may lie past `i64::MAX` for `k == length`.
    fn offset(&self, k: usize) -> i128 {
        i128::from(self.lower) + k as i128 * i128::from(self.stride)
    }

    /// Iterate over the indices in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.length).map(move |k| self.nth(k))
    }

    /// Split into `n` contiguous pieces that together cover `self` exactly.
    ///
    /// Pieces differ in length by at most one and the first
    /// `length % n` pieces are the longer ones. When `n > length` the trailing
    /// pieces are empty.
    pub fn subranges(&self, n: usize) -> Result<Vec<Range>> {
        if n == 0 {
            return Err(SpmdError::invalid_argument(
                "n",
                n,
                "number of subranges must be positive",
            ));
        }
        Ok((0..n).map(|k| self.piece(n, k)).collect())
    }

    /// The `k`-th of `n` pieces, without materializing the others.
    pub fn subrange(&self, n: usize, k: usize) -> Result<Range> {
        if n == 0 {
            return Err(SpmdError::invalid_argument(
                "n",
                n,
                "number of subranges must be positive",
            ));
        }
        if k >= n {
            return Err(SpmdError::index_out_of_bounds(k, n));
        }
        Ok(self.piece(n, k))
    }

    pub(crate) fn piece(&self, n: usize, k: usize) -> Range {
        let (start, len) = Threading::block_info(self.length, n, k);
        if len == 0 {
            let lower = self.offset(start).clamp(i128::from(i64::MIN), i128::from(i64::MAX));
            Self::empty_at(lower as i64, self.stride)
        } else {
            Range {
                lower: self.nth(start),
                upper: self.nth(start + len - 1),
                stride: self.stride,
                length: len,
            }
        }
    }

    /// Find which of `pieces` (as returned by [`subranges`](Self::subranges))
    /// contains `index`, by binary search over their bounds.
    pub fn locate(pieces: &[Range], index: i64) -> Option<usize> {
        // Empty pieces only ever trail the non-empty ones.
        let k = pieces.partition_point(|r| !r.is_empty() && r.upper < index);
        if k < pieces.len() && pieces[k].contains(index) {
            Some(k)
        } else {
            None
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stride == 1 {
            write!(f, "{}..{}", self.lower, self.upper)
        } else {
            write!(f, "{}..{};{}", self.lower, self.upper, self.stride)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_normalization() {
        let r = Range::with_stride(0, 10, 4).unwrap();
        assert_eq!(r.length(), 3);
        assert_eq!(r.upper(), 8);
        assert!(r.contains(4));
        assert!(!r.contains(5));
        assert!(!r.contains(10));
    }

    #[test]
    fn test_single_index_range() {
        let r = Range::new(5, 5).unwrap();
        assert_eq!(r.length(), 1);
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            Range::with_stride(0, 9, 0),
            Err(SpmdError::InvalidArgument { .. })
        ));
        assert!(Range::new(3, 2).is_err());
    }

    #[test]
    fn test_subranges_ten_by_three() {
        let pieces = Range::new(0, 9).unwrap().subranges(3).unwrap();
        let bounds: Vec<_> = pieces
            .iter()
            .map(|r| (r.lower(), r.upper(), r.length()))
            .collect();
        assert_eq!(bounds, vec![(0, 3, 4), (4, 6, 3), (7, 9, 3)]);
    }

    #[test]
    fn test_subranges_rejects_zero() {
        let r = Range::new(0, 9).unwrap();
        assert!(matches!(
            r.subranges(0),
            Err(SpmdError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_subranges_strided() {
        let r = Range::with_stride(1, 19, 2).unwrap();
        let pieces = r.subranges(4).unwrap();
        let joined: Vec<i64> = pieces.iter().flat_map(|p| p.iter().collect::<Vec<_>>()).collect();
        assert_eq!(joined, r.iter().collect::<Vec<_>>());
        assert_eq!(pieces[0].lower(), 1);
        assert_eq!(pieces[0].length(), 3);
        assert_eq!(pieces[3].length(), 2);
    }

    #[test]
    fn test_more_pieces_than_indices() {
        let pieces = Range::new(0, 1).unwrap().subranges(4).unwrap();
        let lens: Vec<_> = pieces.iter().map(|p| p.length()).collect();
        assert_eq!(lens, vec![1, 1, 0, 0]);
        assert!(pieces[2].is_empty());
        assert!(!pieces[2].contains(pieces[2].lower()));
    }

    #[test]
    fn test_subrange_matches_subranges() {
        let r = Range::new(-7, 30).unwrap();
        let all = r.subranges(5).unwrap();
        for (k, piece) in all.iter().enumerate() {
            assert_eq!(r.subrange(5, k).unwrap(), *piece);
        }
        assert!(r.subrange(5, 5).is_err());
    }

    #[test]
    fn test_locate_owner() {
        let pieces = Range::new(0, 9).unwrap().subranges(3).unwrap();
        assert_eq!(Range::locate(&pieces, 0), Some(0));
        assert_eq!(Range::locate(&pieces, 3), Some(0));
        assert_eq!(Range::locate(&pieces, 4), Some(1));
        assert_eq!(Range::locate(&pieces, 9), Some(2));
        assert_eq!(Range::locate(&pieces, 10), None);
        assert_eq!(Range::locate(&pieces, -1), None);

        let sparse = Range::new(0, 1).unwrap().subranges(4).unwrap();
        assert_eq!(Range::locate(&sparse, 1), Some(1));
        assert_eq!(Range::locate(&sparse, 2), None);
    }

    #[test]
    fn test_indices_of_empty_container() {
        let r = Range::indices(0).unwrap();
        assert!(r.is_empty());
        assert_eq!(r.iter().count(), 0);
        assert_eq!(Range::indices(4).unwrap().upper(), 3);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_extreme_bounds() {
        let negative = Range::with_stride(i64::MIN, 0, 1).unwrap();
        assert_eq!(negative.length(), (1usize << 63) + 1);
        assert_eq!(negative.upper(), 0);
        assert!(negative.contains(i64::MIN));
        assert!(negative.contains(-1));

        let wide = Range::with_stride(i64::MIN, i64::MAX, 2).unwrap();
        assert_eq!(wide.length(), 1usize << 63);
        assert_eq!(wide.upper(), i64::MAX - 1);
        assert!(wide.contains(i64::MAX - 1));
        assert!(!wide.contains(i64::MAX));

        let halves = wide.subranges(2).unwrap();
        assert_eq!(halves[0].lower(), i64::MIN);
        assert_eq!(halves[1].upper(), i64::MAX - 1);
        assert_eq!(halves[0].upper() + 2, halves[1].lower());
        assert_eq!(Range::locate(&halves, i64::MAX - 1), Some(1));

        assert!(matches!(
            Range::new(i64::MIN, i64::MAX),
            Err(SpmdError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_trailing_empty_piece_near_max() {
        let top = Range::new(i64::MAX - 1, i64::MAX).unwrap();
        let pieces = top.subranges(3).unwrap();
        assert_eq!(pieces[1].upper(), i64::MAX);
        assert!(pieces[2].is_empty());
        assert_eq!(pieces[2].lower(), i64::MAX);
        assert_eq!(Range::locate(&pieces, i64::MAX), Some(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(Range::new(0, 9).unwrap().to_string(), "0..9");
        assert_eq!(Range::with_stride(0, 9, 3).unwrap().to_string(), "0..9;3");
    }
}
