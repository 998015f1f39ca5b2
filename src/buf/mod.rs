//! Typed, linear-indexed views over caller-owned storage.
//!
//! A [`Buf`] never owns its elements. It borrows a slice or an `ndarray`
//! view for the duration of a communication call and translates a linear
//! index `0..len` into a position inside that storage. Buffers stream
//! through a fixed-capacity [`ByteWindow`] with [`Buf::send_items`] and
//! [`Buf::receive_items`], which can be called repeatedly with an
//! advancing start index until every element has moved.

pub mod flat;
pub mod matrix;
pub mod reduction;

pub use flat::FlatBuf;
pub use matrix::MatrixBuf;
pub use reduction::ReductionBuf;

use crate::core::error::{Result, SpmdError};
use crate::core::types::Element;
use crate::core::utils::byte_window::ByteWindow;
use crate::op::Op;
use crate::range::Range;
use ndarray::ArrayViewMut2;

/// A view over borrowed storage, one of a fixed set of layouts.
#[derive(Debug)]
pub enum Buf<'a, T: Element> {
    /// Strided one-dimensional view over a slice.
    Flat(FlatBuf<'a, T>),
    /// Strided row/column view over a matrix.
    Matrix(MatrixBuf<'a, T>),
    /// Any buffer whose writes are combined with an [`Op`].
    Reduction(ReductionBuf<'a, T>),
}

impl<T: Element> Default for Buf<'_, T> {
    /// Zero-length flat buffer.
    fn default() -> Self {
        Buf::Flat(FlatBuf::new(<&mut [T]>::default()))
    }
}

impl<'a, T: Element> Buf<'a, T> {
    /// Whole slice, unit stride.
    pub fn flat(data: &'a mut [T]) -> Self {
        Buf::Flat(FlatBuf::new(data))
    }

    /// The indices of `range` inside `data`.
    pub fn flat_slice(data: &'a mut [T], range: Range) -> Result<Self> {
        Ok(Buf::Flat(FlatBuf::with_range(data, range)?))
    }

    /// Every element of a matrix, row-major.
    pub fn matrix(view: ArrayViewMut2<'a, T>) -> Result<Self> {
        Ok(Buf::Matrix(MatrixBuf::new(view)?))
    }

    /// Columns `cols` of one row.
    pub fn row_slice(view: ArrayViewMut2<'a, T>, row: usize, cols: Range) -> Result<Self> {
        let rows = Range::new(row as i64, row as i64)?;
        Ok(Buf::Matrix(MatrixBuf::with_ranges(view, rows, cols)?))
    }

    /// Rows `rows` of one column.
    pub fn col_slice(view: ArrayViewMut2<'a, T>, col: usize, rows: Range) -> Result<Self> {
        let cols = Range::new(col as i64, col as i64)?;
        Ok(Buf::Matrix(MatrixBuf::with_ranges(view, rows, cols)?))
    }

    /// Strided sub-matrix.
    pub fn sub_matrix(view: ArrayViewMut2<'a, T>, rows: Range, cols: Range) -> Result<Self> {
        Ok(Buf::Matrix(MatrixBuf::with_ranges(view, rows, cols)?))
    }

    /// Wrap `self` so that every put is combined with `op`.
    pub fn reduction(self, op: Op<T>) -> Self {
        Buf::Reduction(ReductionBuf::new(self, op))
    }

    /// Strip one reduction wrapper, if present.
    pub fn into_target(self) -> Self {
        match self {
            Buf::Reduction(r) => r.into_target(),
            other => other,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Buf::Flat(b) => b.len(),
            Buf::Matrix(b) => b.len(),
            Buf::Reduction(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short layout name for logs.
    pub fn layout(&self) -> &'static str {
        match self {
            Buf::Flat(_) => "flat",
            Buf::Matrix(_) => "matrix",
            Buf::Reduction(_) => "reduction",
        }
    }

    /// Element `i`. Panics if `i >= len()`.
    #[inline]
    pub fn get(&self, i: usize) -> T {
        match self {
            Buf::Flat(b) => b.get(i),
            Buf::Matrix(b) => b.get(i),
            Buf::Reduction(b) => b.get(i),
        }
    }

    /// Store into element `i`. Panics if `i >= len()`.
    #[inline]
    pub fn put(&mut self, i: usize, value: T) {
        match self {
            Buf::Flat(b) => b.put(i, value),
            Buf::Matrix(b) => b.put(i, value),
            Buf::Reduction(b) => b.put(i, value),
        }
    }

    /// Bounds-checked [`get`](Self::get).
    pub fn try_get(&self, i: usize) -> Result<T> {
        if i >= self.len() {
            return Err(SpmdError::index_out_of_bounds(i, self.len()));
        }
        Ok(self.get(i))
    }

    /// Bounds-checked [`put`](Self::put).
    pub fn try_put(&mut self, i: usize, value: T) -> Result<()> {
        if i >= self.len() {
            return Err(SpmdError::index_out_of_bounds(i, self.len()));
        }
        self.put(i, value);
        Ok(())
    }

    /// Overwrite the first `min(self.len(), src.len())` elements from `src`.
    ///
    /// Returns the number of elements copied. Writes go through `put`, so a
    /// reduction buffer combines rather than overwrites.
    pub fn copy_from(&mut self, src: &Buf<'_, T>) -> usize {
        let n = self.len().min(src.len());
        if let (Buf::Flat(dst), Buf::Flat(from)) = (&mut *self, src) {
            if let (Some(d), Some(s)) = (dst.as_contiguous_mut(), from.as_contiguous()) {
                d[..n].copy_from_slice(&s[..n]);
                return n;
            }
        }
        for i in 0..n {
            self.put(i, src.get(i));
        }
        n
    }

    /// Copy every element out into a fresh vector.
    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len()).map(|i| self.get(i)).collect()
    }

    /// Set every element to `value`.
    pub fn fill(&mut self, value: T) {
        for i in 0..self.len() {
            self.put(i, value);
        }
    }

    /// Pack elements from `start` into the window's free space.
    ///
    /// Returns the number of elements packed, which is zero when the window
    /// cannot fit one more element or `start == len()`.
    pub fn send_items(&self, start: usize, window: &mut ByteWindow) -> usize {
        debug_assert!(start <= self.len());
        match self {
            Buf::Flat(b) => b.send_items(start, window),
            Buf::Matrix(b) => b.send_items(start, window),
            Buf::Reduction(b) => b.send_items(start, window),
        }
    }

    /// Unpack up to `max_count` elements from the window, storing from `start`.
    pub fn receive_items(&mut self, start: usize, max_count: usize, window: &mut ByteWindow) -> usize {
        debug_assert!(start <= self.len());
        match self {
            Buf::Flat(b) => b.receive_items(start, max_count, window),
            Buf::Matrix(b) => b.receive_items(start, max_count, window),
            Buf::Reduction(b) => b.receive_items(start, max_count, window),
        }
    }
}

impl<'a, T: Element> From<&'a mut [T]> for Buf<'a, T> {
    fn from(data: &'a mut [T]) -> Self {
        Buf::flat(data)
    }
}

impl<'a, T: Element> From<&'a mut Vec<T>> for Buf<'a, T> {
    fn from(data: &'a mut Vec<T>) -> Self {
        Buf::flat(data.as_mut_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn stream<T: Element>(src: &Buf<'_, T>, dst: &mut Buf<'_, T>, capacity: usize) {
        let mut window = ByteWindow::new(capacity);
        let mut sent = 0;
        let mut received = 0;
        while received < src.len() {
            window.clear();
            sent += src.send_items(sent, &mut window);
            received += dst.receive_items(received, src.len() - received, &mut window);
        }
        assert_eq!(sent, received);
    }

    #[test]
    fn test_copy_between_layouts() {
        let mut m = Array2::from_shape_fn((3, 3), |(r, c)| (r * 3 + c) as i32);
        let mut flat = vec![0; 3];
        let cols = Range::new(0, 2).unwrap();
        let row = Buf::row_slice(m.view_mut(), 1, cols).unwrap();
        let mut dst = Buf::flat(&mut flat);
        assert_eq!(dst.copy_from(&row), 3);
        drop(dst);
        assert_eq!(flat, vec![3, 4, 5]);
    }

    #[test]
    fn test_copy_truncates_to_shorter() {
        let mut a = vec![1u8, 2, 3, 4];
        let mut b = vec![0u8; 2];
        let src = Buf::flat(&mut a);
        let mut dst = Buf::flat(&mut b);
        assert_eq!(dst.copy_from(&src), 2);
        assert_eq!(dst.to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_column_slice() {
        let mut m = array![[1.0f64, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let rows = Range::with_stride(0, 2, 2).unwrap();
        let mut col = Buf::col_slice(m.view_mut(), 1, rows).unwrap();
        assert_eq!(col.to_vec(), vec![2.0, 6.0]);
        col.put(1, -1.0);
        drop(col);
        assert_eq!(m[[2, 1]], -1.0);
    }

    #[test]
    fn test_matrix_round_trip_through_small_window() {
        let mut m = Array2::from_shape_fn((5, 7), |(r, c)| (r as i64) * 100 + c as i64);
        let mut out = Array2::<i64>::zeros((5, 7));
        let rows = Range::with_stride(1, 4, 2).unwrap();
        let cols = Range::with_stride(0, 6, 3).unwrap();
        let src = Buf::sub_matrix(m.view_mut(), rows, cols).unwrap();
        let mut dst = Buf::sub_matrix(out.view_mut(), rows, cols).unwrap();
        stream(&src, &mut dst, 20);
        assert_eq!(src.to_vec(), dst.to_vec());
        assert_eq!(src.to_vec(), vec![100, 103, 106, 300, 303, 306]);
    }

    #[test]
    fn test_reduction_receive_combines() {
        let mut local = vec![5i32, 1, 9];
        let mut peer = vec![3i32, 4, 9];
        let src = Buf::flat(&mut peer);
        let mut dst = Buf::flat(&mut local).reduction(Op::min());
        assert_eq!(dst.layout(), "reduction");
        stream(&src, &mut dst, 8);
        assert_eq!(dst.into_target().to_vec(), vec![3, 1, 9]);
    }

    #[test]
    fn test_reduction_copy_combines() {
        let mut local = vec![1u64, 2];
        let mut peer = vec![10u64, 20];
        let src = Buf::flat(&mut peer);
        let mut dst = Buf::flat(&mut local).reduction(Op::sum());
        dst.copy_from(&src);
        drop(dst);
        assert_eq!(local, vec![11, 22]);
    }

    #[test]
    fn test_checked_access() {
        let mut data = vec![0i16; 2];
        let mut buf = Buf::flat(&mut data);
        assert!(buf.try_put(1, 7).is_ok());
        assert_eq!(buf.try_get(1).unwrap(), 7);
        assert!(matches!(
            buf.try_get(2),
            Err(SpmdError::IndexOutOfBounds { index: 2, length: 2 })
        ));
    }

    #[test]
    fn test_default_is_empty() {
        let buf = Buf::<f32>::default();
        assert!(buf.is_empty());
        assert_eq!(buf.layout(), "flat");
    }
}
