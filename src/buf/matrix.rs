//! Two-dimensional strided view over an `ndarray` matrix.

use crate::core::error::{Result, SpmdError};
use crate::core::types::Element;
use crate::core::utils::byte_window::ByteWindow;
use crate::range::Range;
use ndarray::ArrayViewMut2;

/// Maps buffer index `i` to the element at
/// `(rows.nth(i / col_count), cols.nth(i % col_count))`.
///
/// Elements are ordered row-major over the selected rows and columns.
#[derive(Debug)]
pub struct MatrixBuf<'a, T> {
    view: ArrayViewMut2<'a, T>,
    rows: Range,
    cols: Range,
}

fn check_axis(range: &Range, extent: usize, axis: &str) -> Result<()> {
    if range.is_empty() {
        return Ok(());
    }
    if range.lower() < 0 {
        return Err(SpmdError::invalid_argument(
            axis,
            range,
            "lower bound must not be negative",
        ));
    }
    if range.upper() as usize >= extent {
        return Err(SpmdError::index_out_of_bounds(
            range.upper() as usize,
            extent,
        ));
    }
    Ok(())
}

impl<'a, T: Element> MatrixBuf<'a, T> {
    /// View every element of the matrix.
    pub fn new(view: ArrayViewMut2<'a, T>) -> Result<Self> {
        let (nrows, ncols) = view.dim();
        let rows = Range::indices(nrows)?;
        let cols = Range::indices(ncols)?;
        Ok(Self { view, rows, cols })
    }

    /// View the sub-matrix selected by a row range and a column range.
    pub fn with_ranges(view: ArrayViewMut2<'a, T>, rows: Range, cols: Range) -> Result<Self> {
        let (nrows, ncols) = view.dim();
        check_axis(&rows, nrows, "rows")?;
        check_axis(&cols, ncols, "cols")?;
        Ok(Self { view, rows, cols })
    }

    /// Selected rows.
    pub fn rows(&self) -> Range {
        self.rows
    }

    /// Selected columns.
    pub fn cols(&self) -> Range {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.rows.length() * self.cols.length()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn position(&self, i: usize) -> [usize; 2] {
        let ncols = self.cols.length();
        [
            self.rows.nth(i / ncols) as usize,
            self.cols.nth(i % ncols) as usize,
        ]
    }

    #[inline]
    pub fn get(&self, i: usize) -> T {
        self.view[self.position(i)]
    }

    #[inline]
    pub fn put(&mut self, i: usize, value: T) {
        let pos = self.position(i);
        self.view[pos] = value;
    }

    /// Pack from `start`, finishing the current row before moving on.
    pub(crate) fn send_items(&self, start: usize, window: &mut ByteWindow) -> usize {
        let total = (self.len() - start).min(window.writable_elements::<T>());
        let ncols = self.cols.length();
        let mut packed = 0;
        while packed < total {
            let i = start + packed;
            let row = self.rows.nth(i / ncols) as usize;
            let first_col = i % ncols;
            let take = (ncols - first_col).min(total - packed);
            for c in first_col..first_col + take {
                window.put(self.view[[row, self.cols.nth(c) as usize]]);
            }
            packed += take;
        }
        total
    }

    pub(crate) fn receive_items(
        &mut self,
        start: usize,
        max_count: usize,
        window: &mut ByteWindow,
    ) -> usize {
        let total = max_count
            .min(self.len() - start)
            .min(window.readable_elements::<T>());
        let ncols = self.cols.length();
        let mut unpacked = 0;
        while unpacked < total {
            let i = start + unpacked;
            let row = self.rows.nth(i / ncols) as usize;
            let first_col = i % ncols;
            let take = (ncols - first_col).min(total - unpacked);
            for c in first_col..first_col + take {
                let col = self.cols.nth(c) as usize;
                self.view[[row, col]] = window.take();
            }
            unpacked += take;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_index_translation() {
        let mut m = Array2::from_shape_fn((4, 5), |(r, c)| (r * 10 + c) as i32);
        let rows = Range::with_stride(1, 3, 2).unwrap();
        let cols = Range::with_stride(0, 4, 2).unwrap();
        let buf = MatrixBuf::with_ranges(m.view_mut(), rows, cols).unwrap();
        assert_eq!(buf.len(), 6);
        let values: Vec<i32> = (0..buf.len()).map(|i| buf.get(i)).collect();
        assert_eq!(values, vec![10, 12, 14, 30, 32, 34]);
    }

    #[test]
    fn test_out_of_bounds_ranges() {
        let mut m = Array2::<f64>::zeros((3, 3));
        let rows = Range::new(0, 3).unwrap();
        let cols = Range::new(0, 2).unwrap();
        assert!(matches!(
            MatrixBuf::with_ranges(m.view_mut(), rows, cols),
            Err(SpmdError::IndexOutOfBounds { index: 3, length: 3 })
        ));
    }

    #[test]
    fn test_send_resumes_mid_row() {
        let mut m = Array2::from_shape_fn((2, 3), |(r, c)| (r * 3 + c) as u64);
        let buf = MatrixBuf::new(m.view_mut()).unwrap();
        let mut window = ByteWindow::new(16);
        let mut seen = Vec::new();
        let mut start = 0;
        while start < buf.len() {
            window.clear();
            let n = buf.send_items(start, &mut window);
            assert!(n <= 2);
            for _ in 0..n {
                seen.push(window.take::<u64>());
            }
            start += n;
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }
}
