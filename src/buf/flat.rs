//! One-dimensional strided view over a caller-owned slice.

use crate::core::error::{Result, SpmdError};
use crate::core::types::Element;
use crate::core::utils::byte_window::ByteWindow;
use crate::range::Range;

/// Maps buffer index `i` to `data[offset + i * stride]`.
#[derive(Debug)]
pub struct FlatBuf<'a, T> {
    data: &'a mut [T],
    offset: usize,
    stride: usize,
    len: usize,
}

impl<'a, T: Element> FlatBuf<'a, T> {
    /// View the whole slice.
    pub fn new(data: &'a mut [T]) -> Self {
        let len = data.len();
        Self {
            data,
            offset: 0,
            stride: 1,
            len,
        }
    }

    /// View the indices of `range` inside `data`.
    pub fn with_range(data: &'a mut [T], range: Range) -> Result<Self> {
        if range.is_empty() {
            return Ok(Self {
                data,
                offset: 0,
                stride: 1,
                len: 0,
            });
        }
        if range.lower() < 0 {
            return Err(SpmdError::invalid_argument(
                "range",
                range,
                "lower bound must not be negative",
            ));
        }
        if range.upper() as usize >= data.len() {
            return Err(SpmdError::index_out_of_bounds(
                range.upper() as usize,
                data.len(),
            ));
        }
        Ok(Self {
            offset: range.lower() as usize,
            stride: range.stride() as usize,
            len: range.length(),
            data,
        })
    }

    #[inline]
    fn slot(&self, i: usize) -> usize {
        self.offset + i * self.stride
    }

    /// Number of elements in the view.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-length view.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> T {
        self.data[self.slot(i)]
    }

    #[inline]
    pub fn put(&mut self, i: usize, value: T) {
        let slot = self.slot(i);
        self.data[slot] = value;
    }

    /// The viewed elements as one slice, when they are adjacent in memory.
    pub fn as_contiguous(&self) -> Option<&[T]> {
        if self.stride == 1 {
            Some(&self.data[self.offset..self.offset + self.len])
        } else {
            None
        }
    }

    /// Mutable counterpart of [`as_contiguous`](Self::as_contiguous).
    pub fn as_contiguous_mut(&mut self) -> Option<&mut [T]> {
        if self.stride == 1 {
            Some(&mut self.data[self.offset..self.offset + self.len])
        } else {
            None
        }
    }

    pub(crate) fn send_items(&self, start: usize, window: &mut ByteWindow) -> usize {
        let count = (self.len - start).min(window.writable_elements::<T>());
        for i in start..start + count {
            window.put(self.data[self.slot(i)]);
        }
        count
    }

    pub(crate) fn receive_items(
        &mut self,
        start: usize,
        max_count: usize,
        window: &mut ByteWindow,
    ) -> usize {
        let count = max_count
            .min(self.len - start)
            .min(window.readable_elements::<T>());
        for i in start..start + count {
            let slot = self.slot(i);
            self.data[slot] = window.take();
        }
        count
    }
}
