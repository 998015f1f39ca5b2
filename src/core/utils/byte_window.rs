//! Bounded byte window used to stream typed buffers through a channel.
//!
//! A sender fills the window with encoded elements until its capacity is
//! reached, ships the written bytes as one frame, clears it and continues.
//! A receiver loads frames into the window and drains whole elements from
//! the read cursor. Leftover bytes of an incomplete element stay in the
//! window and are completed by the next load.

use crate::core::types::Element;

/// A fixed-capacity byte window with independent read and write cursors.
#[derive(Debug, Clone)]
pub struct ByteWindow {
    buffer: Vec<u8>,
    capacity: usize,
    read_pos: usize,
    write_pos: usize,
}

impl ByteWindow {
    /// Create an empty window that accepts up to `capacity` bytes of writes.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity],
            capacity,
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Configured write capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reset both cursors, discarding any content.
    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// Bytes that can still be written before the window is full.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.write_pos)
    }

    /// Bytes written but not yet read.
    pub fn readable(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// True when nothing is left to read.
    pub fn is_drained(&self) -> bool {
        self.read_pos == self.write_pos
    }

    /// Number of whole `T` values that still fit.
    pub fn writable_elements<T: Element>(&self) -> usize {
        self.remaining() / T::WIDTH
    }

    /// Number of whole `T` values waiting to be read.
    pub fn readable_elements<T: Element>(&self) -> usize {
        self.readable() / T::WIDTH
    }

    /// Append one element. Callers check [`writable_elements`](Self::writable_elements) first.
    #[inline]
    pub fn put<T: Element>(&mut self, value: T) {
        let end = self.write_pos + T::WIDTH;
        debug_assert!(end <= self.capacity, "byte window overflow");
        if self.buffer.len() < end {
            self.buffer.resize(end, 0);
        }
        value.write_le(&mut self.buffer[self.write_pos..end]);
        self.write_pos = end;
    }

    /// Read one element. Callers check [`readable_elements`](Self::readable_elements) first.
    #[inline]
    pub fn take<T: Element>(&mut self) -> T {
        let end = self.read_pos + T::WIDTH;
        debug_assert!(end <= self.write_pos, "byte window underflow");
        let value = T::read_le(&self.buffer[self.read_pos..end]);
        self.read_pos = end;
        value
    }

    /// The unread bytes, i.e. what a sender ships as one frame.
    pub fn written(&self) -> &[u8] {
        &self.buffer[self.read_pos..self.write_pos]
    }

    /// Append an incoming frame after any unread leftovers.
    ///
    /// Frames sized by a peer with a larger window are accepted; the buffer
    /// grows to hold them.
    pub fn load(&mut self, bytes: &[u8]) {
        self.compact();
        let end = self.write_pos + bytes.len();
        if self.buffer.len() < end {
            self.buffer.resize(end, 0);
        }
        self.buffer[self.write_pos..end].copy_from_slice(bytes);
        self.write_pos = end;
    }

    /// Move unread bytes to the front of the buffer.
    pub fn compact(&mut self) {
        if self.read_pos == 0 {
            return;
        }
        self.buffer.copy_within(self.read_pos..self.write_pos, 0);
        self.write_pos -= self.read_pos;
        self.read_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_window_is_empty() {
        let w = ByteWindow::new(16);
        assert_eq!(w.capacity(), 16);
        assert_eq!(w.remaining(), 16);
        assert!(w.is_drained());
        assert!(w.written().is_empty());
    }

    #[test]
    fn test_put_take_mixed_widths() {
        let mut w = ByteWindow::new(16);
        w.put(7i32);
        w.put(2.5f64);
        assert_eq!(w.remaining(), 4);
        assert_eq!(w.writable_elements::<f64>(), 0);
        assert_eq!(w.writable_elements::<i32>(), 1);
        assert_eq!(w.take::<i32>(), 7);
        assert_eq!(w.take::<f64>(), 2.5);
        assert!(w.is_drained());
    }

    #[test]
    fn test_load_keeps_partial_element() {
        let mut src = ByteWindow::new(8);
        src.put(0x1122_3344_5566_7788u64);
        let bytes = src.written().to_vec();

        let mut dst = ByteWindow::new(8);
        dst.load(&bytes[..3]);
        assert_eq!(dst.readable_elements::<u64>(), 0);
        dst.load(&bytes[3..]);
        assert_eq!(dst.readable_elements::<u64>(), 1);
        assert_eq!(dst.take::<u64>(), 0x1122_3344_5566_7788);
    }

    #[test]
    fn test_load_grows_for_large_frames() {
        let mut w = ByteWindow::new(4);
        let frame: Vec<u8> = (0..12).collect();
        w.load(&frame);
        assert_eq!(w.readable(), 12);
        assert_eq!(w.written(), frame.as_slice());
    }

    #[test]
    fn test_clear_resets_cursors() {
        let mut w = ByteWindow::new(8);
        w.put(1u32);
        w.put(2u32);
        assert_eq!(w.remaining(), 0);
        w.clear();
        assert_eq!(w.remaining(), 8);
        assert_eq!(w.readable(), 0);
    }
}
