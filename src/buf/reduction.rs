//! Receive-side wrapper that combines incoming values instead of overwriting.

use super::Buf;
use crate::core::types::Element;
use crate::core::utils::byte_window::ByteWindow;
use crate::op::Op;

/// Wraps a target buffer so that `put(i, v)` stores `op(target[i], v)`.
#[derive(Debug)]
pub struct ReductionBuf<'a, T: Element> {
    target: Box<Buf<'a, T>>,
    op: Op<T>,
}

impl<'a, T: Element> ReductionBuf<'a, T> {
    pub fn new(target: Buf<'a, T>, op: Op<T>) -> Self {
        Self {
            target: Box::new(target),
            op,
        }
    }

    /// The combiner applied on every put.
    pub fn op(&self) -> &Op<T> {
        &self.op
    }

    /// The wrapped buffer.
    pub fn target(&self) -> &Buf<'a, T> {
        &self.target
    }

    /// Unwrap, returning the target buffer.
    pub fn into_target(self) -> Buf<'a, T> {
        *self.target
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> T {
        self.target.get(i)
    }

    #[inline]
    pub fn put(&mut self, i: usize, value: T) {
        let combined = self.op.apply(self.target.get(i), value);
        self.target.put(i, combined);
    }

    pub(crate) fn send_items(&self, start: usize, window: &mut ByteWindow) -> usize {
        self.target.send_items(start, window)
    }

    pub(crate) fn receive_items(
        &mut self,
        start: usize,
        max_count: usize,
        window: &mut ByteWindow,
    ) -> usize {
        let count = max_count
            .min(self.len() - start)
            .min(window.readable_elements::<T>());
        for i in start..start + count {
            let incoming = window.take();
            self.put(i, incoming);
        }
        count
    }
}
