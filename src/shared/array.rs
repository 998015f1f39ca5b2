use super::atomic::AtomicElement;
use crate::core::error::{Result, SpmdError};
use crate::op::Op;
use num_traits::One;

/// Fixed-length array of atomically updated elements.
///
/// Every single-index operation is linearizable. Read-modify-write
/// operations retry a compare-and-swap until it succeeds, with no bound and
/// no backoff. Single-index methods panic on an out-of-range index, like
/// slice indexing.
#[derive(Debug)]
pub struct SharedArray<T: AtomicElement> {
    cells: Box<[T::Cell]>,
}

impl<T: AtomicElement> SharedArray<T> {
    /// `len` elements, all `T::default()`.
    pub fn new(len: usize) -> Self {
        Self::filled(len, T::default())
    }

    /// `len` copies of `value`.
    pub fn filled(len: usize, value: T) -> Self {
        Self {
            cells: (0..len).map(|_| T::new_cell(value)).collect(),
        }
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        Self::from_slice(&values)
    }

    pub fn from_slice(values: &[T]) -> Self {
        Self {
            cells: values.iter().map(|&v| T::new_cell(v)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> T {
        T::load(&self.cells[i])
    }

    #[inline]
    pub fn set(&self, i: usize, value: T) {
        T::store(&self.cells[i], value)
    }

    /// Store `value`, returning the previous value.
    pub fn get_and_set(&self, i: usize, value: T) -> T {
        T::swap(&self.cells[i], value)
    }

    /// Store `update` if the element equals `expect`; true on success.
    pub fn compare_and_set(&self, i: usize, expect: T, update: T) -> bool {
        T::compare_exchange(&self.cells[i], expect, update).is_ok()
    }

    /// Like [`compare_and_set`](Self::compare_and_set) but may fail
    /// spuriously; call it in a loop.
    pub fn weak_compare_and_set(&self, i: usize, expect: T, update: T) -> bool {
        T::compare_exchange_weak(&self.cells[i], expect, update).is_ok()
    }

    /// Apply `f(current)` atomically. Returns `(previous, next)`.
    #[inline]
    fn update<F>(&self, i: usize, f: F) -> (T, T)
    where
        F: Fn(T) -> T,
    {
        let cell = &self.cells[i];
        let mut current = T::load(cell);
        loop {
            let next = f(current);
            match T::compare_exchange(cell, current, next) {
                Ok(_) => return (current, next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Combine element `i` with `value` as `op(current, value)`; returns the
    /// stored result.
    pub fn reduce(&self, i: usize, value: T, op: &Op<T>) -> T {
        self.update(i, |current| op.apply(current, value)).1
    }

    /// Wrapping add, returning the previous value.
    pub fn get_and_add(&self, i: usize, delta: T) -> T {
        self.update(i, |current| current.wrapping_sum(delta)).0
    }

    /// Wrapping add, returning the new value.
    pub fn add_and_get(&self, i: usize, delta: T) -> T {
        self.update(i, |current| current.wrapping_sum(delta)).1
    }

    /// Copy every element into a vector. Not a consistent snapshot when
    /// other threads are writing.
    pub fn to_vec(&self) -> Vec<T> {
        self.cells.iter().map(T::load).collect()
    }

    /// Reduce `src[src_offset..src_offset + len]` element-wise into
    /// `self[dst_offset..dst_offset + len]`.
    ///
    /// Both ranges are checked before any element changes. Each element is
    /// updated atomically, but a concurrent reader may see some elements
    /// updated and others not yet.
    pub fn reduce_from(
        &self,
        dst_offset: usize,
        src: &[T],
        src_offset: usize,
        len: usize,
        op: &Op<T>,
    ) -> Result<()> {
        check_span(dst_offset, len, self.len())?;
        check_span(src_offset, len, src.len())?;
        for k in 0..len {
            self.reduce(dst_offset + k, src[src_offset + k], op);
        }
        Ok(())
    }

    /// [`reduce_from`](Self::reduce_from) with another shared array as source.
    pub fn reduce_from_shared(
        &self,
        dst_offset: usize,
        src: &SharedArray<T>,
        src_offset: usize,
        len: usize,
        op: &Op<T>,
    ) -> Result<()> {
        check_span(dst_offset, len, self.len())?;
        check_span(src_offset, len, src.len())?;
        for k in 0..len {
            self.reduce(dst_offset + k, src.get(src_offset + k), op);
        }
        Ok(())
    }
}

impl<T: AtomicElement + One> SharedArray<T> {
    pub fn get_and_increment(&self, i: usize) -> T {
        self.update(i, |current| current.wrapping_sum(T::one())).0
    }

    pub fn get_and_decrement(&self, i: usize) -> T {
        self.update(i, |current| current.wrapping_difference(T::one())).0
    }

    pub fn increment_and_get(&self, i: usize) -> T {
        self.update(i, |current| current.wrapping_sum(T::one())).1
    }

    pub fn decrement_and_get(&self, i: usize) -> T {
        self.update(i, |current| current.wrapping_difference(T::one())).1
    }
}

impl<T: AtomicElement> From<Vec<T>> for SharedArray<T> {
    fn from(values: Vec<T>) -> Self {
        Self::from_vec(values)
    }
}

fn check_span(offset: usize, len: usize, bound: usize) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= bound => Ok(()),
        Some(end) => Err(SpmdError::index_out_of_bounds(end - 1, bound)),
        None => Err(SpmdError::index_out_of_bounds(usize::MAX, bound)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_index_ops() {
        let a = SharedArray::<i32>::new(3);
        assert_eq!(a.get_and_increment(0), 0);
        assert_eq!(a.increment_and_get(0), 2);
        assert_eq!(a.get_and_decrement(0), 2);
        assert_eq!(a.decrement_and_get(0), 0);
        assert_eq!(a.get_and_add(1, 5), 0);
        assert_eq!(a.add_and_get(1, 5), 10);
        assert_eq!(a.get_and_set(2, 7), 0);
        assert!(a.compare_and_set(2, 7, 8));
        assert!(!a.compare_and_set(2, 7, 9));
        assert_eq!(a.to_vec(), vec![0, 10, 8]);
    }

    #[test]
    fn test_weak_cas_in_loop() {
        let a = SharedArray::from_vec(vec![1u64]);
        while !a.weak_compare_and_set(0, 1, 2) {}
        assert_eq!(a.get(0), 2);
    }

    #[test]
    fn test_unsigned_decrement_wraps() {
        let a = SharedArray::<u32>::new(1);
        assert_eq!(a.decrement_and_get(0), u32::MAX);
    }

    #[test]
    fn test_reduce_returns_new_value() {
        let a = SharedArray::filled(2, f64::INFINITY);
        let min = Op::min();
        assert_eq!(a.reduce(1, 4.0, &min), 4.0);
        assert_eq!(a.reduce(1, 9.0, &min), 4.0);
        assert_eq!(a.get(0), f64::INFINITY);
    }

    #[test]
    fn test_bulk_reduce_checks_bounds_first() {
        let a = SharedArray::from_vec(vec![1i64, 2, 3, 4]);
        let src = [10i64, 20, 30];
        let sum = Op::sum();
        let err = a.reduce_from(2, &src, 0, 3, &sum).unwrap_err();
        assert!(matches!(err, SpmdError::IndexOutOfBounds { index: 4, length: 4 }));
        assert!(a.reduce_from(0, &src, 1, 3, &sum).is_err());
        assert!(a.reduce_from(usize::MAX, &src, 0, 1, &sum).is_err());
        assert_eq!(a.to_vec(), vec![1, 2, 3, 4]);

        a.reduce_from(1, &src, 1, 2, &sum).unwrap();
        assert_eq!(a.to_vec(), vec![1, 22, 33, 4]);
    }

    #[test]
    fn test_bulk_reduce_from_shared() {
        let a = SharedArray::from_vec(vec![5u8, 5]);
        let b = SharedArray::from_vec(vec![1u8, 2, 3]);
        a.reduce_from_shared(0, &b, 1, 2, &Op::max()).unwrap();
        assert_eq!(a.to_vec(), vec![5, 5]);
        a.reduce_from_shared(0, &b, 0, 2, &Op::sum()).unwrap();
        assert_eq!(a.to_vec(), vec![6, 7]);
    }

    #[test]
    fn test_zero_length_bulk_reduce() {
        let a = SharedArray::<i32>::new(0);
        assert!(a.is_empty());
        assert!(a.reduce_from(0, &[], 0, 0, &Op::sum()).is_ok());
    }
}
