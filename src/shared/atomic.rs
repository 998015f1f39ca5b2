//! Mapping from element types to their native atomic cell.
//!
//! Floats are stored as their bit patterns in the unsigned atomic of the same
//! width, so compare-and-swap compares bits, not numeric values.

use crate::core::types::Element;
use std::sync::atomic::{
    AtomicBool, AtomicI16, AtomicI32, AtomicI64, AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering,
};

const ORDER: Ordering = Ordering::SeqCst;

/// An element type with a lock-free atomic representation.
pub trait AtomicElement: Element {
    /// The atomic cell holding one element.
    type Cell: Send + Sync + std::fmt::Debug;

    fn new_cell(value: Self) -> Self::Cell;
    fn load(cell: &Self::Cell) -> Self;
    fn store(cell: &Self::Cell, value: Self);
    fn swap(cell: &Self::Cell, value: Self) -> Self;
    /// Strong CAS; `Err` carries the value actually found.
    fn compare_exchange(cell: &Self::Cell, current: Self, new: Self) -> Result<Self, Self>;
    /// Weak CAS; may fail even when the cell holds `current`.
    fn compare_exchange_weak(cell: &Self::Cell, current: Self, new: Self) -> Result<Self, Self>;
}

macro_rules! impl_atomic_native {
    ($t:ty, $cell:ty) => {
        impl AtomicElement for $t {
            type Cell = $cell;

            fn new_cell(value: Self) -> Self::Cell {
                <$cell>::new(value)
            }

            #[inline]
            fn load(cell: &Self::Cell) -> Self {
                cell.load(ORDER)
            }

            #[inline]
            fn store(cell: &Self::Cell, value: Self) {
                cell.store(value, ORDER)
            }

            #[inline]
            fn swap(cell: &Self::Cell, value: Self) -> Self {
                cell.swap(value, ORDER)
            }

            #[inline]
            fn compare_exchange(cell: &Self::Cell, current: Self, new: Self) -> Result<Self, Self> {
                cell.compare_exchange(current, new, ORDER, ORDER)
            }

            #[inline]
            fn compare_exchange_weak(
                cell: &Self::Cell,
                current: Self,
                new: Self,
            ) -> Result<Self, Self> {
                cell.compare_exchange_weak(current, new, ORDER, ORDER)
            }
        }
    };
}

macro_rules! impl_atomic_float {
    ($t:ty, $cell:ty) => {
        impl AtomicElement for $t {
            type Cell = $cell;

            fn new_cell(value: Self) -> Self::Cell {
                <$cell>::new(value.to_bits())
            }

            #[inline]
            fn load(cell: &Self::Cell) -> Self {
                <$t>::from_bits(cell.load(ORDER))
            }

            #[inline]
            fn store(cell: &Self::Cell, value: Self) {
                cell.store(value.to_bits(), ORDER)
            }

            #[inline]
            fn swap(cell: &Self::Cell, value: Self) -> Self {
                <$t>::from_bits(cell.swap(value.to_bits(), ORDER))
            }

            #[inline]
            fn compare_exchange(cell: &Self::Cell, current: Self, new: Self) -> Result<Self, Self> {
                cell.compare_exchange(current.to_bits(), new.to_bits(), ORDER, ORDER)
                    .map(<$t>::from_bits)
                    .map_err(<$t>::from_bits)
            }

            #[inline]
            fn compare_exchange_weak(
                cell: &Self::Cell,
                current: Self,
                new: Self,
            ) -> Result<Self, Self> {
                cell.compare_exchange_weak(current.to_bits(), new.to_bits(), ORDER, ORDER)
                    .map(<$t>::from_bits)
                    .map_err(<$t>::from_bits)
            }
        }
    };
}

impl_atomic_native!(bool, AtomicBool);
impl_atomic_native!(u8, AtomicU8);
impl_atomic_native!(u16, AtomicU16);
impl_atomic_native!(i16, AtomicI16);
impl_atomic_native!(i32, AtomicI32);
impl_atomic_native!(i64, AtomicI64);
impl_atomic_native!(u32, AtomicU32);
impl_atomic_native!(u64, AtomicU64);
impl_atomic_float!(f32, AtomicU32);
impl_atomic_float!(f64, AtomicU64);
