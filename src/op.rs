//! Binary combiners used by reductions.
//!
//! An [`Op`] is a plain value wrapping a `(T, T) -> T` function. The same op
//! drives network-side reduction (through a reduction buffer) and
//! thread-side reduction (through [`SharedArray::reduce`](crate::shared::SharedArray::reduce)).
//! Ops are expected to be associative; nothing checks it.

use crate::core::types::{Element, ElementKind};
use std::borrow::Cow;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor};
use std::sync::Arc;

type CombineFn<T> = dyn Fn(T, T) -> T + Send + Sync;

/// A named binary combiner over element type `T`.
///
/// `apply(a, b)` is always called with the value already held (`a`) first and
/// the incoming value (`b`) second.
pub struct Op<T> {
    name: Cow<'static, str>,
    func: Arc<CombineFn<T>>,
}

impl<T> Clone for Op<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Arc::clone(&self.func),
        }
    }
}

impl<T: Element> fmt::Debug for Op<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Op")
            .field("name", &self.name)
            .field("kind", &T::KIND)
            .finish()
    }
}

impl<T: Element> Op<T> {
    /// Wrap an arbitrary combiner.
    pub fn new<N, F>(name: N, func: F) -> Self
    where
        N: Into<Cow<'static, str>>,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    /// Combine the held value `current` with `incoming`.
    #[inline]
    pub fn apply(&self, current: T, incoming: T) -> T {
        (self.func)(current, incoming)
    }

    /// Human readable name, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element type the op combines.
    pub fn kind(&self) -> ElementKind {
        T::KIND
    }

    /// Sum; wraps on integer overflow.
    pub fn sum() -> Self {
        Self::new("sum", T::wrapping_sum)
    }

    /// Product; wraps on integer overflow.
    pub fn product() -> Self {
        Self::new("product", T::wrapping_product)
    }

    /// Keeps the held value, ignoring the incoming one.
    pub fn first() -> Self {
        Self::new("first", |a, _| a)
    }

    /// Replaces the held value with the incoming one.
    pub fn second() -> Self {
        Self::new("second", |_, b| b)
    }
}

impl<T: Element + PartialOrd> Op<T> {
    /// Minimum. Ties and unordered pairs keep the held value.
    pub fn min() -> Self {
        Self::new("min", |a, b| if b < a { b } else { a })
    }

    /// Maximum. Ties and unordered pairs keep the held value.
    pub fn max() -> Self {
        Self::new("max", |a, b| if b > a { b } else { a })
    }
}

impl<T: Element + BitOr<Output = T>> Op<T> {
    /// Bitwise or.
    pub fn bit_or() -> Self {
        Self::new("or", |a, b| a | b)
    }
}

impl<T: Element + BitAnd<Output = T>> Op<T> {
    /// Bitwise and.
    pub fn bit_and() -> Self {
        Self::new("and", |a, b| a & b)
    }
}

impl<T: Element + BitXor<Output = T>> Op<T> {
    /// Bitwise exclusive or.
    pub fn bit_xor() -> Self {
        Self::new("xor", |a, b| a ^ b)
    }
}

impl Op<bool> {
    /// Logical or.
    pub fn or() -> Self {
        Self::new("or", |a, b| a || b)
    }

    /// Logical and.
    pub fn and() -> Self {
        Self::new("and", |a, b| a && b)
    }
}
