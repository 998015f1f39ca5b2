//! Core data types for the hybrid SPMD substrate.
//!
//! Defines the closed set of primitive element types that buffers can carry,
//! together with their fixed-width little-endian wire encoding.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Process identity inside a communicator group, `0..size`.
pub type Rank = usize;

/// Tag identifying the primitive element type of a buffer or op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Boolean, one byte on the wire
    Bool,
    /// Unsigned 8-bit byte
    U8,
    /// Unsigned 16-bit integer, also used for UTF-16 code units
    U16,
    /// Signed 16-bit integer
    I16,
    /// Signed 32-bit integer
    I32,
    /// Signed 64-bit integer
    I64,
    /// Unsigned 32-bit integer
    U32,
    /// Unsigned 64-bit integer
    U64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
}

impl ElementKind {
    /// Size of one encoded element in bytes.
    pub fn width(&self) -> usize {
        match self {
            ElementKind::Bool | ElementKind::U8 => 1,
            ElementKind::U16 | ElementKind::I16 => 2,
            ElementKind::I32 | ElementKind::U32 | ElementKind::F32 => 4,
            ElementKind::I64 | ElementKind::U64 | ElementKind::F64 => 8,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Bool => "bool",
            ElementKind::U8 => "u8",
            ElementKind::U16 => "u16",
            ElementKind::I16 => "i16",
            ElementKind::I32 => "i32",
            ElementKind::I64 => "i64",
            ElementKind::U32 => "u32",
            ElementKind::U64 => "u64",
            ElementKind::F32 => "f32",
            ElementKind::F64 => "f64",
        };
        write!(f, "{}", name)
    }
}

/// A primitive value that can live in a buffer and travel over a channel.
///
/// Encoding is little-endian and exactly [`Element::WIDTH`] bytes wide, so a
/// sender and a receiver using the same element type always round-trip
/// bit-exactly.
pub trait Element:
    Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// Runtime tag of this element type
    const KIND: ElementKind;
    /// Encoded width in bytes
    const WIDTH: usize;

    /// Encode into the first `WIDTH` bytes of `out`.
    fn write_le(self, out: &mut [u8]);

    /// Decode from the first `WIDTH` bytes of `bytes`.
    fn read_le(bytes: &[u8]) -> Self;

    /// Addition that wraps on integer overflow.
    fn wrapping_sum(self, other: Self) -> Self;

    /// Multiplication that wraps on integer overflow.
    fn wrapping_product(self, other: Self) -> Self;

    /// Subtraction that wraps on integer overflow.
    fn wrapping_difference(self, other: Self) -> Self;
}

macro_rules! impl_integer_element {
    ($t:ty, $kind:expr) => {
        impl Element for $t {
            const KIND: ElementKind = $kind;
            const WIDTH: usize = std::mem::size_of::<$t>();

            #[inline]
            fn write_le(self, out: &mut [u8]) {
                out[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(&bytes[..Self::WIDTH]);
                <$t>::from_le_bytes(raw)
            }

            #[inline]
            fn wrapping_sum(self, other: Self) -> Self {
                self.wrapping_add(other)
            }

            #[inline]
            fn wrapping_product(self, other: Self) -> Self {
                self.wrapping_mul(other)
            }

            #[inline]
            fn wrapping_difference(self, other: Self) -> Self {
                self.wrapping_sub(other)
            }
        }
    };
}

macro_rules! impl_float_element {
    ($t:ty, $kind:expr) => {
        impl Element for $t {
            const KIND: ElementKind = $kind;
            const WIDTH: usize = std::mem::size_of::<$t>();

            #[inline]
            fn write_le(self, out: &mut [u8]) {
                out[..Self::WIDTH].copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(&bytes[..Self::WIDTH]);
                <$t>::from_le_bytes(raw)
            }

            #[inline]
            fn wrapping_sum(self, other: Self) -> Self {
                self + other
            }

            #[inline]
            fn wrapping_product(self, other: Self) -> Self {
                self * other
            }

            #[inline]
            fn wrapping_difference(self, other: Self) -> Self {
                self - other
            }
        }
    };
}

impl_integer_element!(u8, ElementKind::U8);
impl_integer_element!(u16, ElementKind::U16);
impl_integer_element!(i16, ElementKind::I16);
impl_integer_element!(i32, ElementKind::I32);
impl_integer_element!(i64, ElementKind::I64);
impl_integer_element!(u32, ElementKind::U32);
impl_integer_element!(u64, ElementKind::U64);
impl_float_element!(f32, ElementKind::F32);
impl_float_element!(f64, ElementKind::F64);

/// Booleans travel as `0`/`1`; any nonzero byte decodes as `true`.
/// Arithmetic follows logic: sum is or, product is and, difference is and-not.
impl Element for bool {
    const KIND: ElementKind = ElementKind::Bool;
    const WIDTH: usize = 1;

    #[inline]
    fn write_le(self, out: &mut [u8]) {
        out[0] = u8::from(self);
    }

    #[inline]
    fn read_le(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn wrapping_sum(self, other: Self) -> Self {
        self || other
    }

    #[inline]
    fn wrapping_product(self, other: Self) -> Self {
        self && other
    }

    #[inline]
    fn wrapping_difference(self, other: Self) -> Self {
        self && !other
    }
}
