//! Element trait for mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Sub};

/// Trait for types that can be elements of a tensor
///
/// # Bounds
/// - `Copy + Send + Sync + 'static` - values are shared across worker threads
/// - `Pod + Zeroable` - storage is allocated zero-initialised (bytemuck)
/// - `Add + Sub + Mul + Div` - arithmetic operations (Output = Self)
/// - `PartialOrd` - comparison for min/max operations
///
/// Note: `Neg` is NOT required since unsigned types don't support it.
pub trait Element:
    Copy
    + Send
    + Sync
    + Pod
    + Zeroable
    + Debug
    + PartialEq
    + PartialOrd
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;

    /// Convert to f64 (lossy for 64-bit integers beyond 2^53)
    fn to_f64(self) -> f64;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident, $zero:expr, $one:expr;)+) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = DType::$dtype;

                #[inline]
                fn zero() -> Self {
                    $zero
                }

                #[inline]
                fn one() -> Self {
                    $one
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )+
    };
}

impl_element! {
    f64 => F64, 0.0, 1.0;
    f32 => F32, 0.0, 1.0;
    i64 => I64, 0, 1;
    i32 => I32, 0, 1;
    i16 => I16, 0, 1;
    i8 => I8, 0, 1;
    u64 => U64, 0, 1;
    u32 => U32, 0, 1;
    u16 => U16, 0, 1;
    u8 => U8, 0, 1;
}
