//! Type promotion rules for binary operations
//!
//! `promote` answers the question at runtime on `DType` tags; `Promote` is the
//! same table lifted to the type system so that the builtin arithmetic
//! functors can name their output type.

use super::{DType, Element};
use num_traits::AsPrimitive;

/// Promote two dtypes to a common dtype for binary operations
///
/// Follows NumPy-like promotion rules:
/// - Floats always win over integers
/// - Larger types win over smaller types
/// - Mixing signed and unsigned integers yields a signed integer wide enough
///   for both, capped at 64 bits
pub fn promote(lhs: DType, rhs: DType) -> DType {
    use DType::*;

    if lhs == rhs {
        return lhs;
    }

    let priority = |dt: DType| -> u8 {
        match dt {
            F64 => 100,
            F32 => 90,
            I64 => 65,
            U64 => 60,
            I32 => 55,
            U32 => 50,
            I16 => 45,
            U16 => 40,
            I8 => 35,
            U8 => 30,
        }
    };

    if lhs.is_signed_int() && rhs.is_unsigned_int() {
        let bits = (lhs.size_in_bytes() * 8).max(rhs.size_in_bytes() * 16);
        return match bits {
            8 => I8,
            16 => I16,
            32 => I32,
            _ => I64,
        };
    }
    if rhs.is_signed_int() && lhs.is_unsigned_int() {
        return promote(rhs, lhs);
    }

    if priority(lhs) >= priority(rhs) {
        lhs
    } else {
        rhs
    }
}

/// Compile-time promotion of `Self` combined with `Rhs`
pub trait Promote<Rhs: Element>: Element {
    /// Common type both operands are converted to
    type Promoted: Element;

    /// Convert the left operand to the common type
    fn promote_lhs(self) -> Self::Promoted;

    /// Convert the right operand to the common type
    fn promote_rhs(rhs: Rhs) -> Self::Promoted;
}

macro_rules! promote_table {
    ($($lhs:ty: [$($rhs:ty => $out:ty),+];)+) => {
        $($(
            impl Promote<$rhs> for $lhs {
                type Promoted = $out;

                #[inline(always)]
                fn promote_lhs(self) -> $out {
                    <$lhs as AsPrimitive<$out>>::as_(self)
                }

                #[inline(always)]
                fn promote_rhs(rhs: $rhs) -> $out {
                    <$rhs as AsPrimitive<$out>>::as_(rhs)
                }
            }
        )+)+
    };
}

promote_table! {
    f64: [f64 => f64, f32 => f64, i64 => f64, i32 => f64, i16 => f64, i8 => f64, u64 => f64, u32 => f64, u16 => f64, u8 => f64];
    f32: [f64 => f64, f32 => f32, i64 => f32, i32 => f32, i16 => f32, i8 => f32, u64 => f32, u32 => f32, u16 => f32, u8 => f32];
    i64: [f64 => f64, f32 => f32, i64 => i64, i32 => i64, i16 => i64, i8 => i64, u64 => i64, u32 => i64, u16 => i64, u8 => i64];
    i32: [f64 => f64, f32 => f32, i64 => i64, i32 => i32, i16 => i32, i8 => i32, u64 => i64, u32 => i64, u16 => i32, u8 => i32];
    i16: [f64 => f64, f32 => f32, i64 => i64, i32 => i32, i16 => i16, i8 => i16, u64 => i64, u32 => i64, u16 => i32, u8 => i16];
    i8: [f64 => f64, f32 => f32, i64 => i64, i32 => i32, i16 => i16, i8 => i8, u64 => i64, u32 => i64, u16 => i32, u8 => i16];
    u64: [f64 => f64, f32 => f32, i64 => i64, i32 => i64, i16 => i64, i8 => i64, u64 => u64, u32 => u64, u16 => u64, u8 => u64];
    u32: [f64 => f64, f32 => f32, i64 => i64, i32 => i64, i16 => i64, i8 => i64, u64 => u64, u32 => u32, u16 => u32, u8 => u32];
    u16: [f64 => f64, f32 => f32, i64 => i64, i32 => i32, i16 => i32, i8 => i32, u64 => u64, u32 => u32, u16 => u16, u8 => u16];
    u8: [f64 => f64, f32 => f32, i64 => i64, i32 => i32, i16 => i16, i8 => i16, u64 => u64, u32 => u32, u16 => u16, u8 => u8];
}
