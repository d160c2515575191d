//! Arithmetic operators and unary functions on tensors and expressions
//!
//! `+ - * /` between any two of `Tensor`, `&Tensor`, expression nodes and
//! primitive scalars build the same lazy node [`n_operator`] would build with
//! the matching functor, and so return `Result` (the operands may not
//! broadcast). Unary `-` and the unary functions cannot fail and return the
//! node directly.
//!
//! ```
//! use ndexpr::prelude::*;
//!
//! let a = Tensor::from_slice(&[1.0f64, 4.0, 9.0], &[3]);
//! let b = Tensor::from_slice(&[1.0f64], &[1]);
//! let node = ((2.0f64 * &a).unwrap() - &b).unwrap();
//! assert_eq!(node.to_vec(), vec![1.0, 7.0, 17.0]);
//! assert_eq!(ndexpr::ops::sqrt(&a).to_vec(), vec![1.0, 2.0, 3.0]);
//! ```

use crate::dtype::Element;
use crate::error::Result;
use crate::expr::functors::{self, Cast};
use crate::expr::{Expression, Operands, TensorLike, UnaryExpression, n_operator};
use crate::tensor::Tensor;

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, [$($gen:tt)*], $lhs:ty) => {
        impl<$($gen)*, Rhs> std::ops::$trait<Rhs> for $lhs
        where
            ($lhs, Rhs): Operands<functors::$trait>,
        {
            type Output = Result<<($lhs, Rhs) as Operands<functors::$trait>>::Output>;

            #[inline]
            fn $method(self, rhs: Rhs) -> Self::Output {
                n_operator(functors::$trait, (self, rhs))
            }
        }
    };
}

macro_rules! impl_operators {
    ([$($gen:tt)*], $ty:ty) => {
        impl_binary_op!(Add, add, [$($gen)*], $ty);
        impl_binary_op!(Sub, sub, [$($gen)*], $ty);
        impl_binary_op!(Mul, mul, [$($gen)*], $ty);
        impl_binary_op!(Div, div, [$($gen)*], $ty);

        impl<$($gen)*> std::ops::Neg for $ty
        where
            $ty: TensorLike,
        {
            type Output = UnaryExpression<functors::Neg, <$ty as TensorLike>::Operand>;

            #[inline]
            fn neg(self) -> Self::Output {
                UnaryExpression::new(functors::Neg, self.into_operand())
            }
        }
    };
}

impl_operators!([T: Element], Tensor<T>);
impl_operators!(['a, T: Element], &'a Tensor<T>);
impl_operators!([F, Ops], Expression<F, Ops>);
impl_operators!(['a, F, Ops], &'a Expression<F, Ops>);
impl_operators!([F, A], UnaryExpression<F, A>);
impl_operators!(['a, F, A], &'a UnaryExpression<F, A>);

macro_rules! impl_scalar_lhs_op {
    ($trait:ident, $method:ident, $scalar:ty, [$($gen:tt)*], $rhs:ty) => {
        impl<$($gen)*> std::ops::$trait<$rhs> for $scalar
        where
            ($scalar, $rhs): Operands<functors::$trait>,
        {
            type Output = Result<<($scalar, $rhs) as Operands<functors::$trait>>::Output>;

            #[inline]
            fn $method(self, rhs: $rhs) -> Self::Output {
                n_operator(functors::$trait, (self, rhs))
            }
        }
    };
}

macro_rules! impl_scalar_lhs {
    ($trait:ident, $method:ident, $scalar:ty) => {
        impl_scalar_lhs_op!($trait, $method, $scalar, [T: Element], Tensor<T>);
        impl_scalar_lhs_op!($trait, $method, $scalar, ['a, T: Element], &'a Tensor<T>);
        impl_scalar_lhs_op!($trait, $method, $scalar, [F, Ops], Expression<F, Ops>);
        impl_scalar_lhs_op!($trait, $method, $scalar, ['a, F, Ops], &'a Expression<F, Ops>);
        impl_scalar_lhs_op!($trait, $method, $scalar, [F, A], UnaryExpression<F, A>);
        impl_scalar_lhs_op!($trait, $method, $scalar, ['a, F, A], &'a UnaryExpression<F, A>);
    };
}

macro_rules! scalar_lhs_operators {
    ($($scalar:ty),+) => {
        $(
            impl_scalar_lhs!(Add, add, $scalar);
            impl_scalar_lhs!(Sub, sub, $scalar);
            impl_scalar_lhs!(Mul, mul, $scalar);
            impl_scalar_lhs!(Div, div, $scalar);
        )+
    };
}

scalar_lhs_operators!(f64, f32, i64, i32, i16, i8, u64, u32, u16, u8);

macro_rules! binary_fn {
    ($($name:ident => $functor:ident;)+) => {
        $(
            #[doc = concat!("Lazy elementwise `", stringify!($name), "` of two operands, one of which may be a scalar")]
            pub fn $name<A, B>(a: A, b: B) -> Result<<(A, B) as Operands<functors::$functor>>::Output>
            where
                (A, B): Operands<functors::$functor>,
            {
                n_operator(functors::$functor, (a, b))
            }
        )+
    };
}

binary_fn! {
    add => Add;
    sub => Sub;
    mul => Mul;
    div => Div;
}

macro_rules! unary_fn {
    ($($name:ident => $functor:ident;)+) => {
        $(
            #[doc = concat!("Lazy elementwise `", stringify!($name), "`")]
            pub fn $name<A: TensorLike>(a: A) -> UnaryExpression<functors::$functor, A::Operand> {
                UnaryExpression::new(functors::$functor, a.into_operand())
            }
        )+
    };
}

unary_fn! {
    neg => Neg;
    abs => Abs;
    sqrt => Sqrt;
    square => Square;
    exp => Exp;
}

/// Lazy elementwise `as` conversion to `U`
pub fn cast<U, A: TensorLike>(a: A) -> UnaryExpression<Cast<U>, A::Operand> {
    UnaryExpression::new(Cast::new(), a.into_operand())
}
