//! Element functions applied by expression nodes
//!
//! Anything implementing [`ElementFn`] for the tuple of its operands' items
//! can sit at the root of an expression node: plain closures, the named
//! arithmetic functors below, and the scalar binders produced by binary
//! scalar folding.

use crate::dtype::{Element, Promote};
use num_traits::{AsPrimitive, Float, Signed};
use paste::paste;
use std::marker::PhantomData;

/// Function of a tuple of element values
pub trait ElementFn<Args> {
    /// Value produced per element
    type Output;

    /// Apply to one tuple of element values
    fn call(&self, args: Args) -> Self::Output;
}

macro_rules! impl_closure_fn {
    ($($arg:ident),+) => {
        paste! {
            impl<Func, R, $($arg),+> ElementFn<($($arg,)+)> for Func
            where
                Func: Fn($($arg),+) -> R,
            {
                type Output = R;

                #[inline(always)]
                fn call(&self, ($([<$arg:lower>],)+): ($($arg,)+)) -> R {
                    self($([<$arg:lower>]),+)
                }
            }
        }
    };
}

impl_closure_fn!(A);
impl_closure_fn!(A, B);
impl_closure_fn!(A, B, C);
impl_closure_fn!(A, B, C, D);

/// Binary function with its first argument fixed to a scalar
#[derive(Clone, Copy, Debug)]
pub struct BindLhs<F, S> {
    f: F,
    scalar: S,
}

impl<F, S> BindLhs<F, S> {
    /// Fix the first argument of `f` to `scalar`
    pub fn new(f: F, scalar: S) -> Self {
        Self { f, scalar }
    }

    /// The bound scalar
    pub fn scalar(&self) -> &S {
        &self.scalar
    }
}

impl<F, S: Copy, A> ElementFn<(A,)> for BindLhs<F, S>
where
    F: ElementFn<(S, A)>,
{
    type Output = F::Output;

    #[inline(always)]
    fn call(&self, (a,): (A,)) -> F::Output {
        self.f.call((self.scalar, a))
    }
}

/// Binary function with its second argument fixed to a scalar
#[derive(Clone, Copy, Debug)]
pub struct BindRhs<F, S> {
    f: F,
    scalar: S,
}

impl<F, S> BindRhs<F, S> {
    /// Fix the second argument of `f` to `scalar`
    pub fn new(f: F, scalar: S) -> Self {
        Self { f, scalar }
    }

    /// The bound scalar
    pub fn scalar(&self) -> &S {
        &self.scalar
    }
}

impl<F, S: Copy, A> ElementFn<(A,)> for BindRhs<F, S>
where
    F: ElementFn<(A, S)>,
{
    type Output = F::Output;

    #[inline(always)]
    fn call(&self, (a,): (A,)) -> F::Output {
        self.f.call((a, self.scalar))
    }
}

macro_rules! binary_functor {
    ($($name:ident => $op:tt;)+) => {
        $(
            #[doc = concat!("Promoting `", stringify!($op), "` of two elements")]
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
            pub struct $name;

            impl<A, B> ElementFn<(A, B)> for $name
            where
                A: Promote<B>,
                B: Element,
            {
                type Output = <A as Promote<B>>::Promoted;

                #[inline(always)]
                fn call(&self, (a, b): (A, B)) -> Self::Output {
                    <A as Promote<B>>::promote_lhs(a) $op <A as Promote<B>>::promote_rhs(b)
                }
            }
        )+
    };
}

binary_functor! {
    Add => +;
    Sub => -;
    Mul => *;
    Div => /;
}

/// Negation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Neg;

impl<A: Element + std::ops::Neg<Output = A>> ElementFn<(A,)> for Neg {
    type Output = A;

    #[inline(always)]
    fn call(&self, (a,): (A,)) -> A {
        -a
    }
}

/// `x * x`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Square;

impl<A: Element> ElementFn<(A,)> for Square {
    type Output = A;

    #[inline(always)]
    fn call(&self, (a,): (A,)) -> A {
        a * a
    }
}

/// Absolute value of signed elements
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Abs;

impl<A: Element + Signed> ElementFn<(A,)> for Abs {
    type Output = A;

    #[inline(always)]
    fn call(&self, (a,): (A,)) -> A {
        a.abs()
    }
}

macro_rules! float_functor {
    ($($name:ident => $method:ident;)+) => {
        $(
            #[doc = concat!("`", stringify!($method), "` of floating point elements")]
            #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
            pub struct $name;

            impl<A: Element + Float> ElementFn<(A,)> for $name {
                type Output = A;

                #[inline(always)]
                fn call(&self, (a,): (A,)) -> A {
                    a.$method()
                }
            }
        )+
    };
}

float_functor! {
    Sqrt => sqrt;
    Exp => exp;
}

/// `as` conversion to `U`
#[derive(Debug)]
pub struct Cast<U>(PhantomData<fn() -> U>);

impl<U> Cast<U> {
    /// Conversion to `U`
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<U> Default for Cast<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> Clone for Cast<U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<U> Copy for Cast<U> {}

impl<A, U> ElementFn<(A,)> for Cast<U>
where
    A: Element + AsPrimitive<U>,
    U: Element,
{
    type Output = U;

    #[inline(always)]
    fn call(&self, (a,): (A,)) -> U {
        a.as_()
    }
}

/// In-place update of one element from one source value
pub trait AssignOp<T, U> {
    /// True only for plain assignment, which is skipped when source and
    /// destination are the same tensor
    const IS_ASSIGN: bool = false;

    /// Update `dst` from `src`
    fn apply(&self, dst: &mut T, src: U);
}

/// `dst = src`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Assign;

impl<T: Element> AssignOp<T, T> for Assign {
    const IS_ASSIGN: bool = true;

    #[inline(always)]
    fn apply(&self, dst: &mut T, src: T) {
        *dst = src;
    }
}

macro_rules! compound_assign {
    ($($name:ident => $op:tt;)+) => {
        paste! {
            $(
                #[doc = concat!("`dst ", stringify!($op), " src`")]
                #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
                pub struct [<$name Assign>];

                impl<T: Element + std::ops::[<$name Assign>]> AssignOp<T, T> for [<$name Assign>] {
                    #[inline(always)]
                    fn apply(&self, dst: &mut T, src: T) {
                        *dst $op src;
                    }
                }
            )+
        }
    };
}

compound_assign! {
    Add => +=;
    Sub => -=;
    Mul => *=;
    Div => /=;
}

/// Arbitrary in-place update given as a closure
#[derive(Clone, Copy, Debug)]
pub struct AssignWith<F>(pub F);

/// Wrap `f(&mut dst, src)` as an [`AssignOp`]
pub fn assign_with<F>(f: F) -> AssignWith<F> {
    AssignWith(f)
}

impl<T, U, F> AssignOp<T, U> for AssignWith<F>
where
    F: Fn(&mut T, U),
{
    #[inline(always)]
    fn apply(&self, dst: &mut T, src: U) {
        (self.0)(dst, src)
    }
}

/// Adapter running an [`AssignOp`] on a destination slot
///
/// This is the element function of the node `a_operator` evaluates.
#[derive(Clone, Copy, Debug)]
pub struct AssignFn<Op>(pub(crate) Op);

impl<Op, T, U> ElementFn<(*mut T, U)> for AssignFn<Op>
where
    Op: AssignOp<T, U>,
{
    type Output = ();

    #[inline(always)]
    fn call(&self, (dst, src): (*mut T, U)) {
        // SAFETY: slots come from a walker/indexer over exclusively borrowed
        // storage and every slot is visited once per evaluation
        unsafe { self.0.apply(&mut *dst, src) }
    }
}
