//! Operator dispatch: building lazy nodes and broadcast in-place assignment

use super::core::{Expression, UnaryExpression};
use super::evaluator::Strategy;
use super::functors::{AssignFn, AssignOp, BindLhs, BindRhs};
use super::operand::{IntoOperand, Operand, TensorLike, TensorSlots};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::tensor::{Tensor, make_broadcast_shape};

/// Operand tuples `n_operator` accepts for a function `F`
///
/// Tuples of one or two operands need at least one tensor-like member; an
/// all-scalar tuple simply has no implementation. With exactly one scalar
/// among two operands the scalar is folded into `F` and the result is a
/// single-operand node. Tuples of three or four operands accept any mix and
/// reject an all-scalar tuple at construction.
pub trait Operands<F> {
    /// Node produced
    type Output;

    /// Build the node for `f`
    fn build(self, f: F) -> Result<Self::Output>;
}

/// Lazily apply `f` elementwise to the broadcast of `operands`
///
/// Tensor operands are held as shallow clones; no element is computed.
///
/// # Errors
/// `Error::BroadcastError` if the operand shapes do not broadcast, and
/// `Error::InvalidArgument` for a three- or four-operand tuple made only of
/// scalars.
///
/// # Example
/// ```
/// use ndexpr::prelude::*;
/// use ndexpr::expr::functors::Mul;
///
/// let a = Tensor::from_slice(&[1i32, 2, 3], &[3]);
/// let tripled = n_operator(Mul, (&a, 3i32)).unwrap();
/// assert_eq!(tripled.to_vec(), vec![3, 6, 9]);
/// ```
pub fn n_operator<F, Ops: Operands<F>>(f: F, operands: Ops) -> Result<Ops::Output> {
    operands.build(f)
}

impl<F, A: TensorLike> Operands<F> for (A,) {
    type Output = UnaryExpression<F, A::Operand>;

    fn build(self, f: F) -> Result<Self::Output> {
        Ok(UnaryExpression::new(f, self.0.into_operand()))
    }
}

impl<F, A: TensorLike, B: TensorLike> Operands<F> for (A, B) {
    type Output = Expression<F, (A::Operand, B::Operand)>;

    fn build(self, f: F) -> Result<Self::Output> {
        Expression::new(f, (self.0.into_operand(), self.1.into_operand()))
    }
}

macro_rules! scalar_operands {
    ($($ty:ty),+) => {
        $(
            impl<F, A: TensorLike> Operands<F> for (A, $ty) {
                type Output = UnaryExpression<BindRhs<F, $ty>, A::Operand>;

                fn build(self, f: F) -> Result<Self::Output> {
                    Ok(UnaryExpression::new(BindRhs::new(f, self.1), self.0.into_operand()))
                }
            }

            impl<F, B: TensorLike> Operands<F> for ($ty, B) {
                type Output = UnaryExpression<BindLhs<F, $ty>, B::Operand>;

                fn build(self, f: F) -> Result<Self::Output> {
                    Ok(UnaryExpression::new(BindLhs::new(f, self.0), self.1.into_operand()))
                }
            }
        )+
    };
}

scalar_operands!(f64, f32, i64, i32, i16, i8, u64, u32, u16, u8);

macro_rules! mixed_operands {
    ($($name:ident . $idx:tt),+) => {
        impl<F, $($name: IntoOperand),+> Operands<F> for ($($name,)+) {
            type Output = Expression<F, ($($name::Operand,)+)>;

            fn build(self, f: F) -> Result<Self::Output> {
                if !(false $(|| $name::IS_TENSOR)+) {
                    return Err(Error::invalid_argument(
                        "operands",
                        "at least one operand must be a tensor or expression",
                    ));
                }
                Expression::new(f, ($(self.$idx.into_operand(),)+))
            }
        }
    };
}

mixed_operands!(A.0, B.1, C.2);
mixed_operands!(A.0, B.1, C.2, D.3);

/// Broadcast in-place assignment `op(lhs[i], rhs[i])` over every element of
/// `lhs`
///
/// `rhs` is broadcast to `lhs`'s shape; `lhs` is never resized. The update
/// node is built exactly as [`n_operator`] would build it and evaluated at
/// once, through the flat indexer when it is trivial and through walkers
/// otherwise. Plain [`Assign`](super::functors::Assign) of a tensor onto
/// itself returns immediately.
///
/// The update is written into `lhs`'s own buffer and `lhs` keeps its id.
/// Clones and views sharing that buffer observe the new values. An `rhs`
/// that reads the same buffer through a different layout sees elements
/// already updated earlier in the traversal. Aliases held by other threads
/// must not be read while the update runs.
///
/// # Errors
/// `Error::BroadcastError` if the shapes do not broadcast,
/// `Error::ShapeMismatch` if they broadcast to something other than
/// `lhs`'s shape, and `Error::InvalidArgument` if `lhs` is a view with
/// broadcast axes.
pub fn a_operator<'t, T, Op, R>(op: Op, lhs: &'t mut Tensor<T>, rhs: R) -> Result<&'t mut Tensor<T>>
where
    T: Element,
    R: IntoOperand,
    Op: AssignOp<T, <R::Operand as Operand>::Item>,
{
    let rhs = rhs.into_operand();

    if Op::IS_ASSIGN && rhs.tensor_id() == Some(lhs.id()) {
        log::trace!("self-assignment of {} skipped", lhs.id());
        return Ok(lhs);
    }

    let shape = make_broadcast_shape(&[lhs.shape(), rhs.shape()])?;
    if shape.as_slice() != lhs.shape() {
        return Err(Error::shape_mismatch(lhs.shape(), rhs.shape()));
    }

    {
        let node = Expression::new(AssignFn(op), (TensorSlots::new(&mut *lhs)?, rhs))?;
        Strategy::select(&node).for_each_range(
            node.shape(),
            node.order(),
            0..node.size(),
            |()| {},
        );
    }
    Ok(lhs)
}
