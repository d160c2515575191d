//! The operand abstraction shared by tensors and expression nodes

use crate::dtype::Element;
use crate::error::Result;
use crate::tensor::{Layout, Order, Tensor, TensorId};
use crate::walker::{
    Indexer, TensorIndexer, TensorIndexerMut, TensorIter, TensorWalker, TensorWalkerMut, Traverser,
    Walker,
};
use std::marker::PhantomData;

/// Anything an expression node can take as an argument
///
/// Tensors and expression nodes implement this; nodes nest arbitrarily
/// because every node is itself an operand.
pub trait Operand {
    /// Value of one element
    type Item;

    /// Walker borrowed from this operand
    type Walker<'a>: Walker<Item = Self::Item> + Clone
    where
        Self: 'a;

    /// Flat indexer borrowed from this operand
    type Indexer<'a>: Indexer<Item = Self::Item>
    where
        Self: 'a;

    /// Row-major element iterator
    type Iter<'a>: DoubleEndedIterator<Item = Self::Item> + ExactSizeIterator
    where
        Self: 'a;

    /// Logical shape
    fn shape(&self) -> &[usize];

    /// Traversal order the trivial fast path follows
    fn order(&self) -> Order;

    /// Number of dimensions
    fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Number of elements
    fn size(&self) -> usize {
        self.shape().iter().product()
    }

    /// True if flat position `i` in [`Operand::order`] addresses element `i`
    /// of every leaf without broadcasting
    fn is_trivial(&self) -> bool;

    /// Walker at the origin, with `max_dim` right-aligned axes
    fn create_walker(&self, max_dim: usize) -> Self::Walker<'_>;

    /// Walker at the operand's own dimensionality
    fn walker(&self) -> Self::Walker<'_> {
        self.create_walker(self.ndim())
    }

    /// Flat indexer; only valid when [`Operand::is_trivial`] holds
    fn create_trivial_indexer(&self) -> Self::Indexer<'_>;

    /// Iterate elements in row-major logical order
    fn iter(&self) -> Self::Iter<'_>;

    /// Identity of a leaf tensor, None for computed nodes
    fn tensor_id(&self) -> Option<TensorId> {
        None
    }
}

impl<T: Element> Operand for Tensor<T> {
    type Item = T;
    type Walker<'a> = TensorWalker<'a, T>;
    type Indexer<'a> = TensorIndexer<'a, T>;
    type Iter<'a> = TensorIter<'a, T>;

    #[inline]
    fn shape(&self) -> &[usize] {
        self.layout().shape()
    }

    #[inline]
    fn order(&self) -> Order {
        self.layout().order()
    }

    #[inline]
    fn is_trivial(&self) -> bool {
        self.layout().is_dense()
    }

    fn create_walker(&self, max_dim: usize) -> TensorWalker<'_, T> {
        TensorWalker::new(self, max_dim)
    }

    fn create_trivial_indexer(&self) -> TensorIndexer<'_, T> {
        debug_assert!(self.is_trivial());
        TensorIndexer::new(self)
    }

    fn iter(&self) -> TensorIter<'_, T> {
        Tensor::iter(self)
    }

    fn tensor_id(&self) -> Option<TensorId> {
        Some(self.id())
    }
}

/// Writable slots of an exclusively borrowed tensor
///
/// The destination operand of `a_operator`; dereferencing yields slot
/// pointers instead of values.
#[derive(Debug)]
pub struct TensorSlots<'t, T> {
    ptr: *mut T,
    layout: Layout,
    _marker: PhantomData<&'t mut T>,
}

impl<'t, T: Element> TensorSlots<'t, T> {
    /// Borrow the slots of `tensor`
    ///
    /// Writes go to the tensor's own buffer and are visible through every
    /// handle sharing it.
    ///
    /// # Errors
    /// `Error::InvalidArgument` if `tensor` is a view with broadcast axes.
    pub fn new(tensor: &'t mut Tensor<T>) -> Result<Self> {
        let ptr = tensor.data_ptr_mut()?;
        Ok(Self {
            ptr,
            layout: tensor.layout().clone(),
            _marker: PhantomData,
        })
    }
}

impl<'t, T: Element> Operand for TensorSlots<'t, T> {
    type Item = *mut T;
    type Walker<'a>
        = TensorWalkerMut<'a, T>
    where
        Self: 'a;
    type Indexer<'a>
        = TensorIndexerMut<'a, T>
    where
        Self: 'a;
    type Iter<'a>
        = Traverser<TensorWalkerMut<'a, T>>
    where
        Self: 'a;

    fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    fn order(&self) -> Order {
        self.layout.order()
    }

    fn is_trivial(&self) -> bool {
        self.layout.is_dense()
    }

    fn create_walker(&self, max_dim: usize) -> TensorWalkerMut<'_, T> {
        // SAFETY: ptr/layout come from a tensor exclusively borrowed for 't
        unsafe { TensorWalkerMut::from_raw(self.ptr, &self.layout, max_dim) }
    }

    fn create_trivial_indexer(&self) -> TensorIndexerMut<'_, T> {
        debug_assert!(self.is_trivial());
        // SAFETY: dense layout of an exclusively borrowed tensor
        unsafe { TensorIndexerMut::from_raw(self.ptr) }
    }

    fn iter(&self) -> Self::Iter<'_> {
        Traverser::new(self.walker(), self.shape(), Order::RowMajor)
    }
}

/// Values usable as tensor operands of `n_operator` and the arithmetic
/// operators
///
/// Implemented for tensors (by value or reference, the latter making a
/// shallow clone) and for expression nodes.
pub trait TensorLike {
    /// Operand held by the node
    type Operand: Operand;

    /// Convert into the operand handle the node stores
    fn into_operand(self) -> Self::Operand;
}

impl<T: Element> TensorLike for Tensor<T> {
    type Operand = Tensor<T>;

    #[inline]
    fn into_operand(self) -> Tensor<T> {
        self
    }
}

impl<T: Element> TensorLike for &Tensor<T> {
    type Operand = Tensor<T>;

    #[inline]
    fn into_operand(self) -> Tensor<T> {
        self.clone()
    }
}

/// Any value usable as an operand, including primitive scalars
///
/// Scalars become freshly allocated 0-dimensional tensors owned by the node.
pub trait IntoOperand {
    /// Operand held by the node
    type Operand: Operand;

    /// False for primitive scalars
    const IS_TENSOR: bool;

    /// Convert into the operand handle the node stores
    fn into_operand(self) -> Self::Operand;
}

impl<X: TensorLike> IntoOperand for X {
    type Operand = X::Operand;
    const IS_TENSOR: bool = true;

    #[inline]
    fn into_operand(self) -> X::Operand {
        TensorLike::into_operand(self)
    }
}

macro_rules! scalar_operand {
    ($($ty:ty),+) => {
        $(
            impl IntoOperand for $ty {
                type Operand = Tensor<$ty>;
                const IS_TENSOR: bool = false;

                #[inline]
                fn into_operand(self) -> Tensor<$ty> {
                    Tensor::scalar(self)
                }
            }
        )+
    };
}

scalar_operand!(f64, f32, i64, i32, i16, i8, u64, u32, u16, u8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_operand() {
        let t = Tensor::from_slice(&[1, 2, 3, 4, 5, 6], &[2, 3]);
        assert!(Operand::is_trivial(&t));
        assert_eq!(Operand::size(&t), 6);
        let idx = t.create_trivial_indexer();
        assert_eq!(idx.at(4), 5);
        assert!(!Operand::is_trivial(&t.swap_axes(0, 1).unwrap()));
        assert!(!Operand::is_trivial(&t.broadcast_to(&[2, 2, 3]).unwrap()));
        assert!(Operand::is_trivial(&t.transpose()));
    }

    #[test]
    fn test_scalar_becomes_zero_dim() {
        let s = 2.5f32.into_operand();
        assert!(s.is_scalar());
        assert!(!<f32 as IntoOperand>::IS_TENSOR);
        assert!(<&Tensor<f32> as IntoOperand>::IS_TENSOR);
    }

    #[test]
    fn test_reference_is_shallow() {
        let t = Tensor::from_slice(&[1.0, 2.0], &[2]);
        let op = IntoOperand::into_operand(&t);
        assert_eq!(op.tensor_id(), Some(t.id()));
        assert!(op.storage().ptr_eq(t.storage()));
    }

    #[test]
    fn test_slots_write() {
        let mut t = Tensor::<u16>::zeros(&[3]);
        {
            let slots = TensorSlots::new(&mut t).unwrap();
            let mut w = slots.walker();
            w.step(0);
            unsafe { *w.get() = 4 };
        }
        assert_eq!(t.to_vec(), vec![0, 4, 0]);
    }
}
