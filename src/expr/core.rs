//! Lazy expression nodes
//!
//! A node owns its element function, its operand handles and a
//! [`Descriptor`] computed once at construction. Nothing is evaluated until
//! the node is walked, indexed, iterated or materialised.

use super::evaluator::{DerefMap, ExprIndexer, ExprWalker, IndexerTuple, WalkerTuple};
use super::functors::ElementFn;
use super::operand::{Operand, TensorLike};
use crate::error::Result;
use crate::tensor::{Descriptor, Order, Shape, make_broadcast_shape};
use crate::walker::Traverser;
use smallvec::{SmallVec, smallvec};

/// A tuple of operands of one node
pub trait OperandTuple {
    /// Tuple of the operands' items
    type Items;

    /// Tuple of the operands' walkers
    type Walkers<'a>: WalkerTuple<Items = Self::Items>
    where
        Self: 'a;

    /// Tuple of the operands' indexers
    type Indexers<'a>: IndexerTuple<Items = Self::Items>
    where
        Self: 'a;

    /// Every operand's shape, in operand order
    fn shapes(&self) -> SmallVec<[&[usize]; 4]>;

    /// Every operand's order, in operand order
    fn orders(&self) -> SmallVec<[Order; 4]>;

    /// True if every operand has `size` elements and is trivial
    fn all_trivial(&self, size: usize) -> bool;

    /// One walker per operand, all with `max_dim` axes
    fn create_walkers(&self, max_dim: usize) -> Self::Walkers<'_>;

    /// One indexer per operand
    fn create_indexers(&self) -> Self::Indexers<'_>;
}

macro_rules! impl_operand_tuple {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Operand),+> OperandTuple for ($($name,)+) {
            type Items = ($($name::Item,)+);
            type Walkers<'a>
                = ($($name::Walker<'a>,)+)
            where
                Self: 'a;
            type Indexers<'a>
                = ($($name::Indexer<'a>,)+)
            where
                Self: 'a;

            fn shapes(&self) -> SmallVec<[&[usize]; 4]> {
                smallvec![$(self.$idx.shape()),+]
            }

            fn orders(&self) -> SmallVec<[Order; 4]> {
                smallvec![$(self.$idx.order()),+]
            }

            fn all_trivial(&self, size: usize) -> bool {
                true $(&& self.$idx.size() == size && self.$idx.is_trivial())+
            }

            fn create_walkers(&self, max_dim: usize) -> Self::Walkers<'_> {
                ($(self.$idx.create_walker(max_dim),)+)
            }

            fn create_indexers(&self) -> Self::Indexers<'_> {
                ($(self.$idx.create_trivial_indexer(),)+)
            }
        }
    };
}

impl_operand_tuple!(A.0);
impl_operand_tuple!(A.0, B.1);
impl_operand_tuple!(A.0, B.1, C.2);
impl_operand_tuple!(A.0, B.1, C.2, D.3);

/// N-ary lazy node: `f` applied elementwise to the broadcast of its operands
#[derive(Clone, Debug)]
pub struct Expression<F, Ops> {
    f: F,
    operands: Ops,
    descriptor: Descriptor,
}

impl<F, Ops: OperandTuple> Expression<F, Ops> {
    /// Build a node over `operands`
    ///
    /// The node's shape is the broadcast of the operands' shapes and its
    /// order is their common order, or row-major when they disagree.
    ///
    /// # Errors
    /// `Error::BroadcastError` if the shapes do not broadcast.
    pub fn new(f: F, operands: Ops) -> Result<Self> {
        let shape = make_broadcast_shape(&operands.shapes())?;
        let orders = operands.orders();
        let order = match orders.split_first() {
            Some((&first, rest)) if rest.iter().all(|&o| o == first) => first,
            _ => Order::RowMajor,
        };
        Ok(Self {
            f,
            operands,
            descriptor: Descriptor::new(shape, order),
        })
    }
}

impl<F, Ops> Expression<F, Ops> {
    /// The element function
    pub fn function(&self) -> &F {
        &self.f
    }

    /// The operand handles
    pub fn operands(&self) -> &Ops {
        &self.operands
    }

    /// Shape, size and order of the node
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

impl<F, Ops> Operand for Expression<F, Ops>
where
    Ops: OperandTuple,
    F: ElementFn<Ops::Items>,
{
    type Item = F::Output;
    type Walker<'a>
        = ExprWalker<'a, F, Ops::Walkers<'a>>
    where
        Self: 'a;
    type Indexer<'a>
        = ExprIndexer<'a, F, Ops::Indexers<'a>>
    where
        Self: 'a;
    type Iter<'a>
        = Traverser<ExprWalker<'a, F, Ops::Walkers<'a>>>
    where
        Self: 'a;

    #[inline]
    fn shape(&self) -> &[usize] {
        self.descriptor.shape()
    }

    #[inline]
    fn order(&self) -> Order {
        self.descriptor.order()
    }

    #[inline]
    fn size(&self) -> usize {
        self.descriptor.size()
    }

    /// Trivial iff every operand has the node's size and is trivial, and
    /// either all operands follow the node's order or the node has at most
    /// one dimension (where order is irrelevant)
    fn is_trivial(&self) -> bool {
        if !self.operands.all_trivial(self.descriptor.size()) {
            return false;
        }
        self.descriptor.ndim() <= 1
            || self
                .operands
                .orders()
                .iter()
                .all(|&o| o == self.descriptor.order())
    }

    fn create_walker(&self, max_dim: usize) -> Self::Walker<'_> {
        debug_assert!(max_dim >= self.descriptor.ndim());
        ExprWalker::new(&self.f, self.operands.create_walkers(max_dim))
    }

    fn create_trivial_indexer(&self) -> Self::Indexer<'_> {
        debug_assert!(self.is_trivial());
        ExprIndexer::new(&self.f, self.operands.create_indexers())
    }

    fn iter(&self) -> Self::Iter<'_> {
        Traverser::new(self.walker(), self.shape(), Order::RowMajor)
    }
}

/// Single-operand lazy node
///
/// Its descriptor copies the operand's shape and order, so it is trivial
/// exactly when the operand is, and it iterates by decorating the operand's
/// own iterator.
#[derive(Clone, Debug)]
pub struct UnaryExpression<F, A> {
    f: F,
    operand: A,
    descriptor: Descriptor,
}

impl<F, A: Operand> UnaryExpression<F, A> {
    /// Build a node applying `f` to every element of `operand`
    pub fn new(f: F, operand: A) -> Self {
        let descriptor = Descriptor::new(Shape::from(operand.shape()), operand.order());
        Self {
            f,
            operand,
            descriptor,
        }
    }
}

impl<F, A> UnaryExpression<F, A> {
    /// The element function
    pub fn function(&self) -> &F {
        &self.f
    }

    /// The operand handle
    pub fn operand(&self) -> &A {
        &self.operand
    }

    /// Shape, size and order of the node
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }
}

impl<F, A> Operand for UnaryExpression<F, A>
where
    A: Operand,
    F: ElementFn<(A::Item,)>,
{
    type Item = F::Output;
    type Walker<'a>
        = ExprWalker<'a, F, (A::Walker<'a>,)>
    where
        Self: 'a;
    type Indexer<'a>
        = ExprIndexer<'a, F, (A::Indexer<'a>,)>
    where
        Self: 'a;
    type Iter<'a>
        = DerefMap<'a, F, A::Iter<'a>>
    where
        Self: 'a;

    #[inline]
    fn shape(&self) -> &[usize] {
        self.descriptor.shape()
    }

    #[inline]
    fn order(&self) -> Order {
        self.descriptor.order()
    }

    #[inline]
    fn size(&self) -> usize {
        self.descriptor.size()
    }

    fn is_trivial(&self) -> bool {
        self.operand.is_trivial()
    }

    fn create_walker(&self, max_dim: usize) -> Self::Walker<'_> {
        ExprWalker::new(&self.f, (self.operand.create_walker(max_dim),))
    }

    fn create_trivial_indexer(&self) -> Self::Indexer<'_> {
        debug_assert!(self.is_trivial());
        ExprIndexer::new(&self.f, (self.operand.create_trivial_indexer(),))
    }

    fn iter(&self) -> Self::Iter<'_> {
        DerefMap::new(&self.f, self.operand.iter())
    }
}

impl<F, Ops> TensorLike for Expression<F, Ops>
where
    Self: Operand,
{
    type Operand = Self;

    #[inline]
    fn into_operand(self) -> Self {
        self
    }
}

impl<F, Ops> TensorLike for &Expression<F, Ops>
where
    Expression<F, Ops>: Operand + Clone,
{
    type Operand = Expression<F, Ops>;

    #[inline]
    fn into_operand(self) -> Expression<F, Ops> {
        self.clone()
    }
}

impl<F, A> TensorLike for UnaryExpression<F, A>
where
    Self: Operand,
{
    type Operand = Self;

    #[inline]
    fn into_operand(self) -> Self {
        self
    }
}

impl<F, A> TensorLike for &UnaryExpression<F, A>
where
    UnaryExpression<F, A>: Operand + Clone,
{
    type Operand = UnaryExpression<F, A>;

    #[inline]
    fn into_operand(self) -> UnaryExpression<F, A> {
        self.clone()
    }
}
