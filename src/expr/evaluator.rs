//! Walkers, indexers and iterators of expression nodes
//!
//! An expression walker owns one child walker per operand, all created with
//! the node's dimensionality so their axes line up, and moves them in
//! lockstep. Dereferencing applies the node's function to the children's
//! current values. Expression indexers do the same with flat positions.

use super::functors::ElementFn;
use super::operand::Operand;
use crate::tensor::Order;
use crate::walker::{Indexer, Traverser, Walker};
use std::iter::FusedIterator;
use std::ops::Range;

/// A tuple of walkers moved in lockstep
pub trait WalkerTuple: Clone {
    /// Tuple of the children's items
    type Items;

    /// Move every child along `axis`
    fn walk(&mut self, axis: usize, steps: isize);

    /// `reset` on every child
    fn reset(&mut self, axis: usize);

    /// `reset_back` on every child
    fn reset_back(&mut self, axis: usize);

    /// `reset_back_all` on every child
    fn reset_back_all(&mut self);

    /// `update_offset` on every child
    fn update_offset(&mut self);

    /// Every child's current value
    fn get(&self) -> Self::Items;
}

/// A tuple of indexers read at the same flat position
pub trait IndexerTuple {
    /// Tuple of the children's items
    type Items;

    /// Every child's value at `index`
    fn at(&self, index: usize) -> Self::Items;
}

macro_rules! impl_cursor_tuples {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: Walker + Clone),+> WalkerTuple for ($($name,)+) {
            type Items = ($($name::Item,)+);

            #[inline(always)]
            fn walk(&mut self, axis: usize, steps: isize) {
                $(self.$idx.walk(axis, steps);)+
            }

            #[inline]
            fn reset(&mut self, axis: usize) {
                $(self.$idx.reset(axis);)+
            }

            #[inline]
            fn reset_back(&mut self, axis: usize) {
                $(self.$idx.reset_back(axis);)+
            }

            fn reset_back_all(&mut self) {
                $(self.$idx.reset_back_all();)+
            }

            fn update_offset(&mut self) {
                $(self.$idx.update_offset();)+
            }

            #[inline(always)]
            fn get(&self) -> Self::Items {
                ($(self.$idx.get(),)+)
            }
        }

        impl<$($name: Indexer),+> IndexerTuple for ($($name,)+) {
            type Items = ($($name::Item,)+);

            #[inline(always)]
            fn at(&self, index: usize) -> Self::Items {
                ($(self.$idx.at(index),)+)
            }
        }
    };
}

impl_cursor_tuples!(A.0);
impl_cursor_tuples!(A.0, B.1);
impl_cursor_tuples!(A.0, B.1, C.2);
impl_cursor_tuples!(A.0, B.1, C.2, D.3);

/// Walker of an expression node
#[derive(Debug)]
pub struct ExprWalker<'a, F, W> {
    f: &'a F,
    children: W,
}

/// Walker of a single-operand node
pub type UnaryWalker<'a, F, W> = ExprWalker<'a, F, (W,)>;

impl<'a, F, W> ExprWalker<'a, F, W> {
    pub(crate) fn new(f: &'a F, children: W) -> Self {
        Self { f, children }
    }
}

impl<F, W: Clone> Clone for ExprWalker<'_, F, W> {
    fn clone(&self) -> Self {
        Self {
            f: self.f,
            children: self.children.clone(),
        }
    }
}

impl<F, W> Walker for ExprWalker<'_, F, W>
where
    W: WalkerTuple,
    F: ElementFn<W::Items>,
{
    type Item = F::Output;

    #[inline(always)]
    fn walk(&mut self, axis: usize, steps: isize) {
        self.children.walk(axis, steps);
    }

    #[inline]
    fn reset(&mut self, axis: usize) {
        self.children.reset(axis);
    }

    #[inline]
    fn reset_back(&mut self, axis: usize) {
        self.children.reset_back(axis);
    }

    fn reset_back_all(&mut self) {
        self.children.reset_back_all();
    }

    fn update_offset(&mut self) {
        self.children.update_offset();
    }

    #[inline(always)]
    fn get(&self) -> F::Output {
        self.f.call(self.children.get())
    }
}

/// Indexer of an expression node
#[derive(Debug)]
pub struct ExprIndexer<'a, F, I> {
    f: &'a F,
    children: I,
}

/// Indexer of a single-operand node
pub type UnaryIndexer<'a, F, I> = ExprIndexer<'a, F, (I,)>;

impl<'a, F, I> ExprIndexer<'a, F, I> {
    pub(crate) fn new(f: &'a F, children: I) -> Self {
        Self { f, children }
    }
}

impl<F, I> Indexer for ExprIndexer<'_, F, I>
where
    I: IndexerTuple,
    F: ElementFn<I::Items>,
{
    type Item = F::Output;

    #[inline(always)]
    fn at(&self, index: usize) -> F::Output {
        self.f.call(self.children.at(index))
    }
}

/// Iterator decorator applying a unary function on dereference
///
/// Every movement (`next`, `next_back`, `nth`, `nth_back`, length queries) is
/// forwarded unchanged to the wrapped iterator; the function only runs for
/// the elements actually yielded.
#[derive(Debug)]
pub struct DerefMap<'a, F, I> {
    f: &'a F,
    inner: I,
}

impl<'a, F, I> DerefMap<'a, F, I> {
    /// Decorate `inner` with `f`
    pub fn new(f: &'a F, inner: I) -> Self {
        Self { f, inner }
    }
}

impl<F, I: Clone> Clone for DerefMap<'_, F, I> {
    fn clone(&self) -> Self {
        Self {
            f: self.f,
            inner: self.inner.clone(),
        }
    }
}

impl<F, I> Iterator for DerefMap<'_, F, I>
where
    I: Iterator,
    F: ElementFn<(I::Item,)>,
{
    type Item = F::Output;

    #[inline]
    fn next(&mut self) -> Option<F::Output> {
        self.inner.next().map(|x| self.f.call((x,)))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    #[inline]
    fn nth(&mut self, n: usize) -> Option<F::Output> {
        self.inner.nth(n).map(|x| self.f.call((x,)))
    }
}

impl<F, I> DoubleEndedIterator for DerefMap<'_, F, I>
where
    I: DoubleEndedIterator,
    F: ElementFn<(I::Item,)>,
{
    #[inline]
    fn next_back(&mut self) -> Option<F::Output> {
        self.inner.next_back().map(|x| self.f.call((x,)))
    }

    #[inline]
    fn nth_back(&mut self, n: usize) -> Option<F::Output> {
        self.inner.nth_back(n).map(|x| self.f.call((x,)))
    }
}

impl<F, I> ExactSizeIterator for DerefMap<'_, F, I>
where
    I: ExactSizeIterator,
    F: ElementFn<(I::Item,)>,
{
    #[inline]
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<F, I> FusedIterator for DerefMap<'_, F, I>
where
    I: FusedIterator,
    F: ElementFn<(I::Item,)>,
{
}

/// How one traversal reaches the elements of a node
///
/// Chosen once per traversal and never switched midway.
#[derive(Debug)]
pub enum Strategy<W, I> {
    /// Per-axis walker; always correct
    Walker(W),
    /// Flat indexer; only for trivial nodes
    Indexer(I),
}

impl<W, I> Strategy<W, I>
where
    W: Walker + Clone,
    I: Indexer<Item = W::Item>,
{
    /// The indexer if `operand` is trivial, else a walker
    pub fn select<'a, O>(operand: &'a O) -> Self
    where
        O: Operand<Walker<'a> = W, Indexer<'a> = I> + ?Sized,
    {
        if operand.is_trivial() {
            Strategy::Indexer(operand.create_trivial_indexer())
        } else {
            Strategy::Walker(operand.walker())
        }
    }

    /// True if the flat indexer was selected
    pub fn is_indexer(&self) -> bool {
        matches!(self, Strategy::Indexer(_))
    }

    /// Fold the elements at flat positions `range` of `shape` traversed in
    /// `order`
    ///
    /// For the indexer strategy `order` must be the node's own order.
    pub fn fold_range<Acc>(
        self,
        shape: &[usize],
        order: Order,
        range: Range<usize>,
        init: Acc,
        mut f: impl FnMut(Acc, W::Item) -> Acc,
    ) -> Acc {
        match self {
            Strategy::Indexer(indexer) => range.fold(init, |acc, i| f(acc, indexer.at(i))),
            Strategy::Walker(walker) => {
                let mut elements = Traverser::new(walker, shape, order);
                elements.seek(range.start);
                elements.take(range.len()).fold(init, f)
            }
        }
    }

    /// Visit the elements at flat positions `range` in order
    pub fn for_each_range(
        self,
        shape: &[usize],
        order: Order,
        range: Range<usize>,
        mut f: impl FnMut(W::Item),
    ) {
        self.fold_range(shape, order, range, (), |(), x| f(x));
    }
}
