//! Walkers and indexers: the two ways elements of an operand are reached
//!
//! A [`Walker`] is a stateful cursor over an N-dimensional index space that
//! moves relative to its current position one axis at a time. Broadcasting is
//! realised entirely here: axes an operand does not have, or has with size 1,
//! carry stride 0, so moving along them leaves the element offset unchanged.
//!
//! An [`Indexer`] is stateless flat random access. It is only valid for
//! "trivial" operands (dense in their own order, nothing broadcast), where the
//! flat traversal position maps one-to-one onto the element.

mod strided;
mod traverse;

pub use strided::{TensorIndexer, TensorIndexerMut, TensorWalker, TensorWalkerMut};
pub use traverse::{RangeTraverser, Traverser};

/// Row-major element iterator over a tensor
pub type TensorIter<'a, T> = Traverser<TensorWalker<'a, T>>;

/// Stateful cursor over an N-dimensional logical index space
///
/// Movements are unchecked: the driver (usually a [`Traverser`]) keeps every
/// position it dereferences within bounds.
pub trait Walker {
    /// Value produced on dereference
    type Item;

    /// Move `steps` positions along `axis` (negative moves backwards)
    fn walk(&mut self, axis: usize, steps: isize);

    /// Move one position forward along `axis`
    #[inline]
    fn step(&mut self, axis: usize) {
        self.walk(axis, 1);
    }

    /// Move one position backward along `axis`
    #[inline]
    fn step_back(&mut self, axis: usize) {
        self.walk(axis, -1);
    }

    /// Move to the first position on `axis`
    fn reset(&mut self, axis: usize);

    /// Move to one past the last position on `axis`
    fn reset_back(&mut self, axis: usize);

    /// `reset_back` on every axis
    fn reset_back_all(&mut self);

    /// Recompute the element offset from the per-axis positions
    fn update_offset(&mut self);

    /// Value at the current position
    fn get(&self) -> Self::Item;
}

/// Stateless flat random access for trivial operands
pub trait Indexer {
    /// Value produced by `at`
    type Item;

    /// Value at flat traversal position `index`
    fn at(&self, index: usize) -> Self::Item;
}
