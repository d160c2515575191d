//! Descriptor: the immutable shape summary of a tensor or expression node

use super::Order;
use super::shape::Shape;

/// Logical shape, element count and order of a node
///
/// Computed once when a node is built and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Descriptor {
    shape: Shape,
    size: usize,
    order: Order,
}

impl Descriptor {
    /// Describe `shape` laid out densely in `order`
    pub fn new(shape: Shape, order: Order) -> Self {
        let size = shape.size();
        Self { shape, size, order }
    }

    /// Logical shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of elements (0 if any axis is 0)
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of dimensions
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Traversal order
    #[inline]
    pub fn order(&self) -> Order {
        self.order
    }
}
