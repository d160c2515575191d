//! Shape type: dimensions of a tensor

use super::Order;
use super::strides::Strides;
use smallvec::SmallVec;
use std::fmt;
use std::iter::FromIterator;
use std::ops::{Deref, DerefMut};

/// Stack allocation threshold for dimensions
/// Most tensors have 4 or fewer dimensions, so we stack-allocate up to 4
pub(crate) const STACK_DIMS: usize = 4;

/// Shape type: dimensions of a tensor
///
/// An empty shape denotes a 0-dimensional (scalar) tensor holding one element.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Shape(SmallVec<[usize; STACK_DIMS]>);

impl Shape {
    /// Create an empty (0-dimensional) shape.
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Create an empty shape with capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self(SmallVec::with_capacity(capacity))
    }

    /// Push a dimension.
    pub fn push(&mut self, dim: usize) {
        self.0.push(dim);
    }

    /// Reverse dimension order.
    pub fn reverse(&mut self) {
        self.0.reverse();
    }

    /// View shape as a slice.
    pub fn as_slice(&self) -> &[usize] {
        self.0.as_slice()
    }

    /// Number of dimensions in this shape.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements (1 for a scalar, 0 if any axis is 0).
    #[inline]
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }
}

/// Dense element strides of `shape` laid out in `order`
///
/// The stride of an axis is the product of the sizes of all faster-varying
/// axes; zero-sized axes are treated as size 1 so strides stay meaningful.
pub fn contiguous_strides(shape: &[usize], order: Order) -> Strides {
    let mut strides: Strides = std::iter::repeat_n(0isize, shape.len()).collect();
    let mut stride = 1isize;
    match order {
        Order::RowMajor => {
            for (s, &dim) in strides.iter_mut().zip(shape).rev() {
                *s = stride;
                stride *= dim.max(1) as isize;
            }
        }
        Order::ColumnMajor => {
            for (s, &dim) in strides.iter_mut().zip(shape) {
                *s = stride;
                stride *= dim.max(1) as isize;
            }
        }
    }
    strides
}

impl Deref for Shape {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl DerefMut for Shape {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut_slice()
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<[usize]> for Shape {
    fn as_ref(&self) -> &[usize] {
        self.0.as_slice()
    }
}

impl PartialEq<[usize]> for Shape {
    fn eq(&self, other: &[usize]) -> bool {
        self.as_slice() == other
    }
}

impl<const N: usize> PartialEq<[usize; N]> for Shape {
    fn eq(&self, other: &[usize; N]) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl From<Vec<usize>> for Shape {
    fn from(value: Vec<usize>) -> Self {
        Self(value.into_iter().collect())
    }
}

impl From<&[usize]> for Shape {
    fn from(value: &[usize]) -> Self {
        Self(value.iter().copied().collect())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(value: [usize; N]) -> Self {
        Self(value.into_iter().collect())
    }
}

impl FromIterator<usize> for Shape {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
