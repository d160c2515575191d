//! Layout: shape, strides, offset and order for tensor memory layout

use super::shape::{Shape, contiguous_strides};
use super::strides::Strides;
use std::fmt;

/// Memory order of a dense layout
///
/// Logical iteration is always row-major; the order only decides how a dense
/// tensor is laid out in memory and which traversal the trivial fast path
/// follows.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Order {
    /// C order: the last axis varies fastest
    #[default]
    RowMajor,
    /// Fortran order: the first axis varies fastest
    ColumnMajor,
}

impl Order {
    /// The other order
    #[inline]
    pub fn flip(self) -> Self {
        match self {
            Self::RowMajor => Self::ColumnMajor,
            Self::ColumnMajor => Self::RowMajor,
        }
    }
}

/// Layout describes the memory layout of a tensor
///
/// Address of element at indices [i0, i1, ..., in]:
///   offset + i0 * strides[0] + i1 * strides[1] + ... + in * strides[n]
#[derive(Clone, PartialEq, Eq)]
pub struct Layout {
    /// Shape: size along each dimension
    shape: Shape,
    /// Strides: offset (in elements) between consecutive elements along each dimension
    strides: Strides,
    /// Offset: starting element index in the underlying storage
    offset: usize,
    /// Order the layout was created in
    order: Order,
}

impl Layout {
    /// Create a new contiguous row-major layout from a shape
    ///
    /// # Example
    /// ```
    /// use ndexpr::tensor::Layout;
    /// let layout = Layout::contiguous(&[2, 3, 4]);
    /// assert_eq!(layout.shape(), &[2, 3, 4]);
    /// assert_eq!(layout.strides(), &[12, 4, 1]);
    /// ```
    pub fn contiguous(shape: &[usize]) -> Self {
        Self::contiguous_with_order(shape, Order::RowMajor)
    }

    /// Create a new dense layout in the given order
    pub fn contiguous_with_order(shape: &[usize], order: Order) -> Self {
        Self {
            shape: Shape::from(shape),
            strides: contiguous_strides(shape, order),
            offset: 0,
            order,
        }
    }

    /// Create a layout with explicit shape, strides, offset and order
    pub fn new(shape: Shape, strides: Strides, offset: usize, order: Order) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Self {
            shape,
            strides,
            offset,
            order,
        }
    }

    /// Create a scalar (0-dimensional) layout
    pub fn scalar() -> Self {
        Self {
            shape: Shape::new(),
            strides: Strides::new(),
            offset: 0,
            order: Order::RowMajor,
        }
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Get the offset
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Get the order
    #[inline]
    pub fn order(&self) -> Order {
        self.order
    }

    /// Number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    #[inline]
    pub fn elem_count(&self) -> usize {
        self.shape.size()
    }

    /// Check if the tensor is a scalar (0 dimensions)
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// True if the elements occupy one dense run in this layout's order
    ///
    /// Axes of size 1 are ignored, since their stride is never applied. A
    /// stride-0 axis of size > 1 (a broadcast) is never dense. The offset is
    /// not considered: a dense run may start anywhere in storage.
    pub fn is_dense(&self) -> bool {
        if self.elem_count() <= 1 {
            return true;
        }
        let expected = contiguous_strides(&self.shape, self.order);
        self.shape
            .iter()
            .zip(self.strides.iter().zip(expected.iter()))
            .all(|(&dim, (&st, &exp))| dim == 1 || st == exp)
    }

    /// Check if memory is dense in this layout's order and starts at offset 0
    pub fn is_contiguous(&self) -> bool {
        self.is_dense() && self.offset == 0
    }

    /// True if any axis of size > 1 has stride 0
    pub fn has_broadcast_axes(&self) -> bool {
        self.shape
            .iter()
            .zip(self.strides.iter())
            .any(|(&dim, &st)| dim > 1 && st == 0)
    }

    /// Get size along a specific dimension
    ///
    /// Supports negative indexing: -1 is the last dimension
    pub fn dim(&self, d: isize) -> Option<usize> {
        let idx = self.normalize_dim(d)?;
        Some(self.shape[idx])
    }

    /// Normalize a dimension index (handle negative indices)
    pub fn normalize_dim(&self, d: isize) -> Option<usize> {
        let ndim = self.ndim() as isize;
        let idx = if d < 0 { ndim + d } else { d };
        if idx >= 0 && idx < ndim {
            Some(idx as usize)
        } else {
            None
        }
    }

    /// Compute the storage index for given indices
    pub fn index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.ndim() {
            return None;
        }

        for (idx, &dim) in indices.iter().zip(self.shape.iter()) {
            if *idx >= dim {
                return None;
            }
        }

        let mut linear = self.offset as isize;
        for (&idx, &stride) in indices.iter().zip(self.strides.iter()) {
            linear += idx as isize * stride;
        }

        Some(linear as usize)
    }

    /// Reverse the axes
    ///
    /// A dense row-major layout becomes a dense column-major one and vice
    /// versa, so the order tag flips with it.
    pub fn transpose(&self) -> Self {
        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        shape.reverse();
        strides.reverse();
        Self {
            shape,
            strides,
            offset: self.offset,
            order: self.order.flip(),
        }
    }

    /// Swap two axes
    pub fn swap_axes(&self, dim0: isize, dim1: isize) -> Option<Self> {
        let d0 = self.normalize_dim(dim0)?;
        let d1 = self.normalize_dim(dim1)?;

        let mut layout = self.clone();
        layout.shape.swap(d0, d1);
        layout.strides.swap(d0, d1);
        Some(layout)
    }

    /// Create a reshaped layout over the same dense run
    ///
    /// Elements keep their position in this layout's order. Returns None if
    /// the layout is not dense or the element counts differ.
    pub fn reshape(&self, new_shape: &[usize]) -> Option<Self> {
        if !self.is_dense() {
            return None;
        }

        if new_shape.iter().product::<usize>() != self.elem_count() {
            return None;
        }

        let mut layout = Self::contiguous_with_order(new_shape, self.order);
        layout.offset = self.offset;
        Some(layout)
    }

    /// Create a broadcast layout to a target shape
    ///
    /// Leading and size-1 axes get stride 0. Returns None if shapes are not
    /// broadcastable.
    pub fn broadcast_to(&self, target: &[usize]) -> Option<Self> {
        if target.len() < self.ndim() {
            return None;
        }

        let mut new_shape = Shape::with_capacity(target.len());
        let mut new_strides = Strides::with_capacity(target.len());

        let pad = target.len() - self.ndim();
        for &t in &target[..pad] {
            new_shape.push(t);
            new_strides.push(0);
        }

        for ((&s, &st), &t) in self
            .shape
            .iter()
            .zip(self.strides.iter())
            .zip(&target[pad..])
        {
            if s == t {
                new_shape.push(t);
                new_strides.push(st);
            } else if s == 1 {
                new_shape.push(t);
                new_strides.push(0);
            } else {
                return None;
            }
        }

        Some(Self::new(new_shape, new_strides, self.offset, self.order))
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Layout {{ shape: {:?}, strides: {:?}, offset: {}, order: {:?} }}",
            self.shape.as_slice(),
            self.strides.as_slice(),
            self.offset,
            self.order
        )
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.shape.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_layout() {
        let layout = Layout::contiguous(&[2, 3, 4]);
        assert_eq!(layout.shape(), &[2, 3, 4]);
        assert_eq!(layout.strides(), &[12, 4, 1]);
        assert_eq!(layout.elem_count(), 24);
        assert!(layout.is_contiguous());
    }

    #[test]
    fn test_column_major_layout() {
        let layout = Layout::contiguous_with_order(&[2, 3], Order::ColumnMajor);
        assert_eq!(layout.strides(), &[1, 2]);
        assert!(layout.is_dense());
        assert_eq!(layout.index(&[1, 2]), Some(5));
    }

    #[test]
    fn test_scalar_layout() {
        let layout = Layout::scalar();
        assert!(layout.is_scalar());
        assert_eq!(layout.elem_count(), 1);
        assert!(layout.is_contiguous());
    }

    #[test]
    fn test_transpose_flips_order() {
        let layout = Layout::contiguous(&[2, 3, 4]);
        let transposed = layout.transpose();
        assert_eq!(transposed.shape(), &[4, 3, 2]);
        assert_eq!(transposed.strides(), &[1, 4, 12]);
        assert_eq!(transposed.order(), Order::ColumnMajor);
        assert!(transposed.is_dense());
    }

    #[test]
    fn test_swap_axes_not_dense() {
        let layout = Layout::contiguous(&[2, 3, 4]);
        let swapped = layout.swap_axes(-1, -2).unwrap();
        assert_eq!(swapped.shape(), &[2, 4, 3]);
        assert_eq!(swapped.strides(), &[12, 1, 4]);
        assert!(!swapped.is_dense());
    }

    #[test]
    fn test_unit_axes_ignored_for_density() {
        let layout = Layout::new(
            Shape::from([1, 3]),
            Strides::from([99, 1]),
            0,
            Order::RowMajor,
        );
        assert!(layout.is_dense());
    }

    #[test]
    fn test_reshape() {
        let layout = Layout::contiguous(&[2, 3, 4]);
        let reshaped = layout.reshape(&[6, 4]).unwrap();
        assert_eq!(reshaped.shape(), &[6, 4]);
        assert!(reshaped.is_contiguous());
        assert!(layout.reshape(&[5, 5]).is_none());
        assert!(layout.swap_axes(0, 1).unwrap().reshape(&[24]).is_none());
    }

    #[test]
    fn test_broadcast_to() {
        let layout = Layout::contiguous(&[3, 1]);
        let b = layout.broadcast_to(&[2, 3, 4]).unwrap();
        assert_eq!(b.shape(), &[2, 3, 4]);
        assert_eq!(b.strides(), &[0, 1, 0]);
        assert!(b.has_broadcast_axes());
        assert!(!b.is_dense());
        assert!(layout.broadcast_to(&[3, 2, 2]).is_none());
    }

    #[test]
    fn test_index() {
        let layout = Layout::contiguous(&[2, 3]);
        assert_eq!(layout.index(&[0, 0]), Some(0));
        assert_eq!(layout.index(&[0, 2]), Some(2));
        assert_eq!(layout.index(&[1, 0]), Some(3));
        assert_eq!(layout.index(&[1, 2]), Some(5));
        assert_eq!(layout.index(&[2, 0]), None);
    }
}
