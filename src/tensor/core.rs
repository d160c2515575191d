//! Core Tensor type

use super::{Layout, Order, Storage, TensorId};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::walker::{TensorIter, TensorWalker, Traverser};
use std::fmt;

/// N-dimensional array of `T` in host memory
///
/// `Tensor` is the leaf operand of every expression. It consists of:
/// - **Storage**: reference-counted element buffer
/// - **Layout**: shape, strides, offset and order defining the view into storage
/// - **Id**: identity of this view, shared by shallow clones
///
/// # Zero-Copy Views
///
/// `broadcast_to`, `transpose` and `reshape` create new tensors that share
/// the same underlying storage through a modified layout. `clone()` is a
/// shallow alias: same storage, same layout, same id.
///
/// # Example
///
/// ```
/// use ndexpr::prelude::*;
///
/// let a = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[2, 2]);
/// let b = a.transpose();
/// assert_eq!(b.to_vec(), vec![1.0, 3.0, 2.0, 4.0]);
/// ```
pub struct Tensor<T: Element> {
    id: TensorId,
    storage: Storage<T>,
    layout: Layout,
}

impl<T: Element> Tensor<T> {
    /// Create a tensor from storage and layout
    pub(crate) fn from_parts(storage: Storage<T>, layout: Layout) -> Self {
        debug_assert!(
            layout.elem_count() == 0
                || layout.index(&vec![0; layout.ndim()]).is_some_and(|i| i < storage.len())
        );
        Self {
            id: TensorId::new(),
            storage,
            layout,
        }
    }

    /// Create a row-major tensor from a slice of data
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not equal the product of the `shape` dimensions.
    /// For a fallible alternative, use [`Self::try_from_slice`].
    pub fn from_slice(data: &[T], shape: &[usize]) -> Self {
        Self::try_from_slice(data, shape).expect("Tensor::from_slice failed")
    }

    /// Create a row-major tensor from a slice of data (fallible version)
    pub fn try_from_slice(data: &[T], shape: &[usize]) -> Result<Self> {
        Self::from_slice_with_order(data, shape, Order::RowMajor)
    }

    /// Create a tensor whose memory holds `data` in the given order
    ///
    /// `data` is read as the flat memory image: for `Order::ColumnMajor` the
    /// first axis varies fastest.
    pub fn from_slice_with_order(data: &[T], shape: &[usize], order: Order) -> Result<Self> {
        check_len(data.len(), shape)?;
        Ok(Self::from_parts(
            Storage::from_slice(data),
            Layout::contiguous_with_order(shape, order),
        ))
    }

    /// Create a row-major tensor that takes over the buffer of `data`
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        check_len(data.len(), shape)?;
        Ok(Self::from_parts(
            Storage::from_vec(data),
            Layout::contiguous(shape),
        ))
    }

    /// Create a row-major tensor filled with zeros
    pub fn zeros(shape: &[usize]) -> Self {
        Self::zeros_with_order(shape, Order::RowMajor)
    }

    /// Create a tensor filled with zeros, laid out in `order`
    pub fn zeros_with_order(shape: &[usize], order: Order) -> Self {
        let layout = Layout::contiguous_with_order(shape, order);
        Self::from_parts(Storage::zeroed(layout.elem_count()), layout)
    }

    /// Create a row-major tensor filled with `value`
    pub fn full(shape: &[usize], value: T) -> Self {
        let layout = Layout::contiguous(shape);
        Self::from_parts(Storage::filled(layout.elem_count(), value), layout)
    }

    /// Create a 0-dimensional tensor holding `value`
    pub fn scalar(value: T) -> Self {
        Self::from_parts(Storage::from_slice(&[value]), Layout::scalar())
    }

    // ===== Accessors =====

    /// Identity of this view
    #[inline]
    pub fn id(&self) -> TensorId {
        self.id
    }

    /// Underlying storage
    #[inline]
    pub fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    /// Layout of this view
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.layout.strides()
    }

    /// Number of dimensions
    #[inline]
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// Total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.layout.elem_count()
    }

    /// Memory order of this view
    #[inline]
    pub fn order(&self) -> Order {
        self.layout.order()
    }

    /// Dense in its own order and starting at offset 0
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    /// Check if this is a 0-dimensional tensor
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.layout.is_scalar()
    }

    /// Size along one dimension (negative indices count from the end)
    pub fn size(&self, dim: isize) -> Option<usize> {
        self.layout.dim(dim)
    }

    /// Pointer to the first element of this view
    #[inline]
    pub(crate) fn data_ptr(&self) -> *const T {
        // SAFETY: offset is within the allocation for any non-empty view
        self.storage.as_ptr().wrapping_add(self.layout.offset())
    }

    // ===== Element access =====

    /// Element at a multi-index, or None when out of bounds
    pub fn get(&self, indices: &[usize]) -> Option<T> {
        let idx = self.layout.index(indices)?;
        self.storage.as_slice().get(idx).copied()
    }

    /// The single element of a one-element tensor
    pub fn item(&self) -> Result<T> {
        if self.numel() != 1 {
            return Err(Error::shape_mismatch(&[1], self.shape()));
        }
        let zeros = vec![0; self.ndim()];
        self.get(&zeros)
            .ok_or_else(|| Error::shape_mismatch(&[1], self.shape()))
    }

    /// Walker-based traversal of the elements in row-major logical order
    pub fn iter(&self) -> TensorIter<'_, T> {
        Traverser::new(
            TensorWalker::new(self, self.ndim()),
            self.shape(),
            Order::RowMajor,
        )
    }

    /// Copy the elements into a Vec in row-major logical order
    pub fn to_vec(&self) -> Vec<T> {
        if self.layout.is_dense() && self.order() == Order::RowMajor {
            let start = self.layout.offset();
            return self.storage.as_slice()[start..start + self.numel()].to_vec();
        }
        self.iter().collect()
    }

    // ===== Views =====

    /// Broadcast to a target shape (zero-copy)
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self> {
        let layout = self
            .layout
            .broadcast_to(shape)
            .ok_or_else(|| Error::broadcast(self.shape(), shape))?;
        Ok(self.view(layout))
    }

    /// Reverse the axes (zero-copy)
    ///
    /// A dense row-major tensor becomes a dense column-major one.
    pub fn transpose(&self) -> Self {
        self.view(self.layout.transpose())
    }

    /// Swap two axes (zero-copy)
    pub fn swap_axes(&self, dim0: isize, dim1: isize) -> Result<Self> {
        let layout = self.layout.swap_axes(dim0, dim1).ok_or_else(|| {
            let dim = if self.layout.normalize_dim(dim0).is_none() {
                dim0
            } else {
                dim1
            };
            Error::InvalidDimension {
                dim,
                ndim: self.ndim(),
            }
        })?;
        Ok(self.view(layout))
    }

    /// Reshape a dense tensor (zero-copy)
    ///
    /// Elements keep their position in the tensor's memory order.
    pub fn reshape(&self, shape: &[usize]) -> Result<Self> {
        if !self.layout.is_dense() {
            return Err(Error::NotContiguous);
        }
        check_len(self.numel(), shape)?;
        let layout = self
            .layout
            .reshape(shape)
            .ok_or_else(|| Error::shape_mismatch(shape, self.shape()))?;
        Ok(self.view(layout))
    }

    fn view(&self, layout: Layout) -> Self {
        Self {
            id: TensorId::new(),
            storage: self.storage.clone(),
            layout,
        }
    }

    /// Pointer to the first element of the view, for writing in place
    ///
    /// Writes land in the shared buffer, so every handle aliasing it sees
    /// them. The id is unchanged. Views with stride-0 broadcast axes map
    /// several logical elements to one slot and are rejected.
    pub(crate) fn data_ptr_mut(&mut self) -> Result<*mut T> {
        if self.layout.has_broadcast_axes() {
            return Err(Error::invalid_argument(
                "target",
                format!("cannot write into broadcast view of shape {:?}", self.shape()),
            ));
        }
        Ok(self.storage.as_mut_ptr().wrapping_add(self.layout.offset()))
    }
}

fn check_len(len: usize, shape: &[usize]) -> Result<()> {
    let expected: usize = shape.iter().product();
    if len != expected {
        return Err(Error::ShapeMismatch {
            expected: shape.to_vec(),
            got: vec![len],
        });
    }
    Ok(())
}

impl<T: Element> Clone for Tensor<T> {
    /// Shallow alias sharing storage, layout and id
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            storage: self.storage.clone(),
            layout: self.layout.clone(),
        }
    }
}

impl<T: Element> fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.id)
            .field("shape", &self.shape())
            .field("dtype", &T::DTYPE)
            .field("order", &self.order())
            .field("contiguous", &self.is_contiguous())
            .finish()
    }
}

impl<T: Element> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor({:?}, dtype={})", self.shape(), T::DTYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice() {
        let t = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.numel(), 6);
        assert!(t.is_contiguous());
        assert_eq!(t.get(&[1, 0]), Some(4.0));
        assert_eq!(t.get(&[2, 0]), None);
    }

    #[test]
    fn test_length_mismatch() {
        let err = Tensor::try_from_slice(&[1i32, 2, 3], &[2, 2]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_column_major_logical_order() {
        // memory [1, 2, 3, 4, 5, 6] in F order is [[1, 3, 5], [2, 4, 6]]
        let t = Tensor::from_slice_with_order(&[1, 2, 3, 4, 5, 6], &[2, 3], Order::ColumnMajor)
            .unwrap();
        assert_eq!(t.get(&[0, 1]), Some(3));
        assert_eq!(t.to_vec(), vec![1, 3, 5, 2, 4, 6]);
    }

    #[test]
    fn test_clone_is_shallow_alias() {
        let a = Tensor::from_slice(&[1u8, 2, 3], &[3]);
        let b = a.clone();
        assert_eq!(a.id(), b.id());
        assert!(a.storage().ptr_eq(b.storage()));

        let c = a.transpose();
        assert_ne!(a.id(), c.id());
        assert!(a.storage().ptr_eq(c.storage()));
    }

    #[test]
    fn test_transpose() {
        let t = Tensor::from_slice(&[1, 2, 3, 4, 5, 6], &[2, 3]);
        let tt = t.transpose();
        assert_eq!(tt.shape(), &[3, 2]);
        assert_eq!(tt.order(), Order::ColumnMajor);
        assert!(tt.is_contiguous());
        assert_eq!(tt.to_vec(), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_broadcast_to() {
        let t = Tensor::from_slice(&[1, 2, 3], &[3]);
        let b = t.broadcast_to(&[2, 3]).unwrap();
        assert_eq!(b.strides(), &[0, 1]);
        assert_eq!(b.to_vec(), vec![1, 2, 3, 1, 2, 3]);
        assert!(t.broadcast_to(&[2, 4]).unwrap_err().is_value_error());
    }

    #[test]
    fn test_reshape() {
        let t = Tensor::from_slice(&[1, 2, 3, 4, 5, 6], &[2, 3]);
        let r = t.reshape(&[3, 2]).unwrap();
        assert_eq!(r.to_vec(), vec![1, 2, 3, 4, 5, 6]);
        assert!(matches!(
            t.swap_axes(0, 1).unwrap().reshape(&[6]),
            Err(Error::NotContiguous)
        ));
        assert!(t.reshape(&[4]).is_err());
    }

    #[test]
    fn test_scalar_and_full() {
        let s = Tensor::scalar(2.5f64);
        assert!(s.is_scalar());
        assert_eq!(s.item().unwrap(), 2.5);
        assert_eq!(s.to_vec(), vec![2.5]);

        let f = Tensor::full(&[2, 2], 7i64);
        assert_eq!(f.to_vec(), vec![7; 4]);
        assert!(f.item().is_err());
        assert_eq!(Tensor::<f32>::zeros(&[0, 3]).to_vec(), Vec::<f32>::new());
    }

    #[test]
    fn test_data_ptr_mut_writes_through_aliases() {
        let mut a = Tensor::from_slice(&[1, 2, 3, 4], &[2, 2]);
        let alias = a.clone();
        let id = a.id();
        let ptr = a.data_ptr_mut().unwrap();
        unsafe { *ptr = 10 };
        assert_eq!(a.id(), id);
        assert!(a.storage().ptr_eq(alias.storage()));
        assert_eq!(alias.to_vec(), vec![10, 2, 3, 4]);
    }

    #[test]
    fn test_data_ptr_mut_rejects_broadcast_view() {
        let row = Tensor::from_slice(&[1i32, 2, 3], &[3]);
        let mut grid = row.broadcast_to(&[2, 3]).unwrap();
        assert!(matches!(
            grid.data_ptr_mut(),
            Err(Error::InvalidArgument { .. })
        ));
        // a unit axis broadcast to size 1 repeats nothing
        let mut same = row.broadcast_to(&[1, 3]).unwrap();
        assert!(same.data_ptr_mut().is_ok());
    }

    #[test]
    fn test_from_vec_moves_buffer() {
        let data = vec![1u32, 2, 3, 4, 5, 6];
        let ptr = data.as_ptr();
        let t = Tensor::from_vec(data, &[3, 2]).unwrap();
        assert_eq!(t.storage().as_ptr(), ptr);
        assert_eq!(t.get(&[2, 1]), Some(6));
        assert!(Tensor::from_vec(vec![1u32, 2], &[3]).is_err());
    }
}
