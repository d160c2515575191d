//! Walkers and indexers over strided tensor memory

use super::{Indexer, Walker};
use crate::dtype::Element;
use crate::error::Result;
use crate::tensor::{Layout, Shape, Strides, Tensor, broadcast_strides, padded_shape};
use smallvec::SmallVec;
use std::marker::PhantomData;

/// Per-axis position bookkeeping shared by the tensor walkers
#[derive(Clone, Debug)]
struct Cursor {
    /// Own shape, left-padded with 1s to the walker's dimensionality
    shape: Shape,
    /// Broadcast strides aligned with `shape`
    strides: Strides,
    index: SmallVec<[isize; 4]>,
    offset: isize,
}

impl Cursor {
    fn new(layout: &Layout, max_dim: usize) -> Self {
        Self {
            shape: padded_shape(layout.shape(), max_dim),
            strides: broadcast_strides(layout, max_dim),
            index: std::iter::repeat_n(0, max_dim).collect(),
            offset: 0,
        }
    }

    #[inline(always)]
    fn walk(&mut self, axis: usize, steps: isize) {
        self.index[axis] += steps;
        self.offset += steps * self.strides[axis];
    }

    #[inline]
    fn reset(&mut self, axis: usize) {
        self.offset -= self.index[axis] * self.strides[axis];
        self.index[axis] = 0;
    }

    #[inline]
    fn reset_back(&mut self, axis: usize) {
        let end = self.shape[axis] as isize;
        self.offset += (end - self.index[axis]) * self.strides[axis];
        self.index[axis] = end;
    }

    fn reset_back_all(&mut self) {
        for axis in 0..self.index.len() {
            self.reset_back(axis);
        }
    }

    fn update_offset(&mut self) {
        self.offset = self
            .index
            .iter()
            .zip(self.strides.iter())
            .map(|(&i, &s)| i * s)
            .sum();
    }
}

/// Read-only walker over a tensor view
#[derive(Clone, Debug)]
pub struct TensorWalker<'a, T> {
    ptr: *const T,
    cursor: Cursor,
    _marker: PhantomData<&'a T>,
}

impl<'a, T: Element> TensorWalker<'a, T> {
    /// Walker over `tensor` with `max_dim` axes
    ///
    /// The tensor's axes are right-aligned; `max_dim` must be at least the
    /// tensor's own dimensionality.
    pub fn new(tensor: &'a Tensor<T>, max_dim: usize) -> Self {
        debug_assert!(tensor.ndim() <= max_dim);
        Self {
            ptr: tensor.data_ptr(),
            cursor: Cursor::new(tensor.layout(), max_dim),
            _marker: PhantomData,
        }
    }
}

impl<T: Element> Walker for TensorWalker<'_, T> {
    type Item = T;

    #[inline(always)]
    fn walk(&mut self, axis: usize, steps: isize) {
        self.cursor.walk(axis, steps);
    }

    #[inline]
    fn reset(&mut self, axis: usize) {
        self.cursor.reset(axis);
    }

    #[inline]
    fn reset_back(&mut self, axis: usize) {
        self.cursor.reset_back(axis);
    }

    fn reset_back_all(&mut self) {
        self.cursor.reset_back_all();
    }

    fn update_offset(&mut self) {
        self.cursor.update_offset();
    }

    #[inline(always)]
    fn get(&self) -> T {
        // SAFETY: the driver only dereferences in-bounds positions, and the
        // borrow of the tensor keeps the storage alive
        unsafe { *self.ptr.offset(self.cursor.offset) }
    }
}

/// Writable walker handing out element slots
///
/// Dereferencing yields a raw slot pointer; writing through it is sound
/// because the walker was built from exclusive access to the storage (or,
/// for [`TensorWalkerMut::from_raw`], from a range the caller owns).
#[derive(Clone, Debug)]
pub struct TensorWalkerMut<'a, T> {
    ptr: *mut T,
    cursor: Cursor,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T: Element> TensorWalkerMut<'a, T> {
    /// Walker over `tensor` with `max_dim` axes
    ///
    /// Writes reach every handle sharing the tensor's storage.
    ///
    /// # Errors
    /// `Error::InvalidArgument` if `tensor` has broadcast axes, since one
    /// slot would be written through several positions.
    pub fn new(tensor: &'a mut Tensor<T>, max_dim: usize) -> Result<Self> {
        debug_assert!(tensor.ndim() <= max_dim);
        let ptr = tensor.data_ptr_mut()?;
        Ok(Self {
            ptr,
            cursor: Cursor::new(tensor.layout(), max_dim),
            _marker: PhantomData,
        })
    }

    /// Walker over raw memory described by `layout`
    ///
    /// # Safety
    /// `ptr` must address the first element of `layout` for the lifetime
    /// `'a`, and no other code may access the slots this walker writes while
    /// it is alive.
    pub unsafe fn from_raw(ptr: *mut T, layout: &Layout, max_dim: usize) -> Self {
        Self {
            ptr,
            cursor: Cursor::new(layout, max_dim),
            _marker: PhantomData,
        }
    }
}

impl<T: Element> Walker for TensorWalkerMut<'_, T> {
    type Item = *mut T;

    #[inline(always)]
    fn walk(&mut self, axis: usize, steps: isize) {
        self.cursor.walk(axis, steps);
    }

    #[inline]
    fn reset(&mut self, axis: usize) {
        self.cursor.reset(axis);
    }

    #[inline]
    fn reset_back(&mut self, axis: usize) {
        self.cursor.reset_back(axis);
    }

    fn reset_back_all(&mut self) {
        self.cursor.reset_back_all();
    }

    fn update_offset(&mut self) {
        self.cursor.update_offset();
    }

    #[inline(always)]
    fn get(&self) -> *mut T {
        self.ptr.wrapping_offset(self.cursor.offset)
    }
}

/// Flat indexer over a dense tensor view
#[derive(Clone, Copy, Debug)]
pub struct TensorIndexer<'a, T> {
    ptr: *const T,
    _marker: PhantomData<&'a T>,
}

impl<'a, T: Element> TensorIndexer<'a, T> {
    /// Indexer over `tensor`, which must be dense in its own order
    pub fn new(tensor: &'a Tensor<T>) -> Self {
        debug_assert!(tensor.layout().is_dense());
        Self {
            ptr: tensor.data_ptr(),
            _marker: PhantomData,
        }
    }
}

impl<T: Element> Indexer for TensorIndexer<'_, T> {
    type Item = T;

    #[inline(always)]
    fn at(&self, index: usize) -> T {
        // SAFETY: dense layout, index < numel
        unsafe { *self.ptr.add(index) }
    }
}

/// Flat indexer handing out element slots of a dense tensor
#[derive(Clone, Copy, Debug)]
pub struct TensorIndexerMut<'a, T> {
    ptr: *mut T,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T: Element> TensorIndexerMut<'a, T> {
    /// Indexer over raw memory of a dense layout
    ///
    /// # Safety
    /// `ptr` must address the first element of a dense run valid for `'a`,
    /// with no concurrent access to the slots it hands out.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }
}

impl<T: Element> Indexer for TensorIndexerMut<'_, T> {
    type Item = *mut T;

    #[inline(always)]
    fn at(&self, index: usize) -> *mut T {
        self.ptr.wrapping_add(index)
    }
}
