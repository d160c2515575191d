//! Storage: host memory management with Arc-based sharing

use crate::dtype::Element;
use std::alloc::{Layout as AllocLayout, alloc_zeroed, dealloc, handle_alloc_error};
use std::fmt;
use std::mem::ManuallyDrop;
use std::ptr::NonNull;
use std::sync::Arc;

/// Alignment of buffers allocated by [`Storage`], wide enough for AVX-512 loads
///
/// Buffers adopted through [`Storage::from_vec`] keep the `Vec`'s element
/// alignment.
pub const STORAGE_ALIGN: usize = 64;

/// Reference-counted element buffer
///
/// Storage wraps one allocation with reference counting, enabling
/// zero-copy views (transpose, broadcast, reshape) and shallow tensor clones
/// that share the underlying buffer.
///
/// Memory is deallocated when the last reference is dropped.
pub struct Storage<T: Element> {
    inner: Arc<StorageInner<T>>,
}

struct StorageInner<T: Element> {
    ptr: NonNull<T>,
    /// Number of elements (not bytes)
    len: usize,
    origin: Origin,
}

/// Allocator that owns the buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    /// `alloc_zeroed` with [`STORAGE_ALIGN`]
    Aligned,
    /// Buffer taken over from a `Vec` with this capacity
    Vec { capacity: usize },
}

// SAFETY: the buffer is plain `Pod` data owned by the Arc; element types are
// `Send + Sync`. Mutation only happens through `&mut Tensor` (visible to its
// aliases) or through disjoint per-task ranges the evaluators hand out.
unsafe impl<T: Element> Send for StorageInner<T> {}
unsafe impl<T: Element> Sync for StorageInner<T> {}

impl<T: Element> StorageInner<T> {
    fn alloc_layout(len: usize) -> Option<AllocLayout> {
        let size = len.checked_mul(std::mem::size_of::<T>())?;
        if size == 0 {
            return None;
        }
        AllocLayout::from_size_align(size, STORAGE_ALIGN).ok()
    }

    fn zeroed(len: usize) -> Self {
        let ptr = match Self::alloc_layout(len) {
            Some(layout) => {
                // SAFETY: layout has non-zero size
                let raw = unsafe { alloc_zeroed(layout) };
                match NonNull::new(raw.cast::<T>()) {
                    Some(ptr) => ptr,
                    None => handle_alloc_error(layout),
                }
            }
            None => NonNull::dangling(),
        };
        Self {
            ptr,
            len,
            origin: Origin::Aligned,
        }
    }

    fn from_vec(data: Vec<T>) -> Self {
        let mut data = ManuallyDrop::new(data);
        let (len, capacity) = (data.len(), data.capacity());
        // SAFETY: a Vec's buffer pointer is never null
        let ptr = unsafe { NonNull::new_unchecked(data.as_mut_ptr()) };
        Self {
            ptr,
            len,
            origin: Origin::Vec { capacity },
        }
    }
}

impl<T: Element> Drop for StorageInner<T> {
    fn drop(&mut self) {
        match self.origin {
            Origin::Aligned => {
                if let Some(layout) = Self::alloc_layout(self.len) {
                    // SAFETY: allocated in `zeroed` with this exact layout
                    unsafe { dealloc(self.ptr.as_ptr().cast(), layout) };
                }
            }
            Origin::Vec { capacity } => {
                // SAFETY: ptr, len and capacity were taken from a live Vec in `from_vec`
                drop(unsafe { Vec::from_raw_parts(self.ptr.as_ptr(), self.len, capacity) });
            }
        }
    }
}

impl<T: Element> Storage<T> {
    /// Allocate `len` zero-initialised elements
    pub fn zeroed(len: usize) -> Self {
        Self {
            inner: Arc::new(StorageInner::zeroed(len)),
        }
    }

    /// Allocate and copy `data`
    pub fn from_slice(data: &[T]) -> Self {
        let inner = StorageInner::zeroed(data.len());
        // SAFETY: fresh allocation of exactly data.len() elements
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), inner.ptr.as_ptr(), data.len());
        }
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Take ownership of the buffer of `data` without copying
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            inner: Arc::new(StorageInner::from_vec(data)),
        }
    }

    /// Allocate `len` elements all equal to `value`
    pub fn filled(len: usize, value: T) -> Self {
        let mut storage = Self::zeroed(len);
        if let Some(slice) = storage.as_mut_slice() {
            slice.fill(value);
        }
        storage
    }

    /// Base pointer of the buffer
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.inner.ptr.as_ptr()
    }

    /// Mutable base pointer of the buffer
    ///
    /// Writing through it is only sound while no other thread reads the
    /// written elements; callers coordinate this.
    #[inline]
    pub(crate) fn as_mut_ptr(&self) -> *mut T {
        self.inner.ptr.as_ptr()
    }

    /// The whole buffer
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: ptr is valid (or dangling with len 0) for len elements
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.inner.len) }
    }

    /// The whole buffer, if this is the only reference to it
    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        let inner = Arc::get_mut(&mut self.inner)?;
        // SAFETY: unique access through Arc::get_mut
        Some(unsafe { std::slice::from_raw_parts_mut(inner.ptr.as_ptr(), inner.len) })
    }

    /// Get the number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len
    }

    /// Check if storage is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Get size in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.inner.len * std::mem::size_of::<T>()
    }

    /// Get the reference count
    #[inline]
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// True if both handles share one buffer
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Element> Clone for Storage<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Element> fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("ptr", &self.inner.ptr)
            .field("len", &self.inner.len)
            .field("dtype", &T::DTYPE)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
