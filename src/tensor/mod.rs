//! Tensor types and shape machinery
//!
//! This module provides the core `Tensor` type, an n-dimensional array in
//! host memory, together with the layout, broadcast and descriptor types the
//! expression engine is built on.

mod broadcast;
mod core;
mod descriptor;
mod id;
mod layout;
mod shape;
mod storage;
mod strides;

pub use broadcast::{
    broadcast_shapes, broadcast_strides, is_broadcastable, make_broadcast_shape, padded_shape,
};
pub use core::Tensor;
pub use descriptor::Descriptor;
pub use id::TensorId;
pub use layout::{Layout, Order};
pub use shape::{Shape, contiguous_strides};
pub use storage::{STORAGE_ALIGN, Storage};
pub use strides::Strides;
