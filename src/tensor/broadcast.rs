//! Broadcast shape computation
//!
//! Shapes are right-aligned; on every axis the result takes the unique
//! non-1 size among the inputs, or 1 if all inputs are 1 there. Axes a shape
//! does not have count as 1.

use super::Layout;
use super::shape::Shape;
use super::strides::Strides;
use crate::error::{Error, Result};

/// Broadcast shape of any number of shapes
///
/// # Errors
/// `Error::BroadcastError` naming the first two shapes that disagree on a
/// non-1 size.
///
/// # Example
/// ```
/// use ndexpr::tensor::make_broadcast_shape;
/// let shape = make_broadcast_shape(&[&[2, 1, 4], &[3, 1]]).unwrap();
/// assert_eq!(shape.as_slice(), &[2, 3, 4]);
/// ```
pub fn make_broadcast_shape(shapes: &[&[usize]]) -> Result<Shape> {
    let ndim = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut result: Shape = std::iter::repeat_n(1usize, ndim).collect();
    // Which input fixed each axis, for the error message
    let mut owner: smallvec::SmallVec<[usize; 4]> = std::iter::repeat_n(usize::MAX, ndim).collect();

    for (which, shape) in shapes.iter().enumerate() {
        let pad = ndim - shape.len();
        for (axis, &dim) in shape.iter().enumerate() {
            let slot = &mut result[pad + axis];
            if dim == 1 || dim == *slot {
                continue;
            }
            if *slot == 1 {
                *slot = dim;
                owner[pad + axis] = which;
            } else {
                return Err(Error::broadcast(shapes[owner[pad + axis]], shape));
            }
        }
    }

    Ok(result)
}

/// Compute the broadcast shape of two shapes
///
/// Returns None if the shapes are incompatible.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Option<Shape> {
    make_broadcast_shape(&[a, b]).ok()
}

/// True if `src` broadcasts into exactly `dst`
pub fn is_broadcastable(src: &[usize], dst: &[usize]) -> bool {
    if src.len() > dst.len() {
        return false;
    }
    let pad = dst.len() - src.len();
    src.iter()
        .zip(&dst[pad..])
        .all(|(&s, &d)| s == d || s == 1)
}

/// Shape of `shape` left-padded with 1s to `max_dim` axes
pub fn padded_shape(shape: &[usize], max_dim: usize) -> Shape {
    debug_assert!(shape.len() <= max_dim);
    let pad = max_dim - shape.len();
    std::iter::repeat_n(1usize, pad)
        .chain(shape.iter().copied())
        .collect()
}

/// Walker strides of `layout` aligned to `max_dim` axes
///
/// Missing leading axes and axes of size 1 get stride 0, so walking along
/// them never moves the element offset.
pub fn broadcast_strides(layout: &Layout, max_dim: usize) -> Strides {
    debug_assert!(layout.ndim() <= max_dim);
    let pad = max_dim - layout.ndim();
    let own = layout
        .shape()
        .iter()
        .zip(layout.strides())
        .map(|(&dim, &st)| if dim == 1 { 0 } else { st });
    std::iter::repeat_n(0isize, pad).chain(own).collect()
}
