//! Packing of walker-addressed panels into contiguous micro-panel buffers
//!
//! Both packers read the source only through a [`Walker`], so strided,
//! transposed, broadcast and lazily computed operands are packed the same
//! way. Edge panels are zero-padded to full `MR`/`NR` width.

use super::MR;
use crate::dtype::Element;
use crate::walker::Walker;
use std::ops::Range;

/// Walker axes holding the two matrix dimensions
///
/// Operands are walked with the batch dimensionality of the output, so the
/// matrix axes are the last two for lhs, rhs and result alike.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MatAxes {
    /// Axis of matrix rows
    pub row: usize,
    /// Axis of matrix columns
    pub col: usize,
}

impl MatAxes {
    /// The last two of `ndim` axes
    pub fn trailing(ndim: usize) -> Self {
        debug_assert!(ndim >= 2);
        Self {
            row: ndim - 2,
            col: ndim - 1,
        }
    }
}

/// Elements needed to pack `rows × depth` of the left operand
#[inline]
pub fn packed_a_len(rows: usize, depth: usize) -> usize {
    rows.div_ceil(MR) * MR * depth
}

/// Elements needed to pack `depth × cols` of the right operand
#[inline]
pub fn packed_b_len(depth: usize, cols: usize, nr: usize) -> usize {
    cols.div_ceil(nr) * nr * depth
}

/// Pack `A[rows, depth]` into MR-row micro-panels
///
/// Layout: for each MR-row panel, for each depth step, MR consecutive
/// elements `a[i..i+MR, p]`.
pub fn fill_buf_a<T, W>(src: &W, axes: MatAxes, rows: Range<usize>, depth: Range<usize>, buf: &mut [T])
where
    T: Element,
    W: Walker<Item = T> + Clone,
{
    let mc = rows.len();
    let kc = depth.len();
    debug_assert!(buf.len() >= packed_a_len(mc, kc));

    let mut w = src.clone();
    w.walk(axes.row, rows.start as isize);
    w.walk(axes.col, depth.start as isize);

    let mut panels = buf.chunks_exact_mut(MR * kc.max(1));
    for ir in (0..mc).step_by(MR) {
        let mr = (mc - ir).min(MR);
        let Some(panel) = panels.next() else { break };
        for slot in panel.chunks_exact_mut(MR).take(kc) {
            for x in &mut slot[..mr] {
                *x = w.get();
                w.step(axes.row);
            }
            slot[mr..].fill(T::zero());
            w.walk(axes.row, -(mr as isize));
            w.step(axes.col);
        }
        w.walk(axes.col, -(kc as isize));
        w.walk(axes.row, mr as isize);
    }
}

/// Pack `B[depth, cols]` into `nr`-column micro-panels
///
/// Layout: for each `nr`-column panel, for each depth step, `nr` consecutive
/// elements `b[p, j..j+nr]`.
pub fn fill_buf_b<T, W>(
    src: &W,
    axes: MatAxes,
    depth: Range<usize>,
    cols: Range<usize>,
    nr: usize,
    buf: &mut [T],
) where
    T: Element,
    W: Walker<Item = T> + Clone,
{
    let kc = depth.len();
    let nc = cols.len();
    debug_assert!(buf.len() >= packed_b_len(kc, nc, nr));

    let mut w = src.clone();
    w.walk(axes.row, depth.start as isize);
    w.walk(axes.col, cols.start as isize);

    let mut panels = buf.chunks_exact_mut(nr * kc.max(1));
    for jr in (0..nc).step_by(nr) {
        let width = (nc - jr).min(nr);
        let Some(panel) = panels.next() else { break };
        for slot in panel.chunks_exact_mut(nr).take(kc) {
            for x in &mut slot[..width] {
                *x = w.get();
                w.step(axes.col);
            }
            slot[width..].fill(T::zero());
            w.walk(axes.col, -(width as isize));
            w.step(axes.row);
        }
        w.walk(axes.row, -(kc as isize));
        w.walk(axes.col, width as isize);
    }
}
