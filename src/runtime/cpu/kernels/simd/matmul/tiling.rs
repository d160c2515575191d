//! Cache-blocked tile loop over one output rectangle
//!
//! Packing buffers are thread-local and grown on demand, so the hot path
//! allocates nothing after the first call on a thread. They are made of
//! 64-byte cache lines reinterpreted as elements, which keeps every packed
//! panel cache-line aligned.

use super::packing::{MatAxes, fill_buf_a, fill_buf_b, packed_a_len, packed_b_len};
use super::{MAX_NR, MR, MicroKernel};
use crate::dtype::Element;
use crate::runtime::cpu::kernels::matmul::BlockSizes;
use crate::walker::Walker;
use bytemuck::{Pod, Zeroable};
use std::cell::RefCell;
use std::ops::Range;

#[derive(Copy, Clone)]
#[repr(C, align(64))]
struct CacheLine([u8; 64]);

// SAFETY: plain bytes, no padding, every bit pattern valid
unsafe impl Zeroable for CacheLine {}
unsafe impl Pod for CacheLine {}

thread_local! {
    static PACK_BUFFERS: RefCell<(Vec<CacheLine>, Vec<CacheLine>)> =
        const { RefCell::new((Vec::new(), Vec::new())) };
}

fn as_elements<T: Element>(lines: &mut Vec<CacheLine>, len: usize) -> &mut [T] {
    let needed = (len * size_of::<T>()).div_ceil(size_of::<CacheLine>());
    if lines.len() < needed {
        lines.resize(needed, CacheLine::zeroed());
    }
    &mut bytemuck::cast_slice_mut::<CacheLine, T>(&mut lines[..needed])[..len]
}

/// Run `f` with aligned scratch buffers of `a_len` and `b_len` elements
///
/// Uses this thread's cached buffers; a nested call on the same thread (an
/// element function that itself multiplies matrices) gets fresh ones.
pub fn with_pack_buffers<T: Element, R>(
    a_len: usize,
    b_len: usize,
    f: impl FnOnce(&mut [T], &mut [T]) -> R,
) -> R {
    PACK_BUFFERS.with(|cell| match cell.try_borrow_mut() {
        Ok(mut bufs) => {
            let (a, b) = &mut *bufs;
            f(as_elements(a, a_len), as_elements(b, b_len))
        }
        Err(_) => {
            let (mut a, mut b) = (Vec::new(), Vec::new());
            f(as_elements(&mut a, a_len), as_elements(&mut b, b_len))
        }
    })
}

/// Add `tile[0..rows.len(), 0..cols.len()]` (row stride `ldt`) into the
/// result slots `dst[rows, cols]`
///
/// Several depth blocks contribute to the same result tile, hence the
/// accumulation.
///
/// # Safety
/// Every slot of `dst` in `rows × cols` must be valid for reads and writes
/// and not accessed concurrently.
pub unsafe fn fill_res<T, C>(
    dst: &C,
    axes: MatAxes,
    rows: Range<usize>,
    cols: Range<usize>,
    tile: &[T],
    ldt: usize,
) where
    T: Element,
    C: Walker<Item = *mut T> + Clone,
{
    let width = cols.len();
    let mut w = dst.clone();
    w.walk(axes.row, rows.start as isize);
    w.walk(axes.col, cols.start as isize);
    for tile_row in tile.chunks(ldt).take(rows.len()) {
        for &x in &tile_row[..width] {
            let slot = w.get();
            // SAFETY: slot lies in the caller-owned rectangle
            unsafe { *slot = *slot + x };
            w.step(axes.col);
        }
        w.walk(axes.col, -(width as isize));
        w.step(axes.row);
    }
}

/// Accumulate `A[rows, 0..depth] · B[0..depth, cols]` into `dst[rows, cols]`
///
/// `a`, `b` and `dst` are walkers positioned at the origin of the current
/// batch slice; `axes` names their matrix axes.
///
/// # Safety
/// Same contract as [`fill_res`] for the whole `rows × cols` rectangle, and
/// `kernel` must be runnable for `T` on this CPU.
#[allow(clippy::too_many_arguments)]
pub unsafe fn gemm_rect<T, A, B, C>(
    kernel: MicroKernel,
    blocks: &BlockSizes,
    a: &A,
    b: &B,
    dst: &C,
    axes: MatAxes,
    rows: Range<usize>,
    cols: Range<usize>,
    depth: usize,
) where
    T: Element,
    A: Walker<Item = T> + Clone,
    B: Walker<Item = T> + Clone,
    C: Walker<Item = *mut T> + Clone,
{
    let nr = kernel.nr();
    debug_assert!(nr <= MAX_NR);
    let a_len = packed_a_len(blocks.mc, blocks.kc);
    let b_len = packed_b_len(blocks.kc, blocks.nc, nr);

    with_pack_buffers::<T, _>(a_len, b_len, |buf_a, buf_b| {
        let mut tile = [T::zero(); MR * MAX_NR];

        for jc in cols.clone().step_by(blocks.nc) {
            let nc = (cols.end - jc).min(blocks.nc);

            for pc in (0..depth).step_by(blocks.kc) {
                let kc = (depth - pc).min(blocks.kc);
                fill_buf_b(b, axes, pc..pc + kc, jc..jc + nc, nr, buf_b);

                for ic in rows.clone().step_by(blocks.mc) {
                    let mc = (rows.end - ic).min(blocks.mc);
                    fill_buf_a(a, axes, ic..ic + mc, pc..pc + kc, buf_a);

                    for jr in (0..nc).step_by(nr) {
                        let width = (nc - jr).min(nr);
                        for ir in (0..mc).step_by(MR) {
                            let height = (mc - ir).min(MR);
                            let row0 = ic + ir;
                            let col0 = jc + jr;
                            // SAFETY: packed panels hold kc * MR and kc * nr
                            // elements at these offsets; the tile holds MR
                            // rows of nr
                            unsafe {
                                kernel.run(
                                    buf_a[ir * kc..].as_ptr(),
                                    buf_b[jr * kc..].as_ptr(),
                                    tile.as_mut_ptr(),
                                    kc,
                                    nr,
                                );
                                fill_res(
                                    dst,
                                    axes,
                                    row0..row0 + height,
                                    col0..col0 + width,
                                    &tile,
                                    nr,
                                );
                            }
                        }
                    }
                }
            }
        }
    });
}
