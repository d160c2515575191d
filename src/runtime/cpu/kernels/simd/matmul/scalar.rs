//! Portable micro-kernel

use super::MR;
use crate::dtype::Element;

/// Compute `c[0..MR, 0..NR] = a · b` over packed panels for any element
///
/// `a` is the MR-row panel (MR consecutive elements per depth step) and `b`
/// the NR-column panel (NR consecutive elements per depth step), both as
/// written by [`super::fill_buf_a`] and [`super::fill_buf_b`]. The products
/// are summed in depth order, so for integer-valued data the result is exact
/// and identical to the FMA kernels.
///
/// # Safety
/// `a` holds `kc * MR`, `b` holds `kc * NR` elements, and `c` is writable
/// for `MR` rows of `ldc` elements.
#[inline]
pub unsafe fn micro_kernel_generic<T: Element, const NR: usize>(
    a: *const T,
    b: *const T,
    c: *mut T,
    kc: usize,
    ldc: usize,
) {
    let mut acc = [[T::zero(); NR]; MR];
    // SAFETY: panel extents are guaranteed by the caller
    let (a, b) = unsafe {
        (
            std::slice::from_raw_parts(a, kc * MR),
            std::slice::from_raw_parts(b, kc * NR),
        )
    };

    for (a_col, b_row) in a.chunks_exact(MR).zip(b.chunks_exact(NR)) {
        for (row, &av) in acc.iter_mut().zip(a_col) {
            for (out, &bv) in row.iter_mut().zip(b_row) {
                *out = *out + av * bv;
            }
        }
    }

    for (i, row) in acc.iter().enumerate() {
        // SAFETY: row i of the tile is writable for NR <= ldc elements
        let dst = unsafe { std::slice::from_raw_parts_mut(c.add(i * ldc), NR) };
        dst.copy_from_slice(row);
    }
}
