//! Batched matmul drivers
//!
//! [`matmul_nd`] runs the cache-blocked kernel once per batch index of the
//! broadcast leading dimensions. With a parallel policy each batch index is
//! split into a grid of output rectangles, one task per rectangle, and the
//! next batch index starts only after all of them finished.
//!
//! [`matmul_1d`] covers products with a vector operand, as a plain walker
//! dot-product loop.
//!
//! Shapes are validated by the callers in [`crate::ops::matmul`]; these
//! drivers assume compatible operands.

mod blocking;
mod partition;

pub use blocking::{BlockSizes, CacheConfig};
pub use partition::{grid_cells, partition_grid};

use super::simd::matmul::{MatAxes, MicroKernel, gemm_rect};
use crate::dtype::Element;
use crate::error::Result;
use crate::expr::Operand;
use crate::runtime::ExecutionPolicy;
use crate::tensor::{Shape, Tensor};
use crate::walker::{RangeTraverser, TensorWalkerMut, Walker};

/// Micro-kernel and block sizes of one multiplication
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GemmPlan {
    /// Micro-kernel computing the MR×NR tiles
    pub kernel: MicroKernel,
    /// Cache block sizes
    pub blocks: BlockSizes,
}

impl GemmPlan {
    /// Best kernel for `T` on this CPU with the default cache sizes
    pub fn for_element<T: Element>() -> Self {
        Self::new::<T>(MicroKernel::select::<T>(), &CacheConfig::default())
    }

    /// Plan for an explicit kernel and cache configuration
    pub fn new<T: Element>(kernel: MicroKernel, cache: &CacheConfig) -> Self {
        Self {
            kernel,
            blocks: BlockSizes::for_element::<T>(cache, kernel.nr()),
        }
    }
}

/// `out[.., m, n] += lhs[.., m, k] · rhs[.., k, n]`
///
/// `lhs` and `rhs` have at least two dimensions and batch shapes that
/// broadcast to `out`'s leading dimensions; `out` is zero-filled and
/// row-major.
///
/// # Errors
/// `Error::InvalidArgument` if `out` is a broadcast view.
pub fn matmul_nd<T, L, R>(
    plan: &GemmPlan,
    policy: &ExecutionPolicy<'_>,
    lhs: &L,
    rhs: &R,
    out: &mut Tensor<T>,
) -> Result<()>
where
    T: Element,
    L: Operand<Item = T> + Sync,
    R: Operand<Item = T> + Sync,
{
    let ndim = out.ndim();
    let axes = MatAxes::trailing(ndim);
    let (m, n) = (out.shape()[axes.row], out.shape()[axes.col]);
    let k = lhs.shape()[lhs.ndim() - 1];
    let batch_shape = Shape::from(&out.shape()[..axes.row]);
    let grid = partition_grid(m, n, policy.max_tasks());

    log::debug!(
        "matmul {:?} x {:?}: kernel {}, blocks {:?}, grid {:?}",
        lhs.shape(),
        rhs.shape(),
        plan.kernel,
        plan.blocks,
        grid
    );

    let out_ptr = out.data_ptr_mut()?;
    let layout = out.layout().clone();
    let mut batches = RangeTraverser::new(&batch_shape);
    if batches.remaining() == 0 || m == 0 || n == 0 {
        return Ok(());
    }

    match policy.pool() {
        Some(pool) if grid.0 * grid.1 > 1 => {
            let out_addr = out_ptr as usize;
            let plan = *plan;
            loop {
                let index = batches.index().to_vec();
                log::trace!("matmul batch {:?}: {} tasks", index, grid.0 * grid.1);
                pool.scope(|s| {
                    for (rows, cols) in grid_cells(m, n, grid) {
                        let (index, layout) = (&index, &layout);
                        s.spawn(move || {
                            let mut a = lhs.create_walker(ndim);
                            let mut b = rhs.create_walker(ndim);
                            // SAFETY: `out` outlives the scope and the tasks
                            // of one batch write disjoint rectangles
                            let mut c = unsafe {
                                TensorWalkerMut::from_raw(out_addr as *mut T, layout, ndim)
                            };
                            for (axis, &i) in index.iter().enumerate() {
                                a.walk(axis, i as isize);
                                b.walk(axis, i as isize);
                                c.walk(axis, i as isize);
                            }
                            // SAFETY: this task owns rows × cols of the batch slice
                            unsafe {
                                gemm_rect(plan.kernel, &plan.blocks, &a, &b, &c, axes, rows, cols, k)
                            };
                        });
                    }
                });
                if !batches.advance(|_, _| {}) {
                    break;
                }
            }
        }
        _ => {
            let mut a = lhs.create_walker(ndim);
            let mut b = rhs.create_walker(ndim);
            // SAFETY: `out` is exclusively borrowed for the whole call
            let mut c = unsafe { TensorWalkerMut::from_raw(out_ptr, &layout, ndim) };
            loop {
                // SAFETY: the whole batch slice is ours
                unsafe { gemm_rect(plan.kernel, &plan.blocks, &a, &b, &c, axes, 0..m, 0..n, k) };
                let moved = batches.advance(|axis, steps| {
                    a.walk(axis, steps);
                    b.walk(axis, steps);
                    c.walk(axis, steps);
                });
                if !moved {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Product with at least one 1-D operand, row-major elements of the result
///
/// A 1-D `lhs` acts as a `1 × k` row and a 1-D `rhs` as a `k × 1` column;
/// the unit axes they introduce are not part of the result, which has
/// `out_size` elements.
pub fn matmul_1d<T, L, R>(lhs: &L, rhs: &R, out_size: usize) -> Vec<T>
where
    T: Element,
    L: Operand<Item = T>,
    R: Operand<Item = T>,
{
    let lhs_ndim = lhs.ndim().max(2);
    let rhs_ndim = rhs.ndim().max(2);
    let ndim = lhs_ndim.max(rhs_ndim);
    let k = lhs.shape()[lhs.ndim() - 1];

    // walker axes: lhs is always right-aligned as [.., m, k]; a vector rhs
    // is aligned one axis short so that its only axis lands on k
    let a_row = ndim - 2;
    let a_k = ndim - 1;
    let rhs_is_vector = rhs.ndim() == 1;
    let (b_dim, b_k, b_col) = if rhs_is_vector {
        (ndim - 1, ndim - 2, None)
    } else {
        (ndim, ndim - 2, Some(ndim - 1))
    };

    let mut promoted = Shape::with_capacity(ndim);
    for axis in 0..ndim - 2 {
        let size = |shape: &[usize], dims: usize| {
            (axis + shape.len()).checked_sub(dims).map_or(1, |i| shape[i])
        };
        promoted.push(size(lhs.shape(), ndim).max(size(rhs.shape(), b_dim)));
    }
    let m = if lhs.ndim() == 1 { 1 } else { lhs.shape()[lhs.ndim() - 2] };
    let n = if rhs_is_vector { 1 } else { rhs.shape()[rhs.ndim() - 1] };
    promoted.push(m);
    promoted.push(n);
    debug_assert_eq!(promoted.size(), out_size);

    log::debug!("matmul {:?} x {:?}: vector dot loop", lhs.shape(), rhs.shape());

    let mut out = Vec::with_capacity(out_size);
    if out_size == 0 {
        return out;
    }

    let mut a = lhs.create_walker(ndim);
    let mut b = rhs.create_walker(b_dim);
    let mut positions = RangeTraverser::new(&promoted);
    loop {
        let mut acc = T::zero();
        for _ in 0..k {
            acc = acc + a.get() * b.get();
            a.step(a_k);
            b.step(b_k);
        }
        a.walk(a_k, -(k as isize));
        b.walk(b_k, -(k as isize));
        out.push(acc);

        let moved = positions.advance(|axis, steps| {
            if axis < ndim - 2 {
                a.walk(axis, steps);
                b.walk(axis, steps);
            } else if axis == a_row {
                a.walk(a_row, steps);
            } else if let Some(col) = b_col {
                b.walk(col, steps);
            }
        });
        if !moved {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::WorkerPool;

    #[test]
    fn test_plan_uses_kernel_width() {
        let plan = GemmPlan::new::<f32>(MicroKernel::Generic, &CacheConfig::default());
        assert_eq!(plan.blocks.nc % MicroKernel::Generic.nr(), 0);
        assert_eq!(GemmPlan::for_element::<u16>().kernel, MicroKernel::Generic);
    }

    #[test]
    fn test_batched_broadcast() {
        // lhs [2, 2, 3] against a shared rhs [3, 2]
        let lhs = Tensor::from_slice(&[1i32, 2, 3, 4, 5, 6, 1, 0, 0, 0, 1, 0], &[2, 2, 3]);
        let rhs = Tensor::from_slice(&[1i32, 0, 0, 1, 1, 1], &[3, 2]);
        let mut out = Tensor::<i32>::zeros(&[2, 2, 2]);
        let plan = GemmPlan::for_element::<i32>();
        matmul_nd(&plan, &ExecutionPolicy::Sequential, &lhs, &rhs, &mut out).unwrap();
        assert_eq!(out.to_vec(), vec![4, 5, 10, 11, 1, 0, 0, 1]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (b, m, k, n) = (3, 17, 9, 13);
        let lhs_data: Vec<i64> = (0..(b * m * k) as i64).map(|x| x % 11 - 5).collect();
        let rhs_data: Vec<i64> = (0..(k * n) as i64).map(|x| x % 7 - 3).collect();
        let lhs = Tensor::from_slice(&lhs_data, &[b, m, k]);
        let rhs = Tensor::from_slice(&rhs_data, &[1, k, n]);
        let plan = GemmPlan::for_element::<i64>();

        let mut seq = Tensor::<i64>::zeros(&[b, m, n]);
        matmul_nd(&plan, &ExecutionPolicy::Sequential, &lhs, &rhs, &mut seq).unwrap();

        let pool = WorkerPool::with_workers(4).unwrap();
        let mut par = Tensor::<i64>::zeros(&[b, m, n]);
        matmul_nd(&plan, &ExecutionPolicy::Parallel(&pool), &lhs, &rhs, &mut par).unwrap();

        assert_eq!(seq.to_vec(), par.to_vec());
    }

    #[test]
    fn test_vector_products() {
        let v = Tensor::from_slice(&[1i32, 2, 3], &[3]);
        let m = Tensor::from_slice(&[1i32, 0, 0, 1, 1, 1], &[3, 2]);
        assert_eq!(matmul_1d(&v, &m, 2), vec![4, 5]);

        let ones = Tensor::from_slice(&[1i32, 1], &[2]);
        assert_eq!(matmul_1d(&m, &ones, 3), vec![1, 1, 2]);

        assert_eq!(matmul_1d(&v, &v, 1), vec![14]);
    }

    #[test]
    fn test_vector_against_batch() {
        // [2] · [2, 2, 3] -> [2, 3]
        let v = Tensor::from_slice(&[1.0f64, -1.0], &[2]);
        let batch = Tensor::from_slice(
            &[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
            &[2, 2, 3],
        );
        assert_eq!(matmul_1d(&v, &batch, 6), vec![-3.0, -3.0, -3.0, -1.0, 1.0, -1.0]);

        // [2, 2, 3] · [3] -> [2, 2]
        let w = Tensor::from_slice(&[1.0f64, 1.0, 1.0], &[3]);
        assert_eq!(matmul_1d(&batch, &w, 4), vec![6.0, 15.0, 1.0, 2.0]);
    }
}
