//! Matrix multiplication entry points
//!
//! Operands follow NumPy `matmul` rules: the trailing two axes are the
//! matrices, every leading axis is a broadcast batch axis, and a 1-D operand
//! is promoted to a row (lhs) or column (rhs) vector whose unit axis is
//! removed from the result again.

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::expr::Operand;
use crate::runtime::ExecutionPolicy;
use crate::runtime::cpu::kernels::matmul::{GemmPlan, matmul_1d, matmul_nd};
use crate::tensor::{Shape, Tensor, broadcast_shapes};

/// Shape of `lhs · rhs`
///
/// # Errors
/// - `Error::InvalidArgument` if either operand is 0-dimensional
/// - `Error::ShapeMismatch` if the inner dimensions differ
/// - `Error::BroadcastError` if the batch dimensions do not broadcast
pub fn matmul_output_shape(lhs: &[usize], rhs: &[usize]) -> Result<Shape> {
    if lhs.is_empty() || rhs.is_empty() {
        return Err(Error::invalid_argument(
            "operands",
            "matmul doesn't support scalar arguments",
        ));
    }

    let lhs_k = lhs[lhs.len() - 1];
    let rhs_k = if rhs.len() == 1 { rhs[0] } else { rhs[rhs.len() - 2] };
    if lhs_k != rhs_k {
        return Err(Error::shape_mismatch(&[lhs_k], &[rhs_k]));
    }

    let lhs_batch = &lhs[..lhs.len().saturating_sub(2)];
    let rhs_batch = &rhs[..rhs.len().saturating_sub(2)];
    let mut shape =
        broadcast_shapes(lhs_batch, rhs_batch).ok_or_else(|| Error::broadcast(lhs, rhs))?;
    if lhs.len() >= 2 {
        shape.push(lhs[lhs.len() - 2]);
    }
    if rhs.len() >= 2 {
        shape.push(rhs[rhs.len() - 1]);
    }
    Ok(shape)
}

/// `lhs · rhs` on the calling thread
///
/// Both operands may be tensors in any layout or lazy expressions; they are
/// read through walkers while packing, never materialised.
///
/// ```
/// use ndexpr::prelude::*;
///
/// let v = Tensor::from_slice(&[1i32, 2, 3], &[3]);
/// let m = Tensor::from_slice(&[1i32, 0, 0, 1, 1, 1], &[3, 2]);
/// assert_eq!(matmul(&v, &m).unwrap().to_vec(), vec![4, 5]);
/// ```
///
/// # Errors
/// See [`matmul_output_shape`].
pub fn matmul<T, L, R>(lhs: &L, rhs: &R) -> Result<Tensor<T>>
where
    T: Element,
    L: Operand<Item = T> + Sync,
    R: Operand<Item = T> + Sync,
{
    matmul_with(&ExecutionPolicy::Sequential, lhs, rhs)
}

/// `lhs · rhs` under `policy`
///
/// With a parallel policy every batch matrix is split into a grid of at most
/// `policy.max_tasks()` output rectangles. Products with a 1-D operand always
/// run on the calling thread.
pub fn matmul_with<T, L, R>(policy: &ExecutionPolicy<'_>, lhs: &L, rhs: &R) -> Result<Tensor<T>>
where
    T: Element,
    L: Operand<Item = T> + Sync,
    R: Operand<Item = T> + Sync,
{
    matmul_with_plan(&GemmPlan::for_element::<T>(), policy, lhs, rhs)
}

/// `lhs · rhs` with an explicit micro-kernel and block sizes
pub fn matmul_with_plan<T, L, R>(
    plan: &GemmPlan,
    policy: &ExecutionPolicy<'_>,
    lhs: &L,
    rhs: &R,
) -> Result<Tensor<T>>
where
    T: Element,
    L: Operand<Item = T> + Sync,
    R: Operand<Item = T> + Sync,
{
    let shape = matmul_output_shape(lhs.shape(), rhs.shape())?;
    if lhs.ndim() == 1 || rhs.ndim() == 1 {
        let data = matmul_1d(lhs, rhs, shape.size());
        return Tensor::from_vec(data, &shape);
    }

    let mut out = Tensor::zeros(&shape);
    matmul_nd(plan, policy, lhs, rhs, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::kernels::matmul::CacheConfig;
    use crate::runtime::cpu::kernels::simd::matmul::MicroKernel;
    use crate::tensor::Order;
    use rstest::rstest;

    fn naive(a: &[i64], b: &[i64], m: usize, k: usize, n: usize) -> Vec<i64> {
        let mut c = vec![0; m * n];
        for i in 0..m {
            for j in 0..n {
                c[i * n + j] = (0..k).map(|p| a[i * k + p] * b[p * n + j]).sum();
            }
        }
        c
    }

    #[rstest]
    #[case(&[2, 3], &[3, 4], &[2, 4])]
    #[case(&[3], &[3, 4], &[4])]
    #[case(&[2, 3], &[3], &[2])]
    #[case(&[3], &[3], &[])]
    #[case(&[5, 1, 2, 3], &[4, 3, 6], &[5, 4, 2, 6])]
    #[case(&[3], &[7, 3, 2], &[7, 2])]
    fn test_output_shape(#[case] lhs: &[usize], #[case] rhs: &[usize], #[case] expected: &[usize]) {
        assert_eq!(matmul_output_shape(lhs, rhs).unwrap().as_slice(), expected);
    }

    #[test]
    fn test_shape_errors() {
        let err = matmul_output_shape(&[2, 3], &[4, 5]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        let err = matmul_output_shape(&[], &[3]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(err.to_string().contains("scalar arguments"));
        let err = matmul_output_shape(&[2, 2, 3], &[3, 3, 4]).unwrap_err();
        assert!(matches!(err, Error::BroadcastError { .. }));
    }

    #[test]
    fn test_integer_product_is_exact() {
        let (m, k, n) = (23, 31, 19);
        let a: Vec<i64> = (0..(m * k) as i64).map(|x| (x * 7) % 13 - 6).collect();
        let b: Vec<i64> = (0..(k * n) as i64).map(|x| (x * 5) % 11 - 5).collect();
        let out = matmul(&Tensor::from_slice(&a, &[m, k]), &Tensor::from_slice(&b, &[k, n])).unwrap();
        assert_eq!(out.shape(), &[m, n]);
        assert_eq!(out.to_vec(), naive(&a, &b, m, k, n));
    }

    #[test]
    fn test_transposed_and_lazy_operands() {
        let a = Tensor::from_slice(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]);
        let at = a.transpose();
        assert_eq!(at.order(), Order::ColumnMajor);
        let doubled = (&a * 2.0f64).unwrap();
        // [2, 3] · [3, 2]
        let out = matmul(&at, &doubled).unwrap();
        assert_eq!(out.to_vec(), vec![70.0, 88.0, 88.0, 112.0]);
    }

    #[test]
    fn test_small_blocks_match_default_plan() {
        let (m, k, n) = (14, 10, 9);
        let a: Vec<i64> = (0..(m * k) as i64).map(|x| x % 9 - 4).collect();
        let b: Vec<i64> = (0..(k * n) as i64).map(|x| x % 5 - 2).collect();
        let (a, b) = (Tensor::from_slice(&a, &[m, k]), Tensor::from_slice(&b, &[k, n]));
        let cache = CacheConfig { l1: 256, l2: 512, l3: 512 };
        let plan = GemmPlan::new::<i64>(MicroKernel::Generic, &cache);
        let small = matmul_with_plan(&plan, &ExecutionPolicy::Sequential, &a, &b).unwrap();
        assert_eq!(small.to_vec(), matmul(&a, &b).unwrap().to_vec());
    }

    #[test]
    fn test_zero_depth_gives_zeros() {
        let a = Tensor::<f32>::zeros(&[2, 0]);
        let b = Tensor::<f32>::zeros(&[0, 3]);
        let out = matmul(&a, &b).unwrap();
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.to_vec(), vec![0.0; 6]);
    }

    #[test]
    fn test_inner_product_is_zero_dim() {
        let v = Tensor::from_slice(&[1u32, 2, 3], &[3]);
        let out = matmul(&v, &v).unwrap();
        assert_eq!(out.ndim(), 0);
        assert_eq!(out.item().unwrap(), 14);
    }
}
