//! Integration tests for matrix multiplication
//!
//! Tests verify:
//! - 2-D products against a naive reference
//! - Generic and SIMD micro-kernels agree
//! - 1-D operand promotion and removal of the unit axis
//! - Batched products with broadcast batch axes
//! - Shape errors

mod common;

use common::{assert_allclose_f64, naive_matmul_f64, naive_matmul_i64, pattern_f64, pattern_i64};
use ndexpr::ops::matmul_with_plan;
use ndexpr::prelude::*;
use ndexpr::runtime::cpu::kernels::matmul::{CacheConfig, GemmPlan};
use ndexpr::runtime::cpu::kernels::simd::matmul::MicroKernel;
use rstest::rstest;

// ============================================================================
// 2-D products
// ============================================================================

#[rstest]
#[case(1, 1, 1)]
#[case(6, 8, 4)]
#[case(7, 9, 5)]
#[case(33, 65, 17)]
#[case(64, 3, 130)]
fn test_integer_matmul_exact(#[case] m: usize, #[case] k: usize, #[case] n: usize) {
    let a = pattern_i64(m * k, 1, 9);
    let b = pattern_i64(k * n, 2, 9);
    let out = matmul(&Tensor::from_slice(&a, &[m, k]), &Tensor::from_slice(&b, &[k, n])).unwrap();
    assert_eq!(out.shape(), &[m, n]);
    assert_eq!(out.to_vec(), naive_matmul_i64(&a, &b, m, k, n));
}

#[test]
fn test_float_matmul_close() {
    let (m, k, n) = (45, 70, 38);
    let a = pattern_f64(m * k, 3);
    let b = pattern_f64(k * n, 4);
    let out = matmul(&Tensor::from_slice(&a, &[m, k]), &Tensor::from_slice(&b, &[k, n])).unwrap();
    let expected = naive_matmul_f64(&a, &b, m, k, n);
    assert_allclose_f64(&out.to_vec(), &expected, 1e-12, 1e-12, "matmul f64");
}

#[test]
fn test_generic_and_simd_kernels_agree() {
    // small integers are exact in f32, so any summation order gives the same bits
    let (m, k, n) = (19, 27, 21);
    let a: Vec<f32> = pattern_i64(m * k, 5, 4).into_iter().map(|x| x as f32).collect();
    let b: Vec<f32> = pattern_i64(k * n, 6, 4).into_iter().map(|x| x as f32).collect();
    let (a, b) = (Tensor::from_slice(&a, &[m, k]), Tensor::from_slice(&b, &[k, n]));

    let generic = GemmPlan::new::<f32>(MicroKernel::Generic, &CacheConfig::default());
    let best = GemmPlan::for_element::<f32>();
    let seq = ExecutionPolicy::Sequential;
    let lhs = matmul_with_plan(&generic, &seq, &a, &b).unwrap();
    let rhs = matmul_with_plan(&best, &seq, &a, &b).unwrap();
    assert_eq!(lhs.to_vec(), rhs.to_vec());
}

#[test]
fn test_column_major_operands() {
    let data = [1i32, 2, 3, 4, 5, 6];
    let a = Tensor::from_slice_with_order(&data, &[2, 3], Order::ColumnMajor).unwrap();
    let b = Tensor::from_slice(&data, &[3, 2]);
    // a = [[1, 3, 5], [2, 4, 6]]
    let out = matmul(&a, &b).unwrap();
    assert_eq!(out.to_vec(), vec![35, 44, 44, 56]);
}

// ============================================================================
// Vector operands
// ============================================================================

#[test]
fn test_vector_times_matrix() {
    let v = Tensor::from_slice(&[1i32, 2, 3], &[3]);
    let m = Tensor::from_slice(&[1i32, 0, 0, 1, 1, 1], &[3, 2]);
    let out = matmul(&v, &m).unwrap();
    assert_eq!(out.shape(), &[2]);
    assert_eq!(out.to_vec(), vec![4, 5]);
}

#[test]
fn test_matrix_times_vector() {
    let m = Tensor::from_slice(&[1i32, 0, 0, 1, 1, 1], &[3, 2]);
    let v = Tensor::from_slice(&[1i32, 1], &[2]);
    let out = matmul(&m, &v).unwrap();
    assert_eq!(out.shape(), &[3]);
    assert_eq!(out.to_vec(), vec![1, 1, 2]);
}

#[test]
fn test_single_row_times_vector() {
    let m = Tensor::from_slice(&[1.0f32, 2.0], &[1, 2]);
    let v = Tensor::from_slice(&[3.0f32, 4.0], &[2]);
    let out = matmul(&m, &v).unwrap();
    assert_eq!(out.shape(), &[1]);
    assert_eq!(out.to_vec(), vec![11.0]);
}

#[test]
fn test_vector_times_batch() {
    let v = Tensor::from_slice(&[1i64, -1], &[2]);
    let batch = Tensor::from_slice(&(0..12).collect::<Vec<i64>>(), &[3, 2, 2]);
    let out = matmul(&v, &batch).unwrap();
    assert_eq!(out.shape(), &[3, 2]);
    assert_eq!(out.to_vec(), vec![-2, -2, -2, -2, -2, -2]);
}

#[test]
fn test_vector_dot_is_zero_dim() {
    let a = Tensor::from_slice(&[1.5f64, 2.0, -1.0], &[3]);
    let out = matmul(&a, &a).unwrap();
    assert_eq!(out.shape(), &[] as &[usize]);
    assert_eq!(out.item().unwrap(), 7.25);
}

// ============================================================================
// Batched products
// ============================================================================

#[test]
fn test_batched_with_broadcast_batch() {
    let (m, k, n) = (5, 4, 3);
    let a = pattern_i64(2 * m * k, 7, 5);
    let b = pattern_i64(k * n, 8, 5);
    let lhs = Tensor::from_slice(&a, &[2, 1, m, k]);
    let rhs = Tensor::from_slice(&b, &[k, n]).broadcast_to(&[3, k, n]).unwrap();
    let out = matmul(&lhs, &rhs).unwrap();
    assert_eq!(out.shape(), &[2, 3, m, n]);

    let got = out.to_vec();
    for outer in 0..2 {
        let expected = naive_matmul_i64(&a[outer * m * k..(outer + 1) * m * k], &b, m, k, n);
        for inner in 0..3 {
            let start = (outer * 3 + inner) * m * n;
            assert_eq!(&got[start..start + m * n], expected.as_slice());
        }
    }
}

#[test]
fn test_expression_operands() {
    let a = Tensor::from_slice(&[1i32, 2, 3, 4], &[2, 2]);
    let shift = Tensor::from_slice(&[1i32, -1], &[2]);
    let lhs = (&a + &shift).unwrap();
    let rhs = (&a * 2i32).unwrap();
    // lhs = [[2, 1], [4, 3]], rhs = [[2, 4], [6, 8]]
    let out = matmul(&lhs, &rhs).unwrap();
    assert_eq!(out.to_vec(), vec![10, 16, 26, 40]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_inner_dimension_mismatch() {
    let a = Tensor::<f32>::zeros(&[2, 3]);
    let b = Tensor::<f32>::zeros(&[4, 5]);
    let err = matmul(&a, &b).unwrap_err();
    assert!(err.is_value_error());
    assert!(matches!(err, Error::ShapeMismatch { .. }));
}

#[test]
fn test_scalar_operand_rejected() {
    let s = Tensor::scalar(2.0f64);
    let v = Tensor::from_slice(&[1.0f64, 2.0], &[2]);
    let err = matmul(&s, &v).unwrap_err();
    assert!(err.is_value_error());
    assert!(matches!(err, Error::InvalidArgument { .. }));
}

#[test]
fn test_batch_mismatch() {
    let a = Tensor::<i32>::zeros(&[2, 2, 3]);
    let b = Tensor::<i32>::zeros(&[3, 3, 2]);
    let err = matmul(&a, &b).unwrap_err();
    assert!(matches!(err, Error::BroadcastError { .. }));
}
