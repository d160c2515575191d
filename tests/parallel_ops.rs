//! Integration tests for parallel execution
//!
//! Tests verify:
//! - Parallel matmul matches the sequential product
//! - Parallel evaluation and reduction match the sequential ones
//! - Worker pool scopes, panics and shutdown

mod common;

use common::{create_pool, naive_matmul_i64, pattern_f64, pattern_i64};
use ndexpr::expr::functors::Mul;
use ndexpr::ops::{self, PARALLEL_GRAIN};
use ndexpr::prelude::*;
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Matmul
// ============================================================================

#[rstest]
#[case(&[40, 30], &[30, 50])]
#[case(&[3, 17, 9], &[3, 9, 13])]
#[case(&[2, 1, 11, 7], &[5, 7, 3])]
#[case(&[1, 1], &[1, 97])]
#[case(&[97, 5], &[5, 1])]
fn test_parallel_matmul_matches_sequential(#[case] lhs: &[usize], #[case] rhs: &[usize]) {
    let pool = create_pool(4);
    let a = Tensor::from_slice(&pattern_i64(lhs.iter().product(), 11, 7), lhs);
    let b = Tensor::from_slice(&pattern_i64(rhs.iter().product(), 12, 7), rhs);

    let seq = matmul(&a, &b).unwrap();
    let par = matmul_with(&ExecutionPolicy::Parallel(&pool), &a, &b).unwrap();
    assert_eq!(par.shape(), seq.shape());
    assert_eq!(par.to_vec(), seq.to_vec());
}

#[test]
fn test_parallel_matmul_against_reference() {
    let pool = create_pool(3);
    let (m, k, n) = (61, 29, 47);
    let a = pattern_i64(m * k, 13, 6);
    let b = pattern_i64(k * n, 14, 6);
    let out = matmul_with(
        &ExecutionPolicy::Parallel(&pool),
        &Tensor::from_slice(&a, &[m, k]),
        &Tensor::from_slice(&b, &[k, n]),
    )
    .unwrap();
    assert_eq!(out.to_vec(), naive_matmul_i64(&a, &b, m, k, n));
}

#[test]
fn test_parallel_matmul_transposed_float() {
    let pool = create_pool(2);
    let a = Tensor::from_slice(&pattern_f64(24 * 36, 1), &[36, 24]).transpose();
    let b = Tensor::from_slice(&pattern_f64(36 * 20, 2), &[36, 20]);
    let seq = matmul(&a, &b).unwrap();
    let par = matmul_with(&ExecutionPolicy::Parallel(&pool), &a, &b).unwrap();
    // each output element is computed by exactly one task with the same kernel
    assert_eq!(par.to_vec(), seq.to_vec());
}

// ============================================================================
// Evaluation and reduction
// ============================================================================

#[test]
fn test_parallel_eval_matches_sequential() {
    let pool = create_pool(4);
    let rows = 2 * PARALLEL_GRAIN / 64 + 3;
    let a = Tensor::from_slice(&pattern_i64(rows * 64, 1, 100), &[rows, 64]);
    let b = Tensor::from_slice(&pattern_i64(64, 2, 100), &[64]);
    let node = n_operator(Mul, (&a, &b)).unwrap();
    assert!(!node.is_trivial());

    let seq = node.eval();
    let par = node.eval_with(&ExecutionPolicy::Parallel(&pool));
    assert_eq!(par.shape(), &[rows, 64]);
    assert_eq!(par.to_vec(), seq.to_vec());
}

#[test]
fn test_parallel_eval_column_major() {
    let pool = create_pool(3);
    let n = 3 * PARALLEL_GRAIN;
    let data = pattern_f64(n, 9);
    let f = Tensor::from_slice_with_order(&data, &[n / 4, 4], Order::ColumnMajor).unwrap();
    let node = ops::square(&f);
    let par = ops::eval_with(&ExecutionPolicy::Parallel(&pool), &node);
    assert_eq!(par.order(), Order::ColumnMajor);
    assert_eq!(par.to_vec(), ops::eval(&node).to_vec());
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(7)]
fn test_parallel_sum_matches(#[case] workers: usize) {
    let pool = create_pool(workers);
    let n = 5 * PARALLEL_GRAIN + 123;
    let a = Tensor::from_slice(&pattern_i64(n, 3, 1000), &[n]);
    let expected = ops::sum(&a);
    assert_eq!(ops::sum_with(&ExecutionPolicy::Parallel(&pool), &a), expected);
}

#[test]
fn test_parallel_reduce_is_repeatable() {
    let pool = create_pool(4);
    let n = 4 * PARALLEL_GRAIN + 5;
    let a = Tensor::from_slice(&pattern_f64(n, 4), &[n]);
    let policy = ExecutionPolicy::Parallel(&pool);
    let first = ops::sum_with(&policy, &a);
    for _ in 0..5 {
        assert_eq!(ops::sum_with(&policy, &a).to_bits(), first.to_bits());
    }
    let max = ops::reduce_with(&policy, &a, f64::NEG_INFINITY, f64::max);
    assert_eq!(max, ops::reduce(&a, f64::NEG_INFINITY, f64::max));
}

// ============================================================================
// Worker pool
// ============================================================================

#[test]
fn test_scope_borrows_stack_data() {
    let pool = create_pool(4);
    let mut chunks = vec![vec![0u64; 100]; 8];
    pool.scope(|s| {
        for (i, chunk) in chunks.iter_mut().enumerate() {
            s.spawn(move || {
                for (j, x) in chunk.iter_mut().enumerate() {
                    *x = (i * 100 + j) as u64;
                }
            });
        }
    });
    let flat: Vec<u64> = chunks.into_iter().flatten().collect();
    assert_eq!(flat, (0..800u64).collect::<Vec<_>>());
}

#[test]
fn test_nested_scope_runs_inline() {
    let pool = create_pool(2);
    let hits = AtomicUsize::new(0);
    pool.scope(|outer| {
        for _ in 0..4 {
            outer.spawn(|| {
                pool.scope(|inner| {
                    for _ in 0..3 {
                        inner.spawn(|| {
                            hits.fetch_add(1, Ordering::SeqCst);
                        });
                    }
                });
            });
        }
    });
    assert_eq!(hits.load(Ordering::SeqCst), 12);
}

#[test]
fn test_scope_panic_propagates_after_drain() {
    let pool = create_pool(2);
    let finished = AtomicUsize::new(0);
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pool.scope(|s| {
            s.spawn(|| panic!("task failed"));
            for _ in 0..5 {
                s.spawn(|| {
                    finished.fetch_add(1, Ordering::SeqCst);
                });
            }
        });
    }));
    assert!(result.is_err());
    assert_eq!(finished.load(Ordering::SeqCst), 5);

    // the pool is still usable
    let after = AtomicUsize::new(0);
    pool.scope(|s| {
        s.spawn(|| {
            after.fetch_add(1, Ordering::SeqCst);
        });
    });
    assert_eq!(after.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_joins_detached_jobs() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let pool = create_pool(3);
        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
    }
    assert_eq!(counter.load(Ordering::SeqCst), 20);
}

#[test]
fn test_zero_workers_rejected() {
    let err = WorkerPool::new(PoolConfig::with_workers(0)).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}
