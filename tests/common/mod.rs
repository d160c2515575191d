//! Common test utilities
#![allow(dead_code)]

use ndexpr::runtime::{PoolConfig, WorkerPool};

/// Create a pool with `workers` threads and a small queue
pub fn create_pool(workers: usize) -> WorkerPool {
    WorkerPool::new(PoolConfig::with_workers(workers).queue_capacity(2 * workers))
        .expect("worker pool should start")
}

/// Deterministic small integers in `-spread..=spread`
pub fn pattern_i64(len: usize, seed: i64, spread: i64) -> Vec<i64> {
    (0..len as i64)
        .map(|i| (i * 31 + seed * 17) % (2 * spread + 1) - spread)
        .collect()
}

/// Deterministic floats in `[-1, 1)`
pub fn pattern_f64(len: usize, seed: u64) -> Vec<f64> {
    (0..len as u64)
        .map(|i| ((i * 2654435761 + seed * 40503) % 2000) as f64 / 1000.0 - 1.0)
        .collect()
}

/// Row-major `[m, k] · [k, n]` reference product
pub fn naive_matmul_i64(a: &[i64], b: &[i64], m: usize, k: usize, n: usize) -> Vec<i64> {
    let mut c = vec![0; m * n];
    for i in 0..m {
        for j in 0..n {
            c[i * n + j] = (0..k).map(|p| a[i * k + p] * b[p * n + j]).sum();
        }
    }
    c
}

/// Row-major `[m, k] · [k, n]` reference product
pub fn naive_matmul_f64(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut c = vec![0.0; m * n];
    for i in 0..m {
        for j in 0..n {
            c[i * n + j] = (0..k).map(|p| a[i * k + p] * b[p * n + j]).sum();
        }
    }
    c
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}
