//! Low-level CPU kernels
//!
//! - `matmul`: batched, cache-blocked GEMM driver, block sizing and the
//!   parallel partition of the output
//! - `simd`: runtime SIMD detection and the matmul micro-kernels

pub mod matmul;
pub mod simd;
