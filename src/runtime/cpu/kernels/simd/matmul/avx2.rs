//! AVX2+FMA micro-kernels
//!
//! - f32: 6×8 (six ymm accumulators of 8 lanes)
//! - f64: 6×4 (six ymm accumulators of 4 lanes)

#![allow(unsafe_op_in_unsafe_fn)]

use core::arch::x86_64::*;

use super::macros::define_micro_kernel;

define_micro_kernel!(
    micro_kernel_6x8_f32,
    f32,
    8,
    _mm256_loadu_ps,
    _mm256_storeu_ps,
    _mm256_set1_ps,
    _mm256_fmadd_ps,
    _mm256_setzero_ps,
    __m256
);

define_micro_kernel!(
    micro_kernel_6x4_f64,
    f64,
    4,
    _mm256_loadu_pd,
    _mm256_storeu_pd,
    _mm256_set1_pd,
    _mm256_fmadd_pd,
    _mm256_setzero_pd,
    __m256d
);
