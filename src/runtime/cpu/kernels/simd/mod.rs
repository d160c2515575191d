//! SIMD detection for CPU kernels
//!
//! The detected level is cached on first use. Kernels never assume a level
//! at compile time: with the `simd` feature disabled, or on targets other
//! than x86-64, every kernel resolves to its portable scalar version.
//!
//! | Level    | Vector width | f32 lanes | f64 lanes |
//! |----------|--------------|-----------|-----------|
//! | AVX-512F | 512 bits     | 16        | 8         |
//! | AVX2+FMA | 256 bits     | 8         | 4         |
//! | Scalar   | n/a          | 1         | 1         |

pub mod matmul;

use std::sync::OnceLock;

/// SIMD capability level detected at runtime
///
/// Higher values indicate more capable instruction sets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[allow(dead_code)] // only Scalar is constructed off x86-64
pub enum SimdLevel {
    /// AVX-512F with FMA
    Avx512 = 2,
    /// AVX2 with FMA
    Avx2Fma = 1,
    /// No usable vector extension
    Scalar = 0,
}

impl SimdLevel {
    /// True if 256-bit AVX2+FMA instructions are available
    #[inline]
    pub const fn has_avx2(self) -> bool {
        matches!(self, Self::Avx512 | Self::Avx2Fma)
    }

    /// True if 512-bit AVX-512F instructions are available
    #[inline]
    pub const fn has_avx512(self) -> bool {
        matches!(self, Self::Avx512)
    }

    /// Number of f32 elements per vector register
    #[inline]
    pub const fn f32_lanes(self) -> usize {
        match self {
            Self::Avx512 => 16,
            Self::Avx2Fma => 8,
            Self::Scalar => 1,
        }
    }

    /// Number of f64 elements per vector register
    #[inline]
    pub const fn f64_lanes(self) -> usize {
        match self {
            Self::Avx512 => 8,
            Self::Avx2Fma => 4,
            Self::Scalar => 1,
        }
    }

    /// Name of this level
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Avx512 => "AVX-512",
            Self::Avx2Fma => "AVX2+FMA",
            Self::Scalar => "Scalar",
        }
    }
}

impl std::fmt::Display for SimdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

static SIMD_LEVEL: OnceLock<SimdLevel> = OnceLock::new();

/// Best SIMD level of the current CPU, detected once
#[inline]
pub fn detect_simd() -> SimdLevel {
    *SIMD_LEVEL.get_or_init(detect_simd_uncached)
}

#[cold]
fn detect_simd_uncached() -> SimdLevel {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("fma") {
            return SimdLevel::Avx512;
        }
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return SimdLevel::Avx2Fma;
        }
    }
    SimdLevel::Scalar
}
