//! Matmul micro-kernels, packing and the blocked tile loop
//!
//! # Algorithm (BLIS-style)
//!
//! ```text
//! for jc in cols.step_by(NC):              # L3 block of B
//!   for pc in (0..K).step_by(KC):          # L1/L2 depth block
//!     fill_buf_b(B[pc.., jc..]) → B̃
//!     for ic in rows.step_by(MC):          # L2 block of A
//!       fill_buf_a(A[ic.., pc..]) → Ã
//!       for jr in (0..nc).step_by(NR):
//!         for ir in (0..mc).step_by(MR):
//!           micro_kernel(Ã[ir], B̃[jr]) → tile
//!           fill_res(C[ic+ir.., jc+jr..] += tile)
//! ```
//!
//! Sources are read through walkers, so any layout, broadcast batch axis or
//! lazy expression can feed the kernel; packing is the only place elements
//! are read. The result is written through a mutable walker.
//!
//! | Kernel     | MR×NR | Elements     |
//! |------------|-------|--------------|
//! | `Avx2F32`  | 6×8   | f32          |
//! | `Avx2F64`  | 6×4   | f64          |
//! | `Generic`  | 6×4   | any element  |

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod avx2;
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod macros;
mod packing;
mod scalar;
mod tiling;

pub use packing::{MatAxes, fill_buf_a, fill_buf_b, packed_a_len, packed_b_len};
pub use scalar::micro_kernel_generic;
pub use tiling::{fill_res, gemm_rect, with_pack_buffers};

use super::{SimdLevel, detect_simd};
use crate::dtype::Element;
#[cfg(all(feature = "simd", target_arch = "x86_64"))]
use crate::dtype::DType;

/// Micro-kernel row count (Mr)
pub const MR: usize = 6;

/// Widest micro-kernel column count of any kernel
pub const MAX_NR: usize = 8;

/// Column count of the generic kernel
pub const GENERIC_NR: usize = 4;

/// Micro-kernel computing one MR×NR tile
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MicroKernel {
    /// Portable kernel for every element type
    Generic,
    /// 256-bit FMA kernel for f32
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    Avx2F32,
    /// 256-bit FMA kernel for f64
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    Avx2F64,
}

impl MicroKernel {
    /// Best kernel for `T` on this CPU
    pub fn select<T: Element>() -> Self {
        Self::for_level::<T>(detect_simd())
    }

    /// Best kernel for `T` at the given SIMD level
    ///
    /// The caller is responsible for `level` being supported by the CPU the
    /// kernel runs on.
    pub fn for_level<T: Element>(level: SimdLevel) -> Self {
        #[cfg(all(feature = "simd", target_arch = "x86_64"))]
        if level.has_avx2() {
            match T::DTYPE {
                DType::F32 => return Self::Avx2F32,
                DType::F64 => return Self::Avx2F64,
                _ => {}
            }
        }
        let _ = level;
        Self::Generic
    }

    /// Tile rows
    #[inline]
    pub const fn mr(self) -> usize {
        MR
    }

    /// Tile columns
    #[inline]
    pub const fn nr(self) -> usize {
        match self {
            Self::Generic => GENERIC_NR,
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            Self::Avx2F32 => 8,
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            Self::Avx2F64 => 4,
        }
    }

    /// Name used in logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            Self::Avx2F32 => "avx2-f32",
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            Self::Avx2F64 => "avx2-f64",
        }
    }

    /// Compute `c[0..MR, 0..nr] = a · b` for one packed depth-`kc` slice
    ///
    /// # Safety
    /// - `a` holds `kc * MR` packed elements, `b` holds `kc * nr` packed
    ///   elements and `c` is writable for `MR` rows of `ldc` elements
    /// - the SIMD variants require `T` to be the variant's element type and
    ///   the CPU to support AVX2+FMA
    #[inline]
    pub unsafe fn run<T: Element>(self, a: *const T, b: *const T, c: *mut T, kc: usize, ldc: usize) {
        match self {
            Self::Generic => unsafe { micro_kernel_generic::<T, GENERIC_NR>(a, b, c, kc, ldc) },
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            Self::Avx2F32 => {
                debug_assert_eq!(T::DTYPE, DType::F32);
                unsafe { avx2::micro_kernel_6x8_f32(a.cast(), b.cast(), c.cast(), kc, ldc) }
            }
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            Self::Avx2F64 => {
                debug_assert_eq!(T::DTYPE, DType::F64);
                unsafe { avx2::micro_kernel_6x4_f64(a.cast(), b.cast(), c.cast(), kc, ldc) }
            }
        }
    }
}

impl std::fmt::Display for MicroKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_use_generic_kernel() {
        assert_eq!(MicroKernel::select::<i32>(), MicroKernel::Generic);
        assert_eq!(MicroKernel::for_level::<f32>(SimdLevel::Scalar), MicroKernel::Generic);
        assert_eq!(MicroKernel::Generic.nr(), GENERIC_NR);
    }

    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    #[test]
    fn test_avx2_selection() {
        assert_eq!(MicroKernel::for_level::<f32>(SimdLevel::Avx2Fma), MicroKernel::Avx2F32);
        assert_eq!(MicroKernel::for_level::<f64>(SimdLevel::Avx512), MicroKernel::Avx2F64);
        assert_eq!(MicroKernel::Avx2F32.nr(), 8);
        assert_eq!(MicroKernel::Avx2F64.nr(), 4);
        assert!(MicroKernel::Avx2F64.nr() <= MAX_NR);
    }

    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    #[test]
    fn test_simd_matches_generic_exactly() {
        if !detect_simd().has_avx2() {
            eprintln!("Skipping AVX2 test - CPU doesn't support AVX2+FMA");
            return;
        }
        let kc = 5;
        let a: Vec<f32> = (0..kc * MR).map(|i| (i % 7) as f32 - 3.0).collect();
        let b: Vec<f32> = (0..kc * 8).map(|i| (i % 5) as f32).collect();

        let mut simd = [0.0f32; MR * 8];
        let mut generic = [0.0f32; MR * 8];
        unsafe {
            MicroKernel::Avx2F32.run(a.as_ptr(), b.as_ptr(), simd.as_mut_ptr(), kc, 8);
            micro_kernel_generic::<f32, 8>(a.as_ptr(), b.as_ptr(), generic.as_mut_ptr(), kc, 8);
        }
        assert_eq!(simd, generic);
    }
}
