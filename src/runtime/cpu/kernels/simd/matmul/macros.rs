//! Macro generating the 6×NR FMA micro-kernels
//!
//! One accumulator register per tile row, one B load per depth step shared
//! by the six A broadcasts. Accumulators start at zero: the tile is a
//! scratch buffer that `fill_res` later adds into the result.

/// Generate `fn $name(a, b, c, kc, ldc)` computing `c[0..6, 0..$nr] = a · b`
macro_rules! define_micro_kernel {
    (
        $name:ident,
        $ty:ty,
        $nr:expr,
        $loadu:ident,
        $storeu:ident,
        $set1:ident,
        $fmadd:ident,
        $setzero:ident,
        $reg_ty:ty
    ) => {
        /// FMA micro-kernel over packed panels
        ///
        /// # Safety
        /// - the CPU must support AVX2 and FMA
        /// - `a` holds `kc * 6` and `b` holds `kc * NR` packed elements
        /// - `c` is writable for 6 rows of `ldc` elements
        #[target_feature(enable = "avx2")]
        #[target_feature(enable = "fma")]
        pub unsafe fn $name(a: *const $ty, b: *const $ty, c: *mut $ty, kc: usize, ldc: usize) {
            let mut c0: $reg_ty = $setzero();
            let mut c1: $reg_ty = $setzero();
            let mut c2: $reg_ty = $setzero();
            let mut c3: $reg_ty = $setzero();
            let mut c4: $reg_ty = $setzero();
            let mut c5: $reg_ty = $setzero();

            for p in 0..kc {
                let b_row = $loadu(b.add(p * $nr));
                let a_col = a.add(p * 6);

                c0 = $fmadd($set1(*a_col), b_row, c0);
                c1 = $fmadd($set1(*a_col.add(1)), b_row, c1);
                c2 = $fmadd($set1(*a_col.add(2)), b_row, c2);
                c3 = $fmadd($set1(*a_col.add(3)), b_row, c3);
                c4 = $fmadd($set1(*a_col.add(4)), b_row, c4);
                c5 = $fmadd($set1(*a_col.add(5)), b_row, c5);
            }

            $storeu(c, c0);
            $storeu(c.add(ldc), c1);
            $storeu(c.add(ldc * 2), c2);
            $storeu(c.add(ldc * 3), c3);
            $storeu(c.add(ldc * 4), c4);
            $storeu(c.add(ldc * 5), c5);
        }
    };
}

pub(crate) use define_micro_kernel;
