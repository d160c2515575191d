//! Block sizes derived from cache capacities

use crate::dtype::Element;
use crate::runtime::cpu::kernels::simd::matmul::MR;

/// Assumed per-core cache capacities in bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// L1 data cache
    pub l1: usize,
    /// L2 cache
    pub l2: usize,
    /// Share of the L3 cache
    pub l3: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1: 32 * 1024,
            l2: 256 * 1024,
            l3: 2 * 1024 * 1024,
        }
    }
}

/// Cache block sizes of the tiled loop
///
/// - `kc`: depth of one packed slice; an MR×kc panel of A plus a kc×NR
///   panel of B fill half of L1
/// - `mc`: rows of the packed A block (mc×kc in half of L2), a multiple of MR
/// - `nc`: columns of the packed B block (kc×nc in half of L3), a multiple
///   of NR
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSizes {
    /// Rows of A per L2 block
    pub mc: usize,
    /// Shared depth per block
    pub kc: usize,
    /// Columns of B per L3 block
    pub nc: usize,
}

impl BlockSizes {
    /// Block sizes for elements of type `T` and micro-tiles `MR × nr`
    pub fn for_element<T: Element>(cache: &CacheConfig, nr: usize) -> Self {
        let elem = size_of::<T>();
        let kc = (cache.l1 / 2 / ((MR + nr) * elem)).max(1);
        let mc = round_down(cache.l2 / 2 / (kc * elem), MR);
        let nc = round_down(cache.l3 / 2 / (kc * elem), nr);
        Self { mc, kc, nc }
    }
}

/// Largest multiple of `unit` not above `x`, but at least `unit`
fn round_down(x: usize, unit: usize) -> usize {
    (x / unit * unit).max(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::f32_avx2(4, 8)]
    #[case::f64_avx2(8, 4)]
    #[case::i32_generic(4, 4)]
    #[case::u8_generic(1, 4)]
    fn test_blocks_fit_caches(#[case] elem: usize, #[case] nr: usize) {
        let cache = CacheConfig::default();
        let blocks = match elem {
            1 => BlockSizes::for_element::<u8>(&cache, nr),
            4 => BlockSizes::for_element::<f32>(&cache, nr),
            _ => BlockSizes::for_element::<f64>(&cache, nr),
        };
        assert_eq!(blocks.mc % MR, 0);
        assert_eq!(blocks.nc % nr, 0);
        assert!((MR + nr) * blocks.kc * elem <= cache.l1 / 2);
        assert!(blocks.mc * blocks.kc * elem <= cache.l2 / 2);
        assert!(blocks.kc * blocks.nc * elem <= cache.l3 / 2);
    }

    #[test]
    fn test_f32_avx2_defaults() {
        let blocks = BlockSizes::for_element::<f32>(&CacheConfig::default(), 8);
        assert_eq!(blocks, BlockSizes { mc: 108, kc: 292, nc: 896 });
    }

    #[test]
    fn test_tiny_caches_keep_minimum_blocks() {
        let cache = CacheConfig { l1: 1, l2: 1, l3: 1 };
        let blocks = BlockSizes::for_element::<f64>(&cache, 4);
        assert_eq!(blocks, BlockSizes { mc: MR, kc: 1, nc: 4 });
    }
}
