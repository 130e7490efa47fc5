//! Distance between perceptual hashes.

/// Measures how far apart two hashes of the same algorithm are.
///
/// Returns `None` when either hash cannot be interpreted.
pub trait SimilarityComparator {
    fn distance(&self, a: &str, b: &str) -> Option<u32>;
}

/// Bitwise Hamming distance over 64-bit hex-encoded hashes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hamming;

impl SimilarityComparator for Hamming {
    fn distance(&self, a: &str, b: &str) -> Option<u32> {
        let a = u64::from_str_radix(a.trim(), 16).ok()?;
        let b = u64::from_str_radix(b.trim(), 16).ok()?;
        Some((a ^ b).count_ones())
    }
}
