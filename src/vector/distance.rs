//! Distance metric shared by indexing and search.
//!
//! The index ranks by squared Euclidean distance (L2²). It is monotonic in
//! true L2 distance, so rankings are identical, and it skips the square root
//! on every comparison. Stored files carry no metric tag: any vector written
//! by this crate is assumed to be compared with this function.

/// Squared Euclidean distance between two equal-length vectors.
///
/// Sums in index order so the result is bit-identical for identical inputs.
#[inline]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
