use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Chunk width for the dot product accumulators.
const DOT_CHUNK_SIZE: usize = 8;

/// Fixed-length embedding vector shared between the store and its readers.
///
/// Backed by an `Arc<[f32]>` so that store snapshots clone pointers instead
/// of vectors.
#[derive(Clone, PartialEq)]
pub struct Embedding(Arc<[f32]>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values.into())
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.0.to_vec()
    }

    /// Dot product with another vector of the same length.
    #[inline]
    pub fn dot(&self, other: &[f32]) -> f32 {
        dot_product(&self.0, other)
    }
}

impl Deref for Embedding {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl From<&[f32]> for Embedding {
    fn from(values: &[f32]) -> Self {
        Self(values.into())
    }
}

impl fmt::Debug for Embedding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 4;
        let head = &self.0[..self.0.len().min(PREVIEW)];
        f.debug_struct("Embedding")
            .field("dim", &self.0.len())
            .field("head", &head)
            .finish()
    }
}

/// Sum of elementwise products of two equal-length vectors.
///
/// Callers are responsible for checking lengths; a mismatch only trips a
/// debug assertion here and the shorter length wins in release builds.
/// Accumulates in fixed-width chunks so the loop auto-vectorizes.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "dot product over unequal lengths");

    let mut acc = [0f32; DOT_CHUNK_SIZE];
    let chunks_a = a.chunks_exact(DOT_CHUNK_SIZE);
    let chunks_b = b.chunks_exact(DOT_CHUNK_SIZE);
    let rem_a = chunks_a.remainder();
    let rem_b = chunks_b.remainder();

    for (ca, cb) in chunks_a.zip(chunks_b) {
        for lane in 0..DOT_CHUNK_SIZE {
            acc[lane] += ca[lane] * cb[lane];
        }
    }

    let tail: f32 = rem_a.iter().zip(rem_b).map(|(x, y)| x * y).sum();
    acc.iter().sum::<f32>() + tail
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn dot_product_matches_scalar_reference() {
        let a: Vec<f32> = (0..37).map(|i| (i as f32 * 0.37).sin()).collect();
        let b: Vec<f32> = (0..37).map(|i| (i as f32 * 0.11).cos()).collect();
        assert!((dot_product(&a, &b) - scalar_dot(&a, &b)).abs() < 1e-4);
    }

    #[test]
    fn dot_product_of_short_vectors() {
        assert_eq!(dot_product(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]), 1.0);
        assert_eq!(dot_product(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]), 0.0);
        assert_eq!(dot_product(&[], &[]), 0.0);
    }

    #[test]
    fn embedding_clones_share_storage() {
        let a = Embedding::new(vec![0.5; 16]);
        let b = a.clone();
        assert!(std::ptr::eq(a.as_slice().as_ptr(), b.as_slice().as_ptr()));
        assert_eq!(a, b);
    }

    #[test]
    fn debug_output_is_truncated() {
        let e = Embedding::new(vec![1.0; 512]);
        let rendered = format!("{e:?}");
        assert!(rendered.contains("dim: 512"));
        assert!(rendered.len() < 100);
    }
}
