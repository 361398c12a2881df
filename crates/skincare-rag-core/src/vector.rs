//! Vector representations and similarity.
//!
//! Lexical vectorization produces sparse TF-IDF vectors; external
//! embedding services produce dense vectors. Both live behind
//! [`TermVector`] so the scorer does not care which one it got.

/// Sparse vector: `(dimension, weight)` pairs sorted by dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(u32, f64)>,
}

impl SparseVector {
    /// Build from unsorted pairs. Zero weights are dropped; duplicate
    /// dimensions are summed.
    pub fn from_pairs(mut pairs: Vec<(u32, f64)>) -> Self {
        pairs.sort_by_key(|(i, _)| *i);
        let mut entries: Vec<(u32, f64)> = Vec::with_capacity(pairs.len());
        for (i, w) in pairs {
            match entries.last_mut() {
                Some(last) if last.0 == i => last.1 += w,
                _ => entries.push((i, w)),
            }
        }
        entries.retain(|(_, w)| *w != 0.0);
        Self { entries }
    }

    pub fn entries(&self) -> &[(u32, f64)] {
        &self.entries
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut dot = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a, wa) = self.entries[i];
            let (b, wb) = other.entries[j];
            match a.cmp(&b) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dot += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }
        dot
    }

    /// Scale to unit L2 norm. A zero vector stays zero.
    pub fn normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > f64::EPSILON {
            for (_, w) in &mut self.entries {
                *w /= norm;
            }
        }
        self
    }
}

/// A vector produced by a [`Vectorizer`](crate::vectorize::Vectorizer).
#[derive(Debug, Clone, PartialEq)]
pub enum TermVector {
    Sparse(SparseVector),
    Dense(Vec<f32>),
}

impl TermVector {
    /// Cosine similarity, clamped to `[-1.0, 1.0]`.
    ///
    /// Returns `0.0` for zero vectors, mismatched dense lengths, or mixed
    /// representations.
    pub fn cosine(&self, other: &TermVector) -> f64 {
        let sim = match (self, other) {
            (TermVector::Sparse(a), TermVector::Sparse(b)) => {
                let denom = a.norm() * b.norm();
                if denom < f64::EPSILON {
                    0.0
                } else {
                    a.dot(b) / denom
                }
            }
            (TermVector::Dense(a), TermVector::Dense(b)) => cosine_similarity(a, b) as f64,
            _ => 0.0,
        };
        sim.clamp(-1.0, 1.0)
    }
}

/// Compute cosine similarity between two dense vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = TermVector::Dense(vec![1.0, 0.0]);
        let b = TermVector::Dense(vec![-1.0, 0.0]);
        assert!((a.cosine(&b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_different_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_sparse_merges_and_sorts() {
        let v = SparseVector::from_pairs(vec![(3, 1.0), (1, 2.0), (3, 0.5), (2, 0.0)]);
        assert_eq!(v.entries(), &[(1, 2.0), (3, 1.5)]);
    }

    #[test]
    fn test_sparse_cosine() {
        let a = TermVector::Sparse(SparseVector::from_pairs(vec![(0, 1.0), (2, 1.0)]));
        let b = TermVector::Sparse(SparseVector::from_pairs(vec![(2, 1.0), (5, 1.0)]));
        assert!((a.cosine(&b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_sparse_vector_has_zero_similarity() {
        let a = TermVector::Sparse(SparseVector::default());
        let b = TermVector::Sparse(SparseVector::from_pairs(vec![(0, 1.0)]));
        assert_eq!(a.cosine(&b), 0.0);
    }

    #[test]
    fn test_mixed_representations_are_unrelated() {
        let a = TermVector::Sparse(SparseVector::from_pairs(vec![(0, 1.0)]));
        let b = TermVector::Dense(vec![1.0]);
        assert_eq!(a.cosine(&b), 0.0);
    }
}
