//! Error taxonomy for the ranking pipeline.
//!
//! None of these errors escape [`search_all`](crate::search::search_all):
//! every variant degrades to an empty or partial result plus a diagnostic.

use thiserror::Error;

/// Failure produced by a [`Vectorizer`](crate::vectorize::Vectorizer).
#[derive(Debug, Error)]
pub enum VectorizeError {
    /// Every input reduced to stop words or punctuation.
    #[error("empty vocabulary: inputs contain only stop words or punctuation")]
    EmptyVocabulary,

    /// Transport, auth, or protocol error from an external embedding service.
    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    /// The service answered with the wrong number of vectors.
    #[error("expected {expected} vectors, got {got}")]
    CountMismatch { expected: usize, got: usize },

    /// The service answered with vectors of differing dimensionality.
    #[error("vector {index} has {got} dimensions, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },

    /// The worker running an in-process vectorizer was cancelled.
    #[error("vectorizer worker failed: {0}")]
    Worker(String),
}

/// Failure while ranking a single category.
#[derive(Debug, Error)]
pub enum RankError {
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("vectorization failed: {0}")]
    Vectorization(#[from] VectorizeError),

    #[error("scoring failed for row {row}: {reason}")]
    Scoring { row: usize, reason: String },

    /// The ranking task panicked; the payload message is preserved.
    #[error("ranking aborted: {0}")]
    Aborted(String),
}

impl RankError {
    /// Machine-readable code used in diagnostics and HTTP responses.
    pub fn code(&self) -> &'static str {
        match self {
            RankError::CatalogUnavailable(_) => "catalog_unavailable",
            RankError::UnknownCategory(_) => "unknown_category",
            RankError::Vectorization(_) => "vectorization_failure",
            RankError::Scoring { .. } => "scoring_failure",
            RankError::Aborted(_) => "aborted",
        }
    }
}
