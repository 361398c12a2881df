//! Relevance scoring: vector similarity plus exact ingredient matches.
//!
//! ```text
//! combined = similarity + exact_matches × exact_match_bonus
//! ```
//!
//! Both scores are rounded to three decimals, and the rounded values are
//! what ranking sorts and thresholds on.

use serde::{Deserialize, Serialize};

use crate::error::RankError;
use crate::models::{Product, ScoredProduct};
use crate::vector::TermVector;

/// How a target ingredient counts as an exact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Raw substring containment. Short names can match inside longer ones
    /// (`"retin"` matches `"retinol"`).
    #[default]
    Substring,
    /// Containment only at word boundaries.
    Word,
}

/// Count targets contained in `ingredients_lower`.
///
/// Targets are trimmed and lowercased; blank targets never match.
pub fn count_exact_matches(ingredients_lower: &str, targets: &[String], mode: MatchMode) -> usize {
    targets
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| match mode {
            MatchMode::Substring => ingredients_lower.contains(t.as_str()),
            MatchMode::Word => contains_word_bounded(ingredients_lower, t),
        })
        .count()
}

fn contains_word_bounded(haystack: &str, needle: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(needle).any(|(start, m)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + m.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

/// Round to three decimal places.
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Score one catalog row against the query.
///
/// # Errors
///
/// [`RankError::Scoring`] if the similarity is not a finite number; the
/// caller drops the row and keeps ranking the rest.
pub fn score<'a>(
    row: usize,
    product: &'a Product,
    product_vector: &TermVector,
    query_vector: &TermVector,
    targets: &[String],
    exact_match_bonus: f64,
    mode: MatchMode,
) -> Result<ScoredProduct<'a>, RankError> {
    let similarity = product_vector.cosine(query_vector);
    if !similarity.is_finite() {
        return Err(RankError::Scoring {
            row,
            reason: format!("non-finite similarity {similarity}"),
        });
    }

    let exact_match_count = count_exact_matches(&product.ingredients.to_lowercase(), targets, mode);
    let combined = similarity + exact_match_count as f64 * exact_match_bonus;

    Ok(ScoredProduct {
        row,
        product,
        similarity_score: round3(similarity),
        exact_match_count,
        combined_score: round3(combined),
    })
}
