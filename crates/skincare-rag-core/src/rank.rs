//! Per-category ranking.
//!
//! One invocation walks `FILTER → VECTORIZE → SCORE → THRESHOLD_AND_TRUNCATE`:
//!
//! 1. Map the category key through the [`CategoryMap`] and select catalog
//!    rows whose category contains the label (case-insensitive).
//! 2. Return early with no products when nothing matches or there are no
//!    target ingredients; the vectorizer is not called.
//! 3. Vectorize the filtered ingredient texts together with the joined
//!    target ingredients.
//! 4. Score every row independently, in catalog order.
//! 5. Drop rows with `combined_score <= min_relevance_threshold`, stable-sort
//!    the rest by `combined_score` descending, and keep the first `top_k`.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::category::CategoryMap;
use crate::error::{RankError, VectorizeError};
use crate::models::ScoredProduct;
use crate::scoring::{self, MatchMode};
use crate::vectorize::Vectorizer;

/// Ranking tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankParams {
    /// Maximum results per category.
    pub top_k: usize,
    /// Strict lower bound on `combined_score` for inclusion.
    pub min_relevance_threshold: f64,
    /// Score added per exact ingredient match.
    pub exact_match_bonus: f64,
    pub match_mode: MatchMode,
}

impl Default for RankParams {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_relevance_threshold: 0.1,
            exact_match_bonus: 0.3,
            match_mode: MatchMode::Substring,
        }
    }
}

/// Everything a ranking run reads. Shared, read-only.
///
/// `'a` is the lifetime of the catalog that ranked products borrow from;
/// `'p` covers the parameters, which may be built per call.
pub struct RankContext<'a, 'p> {
    pub catalog: &'a Catalog,
    pub categories: &'a CategoryMap,
    pub vectorizer: &'a dyn Vectorizer,
    pub params: &'p RankParams,
}

/// Rank one category, reporting failures.
///
/// Unknown categories yield [`RankError::UnknownCategory`]; vectorizer
/// failures yield [`RankError::Vectorization`]. Rows that fail to score are
/// logged and dropped without failing the category.
pub async fn try_rank<'a>(
    ctx: &RankContext<'a, '_>,
    category: &str,
    target_ingredients: &[String],
) -> Result<Vec<ScoredProduct<'a>>, RankError> {
    let label = ctx
        .categories
        .resolve(category)
        .ok_or_else(|| RankError::UnknownCategory(category.to_string()))?;

    let candidates = ctx.catalog.filter_by_label(label);
    if candidates.is_empty() {
        tracing::warn!(category, label, "no products found for category");
        return Ok(Vec::new());
    }

    let targets: Vec<String> = target_ingredients
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if targets.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        category,
        candidates = candidates.len(),
        targets = ?targets,
        vectorizer = ctx.vectorizer.name(),
        "ranking category"
    );

    let corpus: Vec<String> = candidates
        .iter()
        .map(|(_, p)| p.ingredients.to_lowercase())
        .collect();
    let query = targets.join(" ");

    let vectors = ctx.vectorizer.vectorize(&corpus, &query).await?;
    if vectors.products.len() != candidates.len() {
        return Err(VectorizeError::CountMismatch {
            expected: candidates.len(),
            got: vectors.products.len(),
        }
        .into());
    }

    let mut scored: Vec<ScoredProduct<'a>> = Vec::with_capacity(candidates.len());
    for ((row, product), vector) in candidates.into_iter().zip(vectors.products.iter()) {
        match scoring::score(
            row,
            product,
            vector,
            &vectors.query,
            &targets,
            ctx.params.exact_match_bonus,
            ctx.params.match_mode,
        ) {
            Ok(s) => scored.push(s),
            Err(e) => tracing::warn!(category, error = %e, "dropping row"),
        }
    }

    Ok(select_top(scored, ctx.params))
}

/// Rank one category; every failure degrades to an empty result.
pub async fn rank<'a>(
    ctx: &RankContext<'a, '_>,
    category: &str,
    target_ingredients: &[String],
) -> Vec<ScoredProduct<'a>> {
    match try_rank(ctx, category, target_ingredients).await {
        Ok(products) => products,
        Err(e) => {
            tracing::error!(category, error = %e, "ranking failed");
            Vec::new()
        }
    }
}

/// Threshold, stable sort, and truncate.
pub fn select_top<'a>(
    mut scored: Vec<ScoredProduct<'a>>,
    params: &RankParams,
) -> Vec<ScoredProduct<'a>> {
    scored.retain(|s| s.combined_score > params.min_relevance_threshold);
    // Vec::sort_by is stable: equal scores keep catalog row order.
    scored.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(params.top_k);
    scored
}
