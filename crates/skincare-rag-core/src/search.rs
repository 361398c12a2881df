//! Multi-category search.
//!
//! [`search_all`] ranks every category of a [`QuerySet`] and joins the
//! results in request order. Categories are independent: up to
//! `max_concurrency` rankings are polled at once, and a failure in one
//! (an error or a panic) becomes an empty result plus a [`Diagnostic`]
//! without touching the others.

use std::panic::AssertUnwindSafe;

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use futures::FutureExt;

use crate::error::RankError;
use crate::models::{
    AggregateResult, CategoryQuery, CategoryResult, Diagnostic, QuerySet, ScoredProduct,
};
use crate::rank::{try_rank, RankContext};

type Outcome<'a> = (String, Result<Vec<ScoredProduct<'a>>, RankError>);

/// Rank every category in `query_set`.
///
/// The output always holds one entry per requested category, in request
/// order, even when every ranking failed.
pub async fn search_all<'a>(
    ctx: &RankContext<'a, '_>,
    query_set: &QuerySet,
    max_concurrency: usize,
) -> AggregateResult<'a> {
    tracing::info!(categories = query_set.len(), "searching across categories");

    // Box before streaming: the joined future must stay Send for handlers.
    let rankings: Vec<BoxFuture<'_, Outcome<'a>>> = query_set
        .iter()
        .map(|q| rank_category(ctx, q).boxed())
        .collect();
    let outcomes: Vec<Outcome<'a>> = stream::iter(rankings)
        .buffered(max_concurrency.max(1))
        .collect()
        .await;

    let mut result = AggregateResult::default();
    for (category, outcome) in outcomes {
        let products = match outcome {
            Ok(products) => {
                tracing::info!(category = %category, found = products.len(), "category ranked");
                products
            }
            Err(e) => {
                tracing::error!(category = %category, error = %e, "search failed for category");
                result.diagnostics.push(Diagnostic {
                    category: category.clone(),
                    code: e.code().to_string(),
                    message: e.to_string(),
                });
                Vec::new()
            }
        };
        result.categories.push(CategoryResult { category, products });
    }
    result
}

async fn rank_category<'a>(ctx: &RankContext<'a, '_>, q: &CategoryQuery) -> Outcome<'a> {
    if q.target_ingredients.is_empty() {
        tracing::warn!(category = %q.category, "no ingredients provided");
        return (q.category.clone(), Ok(Vec::new()));
    }
    let outcome = AssertUnwindSafe(try_rank(ctx, &q.category, &q.target_ingredients))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(RankError::Aborted(panic_message(&*payload))));
    (q.category.clone(), outcome)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during ranking".to_string()
    }
}
