//! The search context and the `skinrag search` command.
//!
//! A [`Searcher`] owns everything a ranking run reads: the catalog, the
//! category table, the vectorizer chosen at startup, and the ranking
//! parameters. It is built once per process and shared read-only by every
//! request; nothing is global.

use anyhow::{bail, Result};

use skincare_rag_core::catalog::Catalog;
use skincare_rag_core::category::CategoryMap;
use skincare_rag_core::models::{AggregateResult, QuerySet};
use skincare_rag_core::rank::{RankContext, RankParams};
use skincare_rag_core::search::search_all;
use skincare_rag_core::vectorize::Vectorizer;

use crate::catalog::load_catalog;
use crate::config::Config;
use crate::embedding::create_vectorizer;
use crate::format::{render_json, render_text};

pub struct Searcher {
    catalog: Catalog,
    categories: CategoryMap,
    vectorizer: Box<dyn Vectorizer>,
    params: RankParams,
    max_concurrency: usize,
}

impl Searcher {
    pub fn new(catalog: Catalog, config: &Config, vectorizer: Box<dyn Vectorizer>) -> Self {
        Self {
            catalog,
            categories: config.category_map(),
            vectorizer,
            params: config.rank_params(),
            max_concurrency: config.retrieval.max_concurrency,
        }
    }

    /// Load the catalog and select the vectorizer from `config`.
    ///
    /// A missing catalog is not an error (searches return no products);
    /// a misconfigured vectorizer is.
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = load_catalog(&config.catalog.path);
        let vectorizer = create_vectorizer(&config.vectorizer)?;
        tracing::info!(vectorizer = vectorizer.name(), "search context ready");
        Ok(Self::new(catalog, config, vectorizer))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    pub fn params(&self) -> &RankParams {
        &self.params
    }

    pub fn vectorizer_name(&self) -> &str {
        self.vectorizer.name()
    }

    /// Rank every category of `query_set`; `top_k` overrides the
    /// configured limit for this call only.
    pub async fn search_all(&self, query_set: &QuerySet, top_k: Option<usize>) -> AggregateResult<'_> {
        let params = match top_k {
            Some(k) => RankParams {
                top_k: k,
                ..self.params.clone()
            },
            None => self.params.clone(),
        };
        let ctx = RankContext {
            catalog: &self.catalog,
            categories: &self.categories,
            vectorizer: self.vectorizer.as_ref(),
            params: &params,
        };
        search_all(&ctx, query_set, self.max_concurrency).await
    }
}

/// Parse a `category=ingredient,ingredient` argument.
pub fn parse_ingredient_arg(arg: &str) -> Result<(String, Vec<String>)> {
    let Some((category, list)) = arg.split_once('=') else {
        bail!("Invalid --ingredients value '{}': expected category=a,b", arg);
    };
    let category = category.trim().to_lowercase();
    if category.is_empty() {
        bail!("Invalid --ingredients value '{}': empty category", arg);
    }
    let ingredients = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Ok((category, ingredients))
}

/// Build a [`QuerySet`] from repeated `--ingredients` arguments.
pub fn query_set_from_args(args: &[String]) -> Result<QuerySet> {
    let mut query_set = QuerySet::new();
    for arg in args {
        let (category, ingredients) = parse_ingredient_arg(arg)?;
        query_set.insert(category, ingredients);
    }
    Ok(query_set)
}

/// The `skinrag search` command.
pub async fn run_search(
    config: &Config,
    ingredients: &[String],
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    if top_k == Some(0) {
        bail!("--top-k must be >= 1");
    }
    let query_set = query_set_from_args(ingredients)?;
    if query_set.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let searcher = Searcher::from_config(config)?;
    let results = searcher.search_all(&query_set, top_k).await;

    if json {
        println!("{}", render_json(&results)?);
    } else {
        println!("{}", render_text(&results));
        for d in &results.diagnostics {
            eprintln!("warning: {}: {} ({})", d.category, d.message, d.code);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use skincare_rag_core::models::Product;
    use skincare_rag_core::vectorize::LexicalVectorizer;

    fn searcher() -> Searcher {
        let catalog = Catalog::from_products(vec![
            Product::new("Salicylic Wash", "Cleanser", "water, salicylic acid, glycerin"),
            Product::new("Milky Cleanser", "Cleanser", "water, oat, glycerin"),
            Product::new("Oil Cleanser", "Cleanser", "squalane, salicylic acid"),
            Product::new("Night Cream", "Moisturiser", "water, ceramides"),
        ]);
        Searcher::new(catalog, &Config::minimal(), Box::new(LexicalVectorizer::new()))
    }

    #[test]
    fn test_parse_ingredient_arg() {
        let (cat, ings) = parse_ingredient_arg("Cleanser= salicylic acid, ,zinc").unwrap();
        assert_eq!(cat, "cleanser");
        assert_eq!(ings, vec!["salicylic acid", "zinc"]);
        assert!(parse_ingredient_arg("cleanser").is_err());
        assert!(parse_ingredient_arg("=zinc").is_err());
    }

    #[test]
    fn test_query_set_keeps_argument_order() {
        let qs = query_set_from_args(&[
            "moisturizer=ceramides".to_string(),
            "cleanser=zinc".to_string(),
        ])
        .unwrap();
        let keys: Vec<&str> = qs.iter().map(|q| q.category.as_str()).collect();
        assert_eq!(keys, vec!["moisturizer", "cleanser"]);
    }

    #[tokio::test]
    async fn test_top_k_override_applies_to_one_call() {
        let s = searcher();
        let qs = QuerySet::new().with("cleanser", ["salicylic acid"]);

        let one = s.search_all(&qs, Some(1)).await;
        assert_eq!(one.get("cleanser").unwrap().len(), 1);

        let default = s.search_all(&qs, None).await;
        assert!(default.get("cleanser").unwrap().len() > 1);
        assert_eq!(s.params().top_k, 3);
    }

    #[tokio::test]
    async fn test_results_follow_request_order() {
        let s = searcher();
        let qs = QuerySet::new()
            .with("moisturizer", ["ceramides"])
            .with("cleanser", ["salicylic acid"]);
        let results = s.search_all(&qs, None).await;
        assert_eq!(results.category_names(), vec!["moisturizer", "cleanser"]);
        assert_eq!(results.get("moisturizer").unwrap()[0].product.name, "Night Cream");
    }
}
