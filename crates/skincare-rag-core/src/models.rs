//! Core data models for the ranking pipeline.
//!
//! Products are owned by the [`Catalog`](crate::catalog::Catalog); every
//! derived type here borrows them rather than copying rows.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Sentinel used when a product has no price or URL.
pub const NOT_AVAILABLE: &str = "N/A";

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    #[serde(rename = "product_name")]
    pub name: String,
    #[serde(rename = "product_type")]
    pub category: String,
    pub ingredients: String,
    pub price: String,
    pub url: String,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        ingredients: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            ingredients: ingredients.into(),
            price: NOT_AVAILABLE.to_string(),
            url: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = price.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn has_url(&self) -> bool {
        self.url != NOT_AVAILABLE
    }
}

/// A product with its relevance scores for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredProduct<'a> {
    /// Catalog row index; the tie-breaker for equal scores.
    pub row: usize,
    #[serde(flatten)]
    pub product: &'a Product,
    pub similarity_score: f64,
    #[serde(rename = "exact_matches")]
    pub exact_match_count: usize,
    pub combined_score: f64,
}

/// Target ingredients for a single category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryQuery {
    pub category: String,
    pub target_ingredients: Vec<String>,
}

/// Ordered mapping of category → target ingredients.
///
/// Iteration order is insertion order; inserting an existing category
/// replaces its ingredients in place. Ingredients are trimmed and blank
/// entries dropped on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySet {
    entries: Vec<CategoryQuery>,
}

impl QuerySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<I, S>(&mut self, category: impl Into<String>, ingredients: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let category = category.into();
        let target_ingredients: Vec<String> = ingredients
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        match self.entries.iter_mut().find(|e| e.category == category) {
            Some(existing) => existing.target_ingredients = target_ingredients,
            None => self.entries.push(CategoryQuery {
                category,
                target_ingredients,
            }),
        }
    }

    pub fn with<I, S>(mut self, category: impl Into<String>, ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert(category, ingredients);
        self
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .map(|e| e.target_ingredients.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryQuery> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for QuerySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for e in &self.entries {
            map.serialize_entry(&e.category, &e.target_ingredients)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for QuerySet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuerySetVisitor;

        impl<'de> Visitor<'de> for QuerySetVisitor {
            type Value = QuerySet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category to ingredient list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<QuerySet, A::Error> {
                let mut set = QuerySet::new();
                while let Some((category, ingredients)) =
                    access.next_entry::<String, Vec<String>>()?
                {
                    set.insert(category, ingredients);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(QuerySetVisitor)
    }
}

/// Ranked products for one category, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryResult<'a> {
    pub category: String,
    pub products: Vec<ScoredProduct<'a>>,
}

/// A failure recorded while ranking one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub category: String,
    pub code: String,
    pub message: String,
}

/// Results for every requested category, in request order.
///
/// Serializes as `{ "results": { "<category>": [...] }, "diagnostics": [...] }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResult<'a> {
    pub categories: Vec<CategoryResult<'a>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> AggregateResult<'a> {
    pub fn get(&self, category: &str) -> Option<&[ScoredProduct<'a>]> {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.products.as_slice())
    }

    pub fn category_names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.category.as_str()).collect()
    }

    pub fn total_products(&self) -> usize {
        self.categories.iter().map(|c| c.products.len()).sum()
    }
}

struct ResultsMap<'r, 'a>(&'r [CategoryResult<'a>]);

impl Serialize for ResultsMap<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for c in self.0 {
            map.serialize_entry(&c.category, &c.products)?;
        }
        map.end()
    }
}

impl Serialize for AggregateResult<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("results", &ResultsMap(&self.categories))?;
        map.serialize_entry("diagnostics", &self.diagnostics)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_set_trims_and_drops_blanks() {
        let set = QuerySet::new().with("cleanser", ["  salicylic acid ", "", "   "]);
        assert_eq!(set.get("cleanser"), Some(&["salicylic acid".to_string()][..]));
    }

    #[test]
    fn test_query_set_replace_keeps_position() {
        let set = QuerySet::new()
            .with("cleanser", ["a"])
            .with("moisturizer", ["b"])
            .with("cleanser", ["c"]);
        let order: Vec<&str> = set.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(order, vec!["cleanser", "moisturizer"]);
        assert_eq!(set.get("cleanser"), Some(&["c".to_string()][..]));
    }

    #[test]
    fn test_query_set_deserialize_preserves_order() {
        let set: QuerySet =
            serde_json::from_str(r#"{"moisturizer": ["ceramides"], "cleanser": ["bha"]}"#)
                .unwrap();
        let order: Vec<&str> = set.iter().map(|e| e.category.as_str()).collect();
        assert_eq!(order, vec!["moisturizer", "cleanser"]);
    }

    #[test]
    fn test_aggregate_serializes_in_request_order() {
        let product = Product::new("Foam", "Cleanser", "water").with_price("£5");
        let agg = AggregateResult {
            categories: vec![
                CategoryResult {
                    category: "moisturizer".to_string(),
                    products: vec![],
                },
                CategoryResult {
                    category: "cleanser".to_string(),
                    products: vec![ScoredProduct {
                        row: 0,
                        product: &product,
                        similarity_score: 0.5,
                        exact_match_count: 1,
                        combined_score: 0.8,
                    }],
                },
            ],
            diagnostics: vec![],
        };

        let json = serde_json::to_string(&agg).unwrap();
        let m = json.find("moisturizer").unwrap();
        let c = json.find("cleanser").unwrap();
        assert!(m < c, "request order lost: {}", json);
        assert!(json.contains(r#""product_name":"Foam""#));
        assert!(json.contains(r#""exact_matches":1"#));
        assert!(json.contains(r#""url":"N/A""#));
    }
}
