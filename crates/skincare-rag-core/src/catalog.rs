//! In-memory product catalog.
//!
//! A [`Catalog`] is built once from CSV and never mutated afterwards, so it
//! can be shared freely across concurrent searches. Rows missing
//! `ingredients` or a category are dropped at load time and never reach
//! ranking.

use std::collections::BTreeMap;
use std::io::Read;

use crate::error::RankError;
use crate::models::{Product, NOT_AVAILABLE};

const NAME_COLUMNS: &[&str] = &["product_name", "name"];
const CATEGORY_COLUMNS: &[&str] = &["product_type", "category"];
const INGREDIENT_COLUMNS: &[&str] = &["ingredients"];
const PRICE_COLUMNS: &[&str] = &["price"];
const URL_COLUMNS: &[&str] = &["product_url", "url"];

/// Ordered, immutable sequence of products. Identity is the row index.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// An empty catalog: every search against it returns no products.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from already-validated products.
    ///
    /// Products with blank ingredients or category are dropped, matching
    /// what [`Catalog::from_csv_reader`] does for file input.
    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: products
                .into_iter()
                .filter(|p| !p.ingredients.trim().is_empty() && !p.category.trim().is_empty())
                .collect(),
        }
    }

    /// Parse CSV with a header row.
    ///
    /// Required columns: `product_name`, `ingredients`, and `product_type`
    /// (or `category`). Optional: `price`, `product_url` (or `url`).
    ///
    /// # Errors
    ///
    /// [`RankError::CatalogUnavailable`] if the header cannot be read or a
    /// required column is missing. Individual malformed records are skipped.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, RankError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| RankError::CatalogUnavailable(format!("failed to read header: {e}")))?
            .clone();

        // Names are in priority order: an alias is used only when no
        // earlier name is present, wherever it sits in the header.
        let find = |names: &[&str]| {
            names
                .iter()
                .find_map(|n| headers.iter().position(|h| h.eq_ignore_ascii_case(n)))
        };

        let idx_name = find(NAME_COLUMNS)
            .ok_or_else(|| RankError::CatalogUnavailable("missing product_name column".into()))?;
        let idx_category = find(CATEGORY_COLUMNS)
            .ok_or_else(|| RankError::CatalogUnavailable("missing product_type column".into()))?;
        let idx_ingredients = find(INGREDIENT_COLUMNS)
            .ok_or_else(|| RankError::CatalogUnavailable("missing ingredients column".into()))?;
        let idx_price = find(PRICE_COLUMNS);
        let idx_url = find(URL_COLUMNS);

        let mut products = Vec::new();
        let mut dropped = 0usize;

        for (line, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(line = line + 2, error = %e, "skipping malformed catalog record");
                    dropped += 1;
                    continue;
                }
            };

            let field = |idx: usize| record.get(idx).unwrap_or("").trim();
            let optional = |idx: Option<usize>| {
                idx.map(field)
                    .filter(|v| !v.is_empty())
                    .unwrap_or(NOT_AVAILABLE)
                    .to_string()
            };

            let ingredients = field(idx_ingredients);
            let category = field(idx_category);
            if ingredients.is_empty() || category.is_empty() {
                dropped += 1;
                continue;
            }

            products.push(Product {
                name: field(idx_name).to_string(),
                category: category.to_string(),
                ingredients: ingredients.to_string(),
                price: optional(idx_price),
                url: optional(idx_url),
            });
        }

        tracing::debug!(kept = products.len(), dropped, "parsed catalog");
        Ok(Self { products })
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Product> {
        self.products.get(row)
    }

    /// Rows whose category contains `label` (case-insensitive), with their
    /// row indices, in catalog order.
    pub fn filter_by_label(&self, label: &str) -> Vec<(usize, &Product)> {
        let needle = label.to_lowercase();
        self.products
            .iter()
            .enumerate()
            .filter(|(_, p)| p.category.to_lowercase().contains(&needle))
            .collect()
    }

    /// Row counts per distinct category value.
    pub fn category_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for p in &self.products {
            *counts.entry(p.category.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
product_name,product_url,product_type,ingredients,price
Gentle Foam,https://shop.test/foam,Cleanser,\"Aqua, Salicylic Acid, Glycerin\",£8.50
No Ingredients,https://shop.test/none,Cleanser,,£3.00
Rich Cream,,Moisturiser,\"Ceramide NP, Squalane\",
Uncategorised,,,\"Water\",£1.00
";

    #[test]
    fn test_drops_rows_missing_required_fields() {
        let catalog = Catalog::from_csv_reader(CSV.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(0).unwrap().name, "Gentle Foam");
        assert_eq!(catalog.get(1).unwrap().name, "Rich Cream");
    }

    #[test]
    fn test_optional_fields_default_to_sentinel() {
        let catalog = Catalog::from_csv_reader(CSV.as_bytes()).unwrap();
        let cream = catalog.get(1).unwrap();
        assert_eq!(cream.price, NOT_AVAILABLE);
        assert_eq!(cream.url, NOT_AVAILABLE);
        assert!(!cream.has_url());

        let foam = catalog.get(0).unwrap();
        assert_eq!(foam.price, "£8.50");
        assert_eq!(foam.url, "https://shop.test/foam");
    }

    #[test]
    fn test_category_alias_column() {
        let csv = "name,category,ingredients\nA,Exfoliator,glycolic acid\n";
        let catalog = Catalog::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(0).unwrap().category, "Exfoliator");
    }

    #[test]
    fn test_canonical_columns_win_over_aliases() {
        let csv = "\
name,product_name,category,product_type,url,ingredients,product_url
Acme,Real Name,Skincare,Cleanser,https://acme.test,water,https://shop.test/real
";
        let catalog = Catalog::from_csv_reader(csv.as_bytes()).unwrap();
        let product = catalog.get(0).unwrap();
        assert_eq!(product.name, "Real Name");
        assert_eq!(product.category, "Cleanser");
        assert_eq!(product.url, "https://shop.test/real");
        assert!(catalog.filter_by_label("skincare").is_empty());
    }

    #[test]
    fn test_missing_required_column_is_unavailable() {
        let csv = "product_name,price\nA,1\n";
        let err = Catalog::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, RankError::CatalogUnavailable(_)));
    }

    #[test]
    fn test_filter_by_label_is_case_insensitive_substring() {
        let catalog = Catalog::from_products(vec![
            Product::new("a", "Facial Cleanser", "water"),
            Product::new("b", "Moisturiser", "water"),
            Product::new("c", "cleanser (oil)", "water"),
        ]);
        let rows: Vec<usize> = catalog
            .filter_by_label("Cleanser")
            .into_iter()
            .map(|(i, _)| i)
            .collect();
        assert_eq!(rows, vec![0, 2]);
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let catalog = Catalog::from_products(vec![
            Product::new("Same", "Cleanser", "water"),
            Product::new("Same", "Cleanser", "water"),
        ]);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_category_counts() {
        let catalog = Catalog::from_csv_reader(CSV.as_bytes()).unwrap();
        let counts = catalog.category_counts();
        assert_eq!(counts.get("Cleanser"), Some(&1));
        assert_eq!(counts.get("Moisturiser"), Some(&1));
    }
}
