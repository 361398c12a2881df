//! User-facing category keys → catalog category labels.

use std::collections::BTreeMap;

/// Fixed lookup table from category keys (`"cleanser"`) to the label
/// substring used in the catalog (`"Cleanser"`). Keys are matched
/// case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMap {
    labels: BTreeMap<String, String>,
}

impl CategoryMap {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            labels: entries
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Catalog label for `category`, or `None` if it is not mapped.
    pub fn resolve(&self, category: &str) -> Option<&str> {
        self.labels
            .get(&category.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for CategoryMap {
    fn default() -> Self {
        Self::new([
            ("cleanser", "Cleanser"),
            ("moisturizer", "Moisturiser"),
            ("exfoliator", "Exfoliator"),
        ])
    }
}
