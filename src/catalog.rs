//! Catalog loading and the `skinrag catalog` command.
//!
//! Loading fails open: a missing or unreadable catalog file becomes an
//! empty [`Catalog`] and an error log, so the rest of the pipeline keeps
//! working and every search returns no products.

use std::fs::File;
use std::path::Path;

use skincare_rag_core::catalog::Catalog;
use skincare_rag_core::error::RankError;

use crate::config::Config;

/// Load the catalog at `path`, or an empty catalog if that fails.
pub fn load_catalog(path: &Path) -> Catalog {
    match try_load_catalog(path) {
        Ok(catalog) => {
            tracing::info!(path = %path.display(), products = catalog.len(), "loaded skincare products");
            catalog
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "catalog unavailable; continuing with an empty catalog");
            Catalog::empty()
        }
    }
}

/// Load the catalog at `path`, reporting why it is unavailable.
pub fn try_load_catalog(path: &Path) -> Result<Catalog, RankError> {
    let file = File::open(path).map_err(|e| {
        RankError::CatalogUnavailable(format!("cannot open {}: {}", path.display(), e))
    })?;
    Catalog::from_csv_reader(file)
}

/// Print per-category product counts and which configured categories
/// each catalog label serves.
pub fn run_catalog(config: &Config) -> anyhow::Result<()> {
    let catalog = load_catalog(&config.catalog.path);

    println!("Catalog: {}", config.catalog.path.display());
    println!("Products: {}", catalog.len());
    if catalog.is_empty() {
        println!("No products loaded.");
        return Ok(());
    }

    println!();
    println!("{:<40} {:>8}", "PRODUCT TYPE", "COUNT");
    for (category, count) in catalog.category_counts() {
        println!("{:<40} {:>8}", category, count);
    }

    println!();
    println!("{:<16} {:<20} {:>8}", "CATEGORY", "LABEL", "MATCHES");
    for (key, label) in config.category_map().iter() {
        println!(
            "{:<16} {:<20} {:>8}",
            key,
            label,
            catalog.filter_by_label(label).len()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_empty_catalog() {
        let tmp = tempfile::TempDir::new().unwrap();
        let catalog = load_catalog(&tmp.path().join("nope.csv"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_try_load_reports_missing_file() {
        let err = try_load_catalog(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.code(), "catalog_unavailable");
    }

    #[test]
    fn test_loads_csv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "product_name,product_type,ingredients").unwrap();
        writeln!(file, "Foam,Cleanser,\"water, glycerin\"").unwrap();
        writeln!(file, "Broken,,\"water\"").unwrap();
        let catalog = load_catalog(file.path());
        assert_eq!(catalog.len(), 1);
    }
}
