//! Text and JSON rendering of search results.

use skincare_rag_core::models::AggregateResult;

/// Render results the way the CLI prints them.
///
/// ```text
///
/// === CLEANSER PRODUCTS ===
/// 1. Gentle Foam
///    Price: £8.50 | Matches: 1 | Score: 0.982
///    URL: https://example.com/foam
/// ```
///
/// A category without products prints `No matching <category> products found.`
pub fn render_text(results: &AggregateResult<'_>) -> String {
    let mut out = Vec::new();

    for category in &results.categories {
        out.push(format!(
            "\n=== {} PRODUCTS ===",
            category.category.to_uppercase()
        ));

        if category.products.is_empty() {
            out.push(format!("No matching {} products found.", category.category));
            continue;
        }

        for (i, p) in category.products.iter().enumerate() {
            out.push(format!("{}. {}", i + 1, p.product.name));
            out.push(format!(
                "   Price: {} | Matches: {} | Score: {}",
                p.product.price, p.exact_match_count, p.combined_score
            ));
            if p.product.has_url() {
                out.push(format!("   URL: {}", p.product.url));
            }
        }
    }

    out.join("\n")
}

/// Render results as pretty JSON.
pub fn render_json(results: &AggregateResult<'_>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use skincare_rag_core::models::{CategoryResult, Diagnostic, Product, ScoredProduct};

    fn sample(product: &Product) -> AggregateResult<'_> {
        AggregateResult {
            categories: vec![
                CategoryResult {
                    category: "cleanser".to_string(),
                    products: vec![ScoredProduct {
                        row: 0,
                        product,
                        similarity_score: 0.682,
                        exact_match_count: 1,
                        combined_score: 0.982,
                    }],
                },
                CategoryResult {
                    category: "moisturizer".to_string(),
                    products: Vec::new(),
                },
            ],
            diagnostics: vec![Diagnostic {
                category: "moisturizer".to_string(),
                code: "unknown_category".to_string(),
                message: "unknown category: moisturizer".to_string(),
            }],
        }
    }

    #[test]
    fn test_text_layout() {
        let product = Product::new("Gentle Foam", "Cleanser", "water, zinc")
            .with_price("£8.50")
            .with_url("https://example.com/foam");
        let text = render_text(&sample(&product));
        assert_eq!(
            text,
            "\n=== CLEANSER PRODUCTS ===\n\
             1. Gentle Foam\n   \
             Price: £8.50 | Matches: 1 | Score: 0.982\n   \
             URL: https://example.com/foam\n\
             \n=== MOISTURIZER PRODUCTS ===\n\
             No matching moisturizer products found."
        );
    }

    #[test]
    fn test_text_hides_missing_url() {
        let product = Product::new("Gentle Foam", "Cleanser", "water, zinc");
        let text = render_text(&sample(&product));
        assert!(text.contains("Price: N/A"));
        assert!(!text.contains("URL:"));
    }

    #[test]
    fn test_json_shape() {
        let product = Product::new("Gentle Foam", "Cleanser", "water, zinc");
        let json: serde_json::Value =
            serde_json::from_str(&render_json(&sample(&product)).unwrap()).unwrap();
        let first = &json["results"]["cleanser"][0];
        assert_eq!(first["product_name"], "Gentle Foam");
        assert_eq!(first["exact_matches"], 1);
        assert_eq!(first["combined_score"], 0.982);
        assert_eq!(json["results"]["moisturizer"], serde_json::json!([]));
        assert_eq!(json["diagnostics"][0]["code"], "unknown_category");
    }
}
