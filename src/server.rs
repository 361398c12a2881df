//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version and catalog size) |
//! | `GET`  | `/categories` | Configured categories and their catalog labels |
//! | `POST` | `/search` | Rank products for a set of categories |
//! | `POST` | `/recommend` | Severity → ingredients → products (→ plan) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "top_k must be >= 1" } }
//! ```
//!
//! Error codes: `bad_request` (400), `recommender_disabled` (400),
//! `upstream_error` (502).
//!
//! Per-category ranking failures are not HTTP errors: the category comes
//! back empty and the failure is listed under `diagnostics`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use skincare_rag_core::models::QuerySet;

use crate::config::Config;
use crate::recommend::{recommend, IngredientRecommender};
use crate::search::Searcher;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    searcher: Arc<Searcher>,
    recommender: Option<Arc<IngredientRecommender>>,
}

impl AppState {
    pub fn new(searcher: Searcher, recommender: Option<IngredientRecommender>) -> Self {
        Self {
            searcher: Arc::new(searcher),
            recommender: recommender.map(Arc::new),
        }
    }
}

/// Build the router for `state`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/categories", get(handle_categories))
        .route("/search", post(handle_search))
        .route("/recommend", post(handle_recommend))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind`.
///
/// The catalog is loaded and the vectorizer selected once, before binding.
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let searcher = Searcher::from_config(config)?;
    let recommender = IngredientRecommender::from_config(&config.recommender)?;
    let app = router(AppState::new(searcher, recommender));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("skinrag listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn recommender_disabled() -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "recommender_disabled".to_string(),
        message: "recommender is disabled; set [recommender] provider in config".to_string(),
    }
}

fn upstream_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream_error".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    products: usize,
    vectorizer: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        products: state.searcher.catalog().len(),
        vectorizer: state.searcher.vectorizer_name().to_string(),
    })
}

// ============ GET /categories ============

#[derive(Serialize)]
struct CategoryInfo {
    category: String,
    label: String,
    products: usize,
}

#[derive(Serialize)]
struct CategoriesResponse {
    categories: Vec<CategoryInfo>,
}

async fn handle_categories(State(state): State<AppState>) -> Json<CategoriesResponse> {
    let catalog = state.searcher.catalog();
    let categories = state
        .searcher
        .categories()
        .iter()
        .map(|(category, label)| CategoryInfo {
            category: category.to_string(),
            label: label.to_string(),
            products: catalog.filter_by_label(label).len(),
        })
        .collect();
    Json(CategoriesResponse { categories })
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    queries: QuerySet,
    #[serde(default)]
    top_k: Option<usize>,
}

/// Handler for `POST /search`.
///
/// Returns `{ "results": { "<category>": [...] }, "diagnostics": [...] }`
/// with categories in request order.
async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.top_k == Some(0) {
        return Err(bad_request("top_k must be >= 1"));
    }

    let results = state.searcher.search_all(&req.queries, req.top_k).await;
    let body = serde_json::to_value(&results).map_err(|e| bad_request(e.to_string()))?;
    Ok(Json(body))
}

// ============ POST /recommend ============

#[derive(Deserialize)]
struct RecommendRequest {
    severity: String,
    #[serde(default)]
    plan: bool,
}

async fn handle_recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.severity.trim().is_empty() {
        return Err(bad_request("severity must not be empty"));
    }
    let recommender = state.recommender.as_ref().ok_or_else(recommender_disabled)?;

    let rec = recommend(recommender, &state.searcher, &req.severity, req.plan)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "recommendation failed");
            upstream_error(e.to_string())
        })?;

    let body = serde_json::to_value(&rec).map_err(|e| upstream_error(e.to_string()))?;
    Ok(Json(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skincare_rag_core::catalog::Catalog;
    use skincare_rag_core::models::Product;
    use crate::embedding::PooledLexicalVectorizer;

    async fn spawn() -> String {
        let catalog = Catalog::from_products(vec![
            Product::new("Salicylic Wash", "Cleanser", "water, salicylic acid, glycerin")
                .with_price("£9.00"),
            Product::new("Night Cream", "Moisturiser", "water, ceramides"),
        ]);
        let searcher = Searcher::new(
            catalog,
            &Config::minimal(),
            Box::new(PooledLexicalVectorizer::new()),
        );
        let app = router(AppState::new(searcher, None));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_health_and_categories() {
        let base = spawn().await;
        let client = reqwest::Client::new();

        let health: serde_json::Value = client
            .get(format!("{}/health", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["products"], 2);
        assert_eq!(health["vectorizer"], "lexical");

        let cats: serde_json::Value = client
            .get(format!("{}/categories", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let cleanser = cats["categories"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["category"] == "cleanser")
            .unwrap();
        assert_eq!(cleanser["label"], "Cleanser");
        assert_eq!(cleanser["products"], 1);
    }

    #[tokio::test]
    async fn test_search_endpoint() {
        let base = spawn().await;
        let resp = reqwest::Client::new()
            .post(format!("{}/search", base))
            .json(&serde_json::json!({
                "queries": { "serum": ["niacinamide"], "cleanser": ["salicylic acid"] }
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();

        let keys: Vec<&String> = body["results"].as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(body["results"]["cleanser"][0]["product_name"], "Salicylic Wash");
        assert_eq!(body["results"]["cleanser"][0]["price"], "£9.00");
        assert_eq!(body["results"]["serum"], serde_json::json!([]));
        assert_eq!(body["diagnostics"][0]["code"], "unknown_category");
    }

    #[tokio::test]
    async fn test_search_rejects_zero_top_k() {
        let base = spawn().await;
        let resp = reqwest::Client::new()
            .post(format!("{}/search", base))
            .json(&serde_json::json!({ "queries": {}, "top_k": 0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_recommend_disabled() {
        let base = spawn().await;
        let resp = reqwest::Client::new()
            .post(format!("{}/recommend", base))
            .json(&serde_json::json!({ "severity": "level 2" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "recommender_disabled");
    }
}
