//! Vectorizer selection and the external embedding client.
//!
//! [`create_vectorizer`] picks the [`Vectorizer`] once, from configuration:
//! - **`lexical`** — in-process TF-IDF ([`LexicalVectorizer`]), run on
//!   tokio's blocking pool by [`PooledLexicalVectorizer`].
//! - **`openai`** — `POST {url}/v1/embeddings` (default `https://api.openai.com`),
//!   authenticated with `OPENAI_API_KEY`.
//! - **`ollama`** — `POST {url}/api/embed` (default `http://localhost:11434`).
//!
//! The embedding client sends corpus and query as one batch and expects one
//! vector per input, in order, all of the configured dimensionality.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use skincare_rag_core::error::VectorizeError;
use skincare_rag_core::vector::TermVector;
use skincare_rag_core::vectorize::{LexicalVectorizer, Vectorizer, Vectors};

use crate::config::VectorizerConfig;

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// [`LexicalVectorizer`] whose TF-IDF fit runs on tokio's blocking pool,
/// so large categories never stall the async workers serving requests.
#[derive(Clone, Default)]
pub struct PooledLexicalVectorizer {
    inner: Arc<LexicalVectorizer>,
}

impl PooledLexicalVectorizer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Vectorizer for PooledLexicalVectorizer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn vectorize(&self, corpus: &[String], query: &str) -> Result<Vectors, VectorizeError> {
        let inner = Arc::clone(&self.inner);
        let corpus = corpus.to_vec();
        let query = query.to_string();

        match tokio::task::spawn_blocking(move || inner.transform(&corpus, &query)).await {
            Ok(result) => result,
            // Re-raise so the caller's panic isolation reports it as aborted.
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(VectorizeError::Worker(e.to_string())),
        }
    }
}

/// Wire format spoken by an embedding service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingApi {
    OpenAI,
    Ollama,
}

impl EmbeddingApi {
    fn name(self) -> &'static str {
        match self {
            EmbeddingApi::OpenAI => "openai",
            EmbeddingApi::Ollama => "ollama",
        }
    }
}

/// [`Vectorizer`] backed by an external embedding service.
pub struct EmbeddingVectorizer {
    api: EmbeddingApi,
    client: reqwest::Client,
    url: String,
    model: String,
    dims: usize,
    api_key: Option<String>,
    max_retries: u32,
}

impl EmbeddingVectorizer {
    /// Build a client for `api` from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `model` or `dims` is not set, or if the OpenAI
    /// API is selected and `OPENAI_API_KEY` is not in the environment.
    pub fn new(api: EmbeddingApi, config: &VectorizerConfig) -> Result<Self> {
        let model = config.model.clone().ok_or_else(|| {
            anyhow::anyhow!("vectorizer.model required for {} provider", api.name())
        })?;
        let dims = config.dims.ok_or_else(|| {
            anyhow::anyhow!("vectorizer.dims required for {} provider", api.name())
        })?;

        let api_key = match api {
            EmbeddingApi::OpenAI => Some(
                std::env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?,
            ),
            EmbeddingApi::Ollama => None,
        };

        let url = config
            .url
            .clone()
            .unwrap_or_else(|| match api {
                EmbeddingApi::OpenAI => OPENAI_DEFAULT_URL.to_string(),
                EmbeddingApi::Ollama => OLLAMA_DEFAULT_URL.to_string(),
            })
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api,
            client,
            url,
            model,
            dims,
            api_key,
            max_retries: config.max_retries,
        })
    }

    fn endpoint(&self) -> String {
        match self.api {
            EmbeddingApi::OpenAI => format!("{}/v1/embeddings", self.url),
            EmbeddingApi::Ollama => format!("{}/api/embed", self.url),
        }
    }

    /// Embed `texts` in one request, with retry/backoff.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, VectorizeError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let endpoint = self.endpoint();
        let service = self.api.name();

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .client
                .post(&endpoint)
                .header("Content-Type", "application/json")
                .json(&body);
            if let Some(key) = &self.api_key {
                request = request.header("Authorization", format!("Bearer {}", key));
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await.map_err(|e| {
                            VectorizeError::EmbeddingService(format!("invalid {service} response: {e}"))
                        })?;
                        return match self.api {
                            EmbeddingApi::OpenAI => parse_openai_response(&json),
                            EmbeddingApi::Ollama => parse_ollama_response(&json),
                        };
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = VectorizeError::EmbeddingService(format!(
                        "{service} API error {status}: {body_text}"
                    ));

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(attempt, %status, "embedding request failed; retrying");
                        last_err = Some(err);
                        continue;
                    }

                    return Err(err);
                }
                Err(e) => {
                    let kind = if e.is_timeout() { "timed out" } else { "connection error" };
                    tracing::warn!(attempt, error = %e, "embedding request {}", kind);
                    last_err = Some(VectorizeError::EmbeddingService(format!(
                        "{service} request {kind} ({endpoint}): {e}"
                    )));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            VectorizeError::EmbeddingService("embedding failed after retries".to_string())
        }))
    }
}

#[async_trait]
impl Vectorizer for EmbeddingVectorizer {
    fn name(&self) -> &str {
        self.api.name()
    }

    async fn vectorize(&self, corpus: &[String], query: &str) -> Result<Vectors, VectorizeError> {
        let mut texts = corpus.to_vec();
        texts.push(query.to_string());

        let mut embeddings = self.embed_batch(&texts).await?;
        check_batch(&embeddings, texts.len(), self.dims)?;

        let query = embeddings
            .pop()
            .ok_or(VectorizeError::CountMismatch {
                expected: texts.len(),
                got: 0,
            })?;

        Ok(Vectors {
            query: TermVector::Dense(query),
            products: embeddings.into_iter().map(TermVector::Dense).collect(),
        })
    }
}

/// Verify count and dimensionality of a returned batch.
fn check_batch(embeddings: &[Vec<f32>], expected: usize, dims: usize) -> Result<(), VectorizeError> {
    if embeddings.len() != expected {
        return Err(VectorizeError::CountMismatch {
            expected,
            got: embeddings.len(),
        });
    }
    if let Some((index, v)) = embeddings.iter().enumerate().find(|(_, v)| v.len() != dims) {
        return Err(VectorizeError::DimensionMismatch {
            index,
            expected: dims,
            got: v.len(),
        });
    }
    Ok(())
}

/// Parse the OpenAI embeddings API response JSON.
///
/// Orders `data[]` by its `index` field so vectors line up with inputs.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, VectorizeError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| invalid("openai", "missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| invalid("openai", "missing embedding"))?;
        indexed.push((index, to_f32_vec("openai", embedding)?));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, VectorizeError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| invalid("ollama", "missing embeddings array"))?;

    embeddings
        .iter()
        .map(|embedding| {
            embedding
                .as_array()
                .ok_or_else(|| invalid("ollama", "embedding is not an array"))
                .and_then(|a| to_f32_vec("ollama", a))
        })
        .collect()
}

fn to_f32_vec(service: &str, values: &[serde_json::Value]) -> Result<Vec<f32>, VectorizeError> {
    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| invalid(service, "non-numeric embedding value"))
        })
        .collect()
}

fn invalid(service: &str, what: &str) -> VectorizeError {
    VectorizeError::EmbeddingService(format!("Invalid {service} response: {what}"))
}

/// Create the configured [`Vectorizer`].
///
/// # Supported Providers
///
/// | Config Value | Vectorizer |
/// |-------------|----------|
/// | `"lexical"` | [`PooledLexicalVectorizer`] |
/// | `"openai"` | [`EmbeddingVectorizer`] (OpenAI API) |
/// | `"ollama"` | [`EmbeddingVectorizer`] (Ollama API) |
pub fn create_vectorizer(config: &VectorizerConfig) -> Result<Box<dyn Vectorizer>> {
    match config.provider.as_str() {
        "lexical" => Ok(Box::new(PooledLexicalVectorizer::new())),
        "openai" => Ok(Box::new(EmbeddingVectorizer::new(EmbeddingApi::OpenAI, config)?)),
        "ollama" => Ok(Box::new(EmbeddingVectorizer::new(EmbeddingApi::Ollama, config)?)),
        other => bail!("Unknown vectorizer provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openai_orders_by_index() {
        let json = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let vecs = parse_openai_response(&json).unwrap();
        assert_eq!(vecs, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_openai_missing_data() {
        let err = parse_openai_response(&serde_json::json!({})).unwrap_err();
        assert!(err.to_string().contains("missing data array"));
    }

    #[test]
    fn test_parse_ollama() {
        let json = serde_json::json!({ "embeddings": [[0.5, 0.5], [1.0, 0.0]] });
        let vecs = parse_ollama_response(&json).unwrap();
        assert_eq!(vecs.len(), 2);
        assert_eq!(vecs[1], vec![1.0, 0.0]);
    }

    #[test]
    fn test_non_numeric_embedding_value_is_an_error() {
        let ollama = serde_json::json!({ "embeddings": [[0.5, "oops"], [1.0, 0.0]] });
        let err = parse_ollama_response(&ollama).unwrap_err();
        assert!(matches!(err, VectorizeError::EmbeddingService(_)));
        assert!(err.to_string().contains("non-numeric embedding value"));

        let openai = serde_json::json!({
            "data": [{ "index": 0, "embedding": [0.5, null] }]
        });
        let err = parse_openai_response(&openai).unwrap_err();
        assert!(err.to_string().contains("Invalid openai response"));
    }

    #[test]
    fn test_check_batch_count_and_dims() {
        let ok = vec![vec![0.0; 3], vec![0.0; 3]];
        assert!(check_batch(&ok, 2, 3).is_ok());
        assert!(matches!(
            check_batch(&ok, 3, 3),
            Err(VectorizeError::CountMismatch { expected: 3, got: 2 })
        ));
        let ragged = vec![vec![0.0; 3], vec![0.0; 2]];
        assert!(matches!(
            check_batch(&ragged, 2, 3),
            Err(VectorizeError::DimensionMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_create_lexical_by_default() {
        let v = create_vectorizer(&VectorizerConfig::default()).unwrap();
        assert_eq!(v.name(), "lexical");
    }

    #[tokio::test]
    async fn test_pooled_lexical_matches_inline() {
        let corpus = vec![
            "salicylic acid, water".to_string(),
            "niacinamide, glycerin".to_string(),
        ];
        let pooled = PooledLexicalVectorizer::new()
            .vectorize(&corpus, "salicylic acid")
            .await
            .unwrap();
        let inline = LexicalVectorizer::new().transform(&corpus, "salicylic acid").unwrap();
        assert_eq!(pooled, inline);
    }

    #[tokio::test]
    async fn test_pooled_lexical_reports_empty_vocabulary() {
        let err = PooledLexicalVectorizer::new()
            .vectorize(&["the and".to_string()], "of")
            .await
            .unwrap_err();
        assert!(matches!(err, VectorizeError::EmptyVocabulary));
    }

    #[test]
    fn test_create_ollama_uses_default_url() {
        let config = VectorizerConfig {
            provider: "ollama".to_string(),
            model: Some("nomic-embed-text".to_string()),
            dims: Some(768),
            ..VectorizerConfig::default()
        };
        let v = EmbeddingVectorizer::new(EmbeddingApi::Ollama, &config).unwrap();
        assert_eq!(v.endpoint(), "http://localhost:11434/api/embed");
    }

    #[test]
    fn test_create_requires_model() {
        let config = VectorizerConfig {
            provider: "ollama".to_string(),
            dims: Some(768),
            ..VectorizerConfig::default()
        };
        assert!(create_vectorizer(&config).is_err());
    }
}
