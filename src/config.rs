//! TOML configuration.
//!
//! Every section has defaults, so an empty file is a valid configuration
//! that ranks with the lexical vectorizer against `./skincare_products.csv`.
//! API keys are read from the environment, never from the file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use skincare_rag_core::category::CategoryMap;
use skincare_rag_core::rank::RankParams;
use skincare_rag_core::scoring::MatchMode;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default = "default_categories")]
    pub categories: BTreeMap<String, String>,
    #[serde(default)]
    pub vectorizer: VectorizerConfig,
    #[serde(default)]
    pub recommender: RecommenderConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("./skincare_products.csv")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_threshold")]
    pub min_relevance_threshold: f64,
    #[serde(default = "default_bonus")]
    pub exact_match_bonus: f64,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            min_relevance_threshold: default_threshold(),
            exact_match_bonus: default_bonus(),
            match_mode: MatchMode::default(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_top_k() -> usize {
    3
}
fn default_threshold() -> f64 {
    0.1
}
fn default_bonus() -> f64 {
    0.3
}
fn default_max_concurrency() -> usize {
    3
}

fn default_categories() -> BTreeMap<String, String> {
    CategoryMap::default()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorizerConfig {
    #[serde(default = "default_vectorizer_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL; defaults depend on the provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            provider: default_vectorizer_provider(),
            model: None,
            dims: None,
            url: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_vectorizer_provider() -> String {
    "lexical".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecommenderConfig {
    #[serde(default = "default_recommender_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            provider: default_recommender_provider(),
            model: default_chat_model(),
            url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_chat_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_recommender_provider() -> String {
    "disabled".to_string()
}
fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    800
}
fn default_chat_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5001".to_string()
}

impl RecommenderConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl Config {
    /// Defaults for every section, used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            categories: default_categories(),
            ..Self::default()
        }
    }

    pub fn rank_params(&self) -> RankParams {
        RankParams {
            top_k: self.retrieval.top_k,
            min_relevance_threshold: self.retrieval.min_relevance_threshold,
            exact_match_bonus: self.retrieval.exact_match_bonus,
            match_mode: self.retrieval.match_mode,
        }
    }

    pub fn category_map(&self) -> CategoryMap {
        CategoryMap::new(self.categories.iter().map(|(k, v)| (k, v.clone())))
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }
        if r.max_concurrency < 1 {
            bail!("retrieval.max_concurrency must be >= 1");
        }
        if !r.min_relevance_threshold.is_finite() {
            bail!("retrieval.min_relevance_threshold must be a finite number");
        }
        if !r.exact_match_bonus.is_finite() || r.exact_match_bonus < 0.0 {
            bail!("retrieval.exact_match_bonus must be a finite number >= 0");
        }

        if self.categories.is_empty() {
            bail!("[categories] must map at least one category");
        }
        if let Some((key, _)) = self.categories.iter().find(|(_, v)| v.trim().is_empty()) {
            bail!("categories.{} must not be empty", key);
        }

        match self.vectorizer.provider.as_str() {
            "lexical" => {}
            "openai" | "ollama" => {
                if self.vectorizer.model.is_none() {
                    bail!(
                        "vectorizer.model must be specified when provider is '{}'",
                        self.vectorizer.provider
                    );
                }
                if self.vectorizer.dims.is_none() || self.vectorizer.dims == Some(0) {
                    bail!(
                        "vectorizer.dims must be > 0 when provider is '{}'",
                        self.vectorizer.provider
                    );
                }
            }
            other => bail!(
                "Unknown vectorizer provider: '{}'. Must be lexical, openai, or ollama.",
                other
            ),
        }

        match self.recommender.provider.as_str() {
            "disabled" | "openai" => {}
            other => bail!(
                "Unknown recommender provider: '{}'. Must be disabled or openai.",
                other
            ),
        }

        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}
