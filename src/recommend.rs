//! Severity → ingredient recommendations → routine plan.
//!
//! A [`ChatModel`] answers two prompts: which ingredient suits each
//! product category for a severity, and a daily routine built from the
//! products retrieved for those ingredients. The answer to the first is
//! parsed into a [`QuerySet`] by [`parse_recommendations`].
//!
//! The only provider is the OpenAI chat-completions API ([`OpenAIChat`]);
//! `OPENAI_API_KEY` must be set in the environment.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

use skincare_rag_core::models::{AggregateResult, QuerySet};

use crate::config::{Config, RecommenderConfig};
use crate::format::render_text;
use crate::search::Searcher;

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com";

/// Categories the recommendation prompt asks about, in output order.
pub const RECOMMENDATION_CATEGORIES: [&str; 3] = ["cleanser", "moisturizer", "exfoliator"];

/// Classifier labels and their severity names.
const SEVERITY_LABELS: [(&str, &str); 5] = [
    ("level -1", "clear_skin"),
    ("level 0", "very_mild"),
    ("level 1", "mild"),
    ("level 2", "moderate"),
    ("level 3", "severe"),
];

/// Map a classifier label such as `level 2` to its severity name.
///
/// Unknown labels, including severity names themselves, pass through.
pub fn severity_name(label: &str) -> &str {
    let trimmed = label.trim();
    SEVERITY_LABELS
        .iter()
        .find(|(l, _)| l.eq_ignore_ascii_case(trimmed))
        .map(|(_, name)| *name)
        .unwrap_or(trimmed)
}

/// Parse one recommendation line into ingredients.
///
/// `Cleanser: salicylic acid, tea tree` yields both ingredients; a line
/// without a colon is read as a bare comma-separated list.
pub fn parse_ingredient_line(line: &str) -> Vec<String> {
    let line = line.trim();
    let list = match line.split_once(':') {
        Some((_, rest)) => rest,
        None => line,
    };
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a recommendation answer into per-category ingredients.
///
/// A line mentioning a category (case-insensitive) sets that category's
/// ingredients; a later line for the same category wins. The result always
/// holds all [`RECOMMENDATION_CATEGORIES`], in order, possibly empty.
pub fn parse_recommendations(text: &str) -> QuerySet {
    let mut parsed = QuerySet::new();
    for category in RECOMMENDATION_CATEGORIES {
        parsed.insert(category, Vec::<String>::new());
    }

    for line in text.lines() {
        let lower = line.to_lowercase();
        if let Some(category) = RECOMMENDATION_CATEGORIES
            .iter()
            .find(|c| lower.contains(*c))
        {
            parsed.insert(*category, parse_ingredient_line(line));
        }
    }
    parsed
}

fn recommendation_prompt(severity: &str) -> String {
    format!(
        "For {severity} acne, pick only 1 ingredient that best suits severity level: \
         1) Cleanser 2) Moisturizer 3) Exfoliator? Provide only ingredient names separated \
         by commas for each category. Each line should be [Category]: [Ingredient] \
         (This is a plan so please make a treatment for each possible ingredient unique \
         per severity, you are allowed to list non-acne treatment ingredients)."
    )
}

const PLAN_SYSTEM_PROMPT: &str = "You are a dermatology expert creating personalized skincare \
routines. Use the provided product recommendations to create a detailed, easy-to-follow daily plan.";

fn plan_prompt(severity: &str, recommendations: &str, context: &str) -> String {
    format!(
        "Based on the following information, create a detailed daily skincare routine:\n\n\
         Acne Severity: {severity}\n\n\
         Recommended Ingredients:\n{recommendations}\n\n\
         Available Products:\n{context}\n\n\
         Please create a comprehensive daily skincare routine with:\n\
         1. Morning Routine (step-by-step)\n\
         2. Evening Routine (step-by-step)\n\
         3. Additional Tips specific to {severity} acne\n\n\
         Be specific about which products to use when, and include the product names \
         from the recommendations above."
    )
}

/// Render severity, recommendations and retrieved products as plan context.
pub fn build_context(severity: &str, recommendations: &str, results: &AggregateResult<'_>) -> String {
    let mut parts = vec![
        format!("Acne Severity Level: {}", severity),
        format!("\nRecommended Ingredients:\n{}", recommendations),
        "\nRetrieved Products:\n".to_string(),
    ];

    for category in &results.categories {
        let title = category.category.to_uppercase();
        if category.products.is_empty() {
            parts.push(format!("\n{}: No specific products found", title));
            continue;
        }
        parts.push(format!("\n{}:", title));
        for (i, p) in category.products.iter().enumerate() {
            parts.push(format!(
                "  {}. {} (Exact matches: {}, Relevance: {})",
                i + 1,
                p.product.name,
                p.exact_match_count,
                p.combined_score
            ));
        }
    }

    parts.join("\n")
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A text-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// OpenAI chat-completions client.
///
/// Retries HTTP 429, 5xx and network errors with exponential backoff;
/// other 4xx responses fail immediately.
pub struct OpenAIChat {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    max_retries: u32,
}

impl OpenAIChat {
    pub fn new(config: &RecommenderConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let url = config
            .url
            .as_deref()
            .unwrap_or(OPENAI_DEFAULT_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            url,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        let endpoint = format!("{}/v1/chat/completions", self.url);

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&endpoint)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();

                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(attempt, %status, "chat request failed; retrying");
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "chat request failed");
                    last_err = Some(e.into());
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("chat completion failed after retries")))
    }
}

fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

/// Asks a [`ChatModel`] for ingredients and routines.
pub struct IngredientRecommender {
    chat: Box<dyn ChatModel>,
}

impl IngredientRecommender {
    pub fn new(chat: Box<dyn ChatModel>) -> Self {
        Self { chat }
    }

    /// Build the configured recommender, or `None` when it is disabled.
    pub fn from_config(config: &RecommenderConfig) -> Result<Option<Self>> {
        match config.provider.as_str() {
            "disabled" => Ok(None),
            "openai" => Ok(Some(Self::new(Box::new(OpenAIChat::new(config)?)))),
            other => bail!("Unknown recommender provider: {}", other),
        }
    }

    /// Raw recommendation text for `severity`.
    pub async fn get_recommendations(&self, severity: &str) -> Result<String> {
        tracing::info!(severity, "requesting ingredient recommendations");
        let text = self
            .chat
            .complete(&[ChatMessage::user(recommendation_prompt(severity))])
            .await?;
        tracing::info!("received ingredient recommendations");
        Ok(text)
    }

    /// A daily routine grounded in the retrieved products.
    pub async fn generate_daily_plan(
        &self,
        severity: &str,
        recommendations: &str,
        results: &AggregateResult<'_>,
    ) -> Result<String> {
        tracing::info!(severity, "generating daily plan");
        let context = build_context(severity, recommendations, results);
        let plan = self
            .chat
            .complete(&[
                ChatMessage::system(PLAN_SYSTEM_PROMPT),
                ChatMessage::user(plan_prompt(severity, recommendations, &context)),
            ])
            .await?;
        tracing::info!("generated daily plan");
        Ok(plan)
    }
}

/// Output of one recommend run.
#[derive(Debug, Serialize)]
pub struct Recommendation<'a> {
    pub severity: String,
    pub recommendations: String,
    pub ingredients: QuerySet,
    #[serde(flatten)]
    pub results: AggregateResult<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    pub generated_at: DateTime<Utc>,
}

/// Severity → recommendations → search → optional plan.
pub async fn recommend<'s>(
    recommender: &IngredientRecommender,
    searcher: &'s Searcher,
    severity_label: &str,
    with_plan: bool,
) -> Result<Recommendation<'s>> {
    let severity = severity_name(severity_label).to_string();
    let recommendations = recommender.get_recommendations(&severity).await?;
    let ingredients = parse_recommendations(&recommendations);
    let results = searcher.search_all(&ingredients, None).await;

    let plan = if with_plan {
        Some(
            recommender
                .generate_daily_plan(&severity, &recommendations, &results)
                .await?,
        )
    } else {
        None
    };

    Ok(Recommendation {
        severity,
        recommendations,
        ingredients,
        results,
        plan,
        generated_at: Utc::now(),
    })
}

/// The `skinrag recommend` command.
pub async fn run_recommend(config: &Config, severity: &str, plan: bool, json: bool) -> Result<()> {
    let recommender = match IngredientRecommender::from_config(&config.recommender)? {
        Some(r) => r,
        None => bail!("Recommender is disabled. Set [recommender] provider = \"openai\" in config."),
    };
    let searcher = Searcher::from_config(config)?;

    let rec = recommend(&recommender, &searcher, severity, plan).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rec)?);
        return Ok(());
    }

    println!("Severity: {}", rec.severity);
    println!();
    println!("Recommended ingredients:");
    println!("{}", rec.recommendations.trim());
    println!("{}", render_text(&rec.results));
    if let Some(plan) = &rec.plan {
        println!();
        println!("=== DAILY PLAN ===");
        println!("{}", plan.trim());
    }
    Ok(())
}
