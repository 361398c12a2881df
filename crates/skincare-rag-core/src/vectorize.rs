//! Text vectorization.
//!
//! The [`Vectorizer`] trait turns a corpus of ingredient strings plus one
//! query into vectors in a shared space. Two strategies implement it:
//!
//! - **[`LexicalVectorizer`]** — corpus-relative TF-IDF over unigrams and
//!   bigrams with English stop words removed. Pure, in-process.
//! - An external embedding client, implemented in the application crate.
//!
//! Both return vectors in submission order so callers can zip them back to
//! catalog rows without a matching key.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::VectorizeError;
use crate::vector::{SparseVector, TermVector};

/// Query and corpus vectors from one [`Vectorizer::vectorize`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Vectors {
    pub query: TermVector,
    /// One vector per corpus entry, in corpus order.
    pub products: Vec<TermVector>,
}

/// Converts a corpus and a query into comparable vectors.
#[async_trait]
pub trait Vectorizer: Send + Sync {
    /// Short identifier for logs (`"lexical"`, `"openai"`, ...).
    fn name(&self) -> &str;

    /// Vectorize `corpus` and `query` in one shared space.
    async fn vectorize(&self, corpus: &[String], query: &str) -> Result<Vectors, VectorizeError>;
}

/// English stop words removed before n-gram construction.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto", "or",
    "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "part",
    "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together", "too",
    "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up", "upon",
    "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence",
    "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever",
    "whether", "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why",
    "will", "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Corpus-relative TF-IDF vectorizer.
///
/// - Lowercases input and tokenizes into runs of two or more word
///   characters.
/// - Drops stop words, then emits unigrams and bigrams of the remaining
///   tokens.
/// - Weights raw term counts by smoothed IDF `ln((1 + n) / (1 + df)) + 1`
///   and L2-normalizes each row.
///
/// The vocabulary is fitted on corpus plus query together, so a query
/// disjoint from the corpus still vectorizes; its similarity to every row
/// is simply zero.
#[derive(Debug, Clone)]
pub struct LexicalVectorizer {
    stop_words: HashSet<&'static str>,
    max_ngram: usize,
}

impl Default for LexicalVectorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalVectorizer {
    pub fn new() -> Self {
        Self {
            stop_words: ENGLISH_STOP_WORDS.iter().copied().collect(),
            max_ngram: 2,
        }
    }

    /// Lowercased tokens of two or more word characters, stop words removed.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| t.chars().count() >= 2)
            .filter(|t| !self.stop_words.contains(t))
            .map(str::to_string)
            .collect()
    }

    /// Unigrams through `max_ngram`-grams, joined by single spaces.
    pub fn terms(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenize(text);
        let mut terms = tokens.clone();
        for n in 2..=self.max_ngram {
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    /// Fit on `docs` and return one normalized vector per document.
    pub fn fit_transform(&self, docs: &[&str]) -> Result<Vec<SparseVector>, VectorizeError> {
        let mut vocabulary: HashMap<String, u32> = HashMap::new();
        let mut counts: Vec<HashMap<u32, f64>> = Vec::with_capacity(docs.len());

        for doc in docs {
            let mut tf: HashMap<u32, f64> = HashMap::new();
            for term in self.terms(doc) {
                let next = vocabulary.len() as u32;
                let id = *vocabulary.entry(term).or_insert(next);
                *tf.entry(id).or_insert(0.0) += 1.0;
            }
            counts.push(tf);
        }

        if vocabulary.is_empty() {
            return Err(VectorizeError::EmptyVocabulary);
        }

        let mut df = vec![0usize; vocabulary.len()];
        for tf in &counts {
            for id in tf.keys() {
                df[*id as usize] += 1;
            }
        }

        let n = docs.len() as f64;
        let idf: Vec<f64> = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        Ok(counts
            .into_iter()
            .map(|tf| {
                let pairs = tf
                    .into_iter()
                    .map(|(id, count)| (id, count * idf[id as usize]))
                    .collect();
                SparseVector::from_pairs(pairs).normalized()
            })
            .collect())
    }

    /// Synchronous form of [`Vectorizer::vectorize`]: fit on corpus plus
    /// query and split the query vector off the end.
    ///
    /// CPU-bound; async callers with large catalogs should run it on a
    /// blocking thread.
    pub fn transform(&self, corpus: &[String], query: &str) -> Result<Vectors, VectorizeError> {
        let mut docs: Vec<&str> = corpus.iter().map(String::as_str).collect();
        docs.push(query);

        let mut vectors = self.fit_transform(&docs)?;
        let query = vectors
            .pop()
            .ok_or(VectorizeError::CountMismatch {
                expected: docs.len(),
                got: 0,
            })?;

        Ok(Vectors {
            query: TermVector::Sparse(query),
            products: vectors.into_iter().map(TermVector::Sparse).collect(),
        })
    }
}

#[async_trait]
impl Vectorizer for LexicalVectorizer {
    fn name(&self) -> &str {
        "lexical"
    }

    async fn vectorize(&self, corpus: &[String], query: &str) -> Result<Vectors, VectorizeError> {
        self.transform(corpus, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_drops_short_tokens_and_stop_words() {
        let v = LexicalVectorizer::new();
        assert_eq!(
            v.tokenize("Aqua (Water), Vitamin E, and the Salicylic-Acid"),
            vec!["aqua", "water", "vitamin", "salicylic", "acid"]
        );
    }

    #[test]
    fn test_bigrams_skip_removed_stop_words() {
        let v = LexicalVectorizer::new();
        let terms = v.terms("extract of green tea");
        assert!(terms.contains(&"extract green".to_string()));
        assert!(terms.contains(&"green tea".to_string()));
        assert!(!terms.iter().any(|t| t.contains("of")));
    }

    #[tokio::test]
    async fn test_vectorize_returns_one_vector_per_row() {
        let v = LexicalVectorizer::new();
        let corpus = vec![
            "salicylic acid, water".to_string(),
            "niacinamide, glycerin".to_string(),
            "zinc pca".to_string(),
        ];
        let out = v.vectorize(&corpus, "salicylic acid").await.unwrap();
        assert_eq!(out.products.len(), 3);
        assert!(out.query.cosine(&out.products[0]) > 0.0);
        assert_eq!(out.query.cosine(&out.products[1]), 0.0);
    }

    #[tokio::test]
    async fn test_single_row_corpus() {
        let v = LexicalVectorizer::new();
        let corpus = vec!["glycolic acid".to_string()];
        let out = v.vectorize(&corpus, "glycolic acid").await.unwrap();
        assert!((out.query.cosine(&out.products[0]) - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_disjoint_query_is_zero_not_error() {
        let v = LexicalVectorizer::new();
        let corpus = vec!["ceramide squalane".to_string()];
        let out = v.vectorize(&corpus, "retinol").await.unwrap();
        assert_eq!(out.query.cosine(&out.products[0]), 0.0);
    }

    #[tokio::test]
    async fn test_stop_word_only_input_is_empty_vocabulary() {
        let v = LexicalVectorizer::new();
        let corpus = vec!["the and of".to_string()];
        let err = v.vectorize(&corpus, "a").await.unwrap_err();
        assert!(matches!(err, VectorizeError::EmptyVocabulary));
    }

    #[tokio::test]
    async fn test_transform_matches_vectorize() {
        let v = LexicalVectorizer::new();
        let corpus = vec!["salicylic acid, water".to_string(), "zinc pca".to_string()];
        let sync = v.transform(&corpus, "salicylic acid").unwrap();
        let async_out = v.vectorize(&corpus, "salicylic acid").await.unwrap();
        assert_eq!(sync, async_out);
    }

    #[test]
    fn test_known_tfidf_similarity() {
        // n = 3 docs; shared terms have df = 2, the rest df = 1.
        let v = LexicalVectorizer::new();
        let vecs = v
            .fit_transform(&["salicylic acid, water", "niacinamide, glycerin", "salicylic acid"])
            .unwrap();
        let sim = TermVector::Sparse(vecs[2].clone()).cosine(&TermVector::Sparse(vecs[0].clone()));
        assert!((sim - 0.6816).abs() < 1e-3, "sim = {}", sim);
    }
}
