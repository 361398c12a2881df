//! # Skincare RAG Core
//!
//! Shared ranking logic for skincare-rag: the product catalog model,
//! text vectorizers, relevance scoring, and the per-category ranker and
//! multi-category orchestrator.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. The
//! application crate owns loading files, talking to embedding services,
//! and presenting results.
//!
//! ## Pipeline
//!
//! ```text
//! QuerySet ──▶ search_all ──▶ rank (per category)
//!                               │ filter ─▶ vectorize ─▶ score ─▶ threshold + top-k
//!                               ▼
//!                         AggregateResult
//! ```

pub mod catalog;
pub mod category;
pub mod error;
pub mod models;
pub mod rank;
pub mod scoring;
pub mod search;
pub mod vector;
pub mod vectorize;
