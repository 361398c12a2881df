//! # skincare-rag
//!
//! Ingredient-aware skincare product retrieval.
//!
//! A severity label becomes per-category ingredient recommendations, each
//! category's catalog rows are ranked against those ingredients, and the
//! top products feed an optional generated routine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │  Recommender │──▶│   QuerySet   │──▶│   Searcher    │
//! │  (chat API)  │   │ cat → ingr.  │   │ rank per cat. │
//! └──────────────┘   └──────────────┘   └───────┬───────┘
//!                                               │
//!                      ┌────────────────────────┤
//!                      ▼                        ▼
//!                 ┌──────────┐            ┌──────────┐
//!                 │   CLI    │            │   HTTP   │
//!                 │(skinrag) │            │  (axum)  │
//!                 └──────────┘            └──────────┘
//! ```
//!
//! Ranking itself lives in the `skincare-rag-core` crate; this crate adds
//! configuration, catalog loading, external vectorizers, the recommender,
//! output formatting, and the CLI and HTTP surfaces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`catalog`] | Fail-open catalog loading |
//! | [`embedding`] | Vectorizer selection and embedding client |
//! | [`search`] | Search context and the `search` command |
//! | [`recommend`] | Severity → ingredients → routine |
//! | [`format`] | Text and JSON rendering |
//! | [`server`] | HTTP server |

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod format;
pub mod recommend;
pub mod search;
pub mod server;
