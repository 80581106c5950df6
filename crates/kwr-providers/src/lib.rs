//! Keyword metrics provider abstraction for the keyword-research pipeline.
//!
//! This crate provides:
//! - A vendor-agnostic provider trait with normalized metrics and health
//! - A rate-limited batcher with retry/backoff and circuit breaking
//! - A content-addressed embedding cache with no TTL
//! - Similarity calculations over embedding vectors
pub mod batcher;
pub mod cache;
pub mod models;
pub mod services;
pub mod traits;

pub use batcher::{Batcher, BatcherConfig, SharedBatcher};
pub use cache::{phrase_key, CacheStats, CachedEmbeddingGenerator, EmbeddingCache, LRUCache, PhraseKey};
pub use models::{CircuitState, MetricsRecord, ProviderHealth, RequestOptions};
pub use services::{
    select_provider, CosineSimilarityCalculator, MockEmbeddingGenerator, MockKeywordMetricsProvider,
    MockLlmProvider,
};
pub use traits::{
    DurableEmbeddingStore, EmbeddingGenerator, KeywordMetricsProvider, LlmProvider,
    SimilarityCalculator,
};
