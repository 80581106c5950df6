use async_trait::async_trait;
use kwr_core::values::Phrase;
use kwr_core::Result;

use crate::models::{MetricsRecord, ProviderHealth, RequestOptions};

/// Uniform interface over whichever keyword-metrics vendor is configured.
/// Mirrors the teacher's `EmbeddingGenerator`/`VectorRepository` split:
/// one capability set, health-checkable, with no virtual-dispatch leak
/// outside this crate.
#[async_trait]
pub trait KeywordMetricsProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Single-phrase lookup. Returns within `opts.timeout_ms` or a typed
    /// error; on hard failure with `opts.fallback = true`, callers should
    /// fall back to `MetricsRecord::mock_fallback` rather than propagate.
    async fn get_keyword_metrics(
        &self,
        phrase: &Phrase,
        opts: &RequestOptions,
    ) -> Result<MetricsRecord>;

    /// Bulk lookup preserving input order. Per-item failures surface as
    /// `Err` at that index; the whole batch only fails on auth failure.
    async fn get_bulk_keyword_metrics(
        &self,
        phrases: &[Phrase],
        opts: &RequestOptions,
    ) -> Result<Vec<Result<MetricsRecord>>>;

    /// Related phrases in the provider's native relevance order, capped at
    /// `opts.limit`.
    async fn get_keyword_suggestions(&self, seed: &Phrase, opts: &RequestOptions)
        -> Result<Vec<Phrase>>;

    async fn health(&self) -> Result<ProviderHealth>;
}

/// Embedding generation, kept in the teacher's shape (`dimension`/`model_name`
/// alongside the async calls) so provider implementations and the cache can
/// be written against the same contract regardless of vendor.
#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>>;
    async fn generate_batch_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
    fn dimension(&self) -> usize;
    fn model_name(&self) -> &str;
}

/// Similarity calculations over embedding vectors.
pub trait SimilarityCalculator: Send + Sync {
    fn calculate_similarity(&self, a: &[f32], b: &[f32]) -> f32;
    fn batch_similarities(&self, query: &[f32], candidates: &[Vec<f32>]) -> Vec<f32>;
}

/// Prompt-based expansion and classification, per the LLM provider contract
/// in §6: structured responses, no streaming in this crate.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Free-form semantic expansion: given seed phrases, propose up to
    /// `limit` novel related phrases.
    async fn expand_phrases(&self, seeds: &[Phrase], limit: usize) -> Result<Vec<Phrase>>;

    /// Classify intent for a batch of phrases; implementations should
    /// return one result per input phrase in the same order.
    async fn classify_intent(&self, phrases: &[Phrase]) -> Result<Vec<kwr_core::models::Intent>>;

    /// Produce a refined cluster label from up to 10 representative phrases.
    async fn refine_cluster_label(&self, phrases: &[Phrase]) -> Result<String>;
}

/// Durable backing store for the Embedding Cache. Interface only in this
/// crate — no concrete backend, per the Run Store Interface non-goal.
#[async_trait]
pub trait DurableEmbeddingStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>>;
    async fn put(&self, key: &str, embedding: Vec<f32>) -> Result<()>;
}
