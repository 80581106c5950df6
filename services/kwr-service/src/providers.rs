//! Batched provider adapters: wrap a raw `kwr-providers` trait object so
//! every call routes through its provider's `Batcher`, giving rate limiting,
//! bounded concurrency, retry/backoff, and circuit breaking for free,
//! without `kwr-pipeline`'s pure functions needing to know about any of it.

use std::sync::Arc;

use async_trait::async_trait;
use kwr_core::models::Intent;
use kwr_core::values::Phrase;
use kwr_core::Result;
use kwr_providers::{
    Batcher, EmbeddingGenerator, KeywordMetricsProvider, LlmProvider, MetricsRecord,
    ProviderHealth, RequestOptions,
};

pub struct BatchedLlmProvider {
    inner: Arc<dyn LlmProvider>,
    batcher: Arc<Batcher>,
}

impl BatchedLlmProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, batcher: Arc<Batcher>) -> Self {
        Self { inner, batcher }
    }
}

#[async_trait]
impl LlmProvider for BatchedLlmProvider {
    async fn expand_phrases(&self, seeds: &[Phrase], limit: usize) -> Result<Vec<Phrase>> {
        self.batcher
            .submit(|| async { self.inner.expand_phrases(seeds, limit).await })
            .await
    }

    async fn classify_intent(&self, phrases: &[Phrase]) -> Result<Vec<Intent>> {
        self.batcher
            .submit(|| async { self.inner.classify_intent(phrases).await })
            .await
    }

    async fn refine_cluster_label(&self, phrases: &[Phrase]) -> Result<String> {
        self.batcher
            .submit(|| async { self.inner.refine_cluster_label(phrases).await })
            .await
    }
}

pub struct BatchedMetricsProvider {
    inner: Arc<dyn KeywordMetricsProvider>,
    batcher: Arc<Batcher>,
}

impl BatchedMetricsProvider {
    pub fn new(inner: Arc<dyn KeywordMetricsProvider>, batcher: Arc<Batcher>) -> Self {
        Self { inner, batcher }
    }
}

#[async_trait]
impl KeywordMetricsProvider for BatchedMetricsProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_keyword_metrics(&self, phrase: &Phrase, opts: &RequestOptions) -> Result<MetricsRecord> {
        self.batcher
            .submit(|| async { self.inner.get_keyword_metrics(phrase, opts).await })
            .await
    }

    async fn get_bulk_keyword_metrics(
        &self,
        phrases: &[Phrase],
        opts: &RequestOptions,
    ) -> Result<Vec<Result<MetricsRecord>>> {
        self.batcher
            .submit(|| async { self.inner.get_bulk_keyword_metrics(phrases, opts).await })
            .await
    }

    async fn get_keyword_suggestions(&self, seed: &Phrase, opts: &RequestOptions) -> Result<Vec<Phrase>> {
        self.batcher
            .submit(|| async { self.inner.get_keyword_suggestions(seed, opts).await })
            .await
    }

    async fn health(&self) -> Result<ProviderHealth> {
        self.inner.health().await
    }
}

pub struct BatchedEmbeddingGenerator {
    inner: Arc<dyn EmbeddingGenerator>,
    batcher: Arc<Batcher>,
}

impl BatchedEmbeddingGenerator {
    pub fn new(inner: Arc<dyn EmbeddingGenerator>, batcher: Arc<Batcher>) -> Self {
        Self { inner, batcher }
    }
}

#[async_trait]
impl EmbeddingGenerator for BatchedEmbeddingGenerator {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        self.batcher
            .submit(|| async { self.inner.generate_embedding(text).await })
            .await
    }

    async fn generate_batch_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batcher
            .submit(|| async { self.inner.generate_batch_embeddings(texts).await })
            .await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
