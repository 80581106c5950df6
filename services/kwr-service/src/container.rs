//! Dependency injection container for kwr-service.
//!
//! Centralizes creation and lifecycle of the pipeline's provider
//! dependencies, the Run Store, and the Progress Bus, mirroring the
//! teacher's `ServiceContainer` pattern: one `new` that wires concrete
//! backends behind trait objects, plus cloning getters.

use std::sync::Arc;

use kwr_api::{InMemoryRunStore, RunStore};
use kwr_config::Settings;
use kwr_observability::health::{DiskSpaceHealthCheck, MemoryHealthCheck};
use kwr_observability::{HealthChecker, MetricsRegistry};
use kwr_pipeline::ProgressBus;
use kwr_providers::{
    Batcher, BatcherConfig, CachedEmbeddingGenerator, CosineSimilarityCalculator, EmbeddingGenerator,
    KeywordMetricsProvider, LlmProvider, MockEmbeddingGenerator, MockKeywordMetricsProvider,
    MockLlmProvider, SimilarityCalculator,
};

use crate::config::Config;
use crate::providers::{BatchedEmbeddingGenerator, BatchedLlmProvider, BatchedMetricsProvider};

/// Central dependency injection container for kwr-service.
pub struct ServiceContainer {
    run_store: Arc<dyn RunStore>,
    progress_bus: Arc<ProgressBus>,
    llm: Arc<dyn LlmProvider>,
    metrics_provider: Arc<dyn KeywordMetricsProvider>,
    embeddings: Arc<dyn EmbeddingGenerator>,
    similarity: Arc<dyn SimilarityCalculator>,
    health: Arc<HealthChecker>,
    metrics_registry: Arc<MetricsRegistry>,
    settings: Arc<Settings>,
}

impl ServiceContainer {
    /// Creates a container with all dependencies initialized. Every provider
    /// defaults to its deterministic mock implementation: the reference
    /// service has no vendor key configuration surface, matching the
    /// "no vendor integrations" non-goal, while still exercising the exact
    /// trait seams a production deployment would implement against.
    pub async fn new(config: Config) -> kwr_core::Result<Self> {
        let settings = Arc::new(config.settings);

        let run_store: Arc<dyn RunStore> = Arc::new(InMemoryRunStore::new());
        let progress_bus = Arc::new(ProgressBus::default());

        let raw_llm: Arc<dyn LlmProvider> = Arc::new(MockLlmProvider);
        let raw_metrics: Arc<dyn KeywordMetricsProvider> =
            Arc::new(MockKeywordMetricsProvider::default());
        let raw_embeddings: Arc<dyn EmbeddingGenerator> = Arc::new(MockEmbeddingGenerator::default());
        let similarity: Arc<dyn SimilarityCalculator> = Arc::new(CosineSimilarityCalculator);

        let batcher_config = BatcherConfig {
            max_per_window: settings.providers.max_per_window,
            window: std::time::Duration::from_secs(settings.providers.window_secs),
            burst_capacity: settings.providers.burst_capacity,
            max_in_flight: settings.providers.max_concurrent as usize,
            max_attempts: settings.providers.max_retries,
            circuit_failure_threshold: settings.providers.circuit_breaker_threshold,
            circuit_cooldown: std::time::Duration::from_secs(
                settings.providers.circuit_breaker_cooldown_secs,
            ),
            ..BatcherConfig::default()
        };
        let llm_batcher = Arc::new(Batcher::new("llm", batcher_config.clone()));
        let metrics_batcher = Arc::new(Batcher::new("metrics", batcher_config.clone()));
        let embeddings_batcher = Arc::new(Batcher::new("embeddings", batcher_config));

        let llm: Arc<dyn LlmProvider> = Arc::new(BatchedLlmProvider::new(raw_llm, llm_batcher));
        let metrics_provider: Arc<dyn KeywordMetricsProvider> =
            Arc::new(BatchedMetricsProvider::new(raw_metrics, metrics_batcher));
        let batched_embeddings: Arc<dyn EmbeddingGenerator> =
            Arc::new(BatchedEmbeddingGenerator::new(raw_embeddings, embeddings_batcher));
        // Capacity isn't a wire-exposed setting (§6 lists no embedding-cache
        // knob); sized generously relative to `max_total_keywords`'s default.
        let embeddings: Arc<dyn EmbeddingGenerator> =
            Arc::new(CachedEmbeddingGenerator::new(batched_embeddings, 20_000));

        let mut health_checker = HealthChecker::new(env!("CARGO_PKG_VERSION"));
        health_checker.add_check(Arc::new(MemoryHealthCheck::new(1024.0, 2048.0)));
        health_checker.add_check(Arc::new(DiskSpaceHealthCheck::new("/", 80.0, 95.0)));
        let health = Arc::new(health_checker);
        let metrics_registry = Arc::new(MetricsRegistry::new());

        Ok(Self {
            run_store,
            progress_bus,
            llm,
            metrics_provider,
            embeddings,
            similarity,
            health,
            metrics_registry,
            settings,
        })
    }

    pub fn run_store(&self) -> Arc<dyn RunStore> {
        self.run_store.clone()
    }

    pub fn progress_bus(&self) -> Arc<ProgressBus> {
        self.progress_bus.clone()
    }

    pub fn llm(&self) -> Arc<dyn LlmProvider> {
        self.llm.clone()
    }

    pub fn metrics_provider(&self) -> Arc<dyn KeywordMetricsProvider> {
        self.metrics_provider.clone()
    }

    pub fn embeddings(&self) -> Arc<dyn EmbeddingGenerator> {
        self.embeddings.clone()
    }

    pub fn similarity(&self) -> Arc<dyn SimilarityCalculator> {
        self.similarity.clone()
    }

    pub fn health(&self) -> Arc<HealthChecker> {
        self.health.clone()
    }

    pub fn metrics_registry(&self) -> Arc<MetricsRegistry> {
        self.metrics_registry.clone()
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.clone()
    }
}
