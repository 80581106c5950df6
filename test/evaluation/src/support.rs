use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use kwr_config::Settings;
use kwr_core::values::Phrase;
use kwr_core::Result;
use kwr_providers::{KeywordMetricsProvider, MetricsRecord, ProviderHealth, RequestOptions};
use kwr_service::{Config, ServiceContainer};

/// Builds a `ServiceContainer` over the given pipeline settings, with the
/// HTTP server's own knobs left at their defaults.
pub async fn container_with(settings: Settings) -> Arc<ServiceContainer> {
    let config = Config { server: Default::default(), settings };
    Arc::new(ServiceContainer::new(config).await.expect("container init"))
}

pub fn seed(phrase: &str) -> Phrase {
    Phrase::new(phrase).expect("valid seed phrase")
}

/// Wraps a `KeywordMetricsProvider` so its first `get_bulk_keyword_metrics`
/// call fails transiently, simulating a primary vendor outage, then falls
/// through to the inner (deterministic mock) provider on every later call
/// as if a secondary had taken over. `failures` counts attempts actually
/// made, so a test can assert the stage retried.
pub struct FlakyMetricsProvider<P> {
    inner: P,
    remaining_failures: AtomicU32,
    pub attempts: AtomicU32,
}

impl<P> FlakyMetricsProvider<P> {
    pub fn new(inner: P, remaining_failures: u32) -> Self {
        Self { inner, remaining_failures: AtomicU32::new(remaining_failures), attempts: AtomicU32::new(0) }
    }
}

#[async_trait]
impl<P: KeywordMetricsProvider + Send + Sync> KeywordMetricsProvider for FlakyMetricsProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn get_keyword_metrics(&self, phrase: &Phrase, opts: &RequestOptions) -> Result<MetricsRecord> {
        self.inner.get_keyword_metrics(phrase, opts).await
    }

    async fn get_bulk_keyword_metrics(
        &self,
        phrases: &[Phrase],
        opts: &RequestOptions,
    ) -> Result<Vec<Result<MetricsRecord>>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.remaining_failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            if n > 0 { Some(n - 1) } else { None }
        }).is_ok() {
            return Err(kwr_core::KwrError::provider_transient("primary", "upstream 503"));
        }
        self.inner.get_bulk_keyword_metrics(phrases, opts).await
    }

    async fn get_keyword_suggestions(&self, seed: &Phrase, opts: &RequestOptions) -> Result<Vec<Phrase>> {
        self.inner.get_keyword_suggestions(seed, opts).await
    }

    async fn health(&self) -> Result<ProviderHealth> {
        Ok(ProviderHealth {
            provider: self.name().to_string(),
            healthy: true,
            quota_used: 0,
            quota_limit: u64::MAX,
            quota_remaining: u64::MAX,
            reset_at: Utc::now(),
            last_latency_ms: 0.0,
        })
    }
}
