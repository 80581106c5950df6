use crate::error::Result;
use crate::models::ComponentHealth;
use async_trait::async_trait;
use std::time::Duration;

/// Health checking capability, implemented by providers and services alike.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    async fn check_health(&self) -> Result<ComponentHealth>;
}

/// Event publishing capability backing the Progress Bus (§2 item J).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    type Event: Send + Sync;

    async fn publish(&self, event: Self::Event) -> Result<()>;
}

/// Metrics collection capability, implemented by `kwr-observability`'s registry.
pub trait MetricsCollector: Send + Sync {
    fn increment_counter(&self, name: &str, labels: &[(&str, &str)]);
    fn record_histogram(&self, name: &str, value: f64, labels: &[(&str, &str)]);
    fn record_gauge(&self, name: &str, value: f64, labels: &[(&str, &str)]);
    fn record_duration(&self, name: &str, duration: Duration, labels: &[(&str, &str)]);
}

/// Generic, size/entry-bounded cache capability. The Embedding Cache
/// (§4.C) implements this with no TTL support — eviction is LRU only.
#[async_trait]
pub trait Cache<K, V>: Send + Sync {
    async fn get(&self, key: &K) -> Option<V>;
    async fn put(&self, key: K, value: V);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
