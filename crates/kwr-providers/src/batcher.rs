//! Rate-Limited Batcher (§4.B): every external provider call passes through
//! one of these. Token-bucket rate limiting via `governor`, bounded
//! concurrency via a semaphore, exponential backoff with jitter, and a
//! circuit breaker that fails fast once a provider looks down.

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use governor::{Quota, RateLimiter};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use rand::Rng;
use tokio::sync::{Mutex, Semaphore};
use tracing::{instrument, warn};

use kwr_core::{KwrError, Result};

use crate::models::CircuitState;

/// Tuning knobs, one instance per provider.
#[derive(Debug, Clone)]
pub struct BatcherConfig {
    pub max_per_window: u32,
    pub window: Duration,
    pub burst_capacity: u32,
    pub max_in_flight: usize,
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub circuit_failure_threshold: u32,
    pub circuit_cooldown: Duration,
}

impl Default for BatcherConfig {
    fn default() -> Self {
        Self {
            max_per_window: 60,
            window: Duration::from_secs(60),
            burst_capacity: 10,
            max_in_flight: 8,
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            circuit_failure_threshold: 5,
            circuit_cooldown: Duration::from_secs(30),
        }
    }
}

type GovernorLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-provider request gate. `submit` wraps a caller-supplied async
/// operation with rate limiting, bounded concurrency, retry, and circuit
/// breaking, consistent with the "no lock held across I/O" rule: the
/// circuit state is an atomic-guarded small state machine, never a mutex
/// held while awaiting the provider.
pub struct Batcher {
    provider: String,
    config: BatcherConfig,
    limiter: GovernorLimiter,
    semaphore: Semaphore,
    consecutive_failures: AtomicU32,
    circuit: Mutex<CircuitState>,
}

impl Batcher {
    pub fn new(provider: impl Into<String>, config: BatcherConfig) -> Self {
        let burst = NonZeroU32::new(config.burst_capacity.max(1)).unwrap();
        let quota = Quota::with_period(config.window / config.max_per_window.max(1))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::new(1).unwrap()))
            .allow_burst(burst);
        Self {
            provider: provider.into(),
            semaphore: Semaphore::new(config.max_in_flight),
            limiter: RateLimiter::direct(quota),
            consecutive_failures: AtomicU32::new(0),
            circuit: Mutex::new(CircuitState::default()),
            config,
        }
    }

    #[instrument(skip(self, op), fields(provider = %self.provider))]
    pub async fn submit<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.check_circuit().await?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            self.limiter.until_ready().await;
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| KwrError::internal("batcher semaphore closed"))?;

            match op().await {
                Ok(value) => {
                    self.record_success().await;
                    return Ok(value);
                }
                Err(err) => {
                    self.record_failure().await;
                    if !err.is_retryable() || attempt >= self.config.max_attempts {
                        return Err(err);
                    }
                    let backoff = self.backoff_for_attempt(attempt);
                    warn!(provider = %self.provider, attempt, ?backoff, "retrying after provider failure");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.config.initial_backoff.as_millis() as u64 * 2u64.pow(attempt.saturating_sub(1));
        let capped = base.min(self.config.max_backoff.as_millis() as u64);
        let jitter_frac = rand::thread_rng().gen_range(-0.2..=0.2);
        let jittered = (capped as f64 * (1.0 + jitter_frac)).max(0.0) as u64;
        Duration::from_millis(jittered)
    }

    async fn check_circuit(&self) -> Result<()> {
        let mut circuit = self.circuit.lock().await;
        match &*circuit {
            CircuitState::Open { since } => {
                let elapsed = Utc::now().signed_duration_since(*since);
                if elapsed.to_std().unwrap_or_default() >= self.config.circuit_cooldown {
                    *circuit = CircuitState::HalfOpen;
                    Ok(())
                } else {
                    Err(KwrError::busy(format!("circuit open for provider '{}'", self.provider)))
                }
            }
            _ => Ok(()),
        }
    }

    async fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        let mut circuit = self.circuit.lock().await;
        *circuit = CircuitState::Closed { failures: 0 };
    }

    async fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        let mut circuit = self.circuit.lock().await;
        if failures >= self.config.circuit_failure_threshold {
            *circuit = CircuitState::Open { since: Utc::now() };
        } else {
            *circuit = CircuitState::Closed { failures };
        }
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.circuit.lock().await.clone()
    }
}

pub type SharedBatcher = Arc<Batcher>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32 as Counter;

    #[tokio::test]
    async fn successful_call_passes_through() {
        let batcher = Batcher::new("mock", BatcherConfig::default());
        let result = batcher.submit(|| async { Ok::<_, KwrError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn non_retryable_error_fails_fast() {
        let batcher = Batcher::new("mock", BatcherConfig::default());
        let calls = Arc::new(Counter::new(0));
        let calls_clone = calls.clone();
        let result = batcher
            .submit(move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>(KwrError::not_found("phrase")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn circuit_opens_after_threshold_failures() {
        let mut config = BatcherConfig::default();
        config.circuit_failure_threshold = 2;
        config.initial_backoff = Duration::from_millis(1);
        config.max_attempts = 1;
        let batcher = Batcher::new("mock", config);

        for _ in 0..2 {
            let _ = batcher
                .submit(|| async { Err::<u32, _>(KwrError::provider_transient("mock", "down")) })
                .await;
        }

        assert!(matches!(batcher.circuit_state().await, CircuitState::Open { .. }));
        let result = batcher.submit(|| async { Ok::<_, KwrError>(1) }).await;
        assert!(matches!(result, Err(KwrError::Busy { .. })));
    }
}
