use chrono::{DateTime, Utc};
use kwr_core::values::Phrase;
use kwr_core::models::MetricsSource;
use serde::{Deserialize, Serialize};

/// Normalized result of a single keyword metrics lookup, regardless of vendor.
///
/// Difficulty and competition are always rescaled to 0..100; fields the
/// provider did not return surface as `None`, never a synthesized zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub phrase: Phrase,
    pub source: MetricsSource,
    pub search_volume: Option<u32>,
    pub difficulty: Option<u8>,
    pub cpc: Option<f32>,
    pub competition: Option<u8>,
    pub confidence: f32,
}

impl MetricsRecord {
    pub fn mock_fallback(phrase: Phrase) -> Self {
        Self {
            phrase,
            source: MetricsSource::Mock,
            search_volume: Some(0),
            difficulty: Some(50),
            cpc: None,
            competition: Some(50),
            confidence: 0.5,
        }
    }
}

/// Per-provider request shaping; carried independently of the crate-wide
/// error taxonomy so callers can tune timeout/limit/fallback without
/// touching `KwrError`.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub timeout_ms: u64,
    pub limit: usize,
    pub fallback: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            limit: 100,
            fallback: true,
        }
    }
}

/// Snapshot returned by a provider's `Health()` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub healthy: bool,
    pub quota_used: u64,
    pub quota_limit: u64,
    pub quota_remaining: u64,
    pub reset_at: DateTime<Utc>,
    pub last_latency_ms: f64,
}

impl ProviderHealth {
    pub fn quota_fraction_remaining(&self) -> f64 {
        if self.quota_limit == 0 {
            0.0
        } else {
            self.quota_remaining as f64 / self.quota_limit as f64
        }
    }
}

/// Circuit breaker state for the Rate-Limited Batcher. Guarded by an atomic
/// in `Batcher`; no lock is held across an in-flight provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitState {
    Closed { failures: u32 },
    Open { since: DateTime<Utc> },
    HalfOpen,
}

impl Default for CircuitState {
    fn default() -> Self {
        Self::Closed { failures: 0 }
    }
}
