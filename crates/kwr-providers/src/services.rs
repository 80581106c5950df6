use async_trait::async_trait;
use chrono::Utc;

use kwr_core::values::Phrase;
use kwr_core::models::MetricsSource;
use kwr_core::Result;

use kwr_core::models::Intent;

use crate::models::{MetricsRecord, ProviderHealth, RequestOptions};
use crate::traits::{EmbeddingGenerator, KeywordMetricsProvider, LlmProvider, SimilarityCalculator};

/// Cosine similarity, unchanged from the vector-search teacher.
pub struct CosineSimilarityCalculator;

impl SimilarityCalculator for CosineSimilarityCalculator {
    fn calculate_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot_product / (norm_a * norm_b)
        }
    }

    fn batch_similarities(&self, query: &[f32], candidates: &[Vec<f32>]) -> Vec<f32> {
        candidates
            .iter()
            .map(|candidate| self.calculate_similarity(query, candidate))
            .collect()
    }
}

/// Deterministic mock provider. Used directly when no vendor key is
/// configured, and as the fallback target when `RequestOptions::fallback`
/// is set and every real provider is unhealthy.
pub struct MockKeywordMetricsProvider {
    name: String,
}

impl MockKeywordMetricsProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for MockKeywordMetricsProvider {
    fn default() -> Self {
        Self::new("mock")
    }
}

#[async_trait]
impl KeywordMetricsProvider for MockKeywordMetricsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_keyword_metrics(
        &self,
        phrase: &Phrase,
        _opts: &RequestOptions,
    ) -> Result<MetricsRecord> {
        Ok(synthesize(phrase))
    }

    async fn get_bulk_keyword_metrics(
        &self,
        phrases: &[Phrase],
        _opts: &RequestOptions,
    ) -> Result<Vec<Result<MetricsRecord>>> {
        Ok(phrases.iter().map(|p| Ok(synthesize(p))).collect())
    }

    async fn get_keyword_suggestions(
        &self,
        seed: &Phrase,
        opts: &RequestOptions,
    ) -> Result<Vec<Phrase>> {
        let suffixes = ["guide", "tools", "pricing", "examples", "alternatives", "for teams"];
        let suggestions: Vec<Phrase> = suffixes
            .iter()
            .take(opts.limit)
            .filter_map(|suffix| Phrase::new(format!("{} {}", seed.as_str(), suffix)).ok())
            .collect();
        Ok(suggestions)
    }

    async fn health(&self) -> Result<ProviderHealth> {
        Ok(ProviderHealth {
            provider: self.name.clone(),
            healthy: true,
            quota_used: 0,
            quota_limit: u64::MAX,
            quota_remaining: u64::MAX,
            reset_at: Utc::now(),
            last_latency_ms: 0.0,
        })
    }
}

fn synthesize(phrase: &Phrase) -> MetricsRecord {
    let seed = phrase
        .as_str()
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    MetricsRecord {
        phrase: phrase.clone(),
        source: MetricsSource::Mock,
        search_volume: Some(seed % 10_000),
        difficulty: Some((seed % 100) as u8),
        cpc: Some((seed % 500) as f32 / 100.0),
        competition: Some((seed % 100) as u8),
        confidence: 0.5,
    }
}

/// Deterministic mock LLM provider: deterministic expansions from a fixed
/// lexicon of modifiers, and a length-based intent heuristic. Used when no
/// vendor LLM is configured and as the test double for the S1-S6 scenarios.
pub struct MockLlmProvider;

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn expand_phrases(&self, seeds: &[Phrase], limit: usize) -> Result<Vec<Phrase>> {
        let templates = ["best", "top", "guide to", "how to use", "vs", "alternatives to"];
        let mut out = Vec::new();
        'seeds: for seed in seeds {
            for template in templates {
                let candidate = format!("{} {}", template, seed.as_str());
                if let Ok(phrase) = Phrase::new(candidate) {
                    out.push(phrase);
                }
                if out.len() >= limit {
                    break 'seeds;
                }
            }
        }
        out.truncate(limit);
        Ok(out)
    }

    async fn classify_intent(&self, phrases: &[Phrase]) -> Result<Vec<Intent>> {
        Ok(phrases
            .iter()
            .map(|p| {
                let text = p.as_str();
                if text.contains("buy") || text.contains("price") || text.contains("pricing") {
                    Intent::Transactional
                } else if text.contains("best") || text.contains("vs") || text.contains("alternatives") {
                    Intent::Commercial
                } else if text.contains("how to") || text.contains("what is") || text.contains("guide") {
                    Intent::Informational
                } else {
                    Intent::Unknown
                }
            })
            .collect())
    }

    async fn refine_cluster_label(&self, phrases: &[Phrase]) -> Result<String> {
        Ok(phrases
            .first()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "cluster".to_string()))
    }
}

/// Deterministic mock embedding generator: hashes each token into a fixed
/// low-dimensional vector and averages, giving phrases sharing vocabulary a
/// non-trivial cosine similarity without calling any vendor. Used when no
/// vendor embedding key is configured.
pub struct MockEmbeddingGenerator {
    dimension: usize,
}

impl MockEmbeddingGenerator {
    pub fn new(dimension: usize) -> Self {
        Self { dimension: dimension.max(1) }
    }
}

impl Default for MockEmbeddingGenerator {
    fn default() -> Self {
        Self::new(32)
    }
}

fn hash_token(token: &str, dim: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dim];
    let mut seed = 2166136261u32;
    for b in token.bytes() {
        seed = seed.wrapping_mul(16777619) ^ b as u32;
    }
    for (i, slot) in vec.iter_mut().enumerate() {
        let mixed = seed.wrapping_mul(31).wrapping_add(i as u32);
        *slot = ((mixed % 2000) as f32 / 1000.0) - 1.0;
    }
    vec
}

#[async_trait]
impl EmbeddingGenerator for MockEmbeddingGenerator {
    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }
        let mut sum = vec![0.0f32; self.dimension];
        for token in &tokens {
            for (i, v) in hash_token(token, self.dimension).into_iter().enumerate() {
                sum[i] += v;
            }
        }
        let n = tokens.len() as f32;
        Ok(sum.into_iter().map(|v| v / n).collect())
    }

    async fn generate_batch_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.generate_embedding(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-hash-embedding"
    }
}

/// Implements the "auto" selection policy of §4.A: among healthy providers
/// with remaining quota, pick the one maximizing remaining-quota fraction,
/// breaking ties by lowest observed latency.
pub fn select_provider<'a>(candidates: &'a [ProviderHealth]) -> Option<&'a ProviderHealth> {
    candidates
        .iter()
        .filter(|h| h.healthy && h.quota_remaining > 0)
        .max_by(|a, b| {
            a.quota_fraction_remaining()
                .partial_cmp(&b.quota_fraction_remaining())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.last_latency_ms.partial_cmp(&a.last_latency_ms).unwrap_or(std::cmp::Ordering::Equal))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let calc = CosineSimilarityCalculator;
        let v = vec![1.0, 2.0, 3.0];
        assert!((calc.calculate_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_of_zero_vector_is_zero() {
        let calc = CosineSimilarityCalculator;
        assert_eq!(calc.calculate_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn mock_embedding_generator_is_deterministic_and_dimensioned() {
        let gen = MockEmbeddingGenerator::new(16);
        let a = gen.generate_embedding("social selling").await.unwrap();
        let b = gen.generate_embedding("social selling").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn mock_provider_is_deterministic() {
        let provider = MockKeywordMetricsProvider::default();
        let phrase = Phrase::new("social selling tools").unwrap();
        let a = provider.get_keyword_metrics(&phrase, &RequestOptions::default()).await.unwrap();
        let b = provider.get_keyword_metrics(&phrase, &RequestOptions::default()).await.unwrap();
        assert_eq!(a.search_volume, b.search_volume);
        assert_eq!(a.confidence, 0.5);
    }

    #[test]
    fn select_provider_picks_highest_remaining_quota_fraction() {
        let now = Utc::now();
        let low = ProviderHealth {
            provider: "low".into(),
            healthy: true,
            quota_used: 90,
            quota_limit: 100,
            quota_remaining: 10,
            reset_at: now,
            last_latency_ms: 50.0,
        };
        let high = ProviderHealth {
            provider: "high".into(),
            healthy: true,
            quota_used: 10,
            quota_limit: 100,
            quota_remaining: 90,
            reset_at: now,
            last_latency_ms: 200.0,
        };
        let picked = select_provider(&[low, high]).unwrap();
        assert_eq!(picked.provider, "high");
    }

    #[test]
    fn select_provider_returns_none_when_all_unhealthy() {
        let now = Utc::now();
        let down = ProviderHealth {
            provider: "down".into(),
            healthy: false,
            quota_used: 0,
            quota_limit: 100,
            quota_remaining: 100,
            reset_at: now,
            last_latency_ms: 0.0,
        };
        assert!(select_provider(&[down]).is_none());
    }
}
