//! Universe Expansion Engine (§4.F): Dream100 generation, Tier2/Tier3
//! strategy expansion, cross-tier deduplication, enrichment, intent
//! classification, quality filtering and smart capping.
//!
//! The three Tier2/Tier3 strategies are expressed as an [`ExpansionStrategy`]
//! trait, mirroring the teacher's `query_expansion` strategy-object shape.
//! Cross-tier dedup follows the teacher's `ResultDeduplicator` pattern,
//! specialized to "keep highest tier" as the conflict-resolution rule.

use std::collections::HashMap;

use async_trait::async_trait;
use kwr_config::ExpansionSettings;
use kwr_core::models::{Intent, Tier};
use kwr_core::values::Phrase;
use kwr_core::{KwrError, Result};
use kwr_providers::{
    CosineSimilarityCalculator, EmbeddingGenerator, KeywordMetricsProvider, LlmProvider,
    RequestOptions, SimilarityCalculator,
};

/// A single expansion candidate before enrichment.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub phrase: Phrase,
    pub tier: Tier,
    pub parent_phrase: Option<Phrase>,
    /// Seed-similarity score from Dream100 ranking, carried through so the
    /// keyword doesn't start Scoring with a meaningless default relevance.
    /// `None` for Tier2/Tier3 candidates, whose relevance is computed in
    /// [`enrich`] against their parent phrase instead.
    pub relevance: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct EnrichedCandidate {
    pub phrase: Phrase,
    pub tier: Tier,
    pub parent_phrase: Option<Phrase>,
    pub volume: u32,
    pub difficulty: u8,
    pub intent: Intent,
    pub relevance: f32,
    pub confidence: f32,
}

const MODIFIERS: &[&str] = &[
    "best", "top", "guide", "vs", "alternatives", "cheap", "review", "pricing",
];
const QUESTION_PATTERNS: &[&str] = &["what is", "how to", "why", "when to", "where", "which"];

/// One of the three Tier2/Tier3 generation strategies.
#[async_trait]
pub trait ExpansionStrategy: Send + Sync {
    async fn expand(&self, parent: &Phrase, limit: usize) -> Result<Vec<Phrase>>;
}

pub struct LlmStrategy<'a> {
    pub llm: &'a dyn LlmProvider,
}

#[async_trait]
impl<'a> ExpansionStrategy for LlmStrategy<'a> {
    async fn expand(&self, parent: &Phrase, limit: usize) -> Result<Vec<Phrase>> {
        self.llm.expand_phrases(std::slice::from_ref(parent), limit).await
    }
}

/// Fixed modifier grammar: `{modifier} {parent}`, discarding anything that
/// collapses below two tokens.
pub struct ModifierStrategy;

#[async_trait]
impl ExpansionStrategy for ModifierStrategy {
    async fn expand(&self, parent: &Phrase, limit: usize) -> Result<Vec<Phrase>> {
        let out: Vec<Phrase> = MODIFIERS
            .iter()
            .filter_map(|modifier| Phrase::new(format!("{} {}", modifier, parent.as_str())).ok())
            .filter(|p| p.token_count() >= 2)
            .take(limit)
            .collect();
        Ok(out)
    }
}

/// Question-pattern long-tail generation for Tier3: `{pattern} {parent}`.
pub struct QuestionStrategy;

#[async_trait]
impl ExpansionStrategy for QuestionStrategy {
    async fn expand(&self, parent: &Phrase, limit: usize) -> Result<Vec<Phrase>> {
        let out: Vec<Phrase> = QUESTION_PATTERNS
            .iter()
            .filter_map(|pattern| Phrase::new(format!("{} {}", pattern, parent.as_str())).ok())
            .take(limit)
            .collect();
        Ok(out)
    }
}

/// SERP-overlap mining: delegates to the metrics provider's native
/// suggestion endpoint. A no-op when the provider has none configured.
pub struct SerpOverlapStrategy<'a> {
    pub provider: &'a dyn KeywordMetricsProvider,
}

#[async_trait]
impl<'a> ExpansionStrategy for SerpOverlapStrategy<'a> {
    async fn expand(&self, parent: &Phrase, limit: usize) -> Result<Vec<Phrase>> {
        let opts = RequestOptions {
            limit,
            ..RequestOptions::default()
        };
        self.provider.get_keyword_suggestions(parent, &opts).await
    }
}

/// "Keep highest tier" conflict resolution for a phrase appearing under
/// more than one tier: later occurrences at a lower tier are dropped, their
/// parents retaining any other children.
pub fn dedupe_keep_highest_tier(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut best: HashMap<String, Candidate> = HashMap::new();
    for candidate in candidates {
        let key = candidate.phrase.as_str().to_string();
        match best.get(&key) {
            Some(existing) if existing.tier <= candidate.tier => continue,
            _ => {
                best.insert(key, candidate);
            }
        }
    }
    best.into_values().collect()
}

fn estimate_volume_from_tier_and_length(tier: Tier, phrase: &Phrase) -> u32 {
    let base = match tier {
        Tier::Dream100 => 5_000,
        Tier::Tier2 => 800,
        Tier::Tier3 => 150,
    };
    let length_penalty = 1.0 / (1.0 + 0.15 * phrase.token_count() as f32);
    (base as f32 * length_penalty) as u32
}

/// Relevance of a candidate to its lineage: cosine similarity between the
/// candidate phrase's embedding and its parent (or seed) phrase's embedding.
/// A candidate with no parent (shouldn't occur past Dream100) falls back to
/// a neutral 0.5 rather than a self-similarity of 1.0.
async fn relevance_to_parent(
    candidate: &Phrase,
    parent: Option<&Phrase>,
    embeddings: &dyn EmbeddingGenerator,
    calculator: &dyn SimilarityCalculator,
) -> Result<f32> {
    let Some(parent) = parent else {
        return Ok(0.5);
    };
    let vectors = embeddings
        .generate_batch_embeddings(&[candidate.as_str(), parent.as_str()])
        .await?;
    Ok(calculator.calculate_similarity(&vectors[0], &vectors[1]).clamp(0.0, 1.0))
}

/// Batches candidates through `GetBulkKeywordMetrics`, synthesizing metrics
/// for any item that fails enrichment after retries. Relevance is computed
/// per candidate as its embedding similarity to its parent phrase, not a
/// fixed constant.
pub async fn enrich(
    candidates: Vec<Candidate>,
    provider: &dyn KeywordMetricsProvider,
    embeddings: &dyn EmbeddingGenerator,
    batch_size: usize,
) -> Result<Vec<EnrichedCandidate>> {
    let calculator = CosineSimilarityCalculator;
    let mut enriched = Vec::with_capacity(candidates.len());
    for chunk in candidates.chunks(batch_size.max(1)) {
        let phrases: Vec<Phrase> = chunk.iter().map(|c| c.phrase.clone()).collect();
        let results = provider
            .get_bulk_keyword_metrics(&phrases, &RequestOptions::default())
            .await?;
        for (candidate, result) in chunk.iter().zip(results) {
            let (volume, difficulty, confidence) = match result {
                Ok(record) => (
                    record.search_volume.unwrap_or_else(|| estimate_volume_from_tier_and_length(candidate.tier, &candidate.phrase)),
                    record.difficulty.unwrap_or(50),
                    record.confidence,
                ),
                Err(_) => (
                    estimate_volume_from_tier_and_length(candidate.tier, &candidate.phrase),
                    50,
                    0.5,
                ),
            };
            let relevance = relevance_to_parent(
                &candidate.phrase,
                candidate.parent_phrase.as_ref(),
                embeddings,
                &calculator,
            )
            .await?;
            enriched.push(EnrichedCandidate {
                phrase: candidate.phrase.clone(),
                tier: candidate.tier,
                parent_phrase: candidate.parent_phrase.clone(),
                volume,
                difficulty,
                intent: Intent::Informational,
                relevance,
                confidence,
            });
        }
    }
    Ok(enriched)
}

/// Classifies intent in batches, merging by phrase string; a phrase the LLM
/// does not return a result for defaults to `Informational`.
pub async fn classify_intent(
    candidates: &mut [EnrichedCandidate],
    llm: &dyn LlmProvider,
    batch_size: usize,
) -> Result<()> {
    for chunk in candidates.chunks_mut(batch_size.max(1)) {
        let phrases: Vec<Phrase> = chunk.iter().map(|c| c.phrase.clone()).collect();
        let intents = llm.classify_intent(&phrases).await?;
        for (candidate, intent) in chunk.iter_mut().zip(intents) {
            candidate.intent = intent;
        }
    }
    Ok(())
}

fn length_penalty(phrase: &Phrase) -> f32 {
    let tokens = phrase.token_count();
    if (2..=8).contains(&tokens) {
        1.0
    } else if tokens < 2 {
        0.3
    } else {
        (1.0 - 0.1 * (tokens as f32 - 8.0)).clamp(0.0, 1.0)
    }
}

fn quality_score(candidate: &EnrichedCandidate) -> f32 {
    0.4 * candidate.relevance + 0.3 * candidate.confidence + 0.3 * length_penalty(&candidate.phrase)
}

/// Drops candidates scoring below `quality_threshold`.
pub fn quality_filter(candidates: Vec<EnrichedCandidate>, quality_threshold: f32) -> Vec<EnrichedCandidate> {
    candidates.into_iter().filter(|c| quality_score(c) >= quality_threshold).collect()
}

fn blended_score_estimate(candidate: &EnrichedCandidate) -> f32 {
    let ease = ((100 - candidate.difficulty) as f32 / 100.0).clamp(0.0, 1.0);
    let volume_component = (candidate.volume as f32 + 1.0).log10() / 6.0;
    0.4 * volume_component.clamp(0.0, 1.0) + 0.3 * candidate.intent.component_score() + 0.3 * ease
}

/// Keeps the top candidates by estimated blended score while preserving an
/// approximate tier ratio of 1:10:≥70 and ensuring every Dream100 parent
/// retains at least one Tier2 child where possible.
pub fn smart_cap(mut candidates: Vec<EnrichedCandidate>, target_total_count: usize) -> Vec<EnrichedCandidate> {
    if candidates.len() <= target_total_count {
        return candidates;
    }

    candidates.sort_by(|a, b| blended_score_estimate(b).total_cmp(&blended_score_estimate(a)));

    let dream_budget = (target_total_count / 81).max(1);
    let tier2_budget = (target_total_count * 10 / 81).max(1);

    let mut kept = Vec::with_capacity(target_total_count);
    let mut dream_count = 0usize;
    let mut tier2_count = 0usize;
    let mut protected_parents: HashMap<String, bool> = HashMap::new();
    let mut overflow = Vec::new();

    for candidate in candidates {
        let fits = match candidate.tier {
            Tier::Dream100 => dream_count < dream_budget,
            Tier::Tier2 => tier2_count < tier2_budget,
            Tier::Tier3 => true,
        };
        if fits && kept.len() < target_total_count {
            match candidate.tier {
                Tier::Dream100 => dream_count += 1,
                Tier::Tier2 => {
                    tier2_count += 1;
                    if let Some(parent) = &candidate.parent_phrase {
                        protected_parents.insert(parent.as_str().to_string(), true);
                    }
                }
                Tier::Tier3 => {}
            }
            kept.push(candidate);
        } else {
            overflow.push(candidate);
        }
    }

    // Ensure every Dream100 parent retains at least one Tier2 child where possible.
    let dream_parents: Vec<String> = kept
        .iter()
        .filter(|c| c.tier == Tier::Dream100)
        .map(|c| c.phrase.as_str().to_string())
        .collect();
    for parent in dream_parents {
        if protected_parents.contains_key(&parent) {
            continue;
        }
        if let Some(pos) = overflow
            .iter()
            .position(|c| c.tier == Tier::Tier2 && c.parent_phrase.as_ref().map(|p| p.as_str()) == Some(parent.as_str()))
        {
            if kept.len() < target_total_count {
                kept.push(overflow.remove(pos));
            }
        }
    }

    kept.truncate(target_total_count);
    kept
}

/// Dream100 generation from seeds: LLM semantic expansion, de-duped against
/// the seeds, ranked by `llm_confidence * seed_similarity` and trimmed to
/// `max_dream100`. The LLM returns phrases in its own confidence order with
/// no numeric score attached, so position in that order stands in for
/// confidence (first = most confident, decaying linearly); seed similarity
/// is the candidate's best cosine match against any seed's embedding.
pub async fn generate_dream100(
    seeds: &[Phrase],
    llm: &dyn LlmProvider,
    embeddings: &dyn EmbeddingGenerator,
    settings: &ExpansionSettings,
) -> Result<Vec<Candidate>> {
    if seeds.is_empty() {
        return Err(KwrError::input_validation("seeds", "at least one seed phrase is required"));
    }
    let raw = llm.expand_phrases(seeds, settings.max_dream100 as usize * 2).await?;
    let seed_set: std::collections::HashSet<&str> = seeds.iter().map(|s| s.as_str()).collect();
    let mut seen = std::collections::HashSet::new();
    let candidates: Vec<Phrase> = raw
        .into_iter()
        .filter(|phrase| !seed_set.contains(phrase.as_str()) && seen.insert(phrase.as_str().to_string()))
        .collect();

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let calculator = CosineSimilarityCalculator;
    let seed_texts: Vec<&str> = seeds.iter().map(|s| s.as_str()).collect();
    let seed_vectors = embeddings.generate_batch_embeddings(&seed_texts).await?;
    let candidate_texts: Vec<&str> = candidates.iter().map(|c| c.as_str()).collect();
    let candidate_vectors = embeddings.generate_batch_embeddings(&candidate_texts).await?;

    let total = candidates.len().max(1) as f32;
    let mut scored: Vec<(Phrase, f32)> = candidates
        .into_iter()
        .zip(candidate_vectors)
        .enumerate()
        .map(|(idx, (phrase, vector))| {
            let llm_confidence = 1.0 - (idx as f32 / total);
            let seed_similarity = seed_vectors
                .iter()
                .map(|seed_vector| calculator.calculate_similarity(&vector, seed_vector))
                .fold(f32::MIN, f32::max)
                .clamp(0.0, 1.0);
            (phrase, llm_confidence * seed_similarity)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let out = scored
        .into_iter()
        .take(settings.max_dream100 as usize)
        .map(|(phrase, score)| Candidate {
            phrase,
            tier: Tier::Dream100,
            parent_phrase: None,
            relevance: Some(score.clamp(0.0, 1.0)),
        })
        .collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwr_providers::{MockEmbeddingGenerator, MockLlmProvider};

    fn phrase(s: &str) -> Phrase {
        Phrase::new(s).unwrap()
    }

    #[tokio::test]
    async fn modifier_strategy_discards_short_phrases() {
        let out = ModifierStrategy.expand(&phrase("seo"), 10).await.unwrap();
        assert!(out.iter().all(|p| p.token_count() >= 2));
    }

    #[test]
    fn dedupe_keeps_highest_tier_occurrence() {
        let candidates = vec![
            Candidate { phrase: phrase("social selling"), tier: Tier::Tier3, parent_phrase: None, relevance: None },
            Candidate { phrase: phrase("social selling"), tier: Tier::Tier2, parent_phrase: None, relevance: None },
        ];
        let result = dedupe_keep_highest_tier(candidates);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].tier, Tier::Tier2);
    }

    fn candidate(text: &str, tier: Tier, volume: u32, relevance: f32, confidence: f32) -> EnrichedCandidate {
        EnrichedCandidate {
            phrase: phrase(text),
            tier,
            parent_phrase: None,
            volume,
            difficulty: 50,
            intent: Intent::Informational,
            relevance,
            confidence,
        }
    }

    #[test]
    fn quality_filter_drops_low_scoring_candidates() {
        let low = candidate("a", Tier::Tier3, 0, 0.1, 0.1);
        let high = candidate("great social selling tools", Tier::Tier2, 0, 0.9, 0.9);
        let kept = quality_filter(vec![low, high], 0.6);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn smart_cap_preserves_budget() {
        let candidates: Vec<EnrichedCandidate> = (0..200u32)
            .map(|i| candidate(&format!("term {i}"), Tier::Tier3, i, 0.8, 0.8))
            .collect();
        let capped = smart_cap(candidates, 50);
        assert_eq!(capped.len(), 50);
    }

    #[tokio::test]
    async fn dream100_dedupes_against_seeds() {
        let seeds = vec![phrase("social selling")];
        let llm = MockLlmProvider;
        let embeddings = MockEmbeddingGenerator::default();
        let settings = ExpansionSettings::default();
        let out = generate_dream100(&seeds, &llm, &embeddings, &settings).await.unwrap();
        assert!(out.iter().all(|c| c.phrase.as_str() != "social selling"));
    }

    #[tokio::test]
    async fn enrich_computes_relevance_from_parent_similarity() {
        let embeddings = MockEmbeddingGenerator::default();
        let metrics = kwr_providers::MockKeywordMetricsProvider::new("mock");
        let candidates = vec![Candidate {
            phrase: phrase("social selling tools"),
            tier: Tier::Tier2,
            parent_phrase: Some(phrase("social selling")),
            relevance: None,
        }];
        let enriched = enrich(candidates, &metrics, &embeddings, 10).await.unwrap();
        assert_eq!(enriched.len(), 1);
        assert!(enriched[0].relevance > 0.0);
    }
}
