//! Universe stage (§4.F, Tier2/Tier3 half): strategy-based fan-out from the
//! Dream100 persisted by [`super::expansion`], cross-tier dedup, batched
//! enrichment, intent classification, quality filtering and smart capping.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use kwr_api::RunStore;
use kwr_core::models::{Keyword, Run, Stage, Tier};
use kwr_core::values::Phrase;
use kwr_core::Result;
use kwr_pipeline::{
    classify_intent, dedupe_keep_highest_tier, enrich, quality_filter, smart_cap, Candidate,
    EnrichedCandidate, ExpansionStrategy, LlmStrategy, ModifierStrategy, QuestionStrategy,
    SerpOverlapStrategy,
};
use kwr_pipeline::orchestrator::{CancellationSignal, PipelineStage};
use kwr_providers::{EmbeddingGenerator, KeywordMetricsProvider, LlmProvider};
use tracing::info;

use super::{cost, run_settings};

pub struct UniverseStage {
    store: Arc<dyn RunStore>,
    llm: Arc<dyn LlmProvider>,
    metrics: Arc<dyn KeywordMetricsProvider>,
    embeddings: Arc<dyn EmbeddingGenerator>,
}

impl UniverseStage {
    pub fn new(
        store: Arc<dyn RunStore>,
        llm: Arc<dyn LlmProvider>,
        metrics: Arc<dyn KeywordMetricsProvider>,
        embeddings: Arc<dyn EmbeddingGenerator>,
    ) -> Self {
        Self { store, llm, metrics, embeddings }
    }

    async fn fan_out(
        &self,
        parent: &Phrase,
        child_tier: Tier,
        cap: usize,
        settings: &kwr_config::ExpansionSettings,
        cancellation: &CancellationSignal,
    ) -> Result<Vec<Candidate>> {
        cancellation.check()?;

        let modifier_strategy = ModifierStrategy;
        let question_strategy = QuestionStrategy;
        let llm_strategy = LlmStrategy { llm: self.llm.as_ref() };
        let serp_strategy = SerpOverlapStrategy { provider: self.metrics.as_ref() };

        let mut seen: HashSet<String> = HashSet::new();
        let mut phrases: Vec<Phrase> = Vec::new();

        let primary: &dyn ExpansionStrategy = match child_tier {
            Tier::Tier2 => &modifier_strategy,
            _ => &question_strategy,
        };
        for phrase in primary.expand(parent, cap).await? {
            if seen.insert(phrase.as_str().to_string()) {
                phrases.push(phrase);
            }
        }

        if settings.enable_semantic_variations && child_tier == Tier::Tier2 {
            for phrase in llm_strategy.expand(parent, cap).await? {
                if phrases.len() >= cap {
                    break;
                }
                if seen.insert(phrase.as_str().to_string()) {
                    phrases.push(phrase);
                }
            }
        }

        if settings.enable_serp_analysis {
            for phrase in serp_strategy.expand(parent, cap).await? {
                if phrases.len() >= cap {
                    break;
                }
                if seen.insert(phrase.as_str().to_string()) {
                    phrases.push(phrase);
                }
            }
        }

        phrases.truncate(cap);
        Ok(phrases
            .into_iter()
            .map(|phrase| Candidate {
                phrase,
                tier: child_tier,
                parent_phrase: Some(parent.clone()),
                relevance: None,
            })
            .collect())
    }
}

fn keyword_to_enriched(kw: &Keyword) -> EnrichedCandidate {
    EnrichedCandidate {
        phrase: kw.phrase.clone(),
        tier: kw.tier,
        parent_phrase: kw.parent_phrase.clone(),
        volume: kw.volume,
        difficulty: kw.difficulty,
        intent: kw.intent,
        relevance: kw.relevance,
        confidence: 1.0,
    }
}

#[async_trait]
impl PipelineStage for UniverseStage {
    fn stage(&self) -> Stage {
        Stage::Universe
    }

    async fn run(&self, run: &mut Run, cancellation: &CancellationSignal) -> Result<()> {
        let settings = run_settings(run)?;
        let dream_keywords = self.store.list_keywords(run.id).await?;

        let mut tier2_candidates = Vec::new();
        for dream in dream_keywords.iter().filter(|k| k.tier == Tier::Dream100) {
            cancellation.check()?;
            tier2_candidates.extend(
                self.fan_out(
                    &dream.phrase,
                    Tier::Tier2,
                    settings.expansion.max_tier2_per_dream as usize,
                    &settings.expansion,
                    cancellation,
                )
                .await?,
            );
        }

        let mut tier3_candidates = Vec::new();
        for tier2 in &tier2_candidates {
            cancellation.check()?;
            tier3_candidates.extend(
                self.fan_out(
                    &tier2.phrase,
                    Tier::Tier3,
                    settings.expansion.max_tier3_per_tier2 as usize,
                    &settings.expansion,
                    cancellation,
                )
                .await?,
            );
        }

        let dream_as_candidates: Vec<Candidate> = dream_keywords
            .iter()
            .filter(|k| k.tier == Tier::Dream100)
            .map(|k| Candidate {
                phrase: k.phrase.clone(),
                tier: k.tier,
                parent_phrase: k.parent_phrase.clone(),
                relevance: Some(k.relevance),
            })
            .collect();

        let dream_phrases: HashSet<String> = dream_as_candidates
            .iter()
            .map(|c| c.phrase.as_str().to_string())
            .collect();

        let mut combined = dream_as_candidates;
        combined.extend(tier2_candidates);
        combined.extend(tier3_candidates);
        let deduped = dedupe_keep_highest_tier(combined);

        let new_candidates: Vec<Candidate> = deduped
            .into_iter()
            .filter(|c| !dream_phrases.contains(c.phrase.as_str()))
            .collect();

        cancellation.check()?;
        let batch_size = settings.clustering.embedding_batch_size;
        let mut enriched = enrich(new_candidates, self.metrics.as_ref(), self.embeddings.as_ref(), batch_size).await?;
        let metrics_batches = (enriched.len() as f64 / batch_size.max(1) as f64).ceil().max(1.0);
        run.api_usage
            .record("metrics", metrics_batches as u64, 0, cost::METRICS_CALL * metrics_batches);

        cancellation.check()?;
        classify_intent(&mut enriched, self.llm.as_ref(), batch_size).await?;
        run.api_usage.record("llm", 1, 0, cost::LLM_CALL);

        let filtered = quality_filter(enriched, settings.expansion.quality_threshold);

        let dream_enriched: Vec<EnrichedCandidate> = dream_keywords
            .iter()
            .filter(|k| k.tier == Tier::Dream100)
            .map(keyword_to_enriched)
            .collect();

        let mut for_capping = dream_enriched;
        for_capping.extend(filtered);
        let capped = smart_cap(for_capping, settings.orchestrator.max_total_keywords as usize);

        let new_keywords: Vec<Keyword> = capped
            .into_iter()
            .filter(|c| c.tier != Tier::Dream100)
            .map(|c| {
                let mut kw = Keyword::new(run.id, c.phrase, c.tier, c.parent_phrase);
                kw.volume = c.volume;
                kw.difficulty = c.difficulty;
                kw.intent = c.intent;
                kw.relevance = c.relevance;
                kw
            })
            .collect();

        info!(run_id = %run.id, count = new_keywords.len(), "universe expanded");
        self.store.append_keywords(run.id, new_keywords).await
    }

    async fn quality_gate(&self, run: &Run) -> Result<bool> {
        let keywords = self.store.list_keywords(run.id).await?;
        Ok(!keywords.is_empty())
    }
}
