//! Expansion stage (§4.F, Dream100 half): seed-to-Dream100 generation via
//! LLM semantic expansion. Tier2/Tier3 fan-out lives in [`super::universe`] —
//! the orchestrator DAG splits what `kwr-pipeline::expansion` treats as one
//! pipeline into two dependency-gated, independently-progress-weighted jobs.

use std::sync::Arc;

use async_trait::async_trait;
use kwr_api::RunStore;
use kwr_core::models::{Keyword, Run, Stage, Tier};
use kwr_core::Result;
use kwr_pipeline::generate_dream100;
use kwr_pipeline::orchestrator::{CancellationSignal, PipelineStage};
use kwr_providers::{EmbeddingGenerator, LlmProvider};
use tracing::info;

use super::{cost, run_settings};

pub struct ExpansionStage {
    store: Arc<dyn RunStore>,
    llm: Arc<dyn LlmProvider>,
    embeddings: Arc<dyn EmbeddingGenerator>,
}

impl ExpansionStage {
    pub fn new(store: Arc<dyn RunStore>, llm: Arc<dyn LlmProvider>, embeddings: Arc<dyn EmbeddingGenerator>) -> Self {
        Self { store, llm, embeddings }
    }
}

#[async_trait]
impl PipelineStage for ExpansionStage {
    fn stage(&self) -> Stage {
        Stage::Expansion
    }

    async fn run(&self, run: &mut Run, cancellation: &CancellationSignal) -> Result<()> {
        cancellation.check()?;
        let settings = run_settings(run)?;

        let candidates =
            generate_dream100(&run.seeds, self.llm.as_ref(), self.embeddings.as_ref(), &settings.expansion).await?;
        cancellation.check()?;

        let keywords: Vec<Keyword> = candidates
            .into_iter()
            .map(|c| {
                let mut kw = Keyword::new(run.id, c.phrase, Tier::Dream100, c.parent_phrase);
                kw.relevance = c.relevance.unwrap_or(0.0);
                kw
            })
            .collect();

        run.api_usage.record("llm", 1, 0, cost::LLM_CALL);
        info!(run_id = %run.id, count = keywords.len(), "dream100 generated");

        self.store.append_keywords(run.id, keywords).await
    }

    async fn quality_gate(&self, run: &Run) -> Result<bool> {
        let keywords = self.store.list_keywords(run.id).await?;
        let dream_count = keywords.iter().filter(|k| k.tier == Tier::Dream100).count();
        Ok(dream_count >= 50)
    }
}
