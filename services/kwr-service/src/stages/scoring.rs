//! Scoring stage (§4.D): blended scoring, quick-win flagging and ranking
//! over every persisted keyword, followed by a per-cluster score rollup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kwr_api::RunStore;
use kwr_core::ids::ClusterId;
use kwr_core::models::{Run, Stage};
use kwr_core::values::Score;
use kwr_core::Result;
use kwr_pipeline::orchestrator::{CancellationSignal, PipelineStage};
use kwr_pipeline::{score_batch, ScoringInput, VolumeNormalization};
use tracing::info;

pub struct ScoringStage {
    store: Arc<dyn RunStore>,
}

impl ScoringStage {
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PipelineStage for ScoringStage {
    fn stage(&self) -> Stage {
        Stage::Scoring
    }

    async fn run(&self, run: &mut Run, cancellation: &CancellationSignal) -> Result<()> {
        cancellation.check()?;
        let settings = super::run_settings(run)?;
        let mut keywords = self.store.list_keywords(run.id).await?;

        let inputs: Vec<ScoringInput> = keywords
            .iter()
            .map(|k| ScoringInput {
                phrase: k.phrase.clone(),
                tier: k.tier,
                cluster_id: k.cluster_id.map(|id| id.to_string()),
                volume: k.volume,
                difficulty: k.difficulty,
                intent: k.intent,
                relevance: k.relevance,
                trend: k.trend,
            })
            .collect();

        let today = chrono::Utc::now().date_naive();
        let results = score_batch(
            &inputs,
            &settings.scoring.weights,
            VolumeNormalization::MinMax,
            settings.scoring.quick_win_threshold,
            &[],
            today,
        );

        for (keyword, result) in keywords.iter_mut().zip(results.iter()) {
            keyword.blended_score = Some(result.blended_score);
            keyword.quick_win = result.quick_win;
        }

        let mut cluster_scores: HashMap<ClusterId, Vec<f32>> = HashMap::new();
        for keyword in &keywords {
            if let (Some(cluster_id), Some(score)) = (keyword.cluster_id, keyword.blended_score) {
                cluster_scores.entry(cluster_id).or_default().push(score.value());
            }
        }
        for cluster in self.store.list_clusters(run.id).await? {
            if let Some(scores) = cluster_scores.get(&cluster.id) {
                let mean = scores.iter().sum::<f32>() / scores.len() as f32;
                let mut updated = cluster;
                updated.score = Score::clamped(mean);
                self.store.set_cluster(run.id, updated).await?;
            }
        }

        let quick_win_count = keywords.iter().filter(|k| k.quick_win).count();
        info!(run_id = %run.id, scored = keywords.len(), quick_wins = quick_win_count, "scoring complete");

        self.store.replace_keywords(run.id, keywords).await
    }

    async fn quality_gate(&self, run: &Run) -> Result<bool> {
        let keywords = self.store.list_keywords(run.id).await?;
        if keywords.is_empty() {
            return Ok(true);
        }
        let quick_win_fraction =
            keywords.iter().filter(|k| k.quick_win).count() as f32 / keywords.len() as f32;
        Ok(quick_win_fraction <= 0.5)
    }
}
