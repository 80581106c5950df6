//! Roadmap stage (§4.G): turns scored, clustered keywords into a publishing
//! calendar. `kwr_pipeline::generate_roadmap` never assigns `cluster_id` on
//! the items it produces (it only knows cluster labels), so this stage
//! patches each item's `cluster_id` by matching labels against the Run's
//! persisted clusters before saving.

use std::sync::Arc;

use async_trait::async_trait;
use kwr_api::RunStore;
use kwr_core::models::{Run, Stage};
use kwr_core::Result;
use kwr_pipeline::orchestrator::{CancellationSignal, PipelineStage};
use kwr_pipeline::{generate_roadmap, RoadmapInput};
use tracing::info;

pub struct RoadmapStage {
    store: Arc<dyn RunStore>,
}

impl RoadmapStage {
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PipelineStage for RoadmapStage {
    fn stage(&self) -> Stage {
        Stage::Roadmap
    }

    async fn run(&self, run: &mut Run, cancellation: &CancellationSignal) -> Result<()> {
        cancellation.check()?;
        let settings = super::run_settings(run)?;
        let keywords = self.store.list_keywords(run.id).await?;
        let clusters = self.store.list_clusters(run.id).await?;

        let inputs: Vec<RoadmapInput> = keywords
            .iter()
            .filter_map(|k| {
                let cluster = clusters.iter().find(|c| Some(c.id) == k.cluster_id)?;
                Some(RoadmapInput {
                    phrase: k.phrase.clone(),
                    cluster_id: Some(cluster.id.to_string()),
                    cluster_label: cluster.label.clone(),
                    volume: k.volume,
                    difficulty: k.difficulty,
                    blended_score: k.blended_score.map(|s| s.value()).unwrap_or(0.0),
                    quick_win: k.quick_win,
                    intent: k.intent,
                    source_urls: k.top_serp_urls.clone(),
                })
            })
            .collect();

        cancellation.check()?;
        let start_date = chrono::Utc::now().date_naive();
        let output = generate_roadmap(run.id, inputs, &settings.roadmap, start_date)?;

        for mut item in output.items {
            item.cluster_id = clusters
                .iter()
                .find(|c| c.label == item.cluster_label)
                .map(|c| c.id);
            self.store.append_roadmap_item(run.id, item).await?;
        }

        for recommendation in &output.recommendations {
            run.warnings.push(format!("{:?}", recommendation));
        }

        info!(run_id = %run.id, items = output.analytics.stage_distribution.len(), "roadmap generated");
        Ok(())
    }

    async fn quality_gate(&self, run: &Run) -> Result<bool> {
        let items = self.store.list_roadmap_items(run.id).await?;
        Ok(!items.is_empty())
    }
}
