//! Clustering stage (§4.E): attaches embeddings to any keyword missing one,
//! runs the pure agglomerative clustering core, and writes clusters plus
//! the keyword→cluster assignment back to the Run Store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kwr_api::RunStore;
use kwr_core::ids::ClusterId;
use kwr_core::models::{Cluster, Keyword, Run, Stage};
use kwr_core::values::Score;
use kwr_core::{KwrError, Result};
use kwr_pipeline::orchestrator::{CancellationSignal, PipelineStage};
use kwr_pipeline::{cluster_keywords, ClusteringInput, ClusteringParams};
use kwr_providers::EmbeddingGenerator;
use tracing::info;

use super::{cost, run_settings};

pub struct ClusteringStage {
    store: Arc<dyn RunStore>,
    embeddings: Arc<dyn EmbeddingGenerator>,
}

impl ClusteringStage {
    pub fn new(store: Arc<dyn RunStore>, embeddings: Arc<dyn EmbeddingGenerator>) -> Self {
        Self { store, embeddings }
    }

    async fn ensure_embeddings(
        &self,
        keywords: &mut [Keyword],
        batch_size: usize,
        cancellation: &CancellationSignal,
    ) -> Result<u64> {
        let mut batches = 0u64;
        let missing: Vec<usize> = keywords
            .iter()
            .enumerate()
            .filter(|(_, k)| k.embedding.is_none())
            .map(|(i, _)| i)
            .collect();

        for chunk in missing.chunks(batch_size.max(1)) {
            cancellation.check()?;
            let texts: Vec<&str> = chunk.iter().map(|&i| keywords[i].phrase.as_str()).collect();
            let vectors = self.embeddings.generate_batch_embeddings(&texts).await?;
            for (&idx, vector) in chunk.iter().zip(vectors) {
                keywords[idx].embedding = Some(vector);
            }
            batches += 1;
        }
        Ok(batches)
    }
}

#[async_trait]
impl PipelineStage for ClusteringStage {
    fn stage(&self) -> Stage {
        Stage::Clustering
    }

    async fn run(&self, run: &mut Run, cancellation: &CancellationSignal) -> Result<()> {
        let settings = run_settings(run)?;
        let mut keywords = self.store.list_keywords(run.id).await?;

        let batches = self
            .ensure_embeddings(&mut keywords, settings.clustering.embedding_batch_size, cancellation)
            .await?;
        if batches > 0 {
            run.api_usage.record("embeddings", batches, 0, cost::EMBEDDING_CALL * batches as f64);
        }

        cancellation.check()?;
        let inputs: Vec<ClusteringInput> = keywords
            .iter()
            .filter_map(|k| {
                k.embedding.clone().map(|embedding| ClusteringInput {
                    phrase: k.phrase.clone(),
                    embedding,
                    intent: k.intent,
                    volume: k.volume,
                    blended_score: k.blended_score.map(|s| s.value()),
                })
            })
            .collect();

        let params = ClusteringParams {
            similarity_threshold: settings.clustering.similarity_threshold,
            min_cluster_size: settings.clustering.min_cluster_size,
            max_cluster_size: settings.clustering.max_cluster_size,
            max_clusters: settings.clustering.max_clusters,
            intent_weight: settings.clustering.intent_weight,
            semantic_weight: settings.clustering.semantic_weight,
        };
        let output = cluster_keywords(inputs, &params)?;

        let mut phrase_to_cluster: HashMap<String, ClusterId> = HashMap::new();
        for result in &output.clusters {
            let id = ClusterId::new();
            for phrase in &result.member_phrases {
                phrase_to_cluster.insert(phrase.as_str().to_string(), id);
            }
            let cluster = Cluster {
                id,
                run_id: run.id,
                label: result.label.clone(),
                size: result.size,
                score: Score::zero(),
                intent_mix: result.intent_mix.clone(),
                representative_phrases: result.representative_phrases.clone(),
                similarity_threshold: params.similarity_threshold,
                centroid: result.centroid.clone(),
            };
            self.store.set_cluster(run.id, cluster).await?;
        }

        for keyword in keywords.iter_mut() {
            keyword.cluster_id = phrase_to_cluster.get(keyword.phrase.as_str()).copied();
        }

        info!(
            run_id = %run.id,
            clusters = output.clusters.len(),
            outliers = output.outliers.len(),
            quality = output.quality.overall,
            "clustering complete"
        );
        for warning in &output.warnings {
            run.warnings.push(format!("{:?}", warning));
        }

        self.store.replace_keywords(run.id, keywords).await
    }

    async fn quality_gate(&self, run: &Run) -> Result<bool> {
        let clusters = self.store.list_clusters(run.id).await?;
        if clusters.len() < 5 {
            return Err(KwrError::quality_gate_failure(
                "clustering",
                format!("only {} clusters produced, expected at least 5", clusters.len()),
            ));
        }
        Ok(true)
    }
}
