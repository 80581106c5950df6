//! Throughput checks for the two CPU-bound cores of the pipeline at the
//! ~10⁴-keyword budget `cluster_keywords` itself enforces as a hard cap.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use kwr_core::models::Intent;
use kwr_core::values::Phrase;
use kwr_pipeline::{cluster_keywords, score_batch, ClusteringInput, ClusteringParams, ScoringInput, VolumeNormalization};

const KEYWORD_COUNT: usize = 10_000;
const EMBEDDING_DIM: usize = 32;

/// Deterministic pseudo-random embedding: distinct clumps every
/// `cluster_width` entries so the similarity-threshold merge step has real
/// work to do rather than degenerating into 10,000 singleton outliers.
fn synthetic_embedding(index: usize, cluster_width: usize) -> Vec<f32> {
    let cluster = (index / cluster_width) as u32;
    let mut seed = cluster.wrapping_mul(2654435761).wrapping_add(1);
    (0..EMBEDDING_DIM)
        .map(|i| {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345 + i as u32);
            ((seed % 2000) as f32 / 1000.0) - 1.0
        })
        .collect()
}

fn synthetic_clustering_inputs(n: usize) -> Vec<ClusteringInput> {
    (0..n)
        .map(|i| ClusteringInput {
            phrase: Phrase::new(format!("keyword phrase number {i}")).unwrap(),
            embedding: synthetic_embedding(i, 20),
            intent: Intent::Informational,
            volume: 100 + (i as u32 % 5_000),
            blended_score: None,
        })
        .collect()
}

#[test]
fn clusters_ten_thousand_keywords_within_budget() {
    let inputs = synthetic_clustering_inputs(KEYWORD_COUNT);
    let params = ClusteringParams {
        similarity_threshold: 0.7,
        min_cluster_size: 3,
        max_cluster_size: 200,
        max_clusters: 200,
        intent_weight: 0.3,
        semantic_weight: 0.7,
    };

    let started = Instant::now();
    let output = cluster_keywords(inputs, &params).expect("clustering succeeds at the 10k cap");
    let elapsed = started.elapsed();

    let clustered: usize = output.clusters.iter().map(|c| c.size).sum();
    assert_eq!(clustered + output.outliers.len(), KEYWORD_COUNT);
    assert!(
        elapsed < Duration::from_secs(60),
        "clustering {KEYWORD_COUNT} keywords took {elapsed:?}, exceeding the throughput budget"
    );
}

#[test]
fn scores_ten_thousand_keywords_within_budget() {
    let weights = kwr_config::ScoringWeights::default();
    let inputs: Vec<ScoringInput> = (0..KEYWORD_COUNT)
        .map(|i| ScoringInput {
            phrase: Phrase::new(format!("keyword phrase number {i}")).unwrap(),
            tier: kwr_core::models::Tier::Tier2,
            cluster_id: Some(format!("cluster-{}", i / 20)),
            volume: 100 + (i as u32 % 5_000),
            difficulty: (i % 100) as u8,
            intent: Intent::Informational,
            relevance: 0.5,
            trend: 0.0,
        })
        .collect();

    let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let started = Instant::now();
    let results = score_batch(&inputs, &weights, VolumeNormalization::MinMax, 0.7, &[], today);
    let elapsed = started.elapsed();

    assert_eq!(results.len(), KEYWORD_COUNT);
    assert!(
        elapsed < Duration::from_secs(10),
        "scoring {KEYWORD_COUNT} keywords took {elapsed:?}, exceeding the throughput budget"
    );
}
