//! Clustering Engine (§4.E): sparse cosine similarity over an embedded
//! keyword universe, agglomerative merge by centroid average linkage, and
//! per-cluster quality metrics.
//!
//! The merge step uses a binary max-heap keyed by inter-cluster similarity
//! (§9 redesign flag against O(N²) hot loops): only edges touched by a
//! merge are recomputed, rather than rescanning every pair each round.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use kwr_core::models::Intent;
use kwr_core::values::{Phrase, Similarity};
use kwr_core::{KwrError, Result};
use kwr_providers::{CosineSimilarityCalculator, SimilarityCalculator};

#[derive(Debug, Clone)]
pub struct ClusteringInput {
    pub phrase: Phrase,
    pub embedding: Vec<f32>,
    pub intent: Intent,
    pub volume: u32,
    pub blended_score: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct ClusteringParams {
    pub similarity_threshold: f32,
    pub min_cluster_size: usize,
    pub max_cluster_size: usize,
    pub max_clusters: usize,
    pub intent_weight: f32,
    pub semantic_weight: f32,
}

impl ClusteringParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.1..=0.9).contains(&self.similarity_threshold) {
            return Err(KwrError::input_validation(
                "similarity_threshold",
                "must be in [0.1, 0.9]",
            ));
        }
        if self.min_cluster_size < 2 {
            return Err(KwrError::input_validation("min_cluster_size", "must be >= 2"));
        }
        if self.max_cluster_size <= self.min_cluster_size {
            return Err(KwrError::input_validation(
                "max_cluster_size",
                "must be greater than min_cluster_size",
            ));
        }
        if (self.intent_weight + self.semantic_weight - 1.0).abs() > 0.01 {
            return Err(KwrError::input_validation(
                "intent_weight+semantic_weight",
                "must sum to ~1.0",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ClusterResult {
    pub label: String,
    pub member_phrases: Vec<Phrase>,
    pub centroid: Vec<f32>,
    pub intent_mix: HashMap<Intent, f32>,
    pub representative_phrases: Vec<Phrase>,
    pub size: usize,
    /// Mean member-to-centroid cosine similarity, i.e. this cluster's own
    /// cohesion. Member-to-member similarity isn't retained past the merge
    /// loop (only centroids survive), so centroid distance stands in for it.
    pub cohesion: f32,
}

#[derive(Debug, Clone)]
pub enum ClusterWarning {
    SizeOutOfRange { label: String, size: usize },
    LowCoherence { threshold: f32 },
    WeakIntentMajority { label: String, share: f32 },
    DuplicatePhrase { phrase: String },
}

#[derive(Debug, Clone)]
pub struct QualityMetrics {
    pub within_cluster_similarity: f32,
    pub between_cluster_separation: f32,
    pub coverage: f32,
    pub balance: f32,
    pub overall: f32,
}

#[derive(Debug, Clone)]
pub struct ClusteringOutput {
    pub clusters: Vec<ClusterResult>,
    pub outliers: Vec<Phrase>,
    pub quality: QualityMetrics,
    pub warnings: Vec<ClusterWarning>,
}

struct HeapEntry {
    similarity: f32,
    smaller_size: usize,
    a: usize,
    b: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.similarity == other.similarity && self.a == other.a && self.b == other.b
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap on similarity; ties prefer merging the smaller cluster,
        // then lowest cluster id lexicographically (by numeric id here).
        self.similarity
            .total_cmp(&other.similarity)
            .then_with(|| other.smaller_size.cmp(&self.smaller_size))
            .then_with(|| other.a.cmp(&self.a))
    }
}

struct Cluster {
    members: Vec<usize>,
    centroid: Vec<f32>,
    alive: bool,
}

fn mean_vector(vectors: impl Iterator<Item = Vec<f32>>, dim: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; dim];
    let mut count = 0usize;
    for v in vectors {
        for (s, x) in sum.iter_mut().zip(v.iter()) {
            *s += x;
        }
        count += 1;
    }
    if count > 0 {
        for s in sum.iter_mut() {
            *s /= count as f32;
        }
    }
    sum
}

/// Runs the Clustering Engine over already-embedded candidates. Embedding
/// acquisition (cache lookups, batcher calls) happens upstream — this
/// function is the CPU-bound core and performs no I/O.
pub fn cluster_keywords(inputs: Vec<ClusteringInput>, params: &ClusteringParams) -> Result<ClusteringOutput> {
    params.validate()?;
    if inputs.is_empty() || inputs.len() > 10_000 {
        return Err(KwrError::input_validation(
            "inputs",
            "must contain between 1 and 10,000 keywords",
        ));
    }

    let dim = inputs[0].embedding.len();
    let calculator = CosineSimilarityCalculator;
    let n = inputs.len();

    let mut clusters: Vec<Cluster> = inputs
        .iter()
        .map(|i| Cluster {
            members: vec![],
            centroid: i.embedding.clone(),
            alive: true,
        })
        .collect();
    for (idx, cluster) in clusters.iter_mut().enumerate() {
        cluster.members.push(idx);
    }

    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let sim = calculator.calculate_similarity(&inputs[i].embedding, &inputs[j].embedding);
            if sim >= params.similarity_threshold {
                heap.push(HeapEntry {
                    similarity: sim,
                    smaller_size: 1,
                    a: i,
                    b: j,
                });
            }
        }
    }

    let mut alive_count = n;

    while alive_count > params.max_clusters {
        let Some(top) = heap.pop() else { break };
        if !clusters[top.a].alive || !clusters[top.b].alive {
            continue;
        }
        if top.similarity < params.similarity_threshold {
            break;
        }

        let (keep, drop) = if clusters[top.a].members.len() <= clusters[top.b].members.len() {
            (top.b, top.a)
        } else {
            (top.a, top.b)
        };

        let merged_members: Vec<usize> = clusters[keep]
            .members
            .iter()
            .chain(clusters[drop].members.iter())
            .copied()
            .collect();
        let new_centroid = mean_vector(
            merged_members.iter().map(|&idx| inputs[idx].embedding.clone()),
            dim,
        );

        clusters[drop].alive = false;
        clusters[keep].members = merged_members;
        clusters[keep].centroid = new_centroid;
        alive_count -= 1;

        for other in 0..clusters.len() {
            if other == keep || !clusters[other].alive {
                continue;
            }
            let sim = calculator.calculate_similarity(&clusters[keep].centroid, &clusters[other].centroid);
            if sim >= params.similarity_threshold {
                let (a, b) = if keep < other { (keep, other) } else { (other, keep) };
                heap.push(HeapEntry {
                    similarity: sim,
                    smaller_size: clusters[keep].members.len().min(clusters[other].members.len()),
                    a,
                    b,
                });
            }
        }
    }

    let mut warnings = Vec::new();
    let mut seen_phrases: HashSet<String> = HashSet::new();
    for input in &inputs {
        if !seen_phrases.insert(input.phrase.as_str().to_string()) {
            warnings.push(ClusterWarning::DuplicatePhrase {
                phrase: input.phrase.as_str().to_string(),
            });
        }
    }
    if params.similarity_threshold < 0.5 {
        warnings.push(ClusterWarning::LowCoherence {
            threshold: params.similarity_threshold,
        });
    }

    let mut results = Vec::new();
    let mut outliers = Vec::new();

    for cluster in clusters.iter().filter(|c| c.alive) {
        if cluster.members.len() < params.min_cluster_size {
            for &idx in &cluster.members {
                outliers.push(inputs[idx].phrase.clone());
            }
            continue;
        }

        let member_phrases: Vec<Phrase> = cluster.members.iter().map(|&idx| inputs[idx].phrase.clone()).collect();
        let label = derive_label(&member_phrases);

        let mut intent_counts: HashMap<Intent, u32> = HashMap::new();
        for &idx in &cluster.members {
            *intent_counts.entry(inputs[idx].intent).or_insert(0) += 1;
        }
        let total = cluster.members.len() as f32;
        let intent_mix: HashMap<Intent, f32> = intent_counts
            .into_iter()
            .map(|(intent, count)| (intent, count as f32 / total))
            .collect();

        let primary_share = intent_mix.values().cloned().fold(0.0f32, f32::max);
        if primary_share < 0.6 {
            warnings.push(ClusterWarning::WeakIntentMajority {
                label: label.clone(),
                share: primary_share,
            });
        }
        if cluster.members.len() < 3 || cluster.members.len() > 100 {
            warnings.push(ClusterWarning::SizeOutOfRange {
                label: label.clone(),
                size: cluster.members.len(),
            });
        }

        let mut ranked: Vec<usize> = cluster.members.clone();
        ranked.sort_by(|&a, &b| {
            let score_a = inputs[a].blended_score.unwrap_or(inputs[a].volume as f32 / 1_000_000.0);
            let score_b = inputs[b].blended_score.unwrap_or(inputs[b].volume as f32 / 1_000_000.0);
            score_b.total_cmp(&score_a)
        });
        let representative_phrases: Vec<Phrase> = ranked.iter().take(5).map(|&idx| inputs[idx].phrase.clone()).collect();

        let cohesion = cluster
            .members
            .iter()
            .map(|&idx| calculator.calculate_similarity(&inputs[idx].embedding, &cluster.centroid))
            .sum::<f32>()
            / cluster.members.len() as f32;

        results.push(ClusterResult {
            label,
            member_phrases,
            centroid: cluster.centroid.clone(),
            intent_mix,
            representative_phrases,
            size: cluster.members.len(),
            cohesion,
        });
    }

    let quality = compute_quality_metrics(&results, &outliers, n, &calculator);

    Ok(ClusteringOutput {
        clusters: results,
        outliers,
        quality,
        warnings,
    })
}

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "for", "to", "in", "on", "and", "or", "with", "is", "are", "how", "what",
];

fn derive_label(phrases: &[Phrase]) -> String {
    let mut term_counts: HashMap<String, u32> = HashMap::new();
    for phrase in phrases {
        for term in phrase.as_str().split_whitespace() {
            if term.len() > 2 && !STOPWORDS.contains(&term) {
                *term_counts.entry(term.to_string()).or_insert(0) += 1;
            }
        }
    }
    term_counts
        .into_iter()
        .max_by(|(term_a, count_a), (term_b, count_b)| count_a.cmp(count_b).then_with(|| term_b.cmp(term_a)))
        .map(|(term, _)| term)
        .unwrap_or_else(|| phrases.first().map(|p| p.as_str().to_string()).unwrap_or_default())
}

fn compute_quality_metrics(
    clusters: &[ClusterResult],
    outliers: &[Phrase],
    total_input: usize,
    calculator: &CosineSimilarityCalculator,
) -> QualityMetrics {
    if clusters.is_empty() {
        return QualityMetrics {
            within_cluster_similarity: 0.0,
            between_cluster_separation: 0.0,
            coverage: 0.0,
            balance: 0.0,
            overall: 0.0,
        };
    }

    // Mean edge weight inside clusters, approximated as each member's
    // similarity to its own centroid (member-to-member isn't retained past
    // the merge loop), size-weighted across clusters.
    let total_members: usize = clusters.iter().map(|c| c.size).sum();
    let within_cluster_similarity = if total_members == 0 {
        0.0
    } else {
        clusters.iter().map(|c| c.cohesion * c.size as f32).sum::<f32>() / total_members as f32
    };

    let mut cross_similarities = Vec::new();
    for i in 0..clusters.len() {
        for j in (i + 1)..clusters.len() {
            cross_similarities.push(calculator.calculate_similarity(&clusters[i].centroid, &clusters[j].centroid));
        }
    }
    let mean_cross = if cross_similarities.is_empty() {
        0.0
    } else {
        cross_similarities.iter().sum::<f32>() / cross_similarities.len() as f32
    };
    let between_cluster_separation = Similarity::new(1.0 - mean_cross).value().max(0.0);

    let clustered = clusters.iter().map(|c| c.size).sum::<usize>();
    let coverage = if total_input == 0 {
        0.0
    } else {
        clustered as f32 / total_input as f32
    };

    let sizes: Vec<f32> = clusters.iter().map(|c| c.size as f32).collect();
    let mean_size = sizes.iter().sum::<f32>() / sizes.len() as f32;
    let variance = sizes.iter().map(|s| (s - mean_size).powi(2)).sum::<f32>() / sizes.len() as f32;
    let stddev = variance.sqrt();
    let balance = (1.0 - if mean_size > 0.0 { stddev / mean_size } else { 0.0 }).max(0.0);

    let overall =
        0.30 * within_cluster_similarity + 0.25 * between_cluster_separation + 0.25 * coverage + 0.20 * balance;

    let _ = outliers;
    QualityMetrics {
        within_cluster_similarity,
        between_cluster_separation,
        coverage,
        balance,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(phrase: &str, embedding: Vec<f32>) -> ClusteringInput {
        ClusteringInput {
            phrase: Phrase::new(phrase).unwrap(),
            embedding,
            intent: Intent::Commercial,
            volume: 1000,
            blended_score: None,
        }
    }

    fn default_params() -> ClusteringParams {
        ClusteringParams {
            similarity_threshold: 0.7,
            min_cluster_size: 2,
            max_cluster_size: 50,
            max_clusters: 10,
            intent_weight: 0.3,
            semantic_weight: 0.7,
        }
    }

    #[test]
    fn rejects_invalid_params() {
        let mut params = default_params();
        params.similarity_threshold = 0.05;
        let inputs = vec![input("a", vec![1.0, 0.0])];
        assert!(cluster_keywords(inputs, &params).is_err());
    }

    #[test]
    fn clusters_near_identical_embeddings_together() {
        let inputs = vec![
            input("social selling tools", vec![1.0, 0.0, 0.0]),
            input("social selling software", vec![0.99, 0.01, 0.0]),
            input("social selling platform", vec![0.98, 0.02, 0.0]),
            input("unrelated topic entirely", vec![0.0, 0.0, 1.0]),
        ];
        let out = cluster_keywords(inputs, &default_params()).unwrap();
        assert_eq!(out.clusters.len(), 1);
        assert_eq!(out.clusters[0].size, 3);
        assert_eq!(out.outliers.len(), 1);
    }

    #[test]
    fn cluster_cover_accounts_for_every_keyword() {
        let inputs = vec![
            input("a one", vec![1.0, 0.0]),
            input("a two", vec![0.99, 0.01]),
            input("b one", vec![0.0, 1.0]),
        ];
        let total = inputs.len();
        let out = cluster_keywords(inputs, &default_params()).unwrap();
        let clustered: usize = out.clusters.iter().map(|c| c.size).sum();
        assert_eq!(clustered + out.outliers.len(), total);
    }

    #[test]
    fn quality_reflects_actual_cohesion() {
        let tight = vec![
            input("social selling tools", vec![1.0, 0.0, 0.0]),
            input("social selling software", vec![0.999, 0.001, 0.0]),
            input("social selling platform", vec![0.998, 0.002, 0.0]),
        ];
        let loose = vec![
            input("alpha one", vec![1.0, 0.0, 0.0]),
            input("alpha two", vec![0.8, 0.2, 0.0]),
            input("alpha three", vec![0.7, 0.3, 0.0]),
        ];
        let tight_out = cluster_keywords(tight, &default_params()).unwrap();
        let loose_out = cluster_keywords(loose, &default_params()).unwrap();
        assert!(tight_out.quality.within_cluster_similarity > loose_out.quality.within_cluster_similarity);
    }

    #[test]
    fn intent_mix_sums_to_one() {
        let inputs = vec![
            input("term one", vec![1.0, 0.0]),
            input("term two", vec![0.99, 0.01]),
            input("term three", vec![0.98, 0.02]),
        ];
        let out = cluster_keywords(inputs, &default_params()).unwrap();
        for cluster in &out.clusters {
            let sum: f32 = cluster.intent_mix.values().sum();
            assert!((sum - 1.0).abs() < 0.01);
        }
    }
}
