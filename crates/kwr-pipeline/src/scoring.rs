//! Scoring Engine (§4.D): pure functions over a batch of candidate keywords.
//! No I/O, no `tracing` spans inside the hot loop — timing is measured once
//! per `score_batch` call at the call site, the way `fusion::score_fusion`
//! keeps its normalizer free of side effects.

use chrono::NaiveDate;
use kwr_core::models::{Intent, Tier};
use kwr_core::values::{Phrase, Score};
use kwr_config::{ScoringWeights, WeightProfile};

/// One candidate's raw inputs to the Scoring Engine.
#[derive(Debug, Clone)]
pub struct ScoringInput {
    pub phrase: Phrase,
    pub tier: Tier,
    pub cluster_id: Option<String>,
    pub volume: u32,
    pub difficulty: u8,
    pub intent: Intent,
    pub relevance: f32,
    pub trend: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone)]
pub struct ScoringResult {
    pub phrase: Phrase,
    pub blended_score: Score,
    pub band: ScoreBand,
    pub quick_win: bool,
    pub overall_rank: usize,
    pub tier_rank: usize,
    pub cluster_rank: usize,
    pub component_breakdown: ComponentBreakdown,
}

#[derive(Debug, Clone)]
pub struct ComponentBreakdown {
    pub volume: f32,
    pub intent: f32,
    pub relevance: f32,
    pub trend: f32,
    pub ease: f32,
}

#[derive(Debug, Clone, Copy)]
pub enum VolumeNormalization {
    MinMax,
    ZScore,
    Percentile,
}

/// A seasonal multiplier applied when today falls within `[start, end]`
/// (month-day only, year-agnostic) and the phrase matches one in `phrases`
/// case-insensitively.
#[derive(Debug, Clone)]
pub struct SeasonalFactor {
    pub start_month_day: (u32, u32),
    pub end_month_day: (u32, u32),
    pub multiplier: f32,
    pub phrases: Vec<String>,
}

impl SeasonalFactor {
    fn matches_date(&self, today: NaiveDate) -> bool {
        let md = (today.month(), today.day());
        if self.start_month_day <= self.end_month_day {
            md >= self.start_month_day && md <= self.end_month_day
        } else {
            // window wraps year end, e.g. Nov 15 .. Jan 5
            md >= self.start_month_day || md <= self.end_month_day
        }
    }

    fn applies_to(&self, phrase: &Phrase, today: NaiveDate) -> bool {
        self.matches_date(today)
            && self
                .phrases
                .iter()
                .any(|p| p.eq_ignore_ascii_case(phrase.as_str()))
    }
}

use chrono::Datelike;

fn ease(difficulty: u8) -> f32 {
    ((100.0 - difficulty as f32) / 100.0).clamp(0.0, 1.0)
}

fn normalize_volume(inputs: &[ScoringInput], method: VolumeNormalization) -> Vec<f32> {
    let raw: Vec<f32> = inputs.iter().map(|i| i.volume as f32).collect();
    if raw.len() <= 1 {
        return raw
            .iter()
            .map(|v| ((v + 1.0).log10() / 6.0).clamp(0.0, 1.0))
            .collect();
    }

    match method {
        VolumeNormalization::MinMax => {
            let min = raw.iter().cloned().fold(f32::INFINITY, f32::min);
            let max = raw.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            if (max - min).abs() < f32::EPSILON {
                raw.iter()
                    .map(|v| ((v + 1.0).log10() / 6.0).clamp(0.0, 1.0))
                    .collect()
            } else {
                raw.iter().map(|v| (v - min) / (max - min)).collect()
            }
        }
        VolumeNormalization::ZScore => {
            let mean = raw.iter().sum::<f32>() / raw.len() as f32;
            let variance = raw.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / raw.len() as f32;
            let std_dev = variance.sqrt();
            if std_dev < f32::EPSILON {
                raw.iter()
                    .map(|v| ((v + 1.0).log10() / 6.0).clamp(0.0, 1.0))
                    .collect()
            } else {
                raw.iter()
                    .map(|v| ((v - mean) / std_dev + 3.0).clamp(0.0, 6.0) / 6.0)
                    .collect()
            }
        }
        VolumeNormalization::Percentile => {
            let mut sorted = raw.clone();
            sorted.sort_by(|a, b| a.total_cmp(b));
            raw.iter()
                .map(|v| {
                    let rank = sorted.partition_point(|x| x < v);
                    rank as f32 / (sorted.len() - 1).max(1) as f32
                })
                .collect()
        }
    }
}

fn normalize_trend(inputs: &[ScoringInput]) -> Vec<f32> {
    inputs.iter().map(|i| ((i.trend + 1.0) / 2.0).clamp(0.0, 1.0)).collect()
}

/// Runs the Scoring Engine over a batch, preserving input order in the
/// output. `today` drives seasonal adjustment and is always explicitly
/// supplied by the caller (never read from the system clock inside this
/// function), keeping score reproducible per testable property 5.
pub fn score_batch(
    inputs: &[ScoringInput],
    weights: &ScoringWeights,
    volume_normalization: VolumeNormalization,
    quick_win_threshold: f32,
    seasonal_factors: &[SeasonalFactor],
    today: NaiveDate,
) -> Vec<ScoringResult> {
    if inputs.is_empty() {
        return Vec::new();
    }

    let volume_components = normalize_volume(inputs, volume_normalization);
    let trend_components = normalize_trend(inputs);

    let cluster_median_volume = median_volume_by_cluster(inputs);

    let mut raw: Vec<(ComponentBreakdown, f32, bool)> = Vec::with_capacity(inputs.len());

    for (idx, input) in inputs.iter().enumerate() {
        let profile = profile_for_tier(weights, input.tier);
        let ease_component = ease(input.difficulty);
        let intent_component = input.intent.component_score();
        let relevance_component = input.relevance.clamp(0.0, 1.0);
        let volume_component = volume_components[idx];
        let trend_component = trend_components[idx];

        let mut blended = profile.volume * volume_component
            + profile.intent * intent_component
            + profile.relevance * relevance_component
            + profile.trend * trend_component
            + profile.ease * ease_component;
        blended = blended.clamp(0.0, 1.0);

        for factor in seasonal_factors {
            if factor.applies_to(&input.phrase, today) {
                blended = (blended * factor.multiplier).clamp(0.0, 1.0);
            }
        }

        let cluster_median = input
            .cluster_id
            .as_ref()
            .and_then(|c| cluster_median_volume.get(c))
            .copied();
        let meets_cluster_floor = cluster_median.map_or(true, |median| input.volume as f32 >= median);

        let quick_win = ease_component >= 0.7
            && input.volume >= 1000
            && blended >= quick_win_threshold.max(0.6)
            && meets_cluster_floor;

        raw.push((
            ComponentBreakdown {
                volume: volume_component,
                intent: intent_component,
                relevance: relevance_component,
                trend: trend_component,
                ease: ease_component,
            },
            blended,
            quick_win,
        ));
    }

    let overall_order = ranked_indices(inputs, &raw);
    let mut overall_rank = vec![0usize; inputs.len()];
    for (rank, &idx) in overall_order.iter().enumerate() {
        overall_rank[idx] = rank + 1;
    }

    let mut tier_rank = vec![0usize; inputs.len()];
    for tier in [Tier::Dream100, Tier::Tier2, Tier::Tier3] {
        let mut indices: Vec<usize> = overall_order.iter().copied().filter(|&i| inputs[i].tier == tier).collect();
        indices.sort_by(|&a, &b| rank_cmp(inputs, &raw, a, b));
        for (rank, &idx) in indices.iter().enumerate() {
            tier_rank[idx] = rank + 1;
        }
    }

    let mut cluster_rank = vec![0usize; inputs.len()];
    let mut clusters: std::collections::HashMap<&str, Vec<usize>> = std::collections::HashMap::new();
    for (idx, input) in inputs.iter().enumerate() {
        if let Some(cluster_id) = &input.cluster_id {
            clusters.entry(cluster_id.as_str()).or_default().push(idx);
        }
    }
    for indices in clusters.values_mut() {
        indices.sort_by(|&a, &b| rank_cmp(inputs, &raw, a, b));
        for (rank, &idx) in indices.iter().enumerate() {
            cluster_rank[idx] = rank + 1;
        }
    }

    inputs
        .iter()
        .enumerate()
        .map(|(idx, input)| {
            let (breakdown, blended, quick_win) = raw[idx].clone();
            let band = if blended >= 0.7 {
                ScoreBand::High
            } else if blended >= 0.4 {
                ScoreBand::Medium
            } else {
                ScoreBand::Low
            };
            ScoringResult {
                phrase: input.phrase.clone(),
                blended_score: Score::clamped(blended),
                band,
                quick_win,
                overall_rank: overall_rank[idx],
                tier_rank: tier_rank[idx],
                cluster_rank: cluster_rank[idx],
                component_breakdown: breakdown,
            }
        })
        .collect()
}

fn profile_for_tier(weights: &ScoringWeights, tier: Tier) -> WeightProfile {
    match tier {
        Tier::Dream100 => weights.dream100,
        Tier::Tier2 => weights.tier2,
        Tier::Tier3 => weights.tier3,
    }
}

fn median_volume_by_cluster(inputs: &[ScoringInput]) -> std::collections::HashMap<String, f32> {
    let mut by_cluster: std::collections::HashMap<String, Vec<u32>> = std::collections::HashMap::new();
    for input in inputs {
        if let Some(cluster_id) = &input.cluster_id {
            by_cluster.entry(cluster_id.clone()).or_default().push(input.volume);
        }
    }
    by_cluster
        .into_iter()
        .map(|(cluster_id, mut volumes)| {
            volumes.sort_unstable();
            let mid = volumes.len() / 2;
            let median = if volumes.len() % 2 == 0 && volumes.len() >= 2 {
                (volumes[mid - 1] + volumes[mid]) as f32 / 2.0
            } else {
                volumes[mid] as f32
            };
            (cluster_id, median)
        })
        .collect()
}

fn rank_cmp(inputs: &[ScoringInput], raw: &[(ComponentBreakdown, f32, bool)], a: usize, b: usize) -> std::cmp::Ordering {
    raw[b]
        .1
        .partial_cmp(&raw[a].1)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| inputs[b].volume.cmp(&inputs[a].volume))
        .then_with(|| inputs[a].phrase.as_str().cmp(inputs[b].phrase.as_str()))
}

fn ranked_indices(inputs: &[ScoringInput], raw: &[(ComponentBreakdown, f32, bool)]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..inputs.len()).collect();
    indices.sort_by(|&a, &b| rank_cmp(inputs, raw, a, b));
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwr_config::ScoringWeights;

    fn sample_input(phrase: &str, volume: u32, difficulty: u8, relevance: f32) -> ScoringInput {
        ScoringInput {
            phrase: Phrase::new(phrase).unwrap(),
            tier: Tier::Dream100,
            cluster_id: None,
            volume,
            difficulty,
            intent: Intent::Commercial,
            relevance,
            trend: 0.0,
        }
    }

    #[test]
    fn blended_score_is_always_in_unit_range() {
        let inputs = vec![
            sample_input("social selling tools", 5000, 20, 0.9),
            sample_input("obscure term", 1, 95, 0.1),
        ];
        let results = score_batch(
            &inputs,
            &ScoringWeights::default(),
            VolumeNormalization::MinMax,
            0.7,
            &[],
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        for r in &results {
            assert!(r.blended_score.value() >= 0.0 && r.blended_score.value() <= 1.0);
        }
    }

    #[test]
    fn quick_win_rule_requires_all_three_conditions() {
        let inputs = vec![sample_input("easy high volume term", 5000, 10, 0.95)];
        let results = score_batch(
            &inputs,
            &ScoringWeights::default(),
            VolumeNormalization::MinMax,
            0.6,
            &[],
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let r = &results[0];
        if r.quick_win {
            assert!(r.component_breakdown.ease >= 0.7);
            assert!(inputs[0].volume >= 1000);
            assert!(r.blended_score.value() >= 0.6);
        }
    }

    #[test]
    fn scoring_is_reproducible() {
        let inputs = vec![sample_input("repeatable term", 2000, 30, 0.8)];
        let weights = ScoringWeights::default();
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let a = score_batch(&inputs, &weights, VolumeNormalization::MinMax, 0.7, &[], today);
        let b = score_batch(&inputs, &weights, VolumeNormalization::MinMax, 0.7, &[], today);
        assert_eq!(a[0].blended_score.value(), b[0].blended_score.value());
    }

    #[test]
    fn overall_rank_orders_by_score_descending() {
        let inputs = vec![
            sample_input("low score term xyz", 10, 90, 0.1),
            sample_input("high score term abc", 8000, 5, 0.95),
        ];
        let results = score_batch(
            &inputs,
            &ScoringWeights::default(),
            VolumeNormalization::MinMax,
            0.7,
            &[],
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let top = results.iter().find(|r| r.overall_rank == 1).unwrap();
        assert_eq!(top.phrase.as_str(), "high score term abc");
    }

    #[test]
    fn seasonal_multiplier_applies_only_within_window_and_to_matching_phrase() {
        let inputs = vec![sample_input("black friday deals", 4000, 20, 0.8)];
        let factor = SeasonalFactor {
            start_month_day: (11, 1),
            end_month_day: (11, 30),
            multiplier: 1.5,
            phrases: vec!["black friday deals".to_string()],
        };
        let in_window = score_batch(
            &inputs,
            &ScoringWeights::default(),
            VolumeNormalization::MinMax,
            0.7,
            &[factor.clone()],
            NaiveDate::from_ymd_opt(2026, 11, 15).unwrap(),
        );
        let out_of_window = score_batch(
            &inputs,
            &ScoringWeights::default(),
            VolumeNormalization::MinMax,
            0.7,
            &[factor],
            NaiveDate::from_ymd_opt(2026, 6, 15).unwrap(),
        );
        assert!(in_window[0].blended_score.value() >= out_of_window[0].blended_score.value());
    }
}
