//! Roadmap Generator (§4.G): assigns pillar/supporting stage, distributes
//! items across a monthly/weekly content calendar, and assigns a DRI by
//! load and specialty.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use kwr_config::{RoadmapSettings, TeamMember};
use kwr_core::ids::RunId;
use kwr_core::models::{Intent, RoadmapItem, RoadmapStage};
use kwr_core::values::{Phrase, Score};
use kwr_core::{KwrError, Result};

#[derive(Debug, Clone)]
pub struct RoadmapInput {
    pub phrase: Phrase,
    pub cluster_id: Option<String>,
    pub cluster_label: String,
    pub volume: u32,
    pub difficulty: u8,
    pub blended_score: f32,
    pub quick_win: bool,
    pub intent: Intent,
    pub source_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MonthlyDistribution {
    pub month_index: u32,
    pub pillar_count: usize,
    pub supporting_count: usize,
}

#[derive(Debug, Clone)]
pub struct DriWorkload {
    pub name: String,
    pub assigned_count: usize,
    pub capacity: u32,
}

#[derive(Debug, Clone)]
pub struct RoadmapAnalytics {
    pub monthly_distribution: Vec<MonthlyDistribution>,
    pub dri_workload: Vec<DriWorkload>,
    pub intent_distribution: HashMap<Intent, usize>,
    pub stage_distribution: HashMap<&'static str, usize>,
    pub top_opportunities: Vec<Phrase>,
}

#[derive(Debug, Clone)]
pub enum OptimizationRecommendation {
    PillarRatioImbalance { observed: f32, target: f32 },
    WorkloadImbalance { overloaded_dri: String, load_fraction: f32 },
    QuickWinUnderemphasized { quick_win_count: usize, total: usize },
}

#[derive(Debug, Clone)]
pub struct RoadmapOutput {
    pub items: Vec<RoadmapItem>,
    pub analytics: RoadmapAnalytics,
    pub recommendations: Vec<OptimizationRecommendation>,
}

/// Templated title, deterministic given `(primary_keyword, intent)` — the
/// Open Question on LLM-generated titles resolved in favor of a small
/// lookup table, per §9.
fn suggested_title(primary_keyword: &Phrase, intent: Intent) -> String {
    let phrase = primary_keyword.as_str();
    match intent {
        Intent::Transactional => format!("{}: Pricing, Plans, and How to Buy", titlecase(phrase)),
        Intent::Commercial => format!("Best {} in {}: A Buyer's Comparison", titlecase(phrase), chrono::Utc::now().year()),
        Intent::Informational => format!("{}: The Complete Guide", titlecase(phrase)),
        Intent::Navigational => format!("{}: Everything You Need to Know", titlecase(phrase)),
        Intent::Unknown => format!("{}: What You Need to Know", titlecase(phrase)),
    }
}

fn titlecase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn secondary_keywords_for(cluster_id: &Option<String>, primary: &Phrase, all: &[&RoadmapInput], max: usize) -> Vec<Phrase> {
    let mut peers: Vec<&&RoadmapInput> = all
        .iter()
        .filter(|k| k.cluster_id == *cluster_id && k.phrase != *primary)
        .collect();
    peers.sort_by(|a, b| b.volume.cmp(&a.volume).then_with(|| a.phrase.as_str().cmp(b.phrase.as_str())));
    peers.into_iter().take(max).map(|k| k.phrase.clone()).collect()
}

fn load_score(member: &TeamMember, current_load: u32) -> f32 {
    if member.capacity == 0 {
        return 0.0;
    }
    (0.0f32).max((member.capacity as f32 - current_load as f32) / member.capacity as f32)
}

fn specialty_score(member: &TeamMember, cluster_label: &str) -> f32 {
    let label_lower = cluster_label.to_lowercase();
    if member.specialties.iter().any(|s| label_lower.contains(&s.to_lowercase())) {
        1.0
    } else {
        0.3
    }
}

fn assign_dri(team_members: &[TeamMember], loads: &mut HashMap<String, u32>, cluster_label: &str) -> Option<String> {
    team_members
        .iter()
        .max_by(|a, b| {
            let current_a = *loads.get(&a.name).unwrap_or(&0);
            let current_b = *loads.get(&b.name).unwrap_or(&0);
            let score_a = 0.7 * load_score(a, current_a) + 0.3 * specialty_score(a, cluster_label);
            let score_b = 0.7 * load_score(b, current_b) + 0.3 * specialty_score(b, cluster_label);
            score_a.total_cmp(&score_b)
        })
        .map(|member| {
            *loads.entry(member.name.clone()).or_insert(0) += 1;
            member.name.clone()
        })
}

/// Builds the content roadmap from scored, clustered keywords.
pub fn generate_roadmap(
    run_id: RunId,
    inputs: Vec<RoadmapInput>,
    settings: &RoadmapSettings,
    start_date: NaiveDate,
) -> Result<RoadmapOutput> {
    if !(0.1..=0.9).contains(&settings.pillar_ratio) {
        return Err(KwrError::input_validation("pillar_ratio", "must be in [0.1, 0.9]"));
    }
    if inputs.is_empty() {
        return Err(KwrError::input_validation("inputs", "at least one scored keyword is required"));
    }

    // Publishing capacity over the full duration bounds how many scored
    // candidates actually become roadmap items; the rest are dropped,
    // highest blended score first.
    let capacity = settings.posts_per_month.max(1) as usize * settings.duration_months.max(1) as usize;

    let mut ordered: Vec<&RoadmapInput> = inputs.iter().collect();
    ordered.sort_by(|a, b| {
        if settings.quick_win_priority {
            b.quick_win.cmp(&a.quick_win).then_with(|| b.blended_score.total_cmp(&a.blended_score))
        } else {
            b.blended_score.total_cmp(&a.blended_score)
        }
    });
    ordered.truncate(capacity);

    let total_items = ordered.len();
    let pillar_budget = (total_items as f32 * settings.pillar_ratio).floor() as usize;

    // One pillar candidate per cluster: the highest-scoring item in that
    // cluster, up to `pillar_budget`. Scoped to the capacity-truncated set
    // so a dropped candidate can't still "lead" a cluster in the roadmap.
    let mut by_cluster: HashMap<Option<String>, Vec<&RoadmapInput>> = HashMap::new();
    for input in ordered.iter().copied() {
        by_cluster.entry(input.cluster_id.clone()).or_default().push(input);
    }
    let mut cluster_leaders: Vec<&RoadmapInput> = by_cluster
        .values()
        .filter_map(|members| {
            members
                .iter()
                .max_by(|a, b| a.blended_score.total_cmp(&b.blended_score))
                .copied()
        })
        .collect();
    cluster_leaders.sort_by(|a, b| b.blended_score.total_cmp(&a.blended_score));
    let pillar_phrases: std::collections::HashSet<&str> = cluster_leaders
        .iter()
        .take(pillar_budget)
        .map(|k| k.phrase.as_str())
        .collect();

    let mut items = Vec::with_capacity(total_items);
    let mut loads: HashMap<String, u32> = HashMap::new();
    let mut monthly_counts: HashMap<u32, (usize, usize)> = HashMap::new();
    let mut intent_distribution: HashMap<Intent, usize> = HashMap::new();
    let mut stage_distribution: HashMap<&'static str, usize> = HashMap::new();

    for (idx, input) in ordered.iter().enumerate() {
        let month_index = (idx / settings.posts_per_month.max(1) as usize) as u32;
        let week = (idx % settings.posts_per_month.max(1) as usize) / ((settings.posts_per_month.max(1) as usize / 4).max(1));
        let due_date = start_date + Duration::days((month_index as i64) * 30 + (week as i64) * 7);

        let stage = if pillar_phrases.contains(input.phrase.as_str()) {
            RoadmapStage::Pillar
        } else {
            RoadmapStage::Supporting
        };

        let dri = assign_dri(&settings.team_members, &mut loads, &input.cluster_label);
        let secondary = secondary_keywords_for(&input.cluster_id, &input.phrase, &ordered, 5);

        let entry = monthly_counts.entry(month_index).or_insert((0, 0));
        match stage {
            RoadmapStage::Pillar => entry.0 += 1,
            RoadmapStage::Supporting => entry.1 += 1,
        }
        *intent_distribution.entry(input.intent).or_insert(0) += 1;
        *stage_distribution.entry(match stage {
            RoadmapStage::Pillar => "pillar",
            RoadmapStage::Supporting => "supporting",
        }).or_insert(0) += 1;

        items.push(RoadmapItem {
            id: kwr_core::ids::RoadmapItemId::new(),
            run_id,
            // Resolved to the real ClusterId by the orchestrator, which holds
            // the string-label -> ClusterId mapping produced by Clustering.
            cluster_id: None,
            primary_keyword: input.phrase.clone(),
            secondary_keywords: secondary,
            stage,
            cluster_label: input.cluster_label.clone(),
            volume: input.volume,
            difficulty: input.difficulty,
            blended_score: Score::clamped(input.blended_score),
            quick_win: input.quick_win,
            suggested_title: suggested_title(&input.phrase, input.intent),
            dri,
            due_date,
            notes: String::new(),
            source_urls: input.source_urls.clone(),
        });
    }

    let mut monthly_distribution: Vec<MonthlyDistribution> = monthly_counts
        .into_iter()
        .map(|(month_index, (pillar_count, supporting_count))| MonthlyDistribution {
            month_index,
            pillar_count,
            supporting_count,
        })
        .collect();
    monthly_distribution.sort_by_key(|m| m.month_index);

    let dri_workload: Vec<DriWorkload> = loads
        .into_iter()
        .map(|(name, assigned_count)| {
            let capacity = settings
                .team_members
                .iter()
                .find(|m| m.name == name)
                .map(|m| m.capacity)
                .unwrap_or(0);
            DriWorkload {
                name,
                assigned_count: assigned_count as usize,
                capacity,
            }
        })
        .collect();

    let mut top_opportunities: Vec<&&RoadmapInput> = ordered.iter().filter(|k| k.quick_win).collect();
    top_opportunities.sort_by(|a, b| b.blended_score.total_cmp(&a.blended_score));
    let top_opportunities: Vec<Phrase> = top_opportunities.into_iter().take(10).map(|k| k.phrase.clone()).collect();

    let mut recommendations = Vec::new();
    let observed_pillar_ratio = stage_distribution.get("pillar").copied().unwrap_or(0) as f32 / total_items as f32;
    if (observed_pillar_ratio - settings.pillar_ratio).abs() > 0.1 {
        recommendations.push(OptimizationRecommendation::PillarRatioImbalance {
            observed: observed_pillar_ratio,
            target: settings.pillar_ratio,
        });
    }
    for workload in &dri_workload {
        if workload.capacity > 0 {
            let fraction = workload.assigned_count as f32 / workload.capacity as f32;
            if fraction > 1.2 {
                recommendations.push(OptimizationRecommendation::WorkloadImbalance {
                    overloaded_dri: workload.name.clone(),
                    load_fraction: fraction,
                });
            }
        }
    }
    let quick_win_count = ordered.iter().filter(|k| k.quick_win).count();
    if settings.quick_win_priority && quick_win_count > 0 && quick_win_count < total_items / 20 {
        recommendations.push(OptimizationRecommendation::QuickWinUnderemphasized {
            quick_win_count,
            total: total_items,
        });
    }

    Ok(RoadmapOutput {
        items,
        analytics: RoadmapAnalytics {
            monthly_distribution,
            dri_workload,
            intent_distribution,
            stage_distribution,
            top_opportunities,
        },
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kwr_config::TeamRole;

    fn input(phrase: &str, cluster: &str, volume: u32, score: f32, quick_win: bool) -> RoadmapInput {
        RoadmapInput {
            phrase: Phrase::new(phrase).unwrap(),
            cluster_id: Some(cluster.to_string()),
            cluster_label: cluster.to_string(),
            volume,
            difficulty: 40,
            blended_score: score,
            quick_win,
            intent: Intent::Commercial,
            source_urls: vec![],
        }
    }

    fn settings_with_team() -> RoadmapSettings {
        let mut settings = RoadmapSettings::default();
        settings.posts_per_month = 4;
        settings.team_members = vec![
            TeamMember {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                role: TeamRole::Writer,
                capacity: 10,
                specialties: vec!["social selling".into()],
                unavailable: vec![],
            },
            TeamMember {
                name: "Grace".into(),
                email: "grace@example.com".into(),
                role: TeamRole::Writer,
                capacity: 10,
                specialties: vec![],
                unavailable: vec![],
            },
        ];
        settings
    }

    #[test]
    fn rejects_invalid_pillar_ratio() {
        let mut settings = RoadmapSettings::default();
        settings.pillar_ratio = 0.95;
        let inputs = vec![input("a", "c1", 100, 0.5, false)];
        assert!(generate_roadmap(RunId::new(), inputs, &settings, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()).is_err());
    }

    #[test]
    fn every_input_produces_one_roadmap_item() {
        let settings = settings_with_team();
        let inputs = vec![
            input("social selling tools", "c1", 5000, 0.9, true),
            input("social selling software", "c1", 3000, 0.8, false),
            input("crm alternatives", "c2", 2000, 0.7, false),
        ];
        let total = inputs.len();
        let out = generate_roadmap(RunId::new(), inputs, &settings, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()).unwrap();
        assert_eq!(out.items.len(), total);
    }

    #[test]
    fn cluster_leader_becomes_pillar() {
        let settings = settings_with_team();
        let inputs = vec![
            input("social selling tools", "c1", 5000, 0.95, true),
            input("social selling software", "c1", 3000, 0.6, false),
        ];
        let out = generate_roadmap(RunId::new(), inputs, &settings, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()).unwrap();
        let leader = out.items.iter().find(|i| i.primary_keyword.as_str() == "social selling tools").unwrap();
        assert_eq!(leader.stage, RoadmapStage::Pillar);
    }

    #[test]
    fn dri_assignment_respects_specialty() {
        let settings = settings_with_team();
        let inputs = vec![input("social selling tools", "c1", 5000, 0.9, true)];
        let out = generate_roadmap(RunId::new(), inputs, &settings, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()).unwrap();
        assert_eq!(out.items[0].dri.as_deref(), Some("Ada"));
    }
}
