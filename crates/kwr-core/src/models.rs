use crate::error::{KwrError, Result};
use crate::ids::{ClusterId, JobId, KeywordId, RoadmapItemId, RunId};
use crate::values::{Phrase, Score};
use crate::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Expansion tier. Ordering reflects traffic potential, highest first:
/// `Dream100 > Tier2 > Tier3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    Dream100,
    Tier2,
    Tier3,
}

impl Tier {
    /// True if `self` is a valid immediate-or-ancestor tier for `child`,
    /// i.e. strictly higher traffic potential.
    pub fn is_strictly_above(&self, child: Tier) -> bool {
        self.rank() > child.rank()
    }

    fn rank(&self) -> u8 {
        match self {
            Tier::Dream100 => 2,
            Tier::Tier2 => 1,
            Tier::Tier3 => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Transactional,
    Commercial,
    Informational,
    Navigational,
    Unknown,
}

impl Intent {
    /// Fixed normalization table from the Scoring Engine contract.
    pub fn component_score(&self) -> f32 {
        match self {
            Intent::Transactional => 1.0,
            Intent::Commercial => 0.8,
            Intent::Informational => 0.6,
            Intent::Navigational => 0.4,
            Intent::Unknown => 0.6,
        }
    }
}

impl Default for Intent {
    fn default() -> Self {
        Intent::Unknown
    }
}

/// Origin of a metrics value, surfaced on every downstream artifact per the
/// "mock fallback silently substituted" redesign flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricsSource {
    Provider(String),
    Mock,
}

/// The atomic unit produced by Expansion and refined by every later stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub id: KeywordId,
    pub run_id: RunId,
    pub phrase: Phrase,
    pub tier: Tier,
    pub parent_phrase: Option<Phrase>,
    pub volume: u32,
    pub difficulty: u8,
    pub intent: Intent,
    pub relevance: f32,
    pub trend: f32,
    pub cpc: Option<f32>,
    pub blended_score: Option<Score>,
    pub quick_win: bool,
    pub cluster_id: Option<ClusterId>,
    pub embedding: Option<Vec<f32>>,
    pub top_serp_urls: Vec<String>,
    pub metrics_source: Option<MetricsSource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Keyword {
    pub fn new(run_id: RunId, phrase: Phrase, tier: Tier, parent_phrase: Option<Phrase>) -> Self {
        let now = Utc::now();
        Self {
            id: KeywordId::new(),
            run_id,
            phrase,
            tier,
            parent_phrase,
            volume: 0,
            difficulty: 0,
            intent: Intent::Unknown,
            relevance: 0.0,
            trend: 0.0,
            cpc: None,
            blended_score: None,
            quick_win: false,
            cluster_id: None,
            embedding: None,
            top_serp_urls: Vec::new(),
            metrics_source: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `ease = (100 - difficulty) / 100`, clamped to `[0, 1]`.
    pub fn ease(&self) -> f32 {
        ((100.0 - self.difficulty as f32) / 100.0).clamp(0.0, 1.0)
    }
}

/// A semantic grouping of Keywords produced by the Clustering Engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub run_id: RunId,
    pub label: String,
    pub size: usize,
    pub score: Score,
    pub intent_mix: HashMap<Intent, f32>,
    pub representative_phrases: Vec<Phrase>,
    pub similarity_threshold: f32,
    pub centroid: Vec<f32>,
}

impl Cluster {
    /// Intent mix must sum to 1.0 within ±0.01 (testable property 8).
    pub fn intent_mix_is_valid(&self) -> bool {
        let sum: f32 = self.intent_mix.values().sum();
        (sum - 1.0).abs() <= 0.01
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

/// Fixed, ordered pipeline stages. Weights sum to 100 and drive progress
/// aggregation (`overall = Σ stage_weight · stage_progress_fraction`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    Initialization,
    Expansion,
    Universe,
    Clustering,
    Scoring,
    Roadmap,
    Export,
    Cleanup,
}

impl Stage {
    pub const ORDERED: [Stage; 8] = [
        Stage::Initialization,
        Stage::Expansion,
        Stage::Universe,
        Stage::Clustering,
        Stage::Scoring,
        Stage::Roadmap,
        Stage::Export,
        Stage::Cleanup,
    ];

    /// Progress-aggregation weight in percent; sums to 100 across all stages.
    pub fn weight_pct(&self) -> u8 {
        match self {
            Stage::Initialization => 5,
            Stage::Expansion => 40,
            Stage::Universe => 25,
            Stage::Clustering => 15,
            Stage::Scoring => 8,
            Stage::Roadmap => 5,
            Stage::Export => 2,
            Stage::Cleanup => 0,
        }
    }

    pub fn next(&self) -> Option<Stage> {
        let idx = Self::ORDERED.iter().position(|s| s == self)?;
        Self::ORDERED.get(idx + 1).copied()
    }
}

/// Per-provider API usage accounting for budget enforcement (§4.H, §7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiUsage {
    pub per_provider: HashMap<String, ProviderUsage>,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub requests: u64,
    pub tokens: u64,
    pub cost: f64,
    pub errors: u64,
}

impl ApiUsage {
    pub fn record(&mut self, provider: &str, requests: u64, tokens: u64, cost: f64) {
        let entry = self.per_provider.entry(provider.to_string()).or_default();
        entry.requests += requests;
        entry.tokens += tokens;
        entry.cost += cost;
        self.total_cost += cost;
    }

    pub fn record_error(&mut self, provider: &str) {
        self.per_provider.entry(provider.to_string()).or_default().errors += 1;
    }
}

/// One end-to-end pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub owner_id: String,
    pub seeds: Vec<Phrase>,
    pub market: String,
    pub language: String,
    /// Snapshot of the typed `Settings` record this Run was created with,
    /// serialized at submission time (matches the `settings_json` column
    /// in the logical stored-state layout).
    pub settings: serde_json::Value,
    pub status: RunStatus,
    pub current_stage: Option<Stage>,
    pub completed_stages: Vec<Stage>,
    pub progress: u8,
    pub api_usage: ApiUsage,
    pub budget_limit: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_log: Vec<String>,
    pub warnings: Vec<String>,
}

impl Run {
    pub fn new(
        owner_id: impl Into<String>,
        seeds: Vec<Phrase>,
        market: impl Into<String>,
        language: impl Into<String>,
        settings: serde_json::Value,
        budget_limit: f64,
    ) -> Result<Self> {
        if seeds.is_empty() || seeds.len() > 5 {
            return Err(KwrError::input_validation(
                "seeds",
                "must supply between 1 and 5 seed phrases",
            ));
        }
        let mut unique = seeds.clone();
        unique.sort();
        unique.dedup();
        if unique.len() != seeds.len() {
            return Err(KwrError::input_validation("seeds", "seeds must be unique"));
        }
        if budget_limit < 10.0 {
            return Err(KwrError::input_validation(
                "budget_limit",
                "must be at least 10",
            ));
        }

        Ok(Self {
            id: RunId::new(),
            owner_id: owner_id.into(),
            seeds,
            market: market.into(),
            language: language.into(),
            settings,
            status: RunStatus::Pending,
            current_stage: None,
            completed_stages: Vec::new(),
            progress: 0,
            api_usage: ApiUsage::default(),
            budget_limit,
            started_at: None,
            completed_at: None,
            error_log: Vec::new(),
            warnings: Vec::new(),
        })
    }

    /// Guarded transition; terminal states are sinks (testable property 10).
    pub fn transition_to(&mut self, next: RunStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(KwrError::internal(format!(
                "cannot transition Run out of terminal state {:?}",
                self.status
            )));
        }
        if next == RunStatus::Processing && self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        self.status = next;
        Ok(())
    }

    /// Monotonically non-decreasing while `status = Processing` (testable property 9).
    pub fn advance_progress(&mut self, new_progress: u8) {
        if new_progress > self.progress {
            self.progress = new_progress.min(100);
        }
    }

    pub fn mark_stage_completed(&mut self, stage: Stage) {
        if !self.completed_stages.contains(&stage) {
            self.completed_stages.push(stage);
        }
        self.current_stage = stage.next();
    }

    pub fn would_exceed_budget(&self, additional_cost: f64) -> bool {
        self.api_usage.total_cost + additional_cost > self.budget_limit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    Retrying,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }
}

/// A unit of orchestration corresponding to one pipeline Stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub run_id: RunId,
    pub stage: Stage,
    pub priority: u8,
    pub status: JobStatus,
    pub dependencies: Vec<JobId>,
    pub attempt: u32,
    pub max_attempts: u32,
    pub error: Option<String>,
}

impl Job {
    pub fn new(run_id: RunId, stage: Stage, dependencies: Vec<JobId>, max_attempts: u32) -> Self {
        Self {
            id: JobId::new(),
            run_id,
            stage,
            priority: 5,
            status: JobStatus::Queued,
            dependencies,
            attempt: 0,
            max_attempts,
            error: None,
        }
    }

    pub fn can_start(&self, completed: &[JobId]) -> bool {
        self.dependencies.iter().all(|dep| completed.contains(dep))
    }

    pub fn record_attempt_failure(&mut self, error: impl Into<String>) {
        self.attempt += 1;
        self.error = Some(error.into());
        self.status = if self.attempt >= self.max_attempts {
            JobStatus::Failed
        } else {
            JobStatus::Retrying
        };
    }
}

/// Roadmap stage: pillar items anchor a cluster, supporting items orbit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoadmapStage {
    Pillar,
    Supporting,
}

/// One scheduled content post in the generated roadmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapItem {
    pub id: RoadmapItemId,
    pub run_id: RunId,
    pub cluster_id: Option<ClusterId>,
    pub primary_keyword: Phrase,
    pub secondary_keywords: Vec<Phrase>,
    pub stage: RoadmapStage,
    pub cluster_label: String,
    pub volume: u32,
    pub difficulty: u8,
    pub blended_score: Score,
    pub quick_win: bool,
    pub suggested_title: String,
    pub dri: Option<String>,
    pub due_date: chrono::NaiveDate,
    pub notes: String,
    pub source_urls: Vec<String>,
}

/// Health status for a provider, cache, or service component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    Degraded { message: String },
    Unhealthy { message: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
    pub details: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(p: &str) -> Phrase {
        Phrase::new(p).unwrap()
    }

    #[test]
    fn run_rejects_too_many_seeds() {
        let seeds = (0..6).map(|i| seed(&format!("seed {i}"))).collect();
        let err = Run::new("owner", seeds, "US", "en", serde_json::json!({}), 100.0).unwrap_err();
        assert!(matches!(err, KwrError::InputValidation { .. }));
    }

    #[test]
    fn run_rejects_budget_below_minimum() {
        let err = Run::new(
            "owner",
            vec![seed("social selling")],
            "US",
            "en",
            serde_json::json!({}),
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, KwrError::InputValidation { .. }));
    }

    #[test]
    fn run_terminal_state_cannot_transition() {
        let mut run = Run::new(
            "owner",
            vec![seed("social selling")],
            "US",
            "en",
            serde_json::json!({}),
            100.0,
        )
        .unwrap();
        run.transition_to(RunStatus::Processing).unwrap();
        run.transition_to(RunStatus::Completed).unwrap();
        assert!(run.transition_to(RunStatus::Processing).is_err());
    }

    #[test]
    fn progress_never_decreases() {
        let mut run = Run::new(
            "owner",
            vec![seed("social selling")],
            "US",
            "en",
            serde_json::json!({}),
            100.0,
        )
        .unwrap();
        run.advance_progress(40);
        run.advance_progress(10);
        assert_eq!(run.progress, 40);
        run.advance_progress(60);
        assert_eq!(run.progress, 60);
    }

    #[test]
    fn tier_ordering_matches_traffic_potential() {
        assert!(Tier::Dream100.is_strictly_above(Tier::Tier2));
        assert!(Tier::Tier2.is_strictly_above(Tier::Tier3));
        assert!(!Tier::Tier3.is_strictly_above(Tier::Dream100));
    }

    #[test]
    fn job_cannot_start_until_dependencies_complete() {
        let run_id = RunId::new();
        let dep = JobId::new();
        let job = Job::new(run_id, Stage::Universe, vec![dep], 3);
        assert!(!job.can_start(&[]));
        assert!(job.can_start(&[dep]));
    }
}
