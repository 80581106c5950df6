use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Writer,
    Editor,
    Strategist,
    Designer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub email: String,
    pub role: TeamRole,
    pub capacity: u32,
    pub specialties: Vec<String>,
    #[serde(default)]
    pub unavailable: Vec<chrono::NaiveDate>,
}

/// One of the three tier-conditioned weight profiles used by the Scoring
/// Engine. Fields must sum to 1.0 ± 0.01 (validated, not enforced at the
/// type level — see `validation.rs`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeightProfile {
    pub volume: f32,
    pub intent: f32,
    pub relevance: f32,
    pub trend: f32,
    pub ease: f32,
}

impl WeightProfile {
    pub fn sum(&self) -> f32 {
        self.volume + self.intent + self.relevance + self.trend + self.ease
    }

    pub fn is_valid(&self) -> bool {
        (self.sum() - 1.0).abs() <= 0.01
            && [self.volume, self.intent, self.relevance, self.trend, self.ease]
                .iter()
                .all(|w| *w >= 0.0)
    }
}

impl Default for WeightProfile {
    fn default() -> Self {
        Self {
            volume: 0.3,
            intent: 0.2,
            relevance: 0.2,
            trend: 0.1,
            ease: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub dream100: WeightProfile,
    pub tier2: WeightProfile,
    pub tier3: WeightProfile,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            dream100: WeightProfile {
                volume: 0.4,
                intent: 0.2,
                relevance: 0.2,
                trend: 0.1,
                ease: 0.1,
            },
            tier2: WeightProfile::default(),
            tier3: WeightProfile {
                volume: 0.2,
                intent: 0.2,
                relevance: 0.2,
                trend: 0.1,
                ease: 0.3,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionSettings {
    pub max_dream100: u32,
    pub max_tier2_per_dream: u32,
    pub max_tier3_per_tier2: u32,
    pub enable_competitor_scraping: bool,
    pub enable_serp_analysis: bool,
    pub enable_semantic_variations: bool,
    pub quality_threshold: f32,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self {
            max_dream100: 100,
            max_tier2_per_dream: 10,
            max_tier3_per_tier2: 10,
            enable_competitor_scraping: false,
            enable_serp_analysis: false,
            enable_semantic_variations: true,
            quality_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringSettings {
    pub similarity_threshold: f32,
    pub min_cluster_size: usize,
    pub max_cluster_size: usize,
    pub max_clusters: usize,
    pub embedding_batch_size: usize,
    pub intent_weight: f32,
    pub semantic_weight: f32,
    pub enable_label_enhancement: bool,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.72,
            min_cluster_size: 3,
            max_cluster_size: 100,
            max_clusters: 100,
            embedding_batch_size: 100,
            intent_weight: 0.3,
            semantic_weight: 0.7,
            enable_label_enhancement: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    pub quick_win_threshold: f32,
    pub weights: ScoringWeights,
    pub enable_seasonal_adjustment: bool,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            quick_win_threshold: 0.7,
            weights: ScoringWeights::default(),
            enable_seasonal_adjustment: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadmapSettings {
    pub posts_per_month: u32,
    pub duration_months: u32,
    pub pillar_ratio: f32,
    pub quick_win_priority: bool,
    pub team_members: Vec<TeamMember>,
}

impl Default for RoadmapSettings {
    fn default() -> Self {
        Self {
            posts_per_month: 20,
            duration_months: 6,
            pillar_ratio: 0.3,
            quick_win_priority: true,
            team_members: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorSettings {
    pub max_total_keywords: u32,
    pub budget_limit: f64,
    pub max_retries: u32,
    pub strict_quality_gates: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_total_keywords: 10_000,
            budget_limit: 100.0,
            max_retries: 3,
            strict_quality_gates: false,
        }
    }
}

/// Rate-Limited Batcher knobs (§4.B), applied per provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub max_per_window: u32,
    pub window_secs: u64,
    pub burst_capacity: u32,
    pub max_concurrent: u32,
    pub max_retries: u32,
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_cooldown_secs: u64,
    pub fallback_to_mock: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            max_per_window: 60,
            window_secs: 60,
            burst_capacity: 10,
            max_concurrent: 5,
            max_retries: 3,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown_secs: 30,
            fallback_to_mock: true,
        }
    }
}

/// The single typed settings record for the keyword-research pipeline.
/// Unknown fields are rejected at extraction time (see `loader.rs`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub market: String,
    pub language: String,
    pub expansion: ExpansionSettings,
    pub clustering: ClusteringSettings,
    pub scoring: ScoringSettings,
    pub roadmap: RoadmapSettings,
    pub orchestrator: OrchestratorSettings,
    pub providers: ProviderSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            market: "US".to_string(),
            language: "en".to_string(),
            expansion: ExpansionSettings::default(),
            clustering: ClusteringSettings::default(),
            scoring: ScoringSettings::default(),
            roadmap: RoadmapSettings::default(),
            orchestrator: OrchestratorSettings::default(),
            providers: ProviderSettings::default(),
        }
    }
}
