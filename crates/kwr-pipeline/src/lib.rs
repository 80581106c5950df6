//! Universe expansion, clustering, scoring, roadmap generation, and
//! orchestration for the keyword-research pipeline.
//!
//! - [`expansion`] — Dream100/Tier2/Tier3 generation, enrichment, capping (§4.F)
//! - [`clustering`] — embeddings to agglomerative clusters with quality metrics (§4.E)
//! - [`scoring`] — weighted blended scoring, quick-win rule, ranking (§4.D)
//! - [`roadmap`] — content calendar, pillar/supporting assignment, DRI load (§4.G)
//! - [`orchestrator`] — stage DAG, budget gating, cancellation, resumption (§4.H)
//! - [`progress`] — broadcast progress events (§2 item J)
pub mod clustering;
pub mod expansion;
pub mod orchestrator;
pub mod progress;
pub mod roadmap;
pub mod scoring;

pub use clustering::{
    cluster_keywords, ClusterResult, ClusterWarning, ClusteringInput, ClusteringOutput,
    ClusteringParams, QualityMetrics,
};
pub use expansion::{
    classify_intent, dedupe_keep_highest_tier, enrich, generate_dream100, quality_filter,
    smart_cap, Candidate, EnrichedCandidate, ExpansionStrategy, LlmStrategy, ModifierStrategy,
    QuestionStrategy, SerpOverlapStrategy,
};
pub use orchestrator::{CancellationSignal, Orchestrator, PipelineBuilder, PipelineStage};
pub use progress::{aggregate_progress, ProgressBus, ProgressEvent};
pub use roadmap::{
    generate_roadmap, DriWorkload, MonthlyDistribution, OptimizationRecommendation,
    RoadmapAnalytics, RoadmapInput, RoadmapOutput,
};
pub use scoring::{
    score_batch, ComponentBreakdown, ScoreBand, ScoringInput, ScoringResult, SeasonalFactor,
    VolumeNormalization,
};
