//! `PipelineStage` implementations wiring `kwr-pipeline`'s pure engines to
//! the Run Store and provider pool, one module per `Stage` variant.
//!
//! Each stage deserializes its own copy of the per-run `Settings` snapshot
//! out of `Run::settings` rather than reading the container's defaults
//! directly: the snapshot is what `settings_overrides` was merged into at
//! submission time, so two concurrent runs can carry different knobs.

mod cleanup;
mod clustering;
mod expansion;
mod export;
mod initialization;
mod roadmap;
mod scoring;
mod universe;

pub use cleanup::CleanupStage;
pub use clustering::ClusteringStage;
pub use expansion::ExpansionStage;
pub use export::ExportStage;
pub use initialization::InitializationStage;
pub use roadmap::RoadmapStage;
pub use scoring::ScoringStage;
pub use universe::UniverseStage;

use kwr_config::Settings;
use kwr_core::models::Run;
use kwr_core::{KwrError, Result};

/// Recovers the typed settings a Run was submitted with.
pub(crate) fn run_settings(run: &Run) -> Result<Settings> {
    serde_json::from_value(run.settings.clone())
        .map_err(|e| KwrError::internal(format!("invalid run settings snapshot: {e}")))
}

/// Flat per-call cost estimates for budget accounting. Deliberately coarse:
/// the reference providers are mocks with no real billing, so these exist
/// to exercise `ApiUsage`/`BudgetExceeded` rather than model a vendor's
/// actual price sheet.
pub(crate) mod cost {
    pub const LLM_CALL: f64 = 0.02;
    pub const METRICS_CALL: f64 = 0.002;
    pub const EMBEDDING_CALL: f64 = 0.001;
}
