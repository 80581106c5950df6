//! Assembles the fixed stage DAG against a live `ServiceContainer`.
//!
//! Pulled out of `main.rs` so the scenario test suite can build the exact
//! same pipeline the binary runs, against the container's mock providers,
//! without duplicating the wiring.

use kwr_core::models::Stage;
use kwr_pipeline::orchestrator::{Orchestrator, PipelineBuilder};

use crate::container::ServiceContainer;
use crate::stages::{
    CleanupStage, ClusteringStage, ExpansionStage, ExportStage, InitializationStage, RoadmapStage,
    ScoringStage, UniverseStage,
};

/// Builds `expansion -> universe -> clustering -> scoring -> roadmap ->
/// export -> cleanup` over `container`'s providers and Run Store. Built
/// fresh per caller and shared across every Run it serves; holds no
/// per-run state beyond the stage list and the progress bus.
pub fn build_pipeline(container: &ServiceContainer) -> Orchestrator {
    let settings = container.settings();

    PipelineBuilder::new()
        .add_stage(Box::new(InitializationStage), vec![], 0.0)
        .add_stage(
            Box::new(ExpansionStage::new(container.run_store(), container.llm(), container.embeddings())),
            vec![Stage::Initialization],
            1.0,
        )
        .add_stage(
            Box::new(UniverseStage::new(
                container.run_store(),
                container.llm(),
                container.metrics_provider(),
                container.embeddings(),
            )),
            vec![Stage::Expansion],
            5.0,
        )
        .add_stage(
            Box::new(ClusteringStage::new(container.run_store(), container.embeddings())),
            vec![Stage::Universe],
            2.0,
        )
        .add_stage(
            Box::new(ScoringStage::new(container.run_store())),
            vec![Stage::Clustering],
            0.1,
        )
        .add_stage(
            Box::new(RoadmapStage::new(container.run_store())),
            vec![Stage::Scoring],
            0.1,
        )
        .add_stage(
            Box::new(ExportStage::new(container.run_store())),
            vec![Stage::Roadmap],
            0.0,
        )
        .add_stage(Box::new(CleanupStage), vec![Stage::Export], 0.0)
        .build(
            container.progress_bus(),
            settings.orchestrator.strict_quality_gates,
            settings.orchestrator.max_retries,
        )
}
