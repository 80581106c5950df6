//! Cleanup stage (§4.H): best-effort housekeeping after a run completes.
//! Zero progress weight — its failure is logged, never propagated, so it
//! can never block a Run from reaching `Completed`.

use async_trait::async_trait;
use kwr_core::models::{Run, Stage};
use kwr_core::Result;
use kwr_pipeline::orchestrator::{CancellationSignal, PipelineStage};
use tracing::info;

pub struct CleanupStage;

#[async_trait]
impl PipelineStage for CleanupStage {
    fn stage(&self) -> Stage {
        Stage::Cleanup
    }

    async fn run(&self, run: &mut Run, _cancellation: &CancellationSignal) -> Result<()> {
        info!(run_id = %run.id, "cleanup complete");
        Ok(())
    }
}
