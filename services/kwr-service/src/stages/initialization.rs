//! Initialization stage (§4.H): validates the run's settings snapshot
//! before any provider is touched. No providers, no persistence beyond the
//! Run itself, which the orchestrator already owns.

use async_trait::async_trait;
use kwr_core::models::{Run, Stage};
use kwr_core::{KwrError, Result};
use kwr_pipeline::orchestrator::{CancellationSignal, PipelineStage};
use tracing::info;

use super::run_settings;

pub struct InitializationStage;

#[async_trait]
impl PipelineStage for InitializationStage {
    fn stage(&self) -> Stage {
        Stage::Initialization
    }

    async fn run(&self, run: &mut Run, cancellation: &CancellationSignal) -> Result<()> {
        cancellation.check()?;
        let settings = run_settings(run)?;
        kwr_config::validate_settings(&settings)?;
        if settings.orchestrator.max_total_keywords > 50_000 {
            return Err(KwrError::input_validation(
                "max_total_keywords",
                "must not exceed 50,000",
            ));
        }
        info!(run_id = %run.id, seeds = run.seeds.len(), market = %run.market, "run initialized");
        Ok(())
    }
}
