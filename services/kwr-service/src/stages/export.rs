//! Export stage (§4.G): confirms the roadmap is complete and ready to be
//! rendered by a client. Artifact formats (CSV/Markdown/etc.) are served on
//! demand by the HTTP layer from the Run Store, so this stage is a
//! readiness check rather than a file writer.

use std::sync::Arc;

use async_trait::async_trait;
use kwr_api::RunStore;
use kwr_core::models::{Run, Stage};
use kwr_core::{KwrError, Result};
use kwr_pipeline::orchestrator::{CancellationSignal, PipelineStage};
use tracing::info;

pub struct ExportStage {
    store: Arc<dyn RunStore>,
}

impl ExportStage {
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PipelineStage for ExportStage {
    fn stage(&self) -> Stage {
        Stage::Export
    }

    async fn run(&self, run: &mut Run, cancellation: &CancellationSignal) -> Result<()> {
        cancellation.check()?;
        let items = self.store.list_roadmap_items(run.id).await?;
        if items.is_empty() {
            return Err(KwrError::internal("no roadmap items to export"));
        }
        info!(run_id = %run.id, items = items.len(), "roadmap ready for export");
        Ok(())
    }
}
