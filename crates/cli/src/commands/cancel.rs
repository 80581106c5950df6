use anyhow::Result;
use clap::Args;

use crate::client::ApiClient;
use crate::commands::Command;
use crate::output::OutputFormatter;

#[derive(Args)]
pub struct CancelCommand {
    /// Run ID
    pub id: String,
}

impl Command for CancelCommand {
    async fn execute(&self, client: &ApiClient) -> Result<()> {
        let formatter = OutputFormatter::new("table");
        let summary = client.cancel_run(&self.id).await?;
        formatter.display_run_summary(&summary)?;
        formatter.display_success_message(&format!("Run {} cancelled", summary.id))?;
        Ok(())
    }
}
