use anyhow::Result;
use clap::Args;

use crate::client::ApiClient;
use crate::commands::Command;
use crate::output::OutputFormatter;

#[derive(Args)]
pub struct ResumeCommand {
    /// Run ID
    pub id: String,
}

impl Command for ResumeCommand {
    async fn execute(&self, client: &ApiClient) -> Result<()> {
        let formatter = OutputFormatter::new("table");
        let summary = client.resume_run(&self.id).await?;
        formatter.display_run_summary(&summary)?;
        formatter.display_success_message(&format!("Run {} resumed", summary.id))?;
        Ok(())
    }
}
