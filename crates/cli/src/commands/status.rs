use anyhow::Result;
use clap::Args;

use crate::client::ApiClient;
use crate::commands::Command;
use crate::output::OutputFormatter;

#[derive(Args)]
pub struct StatusCommand {
    /// Run ID
    pub id: String,

    /// Output format: table, json
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

impl Command for StatusCommand {
    async fn execute(&self, client: &ApiClient) -> Result<()> {
        let formatter = OutputFormatter::new(&self.format);

        if !client.health_check().await? {
            formatter.display_error_message("API server is not reachable")?;
            return Ok(());
        }

        let detail = client.get_run(&self.id).await?;
        formatter.display_run_detail(&detail)?;

        Ok(())
    }
}
