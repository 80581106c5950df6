use anyhow::Result;
use clap::Args;

use crate::client::ApiClient;
use crate::commands::Command;
use crate::output::OutputFormatter;

#[derive(Args)]
pub struct ListCommand {
    /// Output format: table, json
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

impl Command for ListCommand {
    async fn execute(&self, client: &ApiClient) -> Result<()> {
        let formatter = OutputFormatter::new(&self.format);

        let runs = client.list_runs().await?;
        if runs.is_empty() {
            formatter.display_info_message("No runs found")?;
            return Ok(());
        }
        formatter.display_run_list(&runs)?;

        Ok(())
    }
}
