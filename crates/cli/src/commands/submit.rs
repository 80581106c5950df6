use anyhow::Result;
use clap::Args;
use colored::*;
use kwr_contracts::SubmitRunRequest;

use crate::client::ApiClient;
use crate::commands::Command;
use crate::output::OutputFormatter;

#[derive(Args)]
pub struct SubmitCommand {
    /// Seed keyword phrases (1-5)
    #[arg(required = true, num_args = 1..=5)]
    pub seeds: Vec<String>,

    /// Owner identifier for this run
    #[arg(long, default_value = "cli")]
    pub owner: String,

    /// Target market, e.g. US
    #[arg(long, default_value = "US")]
    pub market: String,

    /// Target language, e.g. en
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Maximum API spend, in provider-cost units
    #[arg(long, default_value = "100")]
    pub budget: f64,

    /// Output format: table, json
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

impl Command for SubmitCommand {
    async fn execute(&self, client: &ApiClient) -> Result<()> {
        let formatter = OutputFormatter::new(&self.format);

        println!(
            "{} Submitting run for seeds: {}",
            "->".blue(),
            self.seeds.join(", ").cyan().bold()
        );

        let request = SubmitRunRequest {
            owner_id: self.owner.clone(),
            seeds: self.seeds.clone(),
            market: self.market.clone(),
            language: self.language.clone(),
            budget_limit: self.budget,
            settings_overrides: None,
        };

        let summary = client.submit_run(request).await?;
        formatter.display_run_summary(&summary)?;
        formatter.display_success_message(&format!("Run {} submitted", summary.id))?;

        Ok(())
    }
}
