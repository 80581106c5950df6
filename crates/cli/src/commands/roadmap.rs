use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::client::ApiClient;
use crate::commands::Command;
use crate::output::OutputFormatter;

#[derive(Args)]
pub struct RoadmapCommand {
    /// Run ID
    pub id: String,

    /// Output format: table, json, csv
    #[arg(short, long, default_value = "table")]
    pub format: String,

    /// Write the export to a file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

impl Command for RoadmapCommand {
    async fn execute(&self, client: &ApiClient) -> Result<()> {
        let roadmap = client.get_roadmap(&self.id).await?;

        if let Some(path) = &self.out {
            let contents = match self.format.as_str() {
                "csv" => roadmap_to_csv(&roadmap),
                _ => serde_json::to_string_pretty(&roadmap)?,
            };
            std::fs::write(path, contents)?;
            OutputFormatter::new("table")
                .display_success_message(&format!("Roadmap written to {}", path.display()))?;
            return Ok(());
        }

        if self.format == "csv" {
            print!("{}", roadmap_to_csv(&roadmap));
            return Ok(());
        }

        OutputFormatter::new(&self.format).display_roadmap(&roadmap)?;
        Ok(())
    }
}

fn roadmap_to_csv(roadmap: &kwr_contracts::RoadmapExportDto) -> String {
    let mut out = String::from("due_date,stage,primary_keyword,title,dri,quick_win,volume,difficulty\n");
    for item in &roadmap.items {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            item.due_date,
            item.stage,
            item.primary_keyword,
            item.suggested_title.replace(',', " "),
            item.dri.as_deref().unwrap_or(""),
            item.quick_win,
            item.volume,
            item.difficulty,
        ));
    }
    out
}
