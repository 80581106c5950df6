use anyhow::Result;
use colored::*;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use kwr_contracts::{RoadmapExportDto, RunDetailDto, RunSummaryDto};

pub struct OutputFormatter {
    format: String,
}

impl OutputFormatter {
    pub fn new(format: &str) -> Self {
        Self {
            format: format.to_string(),
        }
    }

    pub fn display_run_summary(&self, run: &RunSummaryDto) -> Result<()> {
        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(run)?);
            return Ok(());
        }

        let status_color = match run.status.as_str() {
            "Completed" => Color::Green,
            "Failed" | "Cancelled" => Color::Red,
            _ => Color::Yellow,
        };

        println!("{} {}", "Run:".bold(), run.id.cyan());
        println!(
            "  Status:   {}",
            run.status.color(status_color).bold()
        );
        if let Some(stage) = &run.current_stage {
            println!("  Stage:    {}", stage);
        }
        println!("  Progress: {}%", run.progress.to_string().yellow());
        println!(
            "  Cost:     {:.2} / {:.2}",
            run.total_cost, run.budget_limit
        );
        println!("  Seeds:    {}", run.created_seeds.join(", "));

        Ok(())
    }

    pub fn display_run_detail(&self, detail: &RunDetailDto) -> Result<()> {
        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(detail)?);
            return Ok(());
        }

        self.display_run_summary(&detail.summary)?;
        println!(
            "  Completed stages: {}",
            if detail.completed_stages.is_empty() {
                "none".dimmed().to_string()
            } else {
                detail.completed_stages.join(" -> ")
            }
        );
        if !detail.warnings.is_empty() {
            println!("  {}", "Warnings:".yellow().bold());
            for warning in &detail.warnings {
                println!("    - {}", warning.yellow());
            }
        }
        if !detail.error_log.is_empty() {
            println!("  {}", "Errors:".red().bold());
            for error in &detail.error_log {
                println!("    - {}", error.red());
            }
        }

        Ok(())
    }

    pub fn display_run_list(&self, runs: &[RunSummaryDto]) -> Result<()> {
        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(runs)?);
            return Ok(());
        }

        let mut table = Table::new();
        table
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("ID").add_attribute(Attribute::Bold),
                Cell::new("Status").add_attribute(Attribute::Bold),
                Cell::new("Stage").add_attribute(Attribute::Bold),
                Cell::new("Progress").add_attribute(Attribute::Bold),
                Cell::new("Cost").add_attribute(Attribute::Bold),
            ]);

        for run in runs {
            let status_color = match run.status.as_str() {
                "Completed" => Color::Green,
                "Failed" | "Cancelled" => Color::Red,
                _ => Color::Yellow,
            };
            table.add_row(vec![
                Cell::new(&run.id),
                Cell::new(&run.status).fg(status_color),
                Cell::new(run.current_stage.as_deref().unwrap_or("-")),
                Cell::new(format!("{}%", run.progress)),
                Cell::new(format!("{:.2}/{:.2}", run.total_cost, run.budget_limit)),
            ]);
        }

        println!("{}", table);
        Ok(())
    }

    pub fn display_roadmap(&self, roadmap: &RoadmapExportDto) -> Result<()> {
        if self.format == "json" {
            println!("{}", serde_json::to_string_pretty(roadmap)?);
            return Ok(());
        }

        let mut table = Table::new();
        table
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec![
                Cell::new("Due").add_attribute(Attribute::Bold),
                Cell::new("Stage").add_attribute(Attribute::Bold),
                Cell::new("Primary Keyword").add_attribute(Attribute::Bold),
                Cell::new("Title").add_attribute(Attribute::Bold),
                Cell::new("DRI").add_attribute(Attribute::Bold),
                Cell::new("Quick Win").add_attribute(Attribute::Bold),
            ]);

        for item in &roadmap.items {
            table.add_row(vec![
                Cell::new(item.due_date.to_string()),
                Cell::new(&item.stage),
                Cell::new(&item.primary_keyword).add_attribute(Attribute::Bold),
                Cell::new(&item.suggested_title),
                Cell::new(item.dri.as_deref().unwrap_or("-")),
                Cell::new(if item.quick_win { "yes" } else { "" })
                    .fg(Color::Green),
            ]);
        }

        println!("{}", table);
        println!(
            "{} {} items for run {}",
            "Total:".bold(),
            roadmap.items.len(),
            roadmap.run_id.cyan()
        );
        Ok(())
    }

    pub fn display_success_message(&self, message: &str) -> Result<()> {
        println!("{} {}", "OK".green().bold(), message.green());
        Ok(())
    }

    pub fn display_error_message(&self, message: &str) -> Result<()> {
        println!("{} {}", "ERR".red().bold(), message.red());
        Ok(())
    }

    pub fn display_info_message(&self, message: &str) -> Result<()> {
        println!("{} {}", "--".blue(), message);
        Ok(())
    }
}
