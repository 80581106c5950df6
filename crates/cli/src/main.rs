use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

mod client;
mod commands;
mod config;
mod output;

use commands::*;

#[derive(Parser)]
#[command(name = "kwr")]
#[command(about = "Keyword research pipeline CLI")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// kwr-service URL
    #[arg(long, global = true, default_value = "http://localhost:8088")]
    server: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new keyword-research run
    Submit(submit::SubmitCommand),

    /// Poll the status of a run
    Status(status::StatusCommand),

    /// List all known runs
    List(list::ListCommand),

    /// Export a completed run's content roadmap
    Roadmap(roadmap::RoadmapCommand),

    /// Cancel a running run
    Cancel(cancel::CancelCommand),

    /// Resume a failed run from its last completed stage
    Resume(resume::ResumeCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(format!("kwr={},kwr_service={}", log_level, log_level))
        .with_target(false)
        .without_time()
        .init();

    let client = client::ApiClient::new(cli.server.clone())?;

    let result = match cli.command {
        Commands::Submit(cmd) => cmd.execute(&client).await,
        Commands::Status(cmd) => cmd.execute(&client).await,
        Commands::List(cmd) => cmd.execute(&client).await,
        Commands::Roadmap(cmd) => cmd.execute(&client).await,
        Commands::Cancel(cmd) => cmd.execute(&client).await,
        Commands::Resume(cmd) => cmd.execute(&client).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);

        if e.to_string().contains("Connection refused") || e.to_string().contains("network") {
            eprintln!("{} Is kwr-service running at the target --server URL?", "hint:".yellow());
        } else if e.to_string().contains("404") || e.to_string().contains("Not Found") {
            eprintln!("{} The requested run was not found", "hint:".yellow());
        }

        std::process::exit(1);
    }

    Ok(())
}
