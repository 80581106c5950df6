//! kwr-service entry point: loads configuration, assembles the DI container
//! and stage DAG, and starts the HTTP server.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use kwr_service::config::Config;
use kwr_service::{build_pipeline, HttpServer, ServiceContainer};

#[derive(Parser)]
#[command(name = "kwr-service")]
#[command(about = "Keyword research pipeline orchestration service")]
struct Cli {
    /// Configuration file path
    #[arg(long)]
    config: Option<String>,

    /// HTTP server port
    #[arg(long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Enable structured (JSON) logging
    #[arg(long)]
    structured_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.structured_logs);

    info!("Starting kwr-service");

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate()?;
    info!("Configuration loaded successfully");

    let server_config = config.server.clone();
    let container = match ServiceContainer::new(config).await {
        Ok(container) => {
            info!("Service container initialized successfully");
            Arc::new(container)
        }
        Err(e) => {
            error!("Failed to initialize service container: {}", e);
            return Err(e.into());
        }
    };

    let orchestrator = Arc::new(build_pipeline(&container));

    let server = HttpServer::new(server_config.clone(), container, orchestrator);
    info!("Starting HTTP server on {}:{}", server_config.host, server_config.port);

    if let Err(e) = server.start().await {
        error!("HTTP server error: {}", e);
        return Err(anyhow::Error::msg(format!("HTTP server error: {}", e)));
    }

    info!("kwr-service stopped");
    Ok(())
}

fn init_logging(log_level: &str, structured: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "kwr_service={},kwr_core=info,kwr_pipeline=info,kwr_providers=info,kwr_observability=info",
            log_level
        ))
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    if structured {
        subscriber.with(fmt::layer().json().with_target(false).with_current_span(false)).init();
    } else {
        subscriber.with(fmt::layer().with_target(false)).init();
    }

    tracing::info!("Tracing initialized with level: {}, structured: {}", log_level, structured);
}
