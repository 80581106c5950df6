//! Configuration management for kwr-service.
//!
//! Loads and validates configuration from environment variables,
//! configuration files, and command line arguments.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the service process: the pipeline `Settings`
/// plus the HTTP server's own knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub settings: kwr_config::Settings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            settings: kwr_config::Settings::default(),
        }
    }
}

impl Config {
    /// Loads `settings` via `kwr_config`'s figment-layered loader (defaults
    /// < file < `KWR_`-prefixed env) and overlays `server` from a plain
    /// environment read, since the HTTP listen address is a deployment
    /// concern the pipeline settings format doesn't need to know about.
    pub fn load(config_file: Option<&str>) -> anyhow::Result<Self> {
        let settings = match config_file {
            Some(path) => kwr_config::load_settings_from_file(path)?,
            None => kwr_config::load_settings()?,
        };

        Ok(Self {
            server: ServerConfig::from_env(),
            settings,
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port cannot be 0");
        }
        if self.settings.orchestrator.budget_limit < 10.0 {
            anyhow::bail!("orchestrator.budget_limit must be at least 10.0");
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub timeout_seconds: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: kwr_contracts::api::defaults::SERVER_PORT,
            timeout_seconds: 60,
            enable_cors: true,
            cors_origins: vec![],
        }
    }
}

impl ServerConfig {
    fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("KWR_SERVICE_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("KWR_SERVICE_PORT") {
            if let Ok(port) = port.parse() {
                config.port = port;
            }
        }
        config
    }
}
