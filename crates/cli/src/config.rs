use anyhow::Result;
use kwr_contracts::ServiceConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CliConfig {
    pub service: ServiceConfig,
    pub default_market: String,
    pub default_language: String,
    pub output_format: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            default_market: "US".to_string(),
            default_language: "en".to_string(),
            output_format: "table".to_string(),
        }
    }
}

impl CliConfig {
    pub fn load() -> Result<Self> {
        let path = Self::config_file()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(toml::from_str(&contents)?)
    }

    #[allow(dead_code)]
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file()?;
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("kwr");

        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}
