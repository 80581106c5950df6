use crate::models::Settings;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("configuration parsing error: {0}")]
    ParseError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for kwr_core::KwrError {
    fn from(error: ConfigError) -> Self {
        kwr_core::KwrError::input_validation("settings", error.to_string())
    }
}

/// Loads `Settings` with precedence `defaults < file < env`, matching the
/// layered figment loader pattern used across the configuration stack.
/// Environment variables are prefixed `KWR_` and use `__` as the nesting
/// separator (e.g. `KWR_CLUSTERING__SIMILARITY_THRESHOLD=0.8`).
pub struct SettingsLoader {
    file_path: Option<PathBuf>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self { file_path: None }
    }

    pub fn with_file(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: Some(file_path.into()),
        }
    }

    /// Try the conventional locations in order; fall back to defaults+env only.
    pub fn with_default_locations() -> Self {
        let candidates = ["kwr.toml", "config/kwr.toml", "./kwr.toml"];
        for path in candidates {
            if std::path::Path::new(path).exists() {
                return Self::with_file(path);
            }
        }
        if let Some(dir) = dirs::config_dir() {
            let user_config = dir.join("kwr.toml");
            if user_config.exists() {
                return Self::with_file(user_config);
            }
        }
        Self::new()
    }

    pub fn load(&self) -> Result<Settings, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if let Some(path) = &self.file_path {
            if path.exists() {
                figment = figment.merge(Toml::file(path));
            } else {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
        }

        figment = figment.merge(Env::prefixed("KWR_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_settings() -> Result<Settings, ConfigError> {
    SettingsLoader::with_default_locations().load()
}

pub fn load_settings_from_file(path: impl Into<PathBuf>) -> Result<Settings, ConfigError> {
    SettingsLoader::with_file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_when_no_file_present() {
        let settings = SettingsLoader::new().load().unwrap();
        assert_eq!(settings.market, "US");
        assert_eq!(settings.orchestrator.max_total_keywords, 10_000);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = SettingsLoader::with_file("/nonexistent/kwr.toml").load();
        assert!(matches!(err, Err(ConfigError::FileNotFound(_))));
    }
}
