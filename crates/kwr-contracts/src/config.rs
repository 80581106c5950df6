/// Configuration Contracts
///
/// Shared configuration constants and utilities to keep the CLI and the
/// service pointed at the same host/port without either hard-coding it.
use serde::{Deserialize, Serialize};

use crate::api::{defaults, urls};

/// Standard connection settings shared between the CLI and the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub server_port: u16,
    pub server_host: String,
    pub request_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server_port: defaults::SERVER_PORT,
            server_host: defaults::SERVER_HOST.to_string(),
            request_timeout_ms: defaults::REQUEST_TIMEOUT_MS,
        }
    }
}

impl ServiceConfig {
    pub fn server_url(&self) -> String {
        urls::server_url(&self.server_host, self.server_port)
    }

    pub fn with_port(port: u16) -> Self {
        Self {
            server_port: port,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.server_port == 0 {
            return Err(ConfigValidationError::InvalidPort("port cannot be 0".to_string()));
        }
        if self.server_host.is_empty() {
            return Err(ConfigValidationError::InvalidHost("host cannot be empty".to_string()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidTimeout("timeout cannot be 0".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    InvalidPort(String),
    InvalidHost(String),
    InvalidTimeout(String),
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPort(msg) => write!(f, "invalid port: {}", msg),
            Self::InvalidHost(msg) => write!(f, "invalid host: {}", msg),
            Self::InvalidTimeout(msg) => write!(f, "invalid timeout: {}", msg),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.server_port, 8088);
        assert_eq!(config.server_host, "localhost");
    }

    #[test]
    fn zero_port_is_rejected() {
        let config = ServiceConfig::with_port(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn server_url_reflects_configured_port() {
        let config = ServiceConfig::with_port(9000);
        assert_eq!(config.server_url(), "http://localhost:9000");
    }
}
