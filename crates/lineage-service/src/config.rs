//! Configuration file parsing for the provenance service.
//!
//! Loads settings from TOML files: bind address, database path, and the
//! failure-queue log destination.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Service configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),
}

/// Service configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 8080)
    pub bind_port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Path of the append-only failure-queue log
    #[serde(default = "default_failure_log_path")]
    pub failure_log_path: String,
}

/// Default failure-queue destination, relative to the working directory
fn default_failure_log_path() -> String {
    "lineage-failures.log".to_string()
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ServiceConfig = toml::from_str(&contents)?;

        if config.database_path.is_empty() {
            return Err(ConfigError::MissingField("database_path".to_string()));
        }

        Ok(config)
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        ServiceConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 8080,
            database_path: ":memory:".to_string(),
            failure_log_path: default_failure_log_path(),
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default_test_config();
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.database_path, ":memory:");
        assert_eq!(config.failure_log_path, "lineage-failures.log");
    }

    #[test]
    fn test_bind_addr() {
        let config = ServiceConfig::default_test_config();
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            bind_address = "0.0.0.0"
            bind_port = 9000
            database_path = "/var/lib/lineage/lineage.db"
            failure_log_path = "/var/log/lineage/failures.log"
        "#;

        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.database_path, "/var/lib/lineage/lineage.db");
        assert_eq!(config.failure_log_path, "/var/log/lineage/failures.log");
    }

    #[test]
    fn test_failure_log_path_defaults() {
        let toml = r#"
            bind_address = "0.0.0.0"
            bind_port = 9000
            database_path = "lineage.db"
        "#;

        let config: ServiceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.failure_log_path, "lineage-failures.log");
    }
}
