//! Configuration module for the reqlog demo server
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`REQLOG_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use reqlog::config::AppConfig;
//!
//! let toml = r#"
//! [server]
//! port = 9000
//!
//! [logging.request]
//! nest_key = "http"
//! "#;
//! let config: AppConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.server.port, 9000);
//! assert_eq!(config.logging.request.nest_key, "http");
//! ```

pub mod error;
pub mod logging;
pub mod server;

pub use error::ConfigError;
pub use logging::{DiagFormat, DiagnosticsConfig, LoggingConfig, RequestLogSettings};
pub use server::ServerConfig;

use axum::http::HeaderName;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unified configuration for the demo server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Request logger and diagnostics configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (previous values are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("REQLOG_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("REQLOG_HOST") {
            self.server.host = host;
        }
        if let Ok(level) = std::env::var("REQLOG_LOG_LEVEL") {
            if let Ok(l) = level.parse() {
                self.logging.level = l;
            }
        }
        if let Ok(format) = std::env::var("REQLOG_DIAG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.diagnostics.format = f;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }

        let request = &self.logging.request;
        if HeaderName::from_bytes(request.request_id_header.as_bytes()).is_err() {
            return Err(ConfigError::Validation {
                field: "logging.request.request_id_header".to_string(),
                message: format!("'{}' is not a valid header name", request.request_id_header),
            });
        }
        for (i, pattern) in request.skip_paths.iter().enumerate() {
            if let Err(e) = globset::Glob::new(pattern) {
                return Err(ConfigError::Validation {
                    field: format!("logging.request.skip_paths[{}]", i),
                    message: e.to_string(),
                });
            }
        }

        Ok(())
    }
}
