//! Logging configuration
//!
//! Two independent concerns live here: the JSON request logger the server
//! emits to stdout, and the `tracing` diagnostics of the binary itself.

use globset::{Glob, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use super::ConfigError;
use crate::engine::{Level, Sink};
use crate::logging::{Config, DEFAULT_REQUEST_ID_HEADER, DEFAULT_REQUEST_ID_KEY};
use crate::{Logger, Lvl, Setter};

/// Diagnostics output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiagFormat {
    /// Pretty-printed logs for humans
    #[default]
    Pretty,
    /// JSON logs for machine parsing
    Json,
}

impl FromStr for DiagFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(DiagFormat::Pretty),
            "json" => Ok(DiagFormat::Json),
            _ => Err(format!("Invalid diagnostics format: {}", s)),
        }
    }
}

/// `tracing` output of the binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub level: String,
    pub format: DiagFormat,
    /// Component-specific levels (e.g., {"logging": "debug"})
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_levels: Option<HashMap<String, String>>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: DiagFormat::Pretty,
            component_levels: None,
        }
    }
}

/// Request logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Lvl,
    /// Process-wide minimum severity, installed once at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_level: Option<Level>,
    pub timestamp: bool,
    pub caller: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    /// Constant fields added to every line.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub fields: Map<String, Value>,
    pub diagnostics: DiagnosticsConfig,
    pub request: RequestLogSettings,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Lvl::Info,
            global_level: None,
            timestamp: true,
            caller: false,
            prefix: String::new(),
            fields: Map::new(),
            diagnostics: DiagnosticsConfig::default(),
            request: RequestLogSettings::default(),
        }
    }
}

impl LoggingConfig {
    /// Setters equivalent to this configuration, in application order.
    pub fn setters(&self) -> Vec<Setter> {
        let mut setters = vec![Setter::Level(self.level)];
        if self.timestamp {
            setters.push(Setter::Timestamp);
        }
        if self.caller {
            setters.push(Setter::Caller);
        }
        if !self.fields.is_empty() {
            setters.push(Setter::Fields(self.fields.clone()));
        }
        if !self.prefix.is_empty() {
            setters.push(Setter::Prefix(self.prefix.clone()));
        }
        setters
    }

    pub fn build_logger(&self, sink: Sink) -> Logger {
        Logger::new(sink, self.setters())
    }
}

/// Request middleware settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLogSettings {
    pub request_id_header: String,
    pub request_id_key: String,
    /// Nest request fields under this key; empty keeps them flat.
    pub nest_key: String,
    pub handle_error: bool,
    /// Zero disables latency escalation.
    pub latency_limit_ms: u64,
    pub latency_level: Level,
    /// Glob patterns of request paths that are never logged.
    pub skip_paths: Vec<String>,
}

impl Default for RequestLogSettings {
    fn default() -> Self {
        Self {
            request_id_header: DEFAULT_REQUEST_ID_HEADER.to_string(),
            request_id_key: DEFAULT_REQUEST_ID_KEY.to_string(),
            nest_key: String::new(),
            handle_error: false,
            latency_limit_ms: 0,
            latency_level: Level::Warn,
            skip_paths: Vec::new(),
        }
    }
}

impl RequestLogSettings {
    /// Middleware configuration logging through `logger`.
    pub fn to_config(&self, logger: Logger) -> Result<Config, ConfigError> {
        let mut config = Config::new()
            .logger(logger)
            .request_id_header(&self.request_id_header)
            .request_id_key(self.request_id_key.as_str())
            .nest_key(self.nest_key.as_str())
            .handle_error(self.handle_error)
            .request_latency_limit(Duration::from_millis(self.latency_limit_ms))
            .request_latency_level(self.latency_level);

        if !self.skip_paths.is_empty() {
            let mut builder = GlobSetBuilder::new();
            for pattern in &self.skip_paths {
                builder.add(Glob::new(pattern)?);
            }
            let skip = builder.build()?;
            config = config.skipper(move |exchange| skip.is_match(exchange.request().path()));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Buffer;
    use crate::LevelLogger;

    #[test]
    fn test_logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Lvl::Info);
        assert!(config.timestamp);
        assert!(!config.caller);
        assert_eq!(config.diagnostics.format, DiagFormat::Pretty);
        assert_eq!(config.request.request_id_header, "x-request-id");
        assert_eq!(config.request.latency_level, Level::Warn);
    }

    #[test]
    fn test_diag_format_from_str() {
        assert_eq!(DiagFormat::from_str("JSON").unwrap(), DiagFormat::Json);
        assert_eq!(DiagFormat::from_str("pretty").unwrap(), DiagFormat::Pretty);
        assert!(DiagFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_parse_request_section() {
        let toml = r#"
        level = "warn"
        prefix = "edge"

        [fields]
        service = "api"

        [request]
        nest_key = "http"
        latency_limit_ms = 250
        latency_level = "error"
        skip_paths = ["/health", "/static/**"]
        "#;

        let config: LoggingConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.level, Lvl::Warn);
        assert_eq!(config.fields["service"], "api");
        assert_eq!(config.request.nest_key, "http");
        assert_eq!(config.request.latency_level, Level::Error);
        assert_eq!(config.request.skip_paths.len(), 2);
        assert_eq!(config.request.request_id_key, "id");
    }

    #[test]
    fn test_build_logger_applies_settings() {
        let mut config = LoggingConfig::default();
        config.timestamp = false;
        config.prefix = "edge".to_string();
        config.fields.insert("service".to_string(), Value::from("api"));

        let buffer = Buffer::new();
        let logger = config.build_logger(Sink::from(buffer.clone()));
        logger.debug(&"dropped");
        logger.info(&"kept");

        assert_eq!(logger.level(), Lvl::Info);
        assert_eq!(logger.prefix(), "edge");
        assert_eq!(
            buffer.contents(),
            "{\"level\":\"info\",\"service\":\"api\",\"prefix\":\"edge\",\"message\":\"kept\"}\n"
        );
    }

    #[test]
    fn test_to_config_rejects_bad_glob() {
        let settings = RequestLogSettings {
            skip_paths: vec!["/a/[".to_string()],
            ..Default::default()
        };
        let result = settings.to_config(Logger::from(crate::engine::Engine::new(Sink::from(
            Buffer::new(),
        ))));
        assert!(matches!(result, Err(ConfigError::SkipPattern(_))));
    }
}
