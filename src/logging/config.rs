//! Request logger configuration

use axum::extract::Request;
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tower::BoxError;

use super::exchange::Exchange;
use crate::engine::{Context, Level};
use crate::logger::Logger;

/// Header read for an inbound request ID unless configured otherwise.
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

/// Field the request ID is written under unless configured otherwise.
pub const DEFAULT_REQUEST_ID_KEY: &str = "id";

/// Decides whether to bypass logging for an exchange.
pub type Skipper = Arc<dyn Fn(&Exchange<'_>) -> bool + Send + Sync>;

/// Side-effect run on the request right before it reaches the handler.
pub type BeforeFunc = Arc<dyn Fn(&mut Request) + Send + Sync>;

/// Adds fields to the per-request field chain.
pub type Enricher = Arc<dyn Fn(&Exchange<'_>, Context) -> Context + Send + Sync>;

/// Shapes the response for a failed handler.
pub type ErrorHandler = Arc<dyn Fn(&BoxError, &Exchange<'_>) -> Response + Send + Sync>;

/// Configuration for [`RequestLoggerLayer`](super::RequestLoggerLayer).
///
/// Every option has a usable default:
///
/// | option | default |
/// |---|---|
/// | logger | stdout, with timestamps |
/// | skipper / after-next skipper | never skip |
/// | request ID header | `x-request-id` |
/// | request ID key | `id` |
/// | nest key | none, fields are flat |
/// | handle error | off |
/// | error handler | 500 with the error text |
/// | latency limit | zero, escalation disabled |
/// | latency level | `info` |
#[derive(Clone)]
pub struct Config {
    pub(crate) logger: Logger,
    pub(crate) skipper: Option<Skipper>,
    pub(crate) after_next_skipper: Option<Skipper>,
    pub(crate) before_next: Option<BeforeFunc>,
    pub(crate) enricher: Option<Enricher>,
    pub(crate) after_next_enricher: Option<Enricher>,
    pub(crate) request_id_header: HeaderName,
    pub(crate) request_id_key: String,
    pub(crate) nest_key: String,
    pub(crate) handle_error: bool,
    pub(crate) error_handler: ErrorHandler,
    pub(crate) request_latency_limit: Duration,
    pub(crate) request_latency_level: Level,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Template logger every request derives from.
    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Skip all logging for matching requests. The handler still runs.
    pub fn skipper<F>(mut self, skipper: F) -> Self
    where
        F: Fn(&Exchange<'_>) -> bool + Send + Sync + 'static,
    {
        self.skipper = Some(Arc::new(skipper));
        self
    }

    /// Suppress the log line for matching exchanges, evaluated once the
    /// handler has finished.
    pub fn after_next_skipper<F>(mut self, skipper: F) -> Self
    where
        F: Fn(&Exchange<'_>) -> bool + Send + Sync + 'static,
    {
        self.after_next_skipper = Some(Arc::new(skipper));
        self
    }

    pub fn before_next<F>(mut self, before: F) -> Self
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        self.before_next = Some(Arc::new(before));
        self
    }

    /// Enrich the request logger before the handler runs. The handler sees
    /// the enriched logger.
    pub fn enricher<F>(mut self, enricher: F) -> Self
    where
        F: Fn(&Exchange<'_>, Context) -> Context + Send + Sync + 'static,
    {
        self.enricher = Some(Arc::new(enricher));
        self
    }

    /// Enrich the log line after the handler has run. Sees the response and
    /// any [`Locals`](super::Locals) the handler set.
    pub fn after_next_enricher<F>(mut self, enricher: F) -> Self
    where
        F: Fn(&Exchange<'_>, Context) -> Context + Send + Sync + 'static,
    {
        self.after_next_enricher = Some(Arc::new(enricher));
        self
    }

    /// Header to read the request ID from. Invalid names are ignored.
    pub fn request_id_header(mut self, header: &str) -> Self {
        match HeaderName::from_bytes(header.as_bytes()) {
            Ok(name) => self.request_id_header = name,
            Err(_) => tracing::warn!(
                header,
                "Invalid request ID header name, keeping {}",
                self.request_id_header
            ),
        }
        self
    }

    pub fn request_id_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        if !key.is_empty() {
            self.request_id_key = key;
        }
        self
    }

    /// Nest the request fields under `key`. Empty means flat.
    pub fn nest_key(mut self, key: impl Into<String>) -> Self {
        self.nest_key = key.into();
        self
    }

    /// Turn handler errors into responses with the error handler instead of
    /// returning them to the caller. They are logged either way.
    pub fn handle_error(mut self, handle: bool) -> Self {
        self.handle_error = handle;
        self
    }

    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&BoxError, &Exchange<'_>) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Requests slower than `limit` log at the latency level. Zero disables.
    pub fn request_latency_limit(mut self, limit: Duration) -> Self {
        self.request_latency_limit = limit;
        self
    }

    pub fn request_latency_level(mut self, level: Level) -> Self {
        self.request_latency_level = level;
        self
    }

    pub(crate) fn skips_before(&self, exchange: &Exchange<'_>) -> bool {
        self.skipper.as_ref().is_some_and(|skip| skip(exchange))
    }

    pub(crate) fn skips_after(&self, exchange: &Exchange<'_>) -> bool {
        self.after_next_skipper
            .as_ref()
            .is_some_and(|skip| skip(exchange))
    }

    /// Escalated level for `latency`, if the limit is enabled and exceeded.
    pub(crate) fn latency_level(&self, latency: Duration) -> Option<Level> {
        (!self.request_latency_limit.is_zero() && latency > self.request_latency_limit)
            .then_some(self.request_latency_level)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logger: Logger::default(),
            skipper: None,
            after_next_skipper: None,
            before_next: None,
            enricher: None,
            after_next_enricher: None,
            request_id_header: HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER),
            request_id_key: DEFAULT_REQUEST_ID_KEY.to_string(),
            nest_key: String::new(),
            handle_error: false,
            error_handler: Arc::new(default_error_handler),
            request_latency_limit: Duration::ZERO,
            request_latency_level: Level::Info,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("logger", &self.logger)
            .field("skipper", &self.skipper.is_some())
            .field("after_next_skipper", &self.after_next_skipper.is_some())
            .field("before_next", &self.before_next.is_some())
            .field("enricher", &self.enricher.is_some())
            .field("after_next_enricher", &self.after_next_enricher.is_some())
            .field("request_id_header", &self.request_id_header)
            .field("request_id_key", &self.request_id_key)
            .field("nest_key", &self.nest_key)
            .field("handle_error", &self.handle_error)
            .field("request_latency_limit", &self.request_latency_limit)
            .field("request_latency_level", &self.request_latency_level)
            .finish()
    }
}

/// 500 with the error text as body.
pub fn default_error_handler(error: &BoxError, _exchange: &Exchange<'_>) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Locals, RequestHead};

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.request_id_header, "x-request-id");
        assert_eq!(config.request_id_key, "id");
        assert!(config.nest_key.is_empty());
        assert!(!config.handle_error);
        assert_eq!(config.request_latency_limit, Duration::ZERO);
        assert_eq!(config.request_latency_level, Level::Info);
    }

    #[test]
    fn test_invalid_header_name_keeps_previous() {
        let config = Config::new().request_id_header("bad header");
        assert_eq!(config.request_id_header, DEFAULT_REQUEST_ID_HEADER);

        let config = Config::new().request_id_header("X-Correlation-Id");
        assert_eq!(config.request_id_header, "x-correlation-id");
    }

    #[test]
    fn test_empty_request_id_key_keeps_default() {
        let config = Config::new().request_id_key("");
        assert_eq!(config.request_id_key, "id");
    }

    #[test]
    fn test_latency_level_disabled_by_zero_limit() {
        let config = Config::new().request_latency_level(Level::Warn);
        assert_eq!(config.latency_level(Duration::from_secs(60)), None);
    }

    #[test]
    fn test_latency_level_requires_exceeding_limit() {
        let config = Config::new()
            .request_latency_limit(Duration::from_millis(5))
            .request_latency_level(Level::Warn);

        assert_eq!(config.latency_level(Duration::from_millis(5)), None);
        assert_eq!(config.latency_level(Duration::from_millis(6)), Some(Level::Warn));
    }

    #[test]
    fn test_skippers_default_to_never() {
        let head = RequestHead::from_request(&axum::http::Request::new(()));
        let locals = Locals::default();
        let exchange = Exchange::new(&head, None, &locals);

        let config = Config::new();
        assert!(!config.skips_before(&exchange));
        assert!(!config.skips_after(&exchange));

        let config = config.skipper(|ex| ex.request().path() == "/");
        assert!(config.skips_before(&exchange));
    }

    #[test]
    fn test_default_error_handler_returns_500() {
        let head = RequestHead::from_request(&axum::http::Request::new(()));
        let locals = Locals::default();
        let error: BoxError = "boom".into();

        let response = default_error_handler(&error, &Exchange::new(&head, None, &locals));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
