//! HTTP request logging
//!
//! [`RequestLoggerLayer`] is a tower layer for axum services. For every
//! request it derives a per-request [`Logger`](crate::Logger) (request ID and
//! enricher fields on top of the configured template), attaches it to the
//! request extensions for handlers, and writes one line per exchange.
//!
//! Handler errors surface as [`tower::BoxError`], so an axum router needs a
//! `HandleErrorLayer` outside the logger:
//!
//! ```no_run
//! use axum::error_handling::HandleErrorLayer;
//! use axum::http::StatusCode;
//! use axum::{routing::get, BoxError, Router};
//! use reqlog::logging::{Config, RequestLoggerLayer};
//! use reqlog::{LevelLogger, Logger};
//! use tower::ServiceBuilder;
//!
//! async fn hello(logger: Logger) -> &'static str {
//!     logger.debug(&"saying hello");
//!     "hello"
//! }
//!
//! async fn unhandled(err: BoxError) -> (StatusCode, String) {
//!     (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
//! }
//!
//! let app: Router = Router::new().route("/", get(hello)).layer(
//!     ServiceBuilder::new()
//!         .layer(HandleErrorLayer::new(unhandled))
//!         .layer(RequestLoggerLayer::new(Config::new().nest_key("http"))),
//! );
//! ```

mod body;
pub mod config;
pub mod exchange;
pub mod fields;
pub mod middleware;

pub use config::{
    default_error_handler, BeforeFunc, Config, Enricher, ErrorHandler, Skipper,
    DEFAULT_REQUEST_ID_HEADER, DEFAULT_REQUEST_ID_KEY,
};
pub use exchange::{Exchange, Locals, RequestHead};
pub use fields::RequestFields;
pub use middleware::{
    generate_request_id, HandlerError, RequestLogger, RequestLoggerLayer, UuidRequestId,
};

use crate::config::DiagnosticsConfig;

/// Build filter directives string from DiagnosticsConfig
///
/// Constructs a tracing filter string that includes the base level and any
/// component-specific levels.
///
/// # Examples
///
/// ```
/// use reqlog::config::DiagnosticsConfig;
/// use reqlog::logging::build_filter_directives;
/// use std::collections::HashMap;
///
/// let mut component_levels = HashMap::new();
/// component_levels.insert("logging".to_string(), "debug".to_string());
///
/// let config = DiagnosticsConfig {
///     level: "info".to_string(),
///     component_levels: Some(component_levels),
///     ..Default::default()
/// };
///
/// assert_eq!(build_filter_directives(&config), "info,reqlog::logging=debug");
/// ```
pub fn build_filter_directives(config: &DiagnosticsConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        let mut components: Vec<_> = component_levels.iter().collect();
        components.sort();
        for (component, level) in components {
            filter_str.push_str(&format!(",reqlog::{}={}", component, level));
        }
    }

    filter_str
}
