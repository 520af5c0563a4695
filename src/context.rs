//! Request-scoped logger propagation
//!
//! A [`Logger`] is carried in a request's [`Extensions`] under its own type
//! key. Downstream code retrieves it with [`ctx`], [`engine_ctx`], or as an
//! axum extractor:
//!
//! ```no_run
//! use reqlog::{LevelLogger, Logger};
//!
//! async fn handler(logger: Logger) -> &'static str {
//!     logger.info(&"handling request");
//!     "ok"
//! }
//! ```

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Extensions, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::engine::Engine;
use crate::logger::Logger;

impl Logger {
    /// Attach this logger to `extensions`, replacing any logger already there.
    pub fn with_context(&self, extensions: &mut Extensions) {
        extensions.insert(self.clone());
    }
}

/// Logger attached to `extensions`, if any.
pub fn ctx(extensions: &Extensions) -> Option<&Logger> {
    extensions.get::<Logger>()
}

/// Engine of the logger attached to `extensions`, if any.
pub fn engine_ctx(extensions: &Extensions) -> Option<&Engine> {
    ctx(extensions).map(Logger::unwrap)
}

/// Rejection when a handler asks for a [`Logger`] but none was attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingLogger;

impl IntoResponse for MissingLogger {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "request logger is not available",
        )
            .into_response()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Logger
where
    S: Send + Sync,
{
    type Rejection = MissingLogger;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        ctx(&parts.extensions).cloned().ok_or(MissingLogger)
    }
}
