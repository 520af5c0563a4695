//! Request logging middleware
//!
//! [`RequestLoggerLayer`] wraps a service so every request it serves gets a
//! derived [`Logger`] in its extensions and exactly one log line describing
//! the exchange.
//!
//! The line is written as soon as the inner service answers when the
//! response body size is known up front. Streamed bodies are counted as they
//! are sent and the line is written when the body ends or is dropped, so
//! `latency` and `bytes_out` cover the whole transfer.

use axum::body::{Body, HttpBody};
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::Response;
use futures::future::BoxFuture;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::{Duration, Instant};
use tower::{BoxError, Layer, Service};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use super::body::CountingBody;
use super::config::{Config, Enricher};
use super::exchange::{Exchange, Locals, RequestHead};
use super::fields::RequestFields;
use crate::engine::Dict;
use crate::logger::{normal_level, Logger};
use crate::options::Setter;

/// Generate a new request ID using UUID v4
///
/// # Examples
///
/// ```
/// use reqlog::logging::generate_request_id;
///
/// let request_id = generate_request_id();
/// assert_eq!(request_id.len(), 36);
/// ```
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// UUID v4 request IDs for [`tower_http::request_id::SetRequestIdLayer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&generate_request_id())
            .ok()
            .map(RequestId::new)
    }
}

/// Error a handled failure was turned into a response for.
///
/// Attached to the response extensions when `handle_error` is on, so outer
/// layers can still tell the response apart from a regular one.
#[derive(Debug, Clone)]
pub struct HandlerError(pub Arc<BoxError>);

impl HandlerError {
    pub fn error(&self) -> &BoxError {
        &self.0
    }
}

/// Layer applying [`RequestLogger`].
#[derive(Debug, Clone)]
pub struct RequestLoggerLayer {
    config: Arc<Config>,
}

impl RequestLoggerLayer {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for RequestLoggerLayer {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<S> Layer<S> for RequestLoggerLayer {
    type Service = RequestLogger<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogger {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Service logging each exchange with the inner service.
#[derive(Debug, Clone)]
pub struct RequestLogger<S> {
    inner: S,
    config: Arc<Config>,
}

impl<S> Service<Request> for RequestLogger<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Response, BoxError>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        // The clone may not be ready; keep the one that was polled.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let head = RequestHead::from_request(&request);
            let locals = Locals::from_extensions(request.extensions());

            let skip = config.skips_before(&Exchange::new(&head, None, &locals));
            if skip {
                return inner.call(request).await.map_err(Into::into);
            }

            let start = Instant::now();
            let prepared = prepare(&config, &head, &locals, &request);

            prepared.logger.with_context(request.extensions_mut());
            request.extensions_mut().insert(locals.clone());
            if let Some(before) = &config.before_next {
                before(&mut request);
            }

            let outcome = match inner.call(request).await {
                Ok(response) => Outcome::Ok(response),
                Err(error) => Outcome::failed(&config, &head, &locals, error.into()),
            };

            finish(&config, prepared, &head, &locals, outcome, start)
        })
    }
}

/// Per-request logger state carried across the handler call.
struct Prepared {
    logger: Logger,
    has_request_id: bool,
}

/// What the inner service produced, after error handling.
enum Outcome {
    Ok(Response),
    /// Failed, and the error handler answered.
    Handled(Response, Arc<BoxError>),
    /// Failed, returned to the caller as is.
    Failed(BoxError),
}

impl Outcome {
    fn failed(config: &Config, head: &RequestHead, locals: &Locals, error: BoxError) -> Self {
        if !config.handle_error {
            return Outcome::Failed(error);
        }

        let mut response = (config.error_handler)(&error, &Exchange::new(head, None, locals));
        let error = Arc::new(error);
        response
            .extensions_mut()
            .insert(HandlerError(Arc::clone(&error)));
        Outcome::Handled(response, error)
    }

    fn response(&self) -> Option<&Response> {
        match self {
            Outcome::Ok(response) | Outcome::Handled(response, _) => Some(response),
            Outcome::Failed(_) => None,
        }
    }

    fn error(&self) -> Option<&BoxError> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Handled(_, error) => Some(error),
            Outcome::Failed(error) => Some(error),
        }
    }

    fn into_result(self) -> Result<Response, BoxError> {
        match self {
            Outcome::Ok(response) | Outcome::Handled(response, _) => Ok(response),
            Outcome::Failed(error) => Err(error),
        }
    }
}

/// Derive the request logger: request ID first, then the enricher.
fn prepare(config: &Config, head: &RequestHead, locals: &Locals, request: &Request) -> Prepared {
    let request_id = head
        .header(&config.request_id_header)
        .filter(|id| !id.is_empty())
        .or_else(|| {
            request
                .extensions()
                .get::<RequestId>()
                .and_then(|id| id.header_value().to_str().ok())
        });

    let mut logger = config.logger.clone();
    if let Some(id) = request_id {
        logger = with_request_id(config, &logger, id);
    }
    if let Some(enricher) = &config.enricher {
        logger = enrich(enricher, &Exchange::new(head, None, locals), &logger);
    }

    Prepared {
        logger,
        has_request_id: request_id.is_some(),
    }
}

fn finish(
    config: &Arc<Config>,
    prepared: Prepared,
    head: &RequestHead,
    locals: &Locals,
    outcome: Outcome,
    start: Instant,
) -> Result<Response, BoxError> {
    let line = {
        let exchange = Exchange::new(head, outcome.response(), locals);
        (!config.skips_after(&exchange))
            .then(|| pending_line(config, prepared, &exchange, outcome.error(), start))
    };
    let Some(line) = line else {
        return outcome.into_result();
    };

    match outcome.into_result() {
        Ok(response) if response.body().size_hint().exact().is_none() => {
            Ok(response.map(|body| Body::new(CountingBody::new(body, line))))
        }
        result => {
            line.write(None);
            result
        }
    }
}

/// Log line for one exchange, complete except for the transfer figures.
pub(crate) struct PendingLine {
    config: Arc<Config>,
    logger: Logger,
    error: Option<String>,
    fields: RequestFields,
    start: Instant,
}

impl PendingLine {
    /// Write the line, taking `bytes_out` from a counted body when given.
    pub(crate) fn write(mut self, bytes_out: Option<u64>) {
        self.fields.latency = self.start.elapsed();
        if let Some(bytes) = bytes_out {
            self.fields.bytes_out = bytes;
        }

        let engine = self.logger.unwrap();
        let event = match &self.error {
            Some(error) => engine.err(error),
            None => match self.config.latency_level(self.fields.latency) {
                Some(level) => engine.event(level),
                None => engine.event(normal_level(&self.logger)),
            },
        };

        let event = if self.config.nest_key.is_empty() {
            self.fields.write(event)
        } else {
            event.dict(&self.config.nest_key, self.fields.write(Dict::new()))
        };
        event.send();
    }
}

fn pending_line(
    config: &Arc<Config>,
    prepared: Prepared,
    exchange: &Exchange<'_>,
    error: Option<&BoxError>,
    start: Instant,
) -> PendingLine {
    let mut logger = prepared.logger;

    // A layer outside this one may have set the ID on the way out.
    if !prepared.has_request_id {
        let late_id = exchange
            .response()
            .and_then(|response| response.headers().get(&config.request_id_header))
            .and_then(|value| value.to_str().ok())
            .filter(|id| !id.is_empty());
        if let Some(id) = late_id {
            logger = with_request_id(config, &logger, id);
        }
    }

    if let Some(enricher) = &config.after_next_enricher {
        logger = enrich(enricher, exchange, &logger);
    }

    PendingLine {
        config: Arc::clone(config),
        logger,
        error: error.map(ToString::to_string),
        fields: RequestFields::collect(exchange.request(), exchange.response(), Duration::ZERO),
        start,
    }
}

fn with_request_id(config: &Config, logger: &Logger, id: &str) -> Logger {
    logger.derive(vec![Setter::field(config.request_id_key.as_str(), id)])
}

/// Run `enricher` over a fresh field chain of `logger`.
///
/// A panicking enricher is reported through `tracing` and its fields are
/// dropped; the request carries on with `logger` unchanged.
fn enrich(enricher: &Enricher, exchange: &Exchange<'_>, logger: &Logger) -> Logger {
    let chain = logger.unwrap().with();
    match panic::catch_unwind(AssertUnwindSafe(|| enricher(exchange, chain))) {
        Ok(chain) => logger.with_engine(chain.logger()),
        Err(_) => {
            tracing::warn!(
                path = exchange.request().path(),
                "Request log enricher panicked, continuing without its fields"
            );
            logger.clone()
        }
    }
}
