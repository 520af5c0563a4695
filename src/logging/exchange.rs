//! Request/response views handed to skippers, enrichers and error handlers

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::header::AsHeaderName;
use axum::http::{Extensions, HeaderMap, Method, Request, StatusCode, Uri, Version};
use axum::response::Response;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

/// Snapshot of the parts of an inbound request the middleware logs.
///
/// Taken before the request is handed to the inner service, so it stays
/// readable after the handler has consumed the request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    remote_addr: Option<SocketAddr>,
}

impl RequestHead {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
            remote_addr: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text; `None` when absent or not valid UTF-8.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Peer address, when the server was started with connect info.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

/// Per-request value store shared between the middleware and the handler.
///
/// The middleware attaches one to every logged request. Values the handler
/// inserts are visible to the after-next skipper and enricher.
///
/// ```
/// use reqlog::logging::Locals;
///
/// #[derive(Clone)]
/// struct UserId(String);
///
/// let locals = Locals::default();
/// let shared = locals.clone();
/// shared.insert(UserId("u-42".into()));
/// assert_eq!(locals.get::<UserId>().map(|u| u.0), Some("u-42".to_string()));
/// ```
#[derive(Clone, Default)]
pub struct Locals {
    values: Arc<Mutex<Extensions>>,
}

impl Locals {
    pub fn insert<T: Clone + Send + Sync + 'static>(&self, value: T) {
        self.lock().insert(value);
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.lock().get::<T>().cloned()
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.lock().get::<T>().is_some()
    }

    /// Store attached to `extensions`, or a fresh one.
    pub(crate) fn from_extensions(extensions: &Extensions) -> Self {
        extensions.get::<Locals>().cloned().unwrap_or_default()
    }

    fn lock(&self) -> MutexGuard<'_, Extensions> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Locals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locals").field("len", &self.lock().len()).finish()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Locals
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Locals::from_extensions(&parts.extensions))
    }
}

/// What a skipper, enricher or error handler sees of the current exchange.
///
/// `response` is `None` before the handler has run, and after it when the
/// handler failed and its error was not handled.
#[derive(Clone, Copy)]
pub struct Exchange<'a> {
    request: &'a RequestHead,
    response: Option<&'a Response>,
    locals: &'a Locals,
}

impl<'a> Exchange<'a> {
    pub fn new(request: &'a RequestHead, response: Option<&'a Response>, locals: &'a Locals) -> Self {
        Self {
            request,
            response,
            locals,
        }
    }

    pub fn request(&self) -> &'a RequestHead {
        self.request
    }

    pub fn response(&self) -> Option<&'a Response> {
        self.response
    }

    /// Final status, once a response exists.
    pub fn status(&self) -> Option<StatusCode> {
        self.response.map(Response::status)
    }

    pub fn locals(&self) -> &'a Locals {
        self.locals
    }
}
