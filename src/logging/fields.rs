//! Field extraction for request log records

use axum::body::HttpBody;
use axum::http::header::{CONTENT_LENGTH, HOST, REFERER, USER_AGENT};
use axum::http::HeaderName;
use axum::response::Response;
use std::time::Duration;

use super::exchange::RequestHead;
use crate::engine::Record;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// Everything the middleware writes about one exchange.
#[derive(Debug, Clone)]
pub struct RequestFields {
    pub remote_ip: String,
    pub host: String,
    pub method: String,
    pub uri: String,
    pub user_agent: String,
    /// `None` when the handler failed and the error went back unhandled.
    /// The status is then decided outside this layer and is left out of the line.
    pub status: Option<u16>,
    pub referer: String,
    pub latency: Duration,
    pub bytes_in: String,
    pub bytes_out: u64,
}

impl RequestFields {
    /// Collect fields from the request snapshot and, when there is one, the response.
    pub fn collect(head: &RequestHead, response: Option<&Response>, latency: Duration) -> Self {
        Self {
            remote_ip: real_ip(head),
            host: host(head),
            method: head.method().to_string(),
            uri: request_uri(head),
            user_agent: header_or_empty(head, &USER_AGENT),
            status: response.map(|response| response.status().as_u16()),
            referer: header_or_empty(head, &REFERER),
            latency,
            bytes_in: bytes_in(head),
            bytes_out: response.map(bytes_out).unwrap_or(0),
        }
    }

    /// Write the fields onto an event or a detached sub-record.
    pub fn write<R: Record>(&self, record: R) -> R {
        let record = record
            .str("remote_ip", self.remote_ip.as_str())
            .str("host", self.host.as_str())
            .str("method", self.method.as_str())
            .str("uri", self.uri.as_str())
            .str("user_agent", self.user_agent.as_str());
        let record = match self.status {
            Some(status) => record.uint("status", status),
            None => record,
        };
        record
            .str("referer", self.referer.as_str())
            .dur("latency", self.latency)
            .str("latency_human", format!("{:?}", self.latency))
            .str("bytes_in", self.bytes_in.as_str())
            .str("bytes_out", self.bytes_out.to_string())
    }
}

/// Client IP: first `X-Forwarded-For` hop, then `X-Real-IP`, then the peer address.
pub fn real_ip(head: &RequestHead) -> String {
    if let Some(forwarded) = head.header(X_FORWARDED_FOR) {
        if let Some(first) = forwarded.split(',').next().map(str::trim) {
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = head.header(X_REAL_IP) {
        return real_ip.trim().to_string();
    }
    head.remote_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}

/// `Content-Length` exactly as sent, `"0"` when absent or empty.
pub fn bytes_in(head: &RequestHead) -> String {
    match head.header(&CONTENT_LENGTH) {
        Some(length) if !length.is_empty() => length.to_string(),
        _ => "0".to_string(),
    }
}

/// Response body size when known up front, else its `Content-Length`, else 0.
pub fn bytes_out(response: &Response) -> u64 {
    response.body().size_hint().exact().unwrap_or_else(|| {
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    })
}

fn host(head: &RequestHead) -> String {
    head.header(&HOST)
        .map(str::to_string)
        .or_else(|| head.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

fn request_uri(head: &RequestHead) -> String {
    head.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| head.uri().to_string())
}

fn header_or_empty(head: &RequestHead, name: &HeaderName) -> String {
    head.header(name).unwrap_or_default().to_string()
}
