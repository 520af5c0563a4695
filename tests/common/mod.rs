//! Shared test utilities for reqlog integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use reqlog::engine::{Buffer, Sink};
use reqlog::{Logger, Lvl, Setter};
use serde_json::Value;
use std::convert::Infallible;

/// UUID v4 string length: "xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx"
pub const UUID_V4_STRING_LEN: usize = 36;

/// Logger writing into a fresh buffer.
pub fn buffered_logger(setters: Vec<Setter>) -> (Logger, Buffer) {
    let buffer = Buffer::new();
    (Logger::new(Sink::from(buffer.clone()), setters), buffer)
}

/// Info-level logger writing into a fresh buffer, no timestamp.
pub fn info_logger() -> (Logger, Buffer) {
    buffered_logger(vec![Setter::Level(Lvl::Info)])
}

/// Every line in `buffer`, parsed.
pub fn json_lines(buffer: &Buffer) -> Vec<Value> {
    buffer
        .lines()
        .iter()
        .map(|line| serde_json::from_str(line).expect("log line is JSON"))
        .collect()
}

pub fn get(uri: &str) -> Request {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn ok_handler(_request: Request) -> Result<Response, Infallible> {
    Ok(Response::new(Body::from("ok")))
}
