//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `Client` builds `HttpRequest`
//! values and interprets `HttpResponse` values without touching the network;
//! whoever executes the GET (a `Transport`, or a C host through the FFI
//! crate) sits in between.
//!
//! All fields use owned types so values can cross FFI boundaries without
//! lifetime concerns.

/// Ingestion endpoint a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Event tracking, `/track/`.
    Track,
    /// Profile updates, `/engage/`.
    Engage,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Track => "/track/",
            Endpoint::Engage => "/engage/",
        }
    }
}

/// A GET request described as plain data.
///
/// `url` is complete, including the percent-encoded `data` query parameter.
/// `data` holds the same payload before percent-encoding (base64 of the JSON
/// envelope) for hosts that build the query string themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub endpoint: Endpoint,
    pub url: String,
    pub data: String,
}

/// An HTTP response described as plain data.
///
/// Only `body` decides success; `status` is kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}
