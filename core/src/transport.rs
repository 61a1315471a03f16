//! Blocking execution of `HttpRequest` values.
//!
//! # Design
//! `Transport` is the one seam between the pure `Client` and the network.
//! Errors are plain `io::Error`s so `Mixpanel` can hand them back unchanged,
//! and tests can swap in a stub that never opens a socket.

use std::io;

use crate::http::HttpResponse;

/// Executes a GET against a fully-formed URL and returns the whole body.
pub trait Transport {
    fn get(&self, url: &str) -> io::Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> io::Result<HttpResponse> {
        (**self).get(url)
    }
}

/// Default transport backed by a `ureq::Agent`.
///
/// Status-code-as-error is disabled so 4xx/5xx bodies are returned as data
/// and judged by the same `"1"` check as everything else.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    /// Use a preconfigured agent (proxy, timeouts, TLS settings).
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn get(&self, url: &str) -> io::Result<HttpResponse> {
        let mut response = self.agent.get(url).call().map_err(into_io)?;
        let status = response.status().as_u16();
        let bytes = response.body_mut().read_to_vec().map_err(into_io)?;
        // A body that is not UTF-8 is still a body; the "1" check rejects it.
        let body = String::from_utf8_lossy(&bytes).into_owned();
        Ok(HttpResponse { status, body })
    }
}

/// Unwrap socket errors so their `ErrorKind` survives; wrap everything else.
fn into_io(err: ureq::Error) -> io::Error {
    match err {
        ureq::Error::Io(e) => e,
        other => io::Error::other(other),
    }
}
