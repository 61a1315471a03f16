//! Stateless request builder and response parser for the Mixpanel API.
//!
//! # Design
//! `Client` holds only its configuration and carries no mutable state between
//! calls. Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! Whoever executes the GET sits between the two, keeping this half
//! deterministic and free of I/O.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{Endpoint, HttpRequest, HttpResponse};
use crate::types::{EngageEnvelope, ProfileUpdate, Properties, TrackEnvelope};

/// Mixpanel's public ingestion host.
pub const DEFAULT_BASE_URL: &str = "https://api.mixpanel.com";

/// Body Mixpanel returns when it accepted a request.
const SUCCESS_BODY: &str = "1";

/// Event name Mixpanel reserves for linking two distinct ids.
pub const CREATE_ALIAS_EVENT: &str = "$create_alias";

/// Immutable Mixpanel configuration plus request building and response
/// interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    token: String,
    base_url: String,
    override_ip: Option<String>,
}

/// Builder for `Client`.
///
/// ```
/// use mixpanel_core::Client;
///
/// let client = Client::builder("project-token")
///     .base_url("https://api-eu.mixpanel.com")
///     .override_ip("203.0.113.9")
///     .build()
///     .unwrap();
/// assert_eq!(client.base_url(), "https://api-eu.mixpanel.com");
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    token: String,
    base_url: String,
    override_ip: Option<String>,
}

impl ClientBuilder {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            override_ip: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// IP address reported as `$ip` on every profile update.
    pub fn override_ip(mut self, ip: impl Into<String>) -> Self {
        self.override_ip = Some(ip.into());
        self
    }

    pub fn build(self) -> Result<Client, ApiError> {
        if self.token.trim().is_empty() {
            return Err(ApiError::MissingToken);
        }
        Ok(Client {
            token: self.token,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            override_ip: self.override_ip.filter(|ip| !ip.is_empty()),
        })
    }
}

impl Client {
    /// Client for the default Mixpanel host.
    pub fn new(token: impl Into<String>) -> Result<Self, ApiError> {
        ClientBuilder::new(token).build()
    }

    pub fn builder(token: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn override_ip(&self) -> Option<&str> {
        self.override_ip.as_deref()
    }

    /// Build a `/track/` request for `event`.
    ///
    /// `properties` is copied before the project token is injected, so the
    /// caller's map is left untouched. A caller-supplied `token` property is
    /// overwritten.
    pub fn build_track(&self, event: &str, properties: &Properties) -> Result<HttpRequest, ApiError> {
        if event.is_empty() {
            return Err(ApiError::EmptyEventName);
        }
        let mut properties = properties.clone();
        properties.insert("token".to_string(), Value::String(self.token.clone()));
        let envelope = TrackEnvelope { event, properties };
        self.build_request(Endpoint::Track, &envelope)
    }

    /// Build the `$create_alias` track request linking `old_id` to `new_id`.
    pub fn build_alias(&self, old_id: &str, new_id: &str) -> Result<HttpRequest, ApiError> {
        let mut properties = Properties::new();
        properties.insert("distinct_id".to_string(), Value::from(old_id));
        properties.insert("alias".to_string(), Value::from(new_id));
        self.build_track(CREATE_ALIAS_EVENT, &properties)
    }

    /// Build an `/engage/` request applying `update` to `distinct_id`.
    pub fn build_engage(&self, distinct_id: &str, update: &ProfileUpdate) -> Result<HttpRequest, ApiError> {
        let envelope = EngageEnvelope {
            token: &self.token,
            distinct_id,
            ip: self.override_ip.as_deref(),
            update,
        };
        self.build_request(Endpoint::Engage, &envelope)
    }

    pub fn parse_track(&self, response: HttpResponse) -> Result<(), ApiError> {
        if response.body == SUCCESS_BODY {
            return Ok(());
        }
        tracing::warn!(status = response.status, body = %response.body, "track rejected");
        Err(ApiError::UnexpectedTrackResponse { body: response.body })
    }

    pub fn parse_engage(&self, response: HttpResponse) -> Result<(), ApiError> {
        if response.body == SUCCESS_BODY {
            return Ok(());
        }
        tracing::warn!(status = response.status, body = %response.body, "engage rejected");
        Err(ApiError::UnexpectedEngageResponse { body: response.body })
    }

    /// Interpret `response` according to the endpoint it came from.
    pub fn parse(&self, endpoint: Endpoint, response: HttpResponse) -> Result<(), ApiError> {
        match endpoint {
            Endpoint::Track => self.parse_track(response),
            Endpoint::Engage => self.parse_engage(response),
        }
    }

    /// JSON-encode `envelope`, base64 the bytes and address the result to
    /// `endpoint` as the `data` query parameter.
    fn build_request<T: Serialize>(&self, endpoint: Endpoint, envelope: &T) -> Result<HttpRequest, ApiError> {
        let json = serde_json::to_vec(envelope)?;
        let data = STANDARD.encode(json);
        let url = format!(
            "{}{}?data={}",
            self.base_url,
            endpoint.path(),
            urlencoding::encode(&data)
        );
        Ok(HttpRequest { endpoint, url, data })
    }
}
