//! Synchronous client for the Mixpanel ingestion API.
//!
//! # Overview
//! Events go to `/track/`, profile updates to `/engage/`. Each payload is a
//! JSON envelope, base64-encoded and sent as the `data` query parameter of a
//! GET. Mixpanel answers `1` when it accepted the payload; any other body is
//! a failure.
//!
//! # Design
//! - `Client` is stateless: it holds the token, base URL and optional
//!   override IP, builds `HttpRequest` values and parses `HttpResponse`
//!   values without touching the network (host-does-IO pattern).
//! - `Mixpanel` pairs a `Client` with a `Transport` and exposes the blocking
//!   `track` / `alias` / `profile_*` operations.
//! - Profile updates are a typed `ProfileUpdate` rather than untyped JSON, so
//!   each operation can only carry the value shape Mixpanel accepts.
//!
//! ```no_run
//! use mixpanel_core::{Mixpanel, Properties};
//! use serde_json::json;
//!
//! let mp = Mixpanel::new("project-token")?;
//! let mut props = Properties::new();
//! props.insert("$distinct_id".into(), json!("1"));
//! mp.track("User Signed Up", &props)?;
//! mp.profile_unset("1", ["Days Purchased"])?;
//! # Ok::<(), mixpanel_core::ApiError>(())
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod mixpanel;
pub mod transport;
pub mod types;

pub use client::{Client, ClientBuilder, CREATE_ALIAS_EVENT, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use http::{Endpoint, HttpRequest, HttpResponse};
pub use mixpanel::Mixpanel;
pub use transport::{Transport, UreqTransport};
pub use types::{ProfileOperation, ProfileUpdate, Properties};
