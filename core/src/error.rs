//! Error types for the Mixpanel client.
//!
//! # Design
//! Mixpanel answers every ingestion request with a one-character body, so the
//! only domain failures are "the track endpoint did not say 1" and "the engage
//! endpoint did not say 1". Transport failures are passed through untouched in
//! `Transport` so callers can inspect the original `io::Error`.

use thiserror::Error;

/// Errors returned by `Client` and `Mixpanel` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// `/track/` answered with something other than `"1"`.
    #[error("unexpected Mixpanel track response: {body:?}")]
    UnexpectedTrackResponse { body: String },

    /// `/engage/` answered with something other than `"1"`.
    #[error("unexpected Mixpanel engage response: {body:?}")]
    UnexpectedEngageResponse { body: String },

    /// The client was configured without a project token.
    #[error("Mixpanel token must not be empty")]
    MissingToken,

    #[error("event name must not be empty")]
    EmptyEventName,

    /// The envelope could not be serialized, or an untyped profile value
    /// did not have the shape its operation requires.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connection or body-read failure reported by the transport.
    #[error(transparent)]
    Transport(#[from] std::io::Error),
}
