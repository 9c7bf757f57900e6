//! Error types for the chat probe.
//!
//! # Design
//! `TransportError` covers everything that can go wrong on the wire and is
//! the only cause of the `Failed` terminal state. It is `Clone` so the
//! streaming engine can keep it in its final state while also handing it to
//! the caller. `ProbeError` wraps it together with the failures that happen
//! before any bytes are sent: a bad endpoint, a bad cutoff policy, a payload
//! that will not serialize, or a malformed configuration value.
//!
//! A body that is not JSON and a cutoff firing are not errors and have no
//! variant here.

use std::time::Duration;

use thiserror::Error;

/// Wire-level failures reported by a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established (refused, DNS, unreachable).
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request could not be sent or the response head was malformed.
    #[error("request failed: {0}")]
    Request(String),

    /// The response body was reset or closed abnormally mid-stream.
    #[error("response body failed: {0}")]
    Body(String),

    /// The exchange did not complete within the configured request timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Errors returned by the probe components.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The target endpoint is not well-formed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// A cutoff limit was zero.
    #[error("invalid cutoff policy: {0}")]
    InvalidPolicy(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A configuration value could not be parsed.
    #[error("invalid value for {key}: {reason}")]
    Config { key: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}
