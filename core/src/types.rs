//! Payload and body types for the chat service.
//!
//! # Design
//! The probe does not interpret what the service says. `ChatPayload` is the
//! only request shape the service recognizes, and `DecodedBody` records
//! whether a buffered response happened to be JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decoder::TextEncoding;

/// Request payload accepted by the chat endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatPayload {
    pub message: String,
}

impl ChatPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A fully buffered response body, decoded as JSON when possible.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedBody {
    Json(Value),
    /// The body was not valid JSON; this is the decoded text as received.
    Raw(String),
}

impl DecodedBody {
    pub fn decode(bytes: &[u8], encoding: TextEncoding) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => DecodedBody::Json(value),
            Err(_) => DecodedBody::Raw(encoding.decode(bytes)),
        }
    }

    /// Render for the observer: pretty-printed JSON or the raw text.
    pub fn render(&self) -> String {
        match self {
            DecodedBody::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            DecodedBody::Raw(text) => text.clone(),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            DecodedBody::Json(value) => Some(value),
            DecodedBody::Raw(_) => None,
        }
    }
}
