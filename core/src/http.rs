//! HTTP data types shared by both probe components.
//!
//! # Design
//! Requests and response heads are plain owned data. The components build an
//! `HttpRequest`, hand it to a `Transport`, and read the `ResponseEnvelope`
//! back; nothing here touches the network. Every exchange the probe makes is
//! a JSON `POST`, so the method is not represented.

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::error::ProbeError;

/// Target of an exchange: host, port and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    path: String,
}

impl Endpoint {
    pub fn new(host: &str, port: u16, path: &str) -> Result<Self, ProbeError> {
        if host.is_empty() || host.contains(|c: char| c.is_whitespace() || c == '/') {
            return Err(ProbeError::InvalidEndpoint(format!("bad host {host:?}")));
        }
        if port == 0 {
            return Err(ProbeError::InvalidEndpoint("port must be non-zero".to_string()));
        }
        if !path.starts_with('/') {
            return Err(ProbeError::InvalidEndpoint(format!(
                "path {path:?} must start with '/'"
            )));
        }
        Ok(Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    /// Parse an `http://host[:port]/path` URL.
    pub fn parse(raw: &str) -> Result<Self, ProbeError> {
        let url = Url::parse(raw).map_err(|e| ProbeError::InvalidEndpoint(format!("{raw}: {e}")))?;
        if url.scheme() != "http" {
            return Err(ProbeError::InvalidEndpoint(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ProbeError::InvalidEndpoint(format!("{raw}: missing host")))?;
        let port = url.port_or_known_default().unwrap_or(80);
        Self::new(host, port, url.path())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

/// A JSON `POST` described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    /// Serialize `payload` and address it to `endpoint`.
    pub fn json<P: Serialize>(endpoint: &Endpoint, payload: &P) -> Result<Self, ProbeError> {
        let body = serde_json::to_string(payload).map_err(|e| ProbeError::Serialization(e.to_string()))?;
        Ok(Self {
            url: endpoint.url(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        })
    }
}

/// Status and headers of a response, produced once per exchange.
///
/// Header names are lower-cased and unique; when the transport delivers a
/// name more than once the first value is kept. Order is arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseEnvelope {
    pub fn new<I, K, V>(status: u16, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut unique: Vec<(String, String)> = Vec::new();
        for (name, value) in headers {
            let name = name.as_ref().to_ascii_lowercase();
            if unique.iter().any(|(existing, _)| *existing == name) {
                continue;
            }
            unique.push((name, value.into()));
        }
        Self {
            status,
            headers: unique,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatPayload;

    #[test]
    fn endpoint_renders_url() {
        let endpoint = Endpoint::new("localhost", 5000, "/health/chat/physical").unwrap();
        assert_eq!(endpoint.url(), "http://localhost:5000/health/chat/physical");
        assert_eq!(endpoint.to_string(), endpoint.url());
    }

    #[test]
    fn endpoint_rejects_relative_path() {
        let err = Endpoint::new("localhost", 5000, "health").unwrap_err();
        assert!(matches!(err, ProbeError::InvalidEndpoint(_)));
    }

    #[test]
    fn endpoint_rejects_empty_host_and_zero_port() {
        assert!(Endpoint::new("", 5000, "/").is_err());
        assert!(Endpoint::new("local host", 5000, "/").is_err());
        assert!(Endpoint::new("localhost", 0, "/").is_err());
    }

    #[test]
    fn endpoint_parses_url() {
        let endpoint = Endpoint::parse("http://127.0.0.1:8080/health/chat/text/stream").unwrap();
        assert_eq!(endpoint.host(), "127.0.0.1");
        assert_eq!(endpoint.port(), 8080);
        assert_eq!(endpoint.path(), "/health/chat/text/stream");
    }

    #[test]
    fn endpoint_parse_defaults_port_and_path() {
        let endpoint = Endpoint::parse("http://example.test").unwrap();
        assert_eq!(endpoint.port(), 80);
        assert_eq!(endpoint.path(), "/");
    }

    #[test]
    fn endpoint_parse_rejects_other_schemes() {
        assert!(Endpoint::parse("https://example.test/").is_err());
        assert!(Endpoint::parse("not a url").is_err());
    }

    #[test]
    fn json_request_carries_payload() {
        let endpoint = Endpoint::new("localhost", 5000, "/chat").unwrap();
        let req = HttpRequest::json(&endpoint, &ChatPayload::new("test")).unwrap();
        assert_eq!(req.url, "http://localhost:5000/chat");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        assert_eq!(req.body, r#"{"message":"test"}"#);
    }

    #[test]
    fn envelope_keeps_first_header_in_arrival_order() {
        let envelope = ResponseEnvelope::new(
            200,
            vec![
                ("Content-Type", "text/event-stream"),
                ("X-Trace", "a"),
                ("x-trace", "b"),
            ],
        );
        assert_eq!(
            envelope.headers,
            vec![
                ("content-type".to_string(), "text/event-stream".to_string()),
                ("x-trace".to_string(), "a".to_string()),
            ]
        );
        assert_eq!(envelope.header("X-TRACE"), Some("a"));
        assert!(envelope.is_success());
    }
}
