//! Probe configuration from environment variables.
//!
//! Every setting has a default so the probe runs with no arguments and no
//! environment at all.

use std::str::FromStr;
use std::time::Duration;

use crate::decoder::TextEncoding;
use crate::error::ProbeError;
use crate::http::Endpoint;
use crate::policy::{CutoffPolicy, DEFAULT_MAX_LINES, DEFAULT_TIMEOUT};
use crate::types::ChatPayload;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CHAT_PATH: &str = "/health/chat/physical";
pub const DEFAULT_STREAM_PATH: &str = "/health/chat/text/stream";
pub const DEFAULT_MESSAGE: &str = "I often feel tired lately, any advice?";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub host: String,
    pub port: u16,
    pub chat_path: String,
    pub stream_path: String,
    pub message: String,
    pub max_lines: usize,
    pub timeout: Duration,
    pub request_timeout: Duration,
    pub encoding: TextEncoding,
    pub step_delay: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            stream_path: DEFAULT_STREAM_PATH.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
            max_lines: DEFAULT_MAX_LINES,
            timeout: DEFAULT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            encoding: TextEncoding::Utf8,
            step_delay: DEFAULT_STEP_DELAY,
        }
    }
}

impl ProbeConfig {
    pub fn from_env() -> Result<Self, ProbeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProbeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            host: lookup("PROBE_HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PROBE_PORT", defaults.port)?,
            chat_path: lookup("PROBE_CHAT_PATH").unwrap_or(defaults.chat_path),
            stream_path: lookup("PROBE_STREAM_PATH").unwrap_or(defaults.stream_path),
            message: lookup("PROBE_MESSAGE").unwrap_or(defaults.message),
            max_lines: parse_or(&lookup, "PROBE_MAX_LINES", defaults.max_lines)?,
            timeout: millis_or(&lookup, "PROBE_TIMEOUT_MS", defaults.timeout)?,
            request_timeout: millis_or(&lookup, "PROBE_REQUEST_TIMEOUT_MS", defaults.request_timeout)?,
            encoding: parse_or(&lookup, "PROBE_ENCODING", defaults.encoding)?,
            step_delay: millis_or(&lookup, "PROBE_STEP_DELAY_MS", defaults.step_delay)?,
        };
        // Surface bad endpoints and limits now rather than mid-plan.
        config.chat_endpoint()?;
        config.stream_endpoint()?;
        config.policy()?;
        Ok(config)
    }

    pub fn chat_endpoint(&self) -> Result<Endpoint, ProbeError> {
        Endpoint::new(&self.host, self.port, &self.chat_path)
    }

    pub fn stream_endpoint(&self) -> Result<Endpoint, ProbeError> {
        Endpoint::new(&self.host, self.port, &self.stream_path)
    }

    pub fn policy(&self) -> Result<CutoffPolicy, ProbeError> {
        CutoffPolicy::new(self.max_lines, self.timeout)
    }

    pub fn payload(&self) -> ChatPayload {
        ChatPayload::new(self.message.clone())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ProbeError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: ToString,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ProbeError::Config {
            key: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn millis_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ProbeError>
where
    F: Fn(&str) -> Option<String>,
{
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_or(lookup, key, default_ms).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ProbeConfig, ProbeError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProbeConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, ProbeConfig::default());
        assert_eq!(
            config.stream_endpoint().unwrap().url(),
            "http://localhost:5000/health/chat/text/stream"
        );
        assert_eq!(config.policy().unwrap(), CutoffPolicy::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("PROBE_HOST", "127.0.0.1"),
            ("PROBE_PORT", "8080"),
            ("PROBE_MAX_LINES", "3"),
            ("PROBE_TIMEOUT_MS", "2000"),
            ("PROBE_ENCODING", "latin1"),
            ("PROBE_MESSAGE", "how do I sleep better?"),
        ])
        .unwrap();
        assert_eq!(config.chat_endpoint().unwrap().url(), "http://127.0.0.1:8080/health/chat/physical");
        assert_eq!(config.policy().unwrap().max_lines(), 3);
        assert_eq!(config.policy().unwrap().timeout(), Duration::from_millis(2000));
        assert_eq!(config.encoding, TextEncoding::Latin1);
        assert_eq!(config.payload(), ChatPayload::new("how do I sleep better?"));
    }

    #[test]
    fn malformed_number_names_the_variable() {
        let err = config_from(&[("PROBE_PORT", "five thousand")]).unwrap_err();
        assert!(matches!(err, ProbeError::Config { ref key, .. } if key == "PROBE_PORT"));
    }

    #[test]
    fn zero_max_lines_is_rejected() {
        let err = config_from(&[("PROBE_MAX_LINES", "0")]).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidPolicy(_)));
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let err = config_from(&[("PROBE_ENCODING", "ebcdic")]).unwrap_err();
        assert!(matches!(err, ProbeError::Config { ref key, .. } if key == "PROBE_ENCODING"));
    }

    #[test]
    fn relative_path_is_rejected() {
        let err = config_from(&[("PROBE_STREAM_PATH", "stream")]).unwrap_err();
        assert!(matches!(err, ProbeError::InvalidEndpoint(_)));
    }
}
