//! Client-wide defaults.
//!
//! Every field can be overridden per request through `RequestBuilder`.
//! Certificate verification is on unless a caller turns it off explicitly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Advisory; enforced by the transport.
    pub timeout_secs: u64,
    pub follow_location: bool,
    /// Turning this off disables certificate and host-name checks.
    pub verify_ssl: bool,
    /// Return 4xx/5xx responses instead of failing with `HttpStatus`.
    pub ignore_errors: bool,
    pub proxy: Option<String>,
    /// Sent with every request unless the request sets the same name.
    pub default_headers: Vec<(String, String)>,
    /// Copy buffer size for `Client::download`.
    pub chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            follow_location: true,
            verify_ssl: true,
            ignore_errors: true,
            proxy: None,
            default_headers: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ClientError> {
        let config: ClientConfig = serde_json::from_str(raw).map_err(ClientError::Deserialization)?;
        if config.chunk_size == 0 {
            return Err(ClientError::InvalidArgument("chunk_size must be greater than zero".to_string()));
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_verify_certificates() {
        let config = ClientConfig::default();
        assert!(config.verify_ssl);
        assert!(config.follow_location);
        assert!(config.ignore_errors);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.chunk_size, 8192);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ClientConfig::from_json_str(r#"{"timeout_secs": 5, "proxy": "http://proxy:8080"}"#).unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.proxy.as_deref(), Some("http://proxy:8080"));
        assert!(config.verify_ssl);
    }

    #[test]
    fn default_headers_load_as_pairs() {
        let config =
            ClientConfig::from_json_str(r#"{"default_headers": [["User-Agent", "httpwrap"]]}"#).unwrap();
        assert_eq!(
            config.default_headers,
            vec![("User-Agent".to_string(), "httpwrap".to_string())]
        );
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let err = ClientConfig::from_json_str(r#"{"chunk_size": 0}"#).unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument(_)));
    }

    #[test]
    fn malformed_json_is_a_deserialization_error() {
        let err = ClientConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, ClientError::Deserialization(_)));
    }
}
