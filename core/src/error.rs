//! Error types for the HTTP client.
//!
//! # Design
//! Transport failures (DNS, refused connections, TLS) always surface as
//! `Transport`. Error status codes only become `HttpStatus` when the caller
//! turned `ignore_errors` off; by default a 404 is an ordinary `Response`.
//! Download failures carry the step that failed in `IoOp` so callers can
//! tell a missing source from an unwritable destination.

use std::fmt;
use std::io;

use thiserror::Error;

/// Errors returned by `Client`, `RequestBuilder`, `Response` and `Session`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport primitive itself failed: DNS, connection, TLS, proxy.
    #[error("transport error requesting {url}: {message}")]
    Transport { url: String, message: String },

    /// The server answered with a status >= 400 and `ignore_errors` was off.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Decoding needs support that was compiled out (e.g. the `gzip` feature).
    #[error("{capability} decoding is not available; enable the `{capability}` feature or read the raw body")]
    UnavailableCapability { capability: &'static str },

    /// The body claimed an encoding but could not be decoded.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] io::Error),

    /// A download step failed.
    #[error("failed to {op} {target}: {source}")]
    Io {
        op: IoOp,
        target: String,
        #[source]
        source: io::Error,
    },

    /// Caller supplied a value the client cannot use.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),
}

/// The download step an `Io` error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    OpenSource,
    OpenDestination,
    Read,
    Write,
}

impl fmt::Display for IoOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IoOp::OpenSource => "open source",
            IoOp::OpenDestination => "open destination",
            IoOp::Read => "read from",
            IoOp::Write => "write to",
        };
        f.write_str(text)
    }
}

impl ClientError {
    pub(crate) fn transport(url: impl Into<String>, message: impl fmt::Display) -> Self {
        ClientError::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(op: IoOp, target: impl Into<String>, source: io::Error) -> Self {
        ClientError::Io {
            op,
            target: target.into(),
            source,
        }
    }

    /// Status code carried by the error, if it came from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_failed_step() {
        let err = ClientError::io(
            IoOp::OpenDestination,
            "/tmp/out.bin",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "failed to open destination /tmp/out.bin: denied");
    }

    #[test]
    fn status_only_for_http_errors() {
        let err = ClientError::HttpStatus {
            status: 503,
            url: "http://x/".to_string(),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(ClientError::transport("http://x/", "refused").status(), None);
    }
}
