//! HTTP transport types shared by the builder, the transport and the parser.
//!
//! # Design
//! A request is described as plain data: `PreparedRequest` is what goes on
//! the wire and `TransportOptions` is how the transport should send it. The
//! transport answers with a `RawResponse`: header lines exactly as a status
//! line plus `Name: value` lines, and an unread body stream. Keeping the raw
//! shape lets the parser stay independent of the transport crate.

use std::fmt;
use std::io::Read;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ClientError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Connect,
    Options,
    Trace,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.to_ascii_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "HEAD" => HttpMethod::Head,
            "CONNECT" => HttpMethod::Connect,
            "OPTIONS" => HttpMethod::Options,
            "TRACE" => HttpMethod::Trace,
            "PATCH" => HttpMethod::Patch,
            other => return Err(ClientError::InvalidArgument(format!("unknown HTTP method: {other}"))),
        };
        Ok(method)
    }
}

/// Request payload before serialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    /// Structured key-value data, sent as a form or as JSON text.
    Data(serde_json::Map<String, serde_json::Value>),
    /// Sent verbatim.
    Raw(String),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// A fully serialized request, ready for the transport.
///
/// Produced by `HttpRequest::prepare`. Header order is the order the
/// headers will be written in.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// `Host` derived from the URL when the caller set none. Not part of
    /// `headers`: the transport derives it again for every redirect hop.
    pub host: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl PreparedRequest {
    /// First header value whose name matches ASCII case-insensitively.
    ///
    /// `Host` falls back to the derived value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .or_else(|| if name.eq_ignore_ascii_case("host") { self.host.as_deref() } else { None })
    }
}

/// How the transport should carry out a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub timeout: Duration,
    pub follow_location: bool,
    /// Off disables both certificate and host-name verification.
    pub verify_ssl: bool,
    pub proxy: Option<String>,
}

/// What the transport hands back before any parsing.
pub struct RawResponse {
    /// Status line first, then `Name: value` lines in wire order.
    pub header_lines: Vec<String>,
    pub body: Box<dyn Read>,
}

impl fmt::Debug for RawResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawResponse")
            .field("header_lines", &self.header_lines)
            .finish_non_exhaustive()
    }
}
