//! Parsed response with a lazily decoded body.

use std::cell::OnceCell;

use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::headers::{parse_header_lines, HeaderMap, HeaderValue, ParsedHeaders};

/// Result of one executed request.
///
/// `body()` gunzips once when `Content-Encoding` is exactly `gzip` and
/// caches the result; `raw_body()` always returns the bytes as received.
#[derive(Debug, Clone)]
pub struct Response {
    url: String,
    status: Option<u16>,
    headers: HeaderMap,
    cookies: HeaderMap,
    raw_headers: Vec<String>,
    body: Vec<u8>,
    decoded: OnceCell<Vec<u8>>,
}

impl Response {
    /// Build a response from raw header lines and body bytes.
    pub fn from_raw<S: AsRef<str>>(url: impl Into<String>, header_lines: &[S], body: Vec<u8>) -> Self {
        Self::from_parsed(url.into(), parse_header_lines(header_lines), body)
    }

    pub(crate) fn from_parsed(url: String, parsed: ParsedHeaders, body: Vec<u8>) -> Self {
        Self {
            url,
            status: parsed.status,
            headers: parsed.headers,
            cookies: parsed.cookies,
            raw_headers: parsed.raw,
            body,
            decoded: OnceCell::new(),
        }
    }

    /// URL the request was sent to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// `None` when the transport reported no status line.
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_some_and(|status| (200..300).contains(&status))
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// Cookies decoded from `Set-Cookie`.
    pub fn cookies(&self) -> &HeaderMap {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&HeaderValue> {
        self.cookies.get(name)
    }

    /// Header lines exactly as the transport reported them, status line first.
    pub fn raw_headers(&self) -> &[String] {
        &self.raw_headers
    }

    /// `Content-Length` as a number, when present and well formed.
    pub fn content_length(&self) -> Option<u64> {
        content_length(&self.headers)
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.body
    }

    /// Body bytes, gunzipped on first call if the response was gzip encoded.
    pub fn body(&self) -> Result<&[u8], ClientError> {
        if !self.is_gzip() {
            return Ok(&self.body);
        }
        if let Some(decoded) = self.decoded.get() {
            return Ok(decoded);
        }
        let decoded = gunzip(&self.body)?;
        Ok(self.decoded.get_or_init(|| decoded))
    }

    /// Body as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> Result<String, ClientError> {
        Ok(String::from_utf8_lossy(self.body()?).into_owned())
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(self.body()?).map_err(ClientError::Deserialization)
    }

    fn is_gzip(&self) -> bool {
        self.headers.get_str("Content-Encoding") == Some("gzip")
    }
}

pub(crate) fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("Content-Length")
        .and_then(|value| value.last().trim().parse().ok())
}

#[cfg(feature = "gzip")]
fn gunzip(raw: &[u8]) -> Result<Vec<u8>, ClientError> {
    use std::io::Read;

    let mut decoded = Vec::new();
    flate2::read::GzDecoder::new(raw)
        .read_to_end(&mut decoded)
        .map_err(ClientError::Decode)?;
    Ok(decoded)
}

#[cfg(not(feature = "gzip"))]
fn gunzip(_raw: &[u8]) -> Result<Vec<u8>, ClientError> {
    Err(ClientError::UnavailableCapability { capability: "gzip" })
}
