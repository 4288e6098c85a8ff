//! Request building and execution.
//!
//! # Design
//! `Client` holds only configuration and a transport; it carries no state
//! between calls. A request is assembled with a consuming `RequestBuilder`
//! into an immutable `HttpRequest`, which `HttpRequest::prepare` turns into
//! the exact bytes and headers to send (`Content-Length`, `Cookie` and
//! client defaults are filled in there, and `Host` is derived from the URL). `Client::execute` sends a
//! prepared request through the transport and parses the reply.
//!
//! Builder steps that can fail (serializing data, empty cookie names) do not
//! fail on the spot: the first error is kept and returned by `build()` or
//! `send()`, so the chain stays fluent.

use std::io::Read;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::encode::{append_query, cookie_header, form_encode, to_object};
use crate::error::ClientError;
use crate::headers::parse_header_lines;
use crate::http::{Body, HttpMethod, PreparedRequest, RawResponse, TransportOptions};
use crate::response::Response;
use crate::transport::{ReqwestTransport, Transport};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Synchronous HTTP client. One request at a time, nothing pooled.
pub struct Client {
    config: ClientConfig,
    transport: Box<dyn Transport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_transport(config, ReqwestTransport)
    }

    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Box::new(transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn request(&self, method: HttpMethod, url: &str) -> RequestBuilder<'_> {
        RequestBuilder {
            client: self,
            request: Ok(HttpRequest::new(method, url, &self.config)),
        }
    }

    /// GET `url` with `query` appended as a query string.
    ///
    /// Pass `&()` for no query.
    pub fn get<T: Serialize + ?Sized>(&self, url: &str, query: &T) -> RequestBuilder<'_> {
        self.request(HttpMethod::Get, url).query(query)
    }

    /// POST `data` as a form (or as JSON once `json(true)` is set).
    pub fn post<T: Serialize + ?Sized>(&self, url: &str, data: &T) -> RequestBuilder<'_> {
        self.request(HttpMethod::Post, url).data(data)
    }

    pub fn put<T: Serialize + ?Sized>(&self, url: &str, data: &T) -> RequestBuilder<'_> {
        self.request(HttpMethod::Put, url).data(data)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder<'_> {
        self.request(HttpMethod::Delete, url)
    }

    /// Send `request` and parse the reply.
    ///
    /// Error statuses come back as ordinary responses unless the request has
    /// `ignore_errors` off.
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub fn execute(&self, request: &HttpRequest) -> Result<Response, ClientError> {
        let prepared = request.prepare(&self.config.default_headers)?;
        let mut raw = self.send_prepared(&prepared, &request.transport_options())?;

        let mut body = Vec::new();
        raw.body
            .read_to_end(&mut body)
            .map_err(|e| ClientError::transport(&prepared.url, e))?;

        let response = Response::from_parsed(prepared.url, parse_header_lines(&raw.header_lines), body);
        debug!(status = ?response.status_code(), bytes = response.raw_body().len(), "received response");
        request.check_status(response.status_code())?;
        Ok(response)
    }

    pub(crate) fn send_prepared(
        &self,
        prepared: &PreparedRequest,
        options: &TransportOptions,
    ) -> Result<RawResponse, ClientError> {
        debug!(
            headers = prepared.headers.len(),
            body = prepared.body.as_ref().map_or(0, Vec::len),
            "sending request"
        );
        self.transport.send(prepared, options)
    }
}

/// An immutable, fully configured request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Body,
    /// Set in order; a later header replaces an earlier one with the same name.
    pub headers: Vec<(String, String)>,
    /// Rendered into one `Cookie` header.
    pub cookies: Vec<(String, String)>,
    pub is_json: bool,
    pub follow_location: bool,
    pub verify_ssl: bool,
    pub ignore_errors: bool,
    pub timeout: Duration,
    pub proxy: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: &str, config: &ClientConfig) -> Self {
        Self {
            method,
            url: url.to_string(),
            body: Body::Empty,
            headers: Vec::new(),
            cookies: Vec::new(),
            is_json: false,
            follow_location: config.follow_location,
            verify_ssl: config.verify_ssl,
            ignore_errors: config.ignore_errors,
            timeout: config.timeout(),
            proxy: config.proxy.clone(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            timeout: self.timeout,
            follow_location: self.follow_location,
            verify_ssl: self.verify_ssl,
            proxy: self.proxy.clone(),
        }
    }

    /// Serialized body bytes; `None` when there is nothing to send.
    pub fn body_bytes(&self) -> Result<Option<Vec<u8>>, ClientError> {
        let bytes = match &self.body {
            Body::Empty => return Ok(None),
            Body::Data(data) if data.is_empty() => return Ok(None),
            Body::Data(data) if self.is_json => serde_json::to_vec(data).map_err(ClientError::Serialization)?,
            Body::Data(data) => form_encode(data).into_bytes(),
            Body::Raw(raw) if raw.is_empty() => return Ok(None),
            Body::Raw(raw) => raw.clone().into_bytes(),
        };
        Ok(Some(bytes))
    }

    /// Wire-ready request: `defaults` first, then this request's headers,
    /// `Cookie` and `Content-Length`. Without a caller-set `Host`, the one
    /// derived from the URL goes into `PreparedRequest::host`.
    pub fn prepare(&self, defaults: &[(String, String)]) -> Result<PreparedRequest, ClientError> {
        let mut headers = Vec::with_capacity(defaults.len() + self.headers.len() + 3);
        for (name, value) in defaults.iter().chain(&self.headers) {
            set_header(&mut headers, name, value.clone());
        }
        if !self.cookies.is_empty() {
            set_header(&mut headers, "Cookie", cookie_header(&self.cookies));
        }

        let body = self.body_bytes()?;
        if let Some(bytes) = &body {
            set_header(&mut headers, "Content-Length", bytes.len().to_string());
        }
        let host = if headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("Host")) {
            None
        } else {
            host_header(&self.url)
        };

        Ok(PreparedRequest {
            method: self.method,
            url: self.url.clone(),
            headers,
            host,
            body,
        })
    }

    pub(crate) fn check_status(&self, status: Option<u16>) -> Result<(), ClientError> {
        match status {
            Some(status) if !self.ignore_errors && status >= 400 => Err(ClientError::HttpStatus {
                status,
                url: self.url.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Fill in headers and cookies this request does not set itself.
    pub(crate) fn with_fallbacks(mut self, headers: &[(String, String)], cookies: &[(String, String)]) -> Self {
        for (name, value) in headers {
            if self.header(name).is_none() {
                self.headers.push((name.clone(), value.clone()));
            }
        }
        for (name, value) in cookies {
            if !self.cookies.iter().any(|(existing, _)| existing == name) {
                self.cookies.push((name.clone(), value.clone()));
            }
        }
        self
    }
}

/// Replace a header with the same name (ASCII case-insensitive) or append.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
        Some(entry) => *entry = (name.to_string(), value),
        None => headers.push((name.to_string(), value)),
    }
}

/// `host[:port]` for the URL, port only when it is not the scheme default.
fn host_header(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Consuming builder for `HttpRequest`.
#[must_use = "a RequestBuilder does nothing until `build` or `send` is called"]
pub struct RequestBuilder<'a> {
    client: &'a Client,
    request: Result<HttpRequest, ClientError>,
}

impl<'a> RequestBuilder<'a> {
    fn map(mut self, f: impl FnOnce(&mut HttpRequest) -> Result<(), ClientError>) -> Self {
        if let Ok(request) = &mut self.request {
            if let Err(e) = f(request) {
                self.request = Err(e);
            }
        }
        self
    }

    /// Append `query` to the URL, with `&` if it already has a query string.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> Self {
        self.map(|request| {
            let data = to_object(query)?;
            request.url = append_query(&request.url, &data);
            Ok(())
        })
    }

    /// Structured body; also sets the form content type unless in JSON mode.
    pub fn data<T: Serialize + ?Sized>(self, data: &T) -> Self {
        self.map(|request| {
            request.body = Body::Data(to_object(data)?);
            if !request.is_json {
                set_header(&mut request.headers, "Content-Type", FORM_CONTENT_TYPE.to_string());
            }
            Ok(())
        })
    }

    /// Raw body, sent verbatim.
    pub fn body(self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        self.map(|request| {
            request.body = Body::Raw(raw);
            Ok(())
        })
    }

    /// JSON mode: `Content-Type: application/json` and JSON-serialized data.
    ///
    /// Turning it off again puts the form content type back for structured
    /// data; a content type set by hand is left alone.
    pub fn json(self, enabled: bool) -> Self {
        self.map(|request| {
            let was_json = request.is_json;
            request.is_json = enabled;
            if enabled {
                set_header(&mut request.headers, "Content-Type", JSON_CONTENT_TYPE.to_string());
            } else if was_json
                && matches!(request.body, Body::Data(_))
                && request.header("Content-Type") == Some(JSON_CONTENT_TYPE)
            {
                set_header(&mut request.headers, "Content-Type", FORM_CONTENT_TYPE.to_string());
            }
            Ok(())
        })
    }

    pub fn header(self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        self.map(|request| {
            set_header(&mut request.headers, name, value);
            Ok(())
        })
    }

    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.map(|request| {
            for (name, value) in headers {
                set_header(&mut request.headers, name.as_ref(), value.into());
            }
            Ok(())
        })
    }

    /// Add a cookie; an existing cookie with the same name is replaced.
    pub fn cookie(self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        self.map(|request| {
            if name.is_empty() {
                return Err(ClientError::InvalidArgument("cookie name must not be empty".to_string()));
            }
            match request.cookies.iter_mut().find(|(key, _)| key == name) {
                Some(entry) => entry.1 = value,
                None => request.cookies.push((name.to_string(), value)),
            }
            Ok(())
        })
    }

    /// Replace all cookies.
    pub fn cookies<I, K, V>(self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.map(|request| {
            let cookies: Vec<(String, String)> = cookies
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect();
            if cookies.iter().any(|(name, _)| name.is_empty()) {
                return Err(ClientError::InvalidArgument("cookie name must not be empty".to_string()));
            }
            request.cookies = cookies;
            Ok(())
        })
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.map(|request| {
            request.timeout = timeout;
            Ok(())
        })
    }

    pub fn follow_location(self, enabled: bool) -> Self {
        self.map(|request| {
            request.follow_location = enabled;
            Ok(())
        })
    }

    /// Turning verification off accepts any certificate for any host name.
    pub fn verify_ssl(self, enabled: bool) -> Self {
        self.map(|request| {
            request.verify_ssl = enabled;
            Ok(())
        })
    }

    pub fn ignore_errors(self, enabled: bool) -> Self {
        self.map(|request| {
            request.ignore_errors = enabled;
            Ok(())
        })
    }

    pub fn proxy(self, proxy: impl Into<String>) -> Self {
        let proxy = proxy.into();
        self.map(|request| {
            request.proxy = Some(proxy);
            Ok(())
        })
    }

    pub fn build(self) -> Result<HttpRequest, ClientError> {
        self.request
    }

    pub fn send(self) -> Result<Response, ClientError> {
        let request = self.request?;
        self.client.execute(&request)
    }

    pub(crate) fn into_parts(self) -> (&'a Client, Result<HttpRequest, ClientError>) {
        (self.client, self.request)
    }
}
