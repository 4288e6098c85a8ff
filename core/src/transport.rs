//! The network seam.
//!
//! # Design
//! `Transport` performs exactly one request and returns raw header lines plus
//! the unread body. `ReqwestTransport` builds a fresh blocking reqwest client
//! per call from `TransportOptions`: nothing is pooled or reused between
//! requests, environment proxies are ignored, and reqwest never decodes
//! content, so compressed bytes reach the caller untouched.
//!
//! Plain `http://` targets behind a proxy go to the proxy with the absolute
//! URI as request target; `https://` targets are tunnelled with `CONNECT`.
//! The `Host` derived from the URL is left to reqwest, which sets it per
//! redirect hop; only a caller-supplied `Host` is written explicitly.

use std::error::Error as StdError;

use reqwest::blocking;
use reqwest::{redirect, Method, StatusCode, Version};
use tracing::warn;

use crate::error::ClientError;
use crate::http::{PreparedRequest, RawResponse, TransportOptions};

/// Redirect hops followed when `follow_location` is on.
pub const MAX_REDIRECTS: usize = 10;

/// Executes a single request.
///
/// A zero `timeout` in the options means no timeout.
pub trait Transport: Send + Sync {
    fn send(&self, request: &PreparedRequest, options: &TransportOptions) -> Result<RawResponse, ClientError>;
}

/// Blocking transport backed by reqwest.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    fn client(&self, url: &str, options: &TransportOptions) -> Result<blocking::Client, ClientError> {
        if !options.verify_ssl {
            warn!("TLS certificate and host-name verification disabled for this request");
        }
        let policy = if options.follow_location {
            redirect::Policy::limited(MAX_REDIRECTS)
        } else {
            redirect::Policy::none()
        };

        let mut builder = blocking::Client::builder()
            .timeout((!options.timeout.is_zero()).then_some(options.timeout))
            .redirect(policy)
            .danger_accept_invalid_certs(!options.verify_ssl)
            .no_proxy();
        if let Some(proxy) = options.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ClientError::InvalidArgument(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        builder.build().map_err(|e| ClientError::transport(url, describe(&e)))
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &PreparedRequest, options: &TransportOptions) -> Result<RawResponse, ClientError> {
        let client = self.client(&request.url, options)?;
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| ClientError::InvalidArgument(format!("invalid method {}: {e}", request.method)))?;

        let mut builder = client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(bytes) = &request.body {
            builder = builder.body(bytes.clone());
        }

        let response = builder.send().map_err(|e| {
            if e.is_builder() {
                ClientError::InvalidArgument(format!("invalid request {}: {}", request.url, describe(&e)))
            } else {
                ClientError::transport(&request.url, describe(&e))
            }
        })?;

        let mut header_lines = Vec::with_capacity(response.headers().len() + 1);
        header_lines.push(status_line(response.version(), response.status()));
        for (name, value) in response.headers() {
            header_lines.push(format!("{}: {}", name.as_str(), String::from_utf8_lossy(value.as_bytes())));
        }

        Ok(RawResponse {
            header_lines,
            body: Box::new(response),
        })
    }
}

fn status_line(version: Version, status: StatusCode) -> String {
    let line = format!(
        "{:?} {} {}",
        version,
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    line.trim_end().to_string()
}

/// The error and its sources joined with `: `.
fn describe(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
