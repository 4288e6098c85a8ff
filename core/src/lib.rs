//! Minimal blocking HTTP client.
//!
//! # Overview
//! Builds one request at a time (method, URL, headers, cookies, body, proxy,
//! TLS verification), sends it through a blocking transport and exposes the
//! parsed response: status code, multi-valued headers, cookies decoded from
//! `Set-Cookie`, and the body with on-demand gzip decoding. Bodies can also
//! be streamed straight to a file with a progress callback.
//!
//! # Design
//! - `Client` is stateless; `RequestBuilder` produces an immutable
//!   `HttpRequest`, and `Client::execute` sends it.
//! - The network sits behind the `Transport` trait. The default
//!   `ReqwestTransport` hands back raw header lines, which `headers` parses, so
//!   parsing is testable without a socket.
//! - Error statuses are ordinary responses unless `ignore_errors` is off;
//!   transport failures are always errors.
//! - `Session` is the explicit place for state that outlives one request.
//!
//! ```no_run
//! use httpwrap_core::Client;
//!
//! let client = Client::new();
//! let response = client.get("https://example.com/search", &[("q", "rust")]).send()?;
//! println!("{:?} {}", response.status_code(), response.text()?);
//! # Ok::<(), httpwrap_core::ClientError>(())
//! ```

pub mod client;
pub mod config;
pub mod download;
pub mod encode;
pub mod error;
pub mod headers;
pub mod http;
pub mod response;
pub mod session;
pub mod transport;

pub use client::{Client, HttpRequest, RequestBuilder};
pub use config::ClientConfig;
pub use download::{Download, Progress};
pub use error::{ClientError, IoOp};
pub use headers::{parse_header_lines, HeaderMap, HeaderValue, ParsedHeaders};
pub use http::{Body, HttpMethod, PreparedRequest, RawResponse, TransportOptions};
pub use response::Response;
pub use session::Session;
pub use transport::{ReqwestTransport, Transport};
