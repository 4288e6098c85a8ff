use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use flate2::{write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;
use url::form_urlencoded;

/// Everything the echo endpoint saw about a request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub uri: String,
    pub query: BTreeMap<String, String>,
    /// Lower-cased names; repeated headers joined with `, `.
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    /// Decoded when the body was sent as a form.
    pub form: BTreeMap<String, String>,
    pub input: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/gzip", get(gzip))
        .route("/status/{code}", any(status))
        .route("/repeat", get(repeat))
        .route("/redirect", get(redirect))
        .route("/redirect-to", get(redirect_to))
        .route("/download/{size}", get(download))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Deterministic payload served by `/download/{size}`.
pub fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

fn decode_pairs(raw: &[u8]) -> BTreeMap<String, String> {
    form_urlencoded::parse(raw).into_owned().collect()
}

fn request_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .flat_map(|pair| decode_pairs(pair.trim().as_bytes()))
        .collect()
}

/// Reflects the request as JSON and sets every received cookie back.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in &headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        seen.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    let cookies = request_cookies(&headers);
    let echo = Echo {
        method: method.to_string(),
        uri: uri.to_string(),
        query: uri.query().map(|q| decode_pairs(q.as_bytes())).unwrap_or_default(),
        headers: seen,
        cookies: cookies.clone(),
        form: if is_form { decode_pairs(&body) } else { BTreeMap::new() },
        input: String::from_utf8_lossy(&body).into_owned(),
    };
    debug!(method = %echo.method, uri = %echo.uri, "echo");

    let mut response = Json(echo).into_response();
    for (name, value) in &cookies {
        let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
        if let Ok(header_value) = HeaderValue::from_str(&format!("{name}={encoded}")) {
            response.headers_mut().append(header::SET_COOKIE, header_value);
        }
    }
    response
}

/// Gzip-compressed `text` query parameter with `Content-Encoding: gzip`.
async fn gzip(Query(params): Query<HashMap<String, String>>) -> Result<Response, StatusCode> {
    let text = params.get("text").map(String::as_str).unwrap_or("hello gzip");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let compressed = encoder.finish().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok((
        [
            (header::CONTENT_ENCODING, "gzip"),
            (header::CONTENT_TYPE, "text/plain"),
        ],
        compressed,
    )
        .into_response())
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, format!("status {code}")).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid status").into_response(),
    }
}

/// Repeated headers and cookies with the same name.
async fn repeat() -> impl IntoResponse {
    (
        AppendHeaders([
            ("x-multi", "one"),
            ("x-multi", "two"),
            ("set-cookie", "id=1; Path=/"),
            ("set-cookie", "id=2; Path=/; HttpOnly"),
        ]),
        "repeated",
    )
}

async fn redirect() -> impl IntoResponse {
    (
        StatusCode::FOUND,
        AppendHeaders([("location", "/echo"), ("set-cookie", "hop=1")]),
        "redirecting",
    )
}

/// `303 See Other` to the absolute `url` query parameter.
async fn redirect_to(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("url") {
        Some(target) => (
            StatusCode::SEE_OTHER,
            AppendHeaders([(header::LOCATION, target.clone())]),
            "redirecting",
        )
            .into_response(),
        None => (StatusCode::BAD_REQUEST, "missing url").into_response(),
    }
}

async fn download(Path(size): Path<usize>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], payload(size))
}
