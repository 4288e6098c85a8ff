//! Form/query encoding for structured request data.
//!
//! Nested objects and arrays are flattened into bracketed keys
//! (`user[name]=x`, `tags[0]=a`), booleans become `1`/`0` and nulls are
//! skipped, which is what most form-handling servers expect.

use serde::Serialize;
use serde_json::{Map, Value};
use url::form_urlencoded;
use url::Url;

use crate::error::ClientError;

/// Serialize `data` into a JSON object.
///
/// Maps and structs are taken as-is; a sequence of `(name, value)` pairs
/// becomes an object in pair order. Anything else is rejected.
pub fn to_object<T: Serialize + ?Sized>(data: &T) -> Result<Map<String, Value>, ClientError> {
    match serde_json::to_value(data).map_err(ClientError::Serialization)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        Value::Array(items) if items.iter().all(is_pair) => Ok(items.into_iter().filter_map(into_pair).collect()),
        other => Err(ClientError::InvalidArgument(format!(
            "request data must be a key-value mapping, got {}",
            kind(&other)
        ))),
    }
}

/// `application/x-www-form-urlencoded` text for a JSON object.
pub fn form_encode(data: &Map<String, Value>) -> String {
    let mut pairs = Vec::new();
    for (key, value) in data {
        flatten(key.clone(), value, &mut pairs);
    }
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Append `data` as a query string, joining with `&` when `url` already has one.
pub fn append_query(url: &str, data: &Map<String, Value>) -> String {
    let query = form_encode(data);
    if query.is_empty() {
        return url.to_string();
    }
    let separator = if has_query(url) { '&' } else { '?' };
    format!("{url}{separator}{query}")
}

/// `Cookie` header value for name/value pairs, each part URL-encoded.
pub fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| {
            let pair: String = form_urlencoded::Serializer::new(String::new())
                .append_pair(name, value)
                .finish();
            pair
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn has_query(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.query().is_some_and(|query| !query.is_empty()),
        Err(_) => url
            .split_once('?')
            .is_some_and(|(_, query)| !query.split('#').next().unwrap_or_default().is_empty()),
    }
}

fn flatten(prefix: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => out.push((prefix, if *flag { "1" } else { "0" }.to_string())),
        Value::Number(number) => out.push((prefix, number.to_string())),
        Value::String(text) => out.push((prefix, text.clone())),
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                flatten(format!("{prefix}[{idx}]"), item, out);
            }
        }
        Value::Object(fields) => {
            for (key, item) in fields {
                flatten(format!("{prefix}[{key}]"), item, out);
            }
        }
    }
}

fn is_pair(item: &Value) -> bool {
    matches!(item, Value::Array(pair) if pair.len() == 2 && pair[0].is_string())
}

fn into_pair(item: Value) -> Option<(String, Value)> {
    let Value::Array(pair) = item else {
        return None;
    };
    let mut pair = pair.into_iter();
    match (pair.next(), pair.next()) {
        (Some(Value::String(name)), Some(value)) => Some((name, value)),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
