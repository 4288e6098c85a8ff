//! Response header and cookie parsing.
//!
//! # Design
//! The parser works on raw lines (`HTTP/1.1 200 OK`, `Name: value`, ...)
//! rather than on a transport's header type, so any transport that can
//! produce lines can be parsed the same way. Repeated names are folded into
//! an ordered list instead of overwriting: the first repeat turns the
//! scalar into a one-element list and appends.
//!
//! When a later status line shows up (a redirect hop reported inline), the
//! headers and cookies collected so far are dropped and only the final
//! hop is kept. Raw lines keep every hop.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

#[allow(clippy::expect_used)]
static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^HTTP/\S+\s+(\d+)(?:\s|$)").expect("status line regex is valid")
});

/// A header or cookie value: one occurrence, or several in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Scalar(String),
    List(Vec<String>),
}

impl HeaderValue {
    /// The value when it occurred exactly once.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Scalar(value) => Some(value),
            HeaderValue::List(_) => None,
        }
    }

    pub fn first(&self) -> &str {
        match self {
            HeaderValue::Scalar(value) => value,
            HeaderValue::List(values) => values.first().map(String::as_str).unwrap_or_default(),
        }
    }

    pub fn last(&self) -> &str {
        match self {
            HeaderValue::Scalar(value) => value,
            HeaderValue::List(values) => values.last().map(String::as_str).unwrap_or_default(),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderValue::Scalar(value) => vec![value.as_str()],
            HeaderValue::List(values) => values.iter().map(String::as_str).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HeaderValue::Scalar(_) => 1,
            HeaderValue::List(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderValue::Scalar(existing) => {
                let first = std::mem::take(existing);
                *self = HeaderValue::List(vec![first, value]);
            }
            HeaderValue::List(values) => values.push(value),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Scalar(value.to_string())
    }
}

impl From<Vec<&str>> for HeaderValue {
    fn from(values: Vec<&str>) -> Self {
        HeaderValue::List(values.into_iter().map(str::to_string).collect())
    }
}

/// Insertion-ordered name → value map with duplicate folding.
///
/// Header maps compare names ASCII case-insensitively, cookie maps exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, HeaderValue)>,
    case_sensitive: bool,
}

impl HeaderMap {
    pub fn headers() -> Self {
        Self {
            entries: Vec::new(),
            case_sensitive: false,
        }
    }

    pub fn cookies() -> Self {
        Self {
            entries: Vec::new(),
            case_sensitive: true,
        }
    }

    fn matches(&self, key: &str, name: &str) -> bool {
        if self.case_sensitive {
            key == name
        } else {
            key.eq_ignore_ascii_case(name)
        }
    }

    /// Add a value, folding into a list if `name` is already present.
    pub fn append(&mut self, name: &str, value: String) {
        let case_sensitive = self.case_sensitive;
        let existing = self.entries.iter_mut().find(|(key, _)| {
            if case_sensitive {
                key == name
            } else {
                key.eq_ignore_ascii_case(name)
            }
        });
        match existing {
            Some((_, current)) => current.push(value),
            None => self.entries.push((name.to_string(), HeaderValue::Scalar(value))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(key, _)| self.matches(key, name))
            .map(|(_, value)| value)
    }

    /// The value of `name` when it occurred exactly once.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(HeaderValue::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Result of parsing a block of raw response header lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeaders {
    /// `None` when no status line was seen.
    pub status: Option<u16>,
    pub headers: HeaderMap,
    pub cookies: HeaderMap,
    pub raw: Vec<String>,
}

/// Parse raw header lines into status, headers and cookies.
pub fn parse_header_lines<S: AsRef<str>>(lines: &[S]) -> ParsedHeaders {
    let mut parsed = ParsedHeaders {
        status: None,
        headers: HeaderMap::headers(),
        cookies: HeaderMap::cookies(),
        raw: lines.iter().map(|line| line.as_ref().to_string()).collect(),
    };

    for line in lines {
        let line = line.as_ref();
        let Some((key, value)) = split_header(line) else {
            if let Some(status) = status_code(line) {
                // A new status line means a new hop; keep only the last one.
                parsed.status = Some(status);
                parsed.headers.clear();
                parsed.cookies.clear();
            } else {
                trace!(line, "ignoring header line without separator");
            }
            continue;
        };

        if key.eq_ignore_ascii_case("set-cookie") {
            if let Some((name, cookie)) = parse_set_cookie(value) {
                parsed.cookies.append(name, cookie);
            }
        }
        parsed.headers.append(key, value.to_string());
    }

    parsed
}

/// Status code from a line like `HTTP/1.1 404 Not Found`.
pub fn status_code(line: &str) -> Option<u16> {
    STATUS_LINE
        .captures(line.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|code| code.as_str().parse().ok())
}

/// Split on the first `:` that is followed by whitespace; both halves trimmed.
fn split_header(line: &str) -> Option<(&str, &str)> {
    line.match_indices(':').find_map(|(idx, _)| {
        let rest = &line[idx + 1..];
        rest.starts_with(char::is_whitespace)
            .then(|| (line[..idx].trim(), rest.trim()))
    })
}

/// Name and decoded value of a `Set-Cookie` header value; attributes dropped.
fn parse_set_cookie(value: &str) -> Option<(&str, String)> {
    let (name, rest) = value.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let raw = rest.split(';').next().unwrap_or_default().trim();
    Some((name, decode_cookie_value(raw)))
}

fn decode_cookie_value(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}
