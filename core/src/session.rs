//! Stateful wrapper that remembers headers, cookies and the last outcome.
//!
//! # Design
//! `Client` and `HttpRequest` never carry anything from one request to the
//! next. `Session` is the opt-in for that: headers and cookies set on the
//! session are added to every request that does not set them itself, and
//! the most recent response is kept for inspection. The stored outcome is
//! cleared before each send, so a failed request never shows the previous
//! request's status; after a transport failure `status_code()` is `-1`.

use serde::Serialize;

use crate::client::{Client, HttpRequest};
use crate::error::ClientError;
use crate::response::Response;

/// Status reported by `Session::status_code` after a transport failure.
pub const TRANSPORT_FAILURE_STATUS: i32 = -1;

#[derive(Debug)]
pub struct Session {
    client: Client,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    last: Option<Response>,
    failed_status: Option<i32>,
}

impl Session {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            headers: Vec::new(),
            cookies: Vec::new(),
            last: None,
            failed_status: None,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Header sent with every later request; replaces a previous value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
        self
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn clear_headers(&mut self) -> &mut Self {
        self.headers.clear();
        self
    }

    /// Cookie sent with every later request.
    pub fn set_cookie(&mut self, name: &str, value: impl Into<String>) -> Result<&mut Self, ClientError> {
        if name.is_empty() {
            return Err(ClientError::InvalidArgument("cookie name must not be empty".to_string()));
        }
        let value = value.into();
        match self.cookies.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.cookies.push((name.to_string(), value)),
        }
        Ok(self)
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    pub fn clear_cookies(&mut self) -> &mut Self {
        self.cookies.clear();
        self
    }

    pub fn get<T: Serialize + ?Sized>(&mut self, url: &str, query: &T) -> Result<&Response, ClientError> {
        let request = self.begin(|client| client.get(url, query).build())?;
        self.send(request)
    }

    pub fn post<T: Serialize + ?Sized>(&mut self, url: &str, data: &T) -> Result<&Response, ClientError> {
        let request = self.begin(|client| client.post(url, data).build())?;
        self.send(request)
    }

    pub fn put<T: Serialize + ?Sized>(&mut self, url: &str, data: &T) -> Result<&Response, ClientError> {
        let request = self.begin(|client| client.put(url, data).build())?;
        self.send(request)
    }

    pub fn delete(&mut self, url: &str) -> Result<&Response, ClientError> {
        let request = self.begin(|client| client.delete(url).build())?;
        self.send(request)
    }

    /// Send a request built elsewhere, adding the session's headers and cookies.
    pub fn send(&mut self, request: HttpRequest) -> Result<&Response, ClientError> {
        self.reset();
        let request = request.with_fallbacks(&self.headers, &self.cookies);
        match self.client.execute(&request) {
            Ok(response) => Ok(self.last.insert(response)),
            Err(e) => {
                self.failed_status = match &e {
                    ClientError::Transport { .. } => Some(TRANSPORT_FAILURE_STATUS),
                    ClientError::HttpStatus { status, .. } => Some(i32::from(*status)),
                    _ => None,
                };
                Err(e)
            }
        }
    }

    /// Status of the last request: `None` before any request or when the
    /// response had no status line, `-1` after a transport failure.
    pub fn status_code(&self) -> Option<i32> {
        self.failed_status
            .or_else(|| self.last.as_ref().and_then(Response::status_code).map(i32::from))
    }

    pub fn last_response(&self) -> Option<&Response> {
        self.last.as_ref()
    }

    fn begin(
        &mut self,
        build: impl FnOnce(&Client) -> Result<HttpRequest, ClientError>,
    ) -> Result<HttpRequest, ClientError> {
        self.reset();
        build(&self.client)
    }

    fn reset(&mut self) {
        self.last = None;
        self.failed_status = None;
    }
}
