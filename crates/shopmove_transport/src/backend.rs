//! Back-end abstraction: something that can send one HTTP request.

use crate::error::{TransportError, TransportResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Returns the method as it appears on the request line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// Lower-case form used in preference cache keys.
    pub(crate) fn cache_segment(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Put => "put",
            Method::Delete => "delete",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call request arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestArgs {
    /// Request body.
    pub body: Option<Vec<u8>>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Timeout for this call; the transport default applies when unset.
    pub timeout: Option<Duration>,
}

impl RequestArgs {
    /// Creates empty arguments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a raw body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as a JSON body and sets the content type.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> TransportResult<Self> {
        let body = serde_json::to_vec(value).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(self
            .with_header("content-type", "application/json")
            .with_body(body))
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fully prepared request handed to a back-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL, after policy preprocessing.
    pub url: String,
    /// Arguments, with the timeout already resolved.
    pub args: RequestArgs,
}

impl HttpRequest {
    /// Returns the effective timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.args.timeout
    }
}

/// What a back-end received, before any policy is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    /// Status code.
    pub code: u16,
    /// Reason phrase.
    pub message: String,
    /// Headers, names lower-cased.
    pub headers: BTreeMap<String, String>,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Creates a response with the given status and body.
    pub fn new(code: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            message: String::new(),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Sets the reason phrase.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Adds a header; the name is lower-cased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }
}

/// A strategy for sending one HTTP request.
///
/// A back-end reports an error only when it could not obtain a response at
/// all. Any HTTP status, including 4xx and 5xx, is a successful send.
///
/// # Implementors
///
/// - [`crate::ManagedClientBackend`] - reqwest blocking client
/// - [`crate::RawStreamBackend`] - hand-written HTTP/1.0 over a TCP socket
pub trait HttpBackend: Send + Sync {
    /// Stable identifier recorded in the preference cache.
    fn id(&self) -> &str;

    /// Sends the request.
    ///
    /// # Errors
    ///
    /// Returns an error if no response could be obtained.
    fn send(&self, request: &HttpRequest) -> TransportResult<RawResponse>;
}
