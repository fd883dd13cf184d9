//! Managed HTTP client back-end (reqwest).

use crate::backend::{HttpBackend, HttpRequest, Method, RawResponse};
use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::collections::BTreeMap;

/// Back-end built on reqwest's blocking client.
///
/// Handles TLS, redirects and chunked bodies. This is the default and
/// first-probed back-end.
#[derive(Debug, Clone)]
pub struct ManagedClientBackend {
    client: Client,
}

impl ManagedClientBackend {
    /// Id recorded in the preference cache.
    pub const ID: &'static str = "managed";

    /// Builds the client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Setup`] if the client cannot be built.
    pub fn new(config: &TransportConfig) -> TransportResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| TransportError::Setup(format!("invalid user agent: {e}")))?,
        );

        let redirect = if config.max_redirects == 0 {
            reqwest::redirect::Policy::none()
        } else {
            reqwest::redirect::Policy::limited(config.max_redirects)
        };

        let client = Client::builder()
            .timeout(config.default_timeout)
            .default_headers(headers)
            .redirect(redirect)
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpBackend for ManagedClientBackend {
    fn id(&self) -> &str {
        Self::ID
    }

    fn send(&self, request: &HttpRequest) -> TransportResult<RawResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.args.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.args.body {
            builder = builder.body(body.clone());
        }
        if let Some(timeout) = request.timeout() {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().map_err(map_error)?;

        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().map_err(map_error)?.to_vec();

        Ok(RawResponse {
            code: status.as_u16(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

fn map_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if err.is_builder() {
        TransportError::Unsupported(err.to_string())
    } else {
        TransportError::Protocol(err.to_string())
    }
}
