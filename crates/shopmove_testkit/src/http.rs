//! Scripted HTTP back-ends.

use parking_lot::Mutex;
use shopmove_transport::{
    HttpBackend, HttpRequest, Method, RawResponse, TransportError, TransportResult,
};
use std::collections::VecDeque;
use std::sync::Arc;

/// A request a [`ScriptedBackend`] received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    /// HTTP method.
    pub method: Method,
    /// Full URL, query included.
    pub url: String,
    /// Request headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Option<Vec<u8>>,
}

impl SeenRequest {
    /// Returns the body as UTF-8 text.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(self.body.as_deref().unwrap_or_default()).into_owned()
    }

    /// Returns the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<TransportResult<RawResponse>>,
    fallback: Option<RawResponse>,
    seen: Vec<SeenRequest>,
}

/// A back-end that answers from a queue of scripted replies.
///
/// Clones share the script, so a test can keep one handle and give the
/// other to a transport. When the queue is empty the fallback response is
/// returned, or a connect error if there is none.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    id: String,
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    /// Creates a back-end with id `id` and an empty script.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    /// Queues a response.
    pub fn reply(&self, response: RawResponse) -> &Self {
        self.script.lock().replies.push_back(Ok(response));
        self
    }

    /// Queues a JSON response with `code`.
    pub fn reply_json(&self, code: u16, body: serde_json::Value) -> &Self {
        self.reply(
            RawResponse::new(code, body.to_string()).with_header("Content-Type", "application/json"),
        )
    }

    /// Queues a back-end failure.
    pub fn fail(&self, error: TransportError) -> &Self {
        self.script.lock().replies.push_back(Err(error));
        self
    }

    /// Answers with `response` whenever the queue is empty.
    pub fn always(&self, response: RawResponse) -> &Self {
        self.script.lock().fallback = Some(response);
        self
    }

    /// Returns every request received, oldest first.
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.script.lock().seen.clone()
    }

    /// Returns the number of requests received.
    pub fn request_count(&self) -> usize {
        self.script.lock().seen.len()
    }
}

impl HttpBackend for ScriptedBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, request: &HttpRequest) -> TransportResult<RawResponse> {
        let mut script = self.script.lock();
        script.seen.push(SeenRequest {
            method: request.method,
            url: request.url.clone(),
            headers: request.args.headers.clone(),
            body: request.args.body.clone(),
        });
        match script.replies.pop_front() {
            Some(reply) => reply,
            None => script
                .fallback
                .clone()
                .ok_or_else(|| TransportError::Connect(format!("{}: script exhausted", self.id))),
        }
    }
}

/// A back-end that never delivers, like a host without outbound sockets.
#[derive(Debug, Clone)]
pub struct UnreachableBackend {
    id: String,
    attempts: Arc<Mutex<usize>>,
}

impl UnreachableBackend {
    /// Creates the back-end.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attempts: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns how many sends were attempted.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

impl HttpBackend for UnreachableBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&self, _request: &HttpRequest) -> TransportResult<RawResponse> {
        *self.attempts.lock() += 1;
        Err(TransportError::Connect(format!("{}: connection refused", self.id)))
    }
}
