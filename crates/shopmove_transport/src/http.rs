//! Back-end negotiation and the per-request call object.

use crate::backend::{HttpBackend, HttpRequest, Method, RequestArgs};
use crate::clock::{Clock, SystemClock};
use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::managed::ManagedClientBackend;
use crate::negotiation::PreferenceCache;
use crate::policy::{self, Policies, Processed, ResponseMeta};
use crate::stream::RawStreamBackend;
use shopmove_storage::KvStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Sends requests through the best available [`HttpBackend`].
///
/// Back-ends are probed in registration order; the first registered one is
/// the default.
pub struct HttpTransport<S: KvStore> {
    config: TransportConfig,
    backends: Vec<Arc<dyn HttpBackend>>,
    cache: PreferenceCache<S>,
    clock: Arc<dyn Clock>,
    callback_seq: AtomicU64,
}

impl<S: KvStore> HttpTransport<S> {
    /// Creates a transport with no back-ends.
    pub fn new(config: TransportConfig, store: S) -> Self {
        Self {
            config,
            backends: Vec::new(),
            cache: PreferenceCache::new(store),
            clock: Arc::new(SystemClock),
            callback_seq: AtomicU64::new(0),
        }
    }

    /// Creates a transport with the managed client first and the raw stream
    /// back-end as fallback.
    ///
    /// # Errors
    ///
    /// Returns an error if the managed client cannot be built.
    pub fn with_default_backends(config: TransportConfig, store: S) -> TransportResult<Self> {
        let managed = ManagedClientBackend::new(&config)?;
        let stream = RawStreamBackend::new(&config);
        Ok(Self::new(config, store)
            .with_backend(managed)
            .with_backend(stream))
    }

    /// Registers a back-end after the existing ones.
    pub fn with_backend(mut self, backend: impl HttpBackend + 'static) -> Self {
        self.backends.push(Arc::new(backend));
        self
    }

    /// Replaces the clock used for preference expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Returns the ids of the registered back-ends in probe order.
    pub fn backend_ids(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.id()).collect()
    }

    /// Returns the preference cache.
    pub fn preferences(&self) -> &PreferenceCache<S> {
        &self.cache
    }

    /// Prepares a GET call.
    pub fn create_get(
        &self,
        name: impl Into<String>,
        url: impl Into<String>,
        policies: Policies,
    ) -> HttpCall<'_, S> {
        self.create(Method::Get, name, url, policies)
    }

    /// Prepares a POST call.
    pub fn create_post(
        &self,
        name: impl Into<String>,
        url: impl Into<String>,
        policies: Policies,
    ) -> HttpCall<'_, S> {
        self.create(Method::Post, name, url, policies)
    }

    /// Prepares a call with any method.
    ///
    /// `name` identifies the logical request for negotiation; calls with the
    /// same name and method share one cached preference.
    pub fn create(
        &self,
        method: Method,
        name: impl Into<String>,
        url: impl Into<String>,
        policies: Policies,
    ) -> HttpCall<'_, S> {
        HttpCall {
            transport: self,
            method,
            name: name.into(),
            url: url.into(),
            policies,
            callback: None,
            meta: ResponseMeta::default(),
            is_error: false,
            error_message: None,
            backend_used: None,
        }
    }

    fn next_callback_name(&self) -> String {
        let seq = self.callback_seq.fetch_add(1, Ordering::SeqCst);
        format!("jsoncallback{}_{seq}", self.clock.now_secs())
    }

    fn backend(&self, id: &str) -> Option<&Arc<dyn HttpBackend>> {
        self.backends.iter().find(|b| b.id() == id)
    }

    /// Picks the back-ends to try for `(method, name)`.
    fn candidates(&self, method: Method, name: &str) -> (Vec<Arc<dyn HttpBackend>>, Selection) {
        let preference = match self.cache.load(method, name) {
            Ok(preference) => preference,
            Err(e) => {
                warn!(request = name, error = %e, "unreadable transport preference, probing");
                None
            }
        };

        if let Some(pref) = preference {
            if pref.use_default {
                return (self.backends.iter().take(1).cloned().collect(), Selection::Pinned);
            }
            if pref.is_fresh(self.clock.now_secs(), self.config.check_ttl) {
                if let Some(backend) = pref.preferred.as_deref().and_then(|id| self.backend(id)) {
                    debug!(request = name, backend = backend.id(), "using cached transport");
                    return (vec![Arc::clone(backend)], Selection::Cached);
                }
            }
        }

        (self.backends.clone(), Selection::Probe)
    }
}

/// Where the candidate list of a call came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    /// Entry pinned to the default back-end.
    Pinned,
    /// Fresh detected preference.
    Cached,
    /// Every back-end, in order.
    Probe,
}

/// One outbound request and what came back.
pub struct HttpCall<'t, S: KvStore> {
    transport: &'t HttpTransport<S>,
    method: Method,
    name: String,
    url: String,
    policies: Policies,
    callback: Option<String>,
    meta: ResponseMeta,
    is_error: bool,
    error_message: Option<String>,
    backend_used: Option<String>,
}

impl<S: KvStore> HttpCall<'_, S> {
    /// Sends the request and applies the call's policies.
    ///
    /// Returns `None` only when no back-end produced a response. HTTP error
    /// statuses still yield `Some`; inspect them with
    /// [`HttpCall::response_meta`].
    pub fn do_request(&mut self, args: RequestArgs) -> Option<Processed> {
        self.reset();
        let request = match self.prepare(args) {
            Ok(request) => request,
            Err(e) => {
                self.flag_error(&e);
                return None;
            }
        };
        let transport = self.transport;
        let (candidates, selection) = transport.candidates(self.method, &self.name);

        if candidates.is_empty() {
            self.flag_error(&TransportError::Unsupported("no back-ends registered".into()));
            return None;
        }

        let mut last_error = None;
        for backend in candidates {
            match backend.send(&request) {
                Ok(raw) => {
                    if selection == Selection::Probe {
                        self.remember(backend.id());
                    }
                    self.backend_used = Some(backend.id().to_string());
                    self.meta = ResponseMeta::from_raw(&raw);

                    let (processed, decode_error) =
                        policy::process(&raw, self.policies, self.callback.as_deref());
                    if let Some(e) = decode_error {
                        self.flag_error(&e);
                    }
                    return Some(processed);
                }
                Err(e) => {
                    debug!(
                        request = %self.name,
                        backend = backend.id(),
                        error = %e,
                        "transport back-end failed"
                    );
                    if selection == Selection::Cached {
                        if let Err(err) = transport.cache.invalidate(self.method, &self.name) {
                            warn!(request = %self.name, error = %err, "failed to drop transport preference");
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        if let Some(e) = last_error {
            self.flag_error(&e);
        }
        None
    }

    /// Returns the metadata of the last response.
    pub fn response_meta(&self) -> &ResponseMeta {
        &self.meta
    }

    /// Returns true if the last request failed and errors are not ignored.
    pub fn is_error(&self) -> bool {
        self.is_error
    }

    /// Returns the message of the last failure, if any.
    ///
    /// Kept even under `ignore_errors`, which only suppresses flagging.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the id of the back-end that produced the last response.
    pub fn backend_id(&self) -> Option<&str> {
        self.backend_used.as_deref()
    }

    /// Returns the callback name appended to the URL, if any.
    pub fn callback_name(&self) -> Option<&str> {
        self.callback.as_deref()
    }

    fn reset(&mut self) {
        self.meta = ResponseMeta::default();
        self.is_error = false;
        self.error_message = None;
        self.backend_used = None;
    }

    fn prepare(&mut self, mut args: RequestArgs) -> TransportResult<HttpRequest> {
        let url = if self.policies.expect_async_callback {
            let callback = self.transport.next_callback_name();
            let url = policy::with_callback_param(&self.url, &callback)?;
            self.callback = Some(callback);
            url
        } else {
            self.url.clone()
        };

        if args.timeout.is_none() {
            args.timeout = Some(self.transport.config.default_timeout);
        }

        Ok(HttpRequest {
            method: self.method,
            url,
            args,
        })
    }

    fn remember(&self, backend_id: &str) {
        let now = self.transport.clock.now_secs();
        match self
            .transport
            .cache
            .record(self.method, &self.name, backend_id, now)
        {
            Ok(()) => debug!(request = %self.name, backend = backend_id, "recorded preferred transport"),
            Err(e) => warn!(request = %self.name, error = %e, "failed to record transport preference"),
        }
    }

    fn flag_error(&mut self, error: &TransportError) {
        self.error_message = Some(error.to_string());
        if self.policies.ignore_errors {
            return;
        }
        self.is_error = true;
        warn!(request = %self.name, method = %self.method, error = %error, "request failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RawResponse;
    use crate::clock::ManualClock;
    use crate::negotiation::TransportPreference;
    use parking_lot::Mutex;
    use shopmove_storage::InMemoryStore;
    use std::time::Duration;

    struct TestBackend {
        id: &'static str,
        response: Option<RawResponse>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl TestBackend {
        fn working(id: &'static str, body: &str) -> Self {
            Self {
                id,
                response: Some(RawResponse::new(200, body).with_message("OK")),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn broken(id: &'static str) -> Self {
            Self {
                id,
                response: None,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpBackend for Arc<TestBackend> {
        fn id(&self) -> &str {
            self.id
        }

        fn send(&self, request: &HttpRequest) -> TransportResult<RawResponse> {
            self.sent.lock().push(request.clone());
            self.response
                .clone()
                .ok_or_else(|| TransportError::Connect("refused".into()))
        }
    }

    fn transport(
        backends: &[&Arc<TestBackend>],
        clock: Arc<ManualClock>,
    ) -> HttpTransport<Arc<InMemoryStore>> {
        let mut transport = HttpTransport::new(TransportConfig::default(), Arc::new(InMemoryStore::new()))
            .with_clock(clock);
        for backend in backends {
            transport = transport.with_backend(Arc::clone(*backend));
        }
        transport
    }

    #[test]
    fn probe_falls_back_and_records_preference() {
        let clock = Arc::new(ManualClock::new(1_000));
        let first = Arc::new(TestBackend::broken("managed"));
        let second = Arc::new(TestBackend::working("stream", "hello"));
        let transport = transport(&[&first, &second], clock);

        let mut call = transport.create_get("profile", "http://example.com/profile", Policies::none());
        let result = call.do_request(RequestArgs::new());

        assert_eq!(result, Some(Processed::Body(b"hello".to_vec())));
        assert!(!call.is_error());
        assert_eq!(call.backend_id(), Some("stream"));
        assert_eq!(first.sent.lock().len(), 1);
        assert_eq!(second.sent.lock().len(), 1);
        assert_eq!(
            transport.preferences().load(Method::Get, "profile").unwrap(),
            Some(TransportPreference::detected("stream", 1_000))
        );
    }

    #[test]
    fn fresh_preference_skips_probing() {
        let clock = Arc::new(ManualClock::new(1_000));
        let first = Arc::new(TestBackend::working("managed", "a"));
        let second = Arc::new(TestBackend::working("stream", "b"));
        let transport = transport(&[&first, &second], Arc::clone(&clock));
        transport
            .preferences()
            .record(Method::Get, "profile", "stream", 1_000)
            .unwrap();

        clock.advance(Duration::from_secs(3_600));
        let mut call = transport.create_get("profile", "http://example.com/", Policies::none());
        assert_eq!(call.do_request(RequestArgs::new()), Some(Processed::Body(b"b".to_vec())));
        assert!(first.sent.lock().is_empty());
    }

    #[test]
    fn stale_preference_triggers_probe() {
        let clock = Arc::new(ManualClock::new(1_000));
        let first = Arc::new(TestBackend::working("managed", "a"));
        let second = Arc::new(TestBackend::working("stream", "b"));
        let transport = transport(&[&first, &second], Arc::clone(&clock));
        transport
            .preferences()
            .record(Method::Get, "profile", "stream", 1_000)
            .unwrap();

        clock.advance(Duration::from_secs(86_400));
        let mut call = transport.create_get("profile", "http://example.com/", Policies::none());
        assert_eq!(call.do_request(RequestArgs::new()), Some(Processed::Body(b"a".to_vec())));
        assert_eq!(
            transport.preferences().load(Method::Get, "profile").unwrap(),
            Some(TransportPreference::detected("managed", 1_000 + 86_400))
        );
    }

    #[test]
    fn all_backends_failing_yields_none() {
        let clock = Arc::new(ManualClock::new(0));
        let first = Arc::new(TestBackend::broken("managed"));
        let second = Arc::new(TestBackend::broken("stream"));
        let transport = transport(&[&first, &second], clock);

        let mut call = transport.create_post("create", "http://example.com/", Policies::none());
        assert_eq!(call.do_request(RequestArgs::new()), None);
        assert!(call.is_error());
        assert!(call.error_message().unwrap().contains("refused"));
        assert_eq!(transport.preferences().load(Method::Post, "create").unwrap(), None);
    }

    #[test]
    fn ignore_errors_suppresses_flag() {
        let clock = Arc::new(ManualClock::new(0));
        let only = Arc::new(TestBackend::broken("managed"));
        let transport = transport(&[&only], clock);

        let mut call = transport.create_get("ping", "http://example.com/", Policies::none().ignoring_errors());
        assert_eq!(call.do_request(RequestArgs::new()), None);
        assert!(!call.is_error());
        assert!(call.error_message().is_some());
    }

    #[test]
    fn broken_cached_backend_is_forgotten() {
        let clock = Arc::new(ManualClock::new(0));
        let first = Arc::new(TestBackend::working("managed", "a"));
        let second = Arc::new(TestBackend::broken("stream"));
        let transport = transport(&[&first, &second], clock);
        transport
            .preferences()
            .record(Method::Get, "profile", "stream", 0)
            .unwrap();

        let mut call = transport.create_get("profile", "http://example.com/", Policies::none());
        assert_eq!(call.do_request(RequestArgs::new()), None);
        assert_eq!(transport.preferences().load(Method::Get, "profile").unwrap(), None);

        assert_eq!(call.do_request(RequestArgs::new()), Some(Processed::Body(b"a".to_vec())));
    }

    #[test]
    fn callback_policy_rewrites_url_and_unwraps() {
        let clock = Arc::new(ManualClock::new(77));
        let backend = Arc::new(TestBackend::working("managed", "jsoncallback77_0({\"ok\":true});"));
        let transport = transport(&[&backend], clock);

        let mut call = transport.create_get(
            "status",
            "http://example.com/status?lang=en",
            Policies::none().expecting_callback(),
        );
        let result = call.do_request(RequestArgs::new());

        assert_eq!(result, Some(Processed::Callback(serde_json::json!({"ok": true}))));
        assert_eq!(call.callback_name(), Some("jsoncallback77_0"));
        assert_eq!(
            backend.sent.lock()[0].url,
            "http://example.com/status?lang=en&callback=jsoncallback77_0"
        );
    }

    #[test]
    fn callback_param_reaches_server_when_url_has_fragment() {
        let clock = Arc::new(ManualClock::new(77));
        let backend = Arc::new(TestBackend::working("managed", "jsoncallback77_0([1]);"));
        let transport = transport(&[&backend], clock);

        let mut call = transport.create_get(
            "status",
            "http://example.com/status#v1",
            Policies::none().expecting_callback(),
        );

        assert_eq!(
            call.do_request(RequestArgs::new()),
            Some(Processed::Callback(serde_json::json!([1])))
        );
        assert_eq!(
            backend.sent.lock()[0].url,
            "http://example.com/status?callback=jsoncallback77_0#v1"
        );
    }

    #[test]
    fn unparsable_callback_url_is_flagged_without_sending() {
        let clock = Arc::new(ManualClock::new(0));
        let backend = Arc::new(TestBackend::working("managed", "{}"));
        let transport = transport(&[&backend], clock);

        let mut call =
            transport.create_get("status", "status.json", Policies::none().expecting_callback());

        assert_eq!(call.do_request(RequestArgs::new()), None);
        assert!(call.is_error());
        assert!(backend.sent.lock().is_empty());
    }

    #[test]
    fn error_status_is_not_a_transport_failure() {
        let clock = Arc::new(ManualClock::new(0));
        let backend = Arc::new(TestBackend {
            id: "managed",
            response: Some(RawResponse::new(402, r#"{"errorMessage":"limit"}"#).with_message("Payment Required")),
            sent: Mutex::new(Vec::new()),
        });
        let transport = transport(&[&backend], clock);

        let mut call = transport.create_post("create", "http://example.com/", Policies::none());
        assert!(call.do_request(RequestArgs::new()).is_some());
        assert!(!call.is_error());
        assert_eq!(call.response_meta().code, Some(402));
    }

    #[test]
    fn default_timeout_is_applied() {
        let clock = Arc::new(ManualClock::new(0));
        let backend = Arc::new(TestBackend::working("managed", ""));
        let transport = transport(&[&backend], clock);

        let mut call = transport.create_get("t", "http://example.com/", Policies::none());
        call.do_request(RequestArgs::new());
        assert_eq!(backend.sent.lock()[0].timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn pinned_default_uses_first_backend_only() {
        let clock = Arc::new(ManualClock::new(0));
        let first = Arc::new(TestBackend::broken("managed"));
        let second = Arc::new(TestBackend::working("stream", "b"));
        let transport = transport(&[&first, &second], clock);
        transport.preferences().pin_default(Method::Get, "pinned").unwrap();

        let mut call = transport.create_get("pinned", "http://example.com/", Policies::none());
        assert_eq!(call.do_request(RequestArgs::new()), None);
        assert!(second.sent.lock().is_empty());
        assert_eq!(
            transport.preferences().load(Method::Get, "pinned").unwrap(),
            Some(TransportPreference::pinned_default())
        );
    }
}
