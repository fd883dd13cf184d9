//! Response post-processing policies.

use crate::backend::RawResponse;
use crate::error::{TransportError, TransportResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

/// Caller-selected processing policies for one request.
///
/// Policies compose freely. When both `expect_async_callback` and
/// `return_verbose` are set, the callback parameter is still appended to
/// the URL but the verbose envelope (carrying the raw, still-wrapped body)
/// is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policies {
    /// Do not flag failures as errors on the call.
    pub ignore_errors: bool,
    /// The endpoint wraps its JSON in `callback(...);`.
    pub expect_async_callback: bool,
    /// Return the full response envelope instead of the body.
    pub return_verbose: bool,
}

impl Policies {
    /// No policies.
    pub fn none() -> Self {
        Self::default()
    }

    /// Suppresses error flagging.
    pub fn ignoring_errors(mut self) -> Self {
        self.ignore_errors = true;
        self
    }

    /// Expects a callback-wrapped (JSONP) body.
    pub fn expecting_callback(mut self) -> Self {
        self.expect_async_callback = true;
        self
    }

    /// Returns the verbose envelope.
    pub fn verbose(mut self) -> Self {
        self.return_verbose = true;
        self
    }
}

/// Metadata of the last response a call received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    /// Raw body bytes.
    pub data: Vec<u8>,
    /// Status code, if a response was received.
    pub code: Option<u16>,
    /// Reason phrase, if a response was received.
    pub message: Option<String>,
    /// Response headers, names lower-cased.
    pub headers: BTreeMap<String, String>,
}

impl ResponseMeta {
    pub(crate) fn from_raw(raw: &RawResponse) -> Self {
        Self {
            data: raw.body.clone(),
            code: Some(raw.code),
            message: Some(raw.message.clone()),
            headers: raw.headers.clone(),
        }
    }

    /// Returns true if a response with a 2xx status was received.
    pub fn is_success(&self) -> bool {
        matches!(self.code, Some(200..=299))
    }
}

/// The result of a request after policies were applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    /// The response body, untouched.
    Body(Vec<u8>),
    /// The decoded payload of a callback-wrapped body.
    Callback(Value),
    /// The full envelope.
    Verbose(ResponseMeta),
}

impl Processed {
    /// Decodes the payload as JSON into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] if the payload is not valid JSON
    /// for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> TransportResult<T> {
        let decoded = match self {
            Processed::Body(body) => serde_json::from_slice(body),
            Processed::Callback(value) => serde_json::from_value(value.clone()),
            Processed::Verbose(meta) => serde_json::from_slice(&meta.data),
        };
        decoded.map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// Returns the raw body bytes, where there are any.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Processed::Body(body) => Some(body),
            Processed::Verbose(meta) => Some(&meta.data),
            Processed::Callback(_) => None,
        }
    }
}

/// Appends the callback parameter to the query of `url`, ahead of any
/// fragment.
pub(crate) fn with_callback_param(url: &str, callback: &str) -> TransportResult<String> {
    let mut parsed =
        Url::parse(url).map_err(|e| TransportError::Unsupported(format!("{url}: {e}")))?;
    parsed.query_pairs_mut().append_pair("callback", callback);
    Ok(parsed.into())
}

/// Strips `callback(` and the trailing `);` and parses what remains.
pub(crate) fn unwrap_callback(body: &[u8], callback: &str) -> TransportResult<Value> {
    let text = std::str::from_utf8(body).map_err(|e| TransportError::Decode(e.to_string()))?;
    let text = text.trim();

    let inner = text
        .strip_prefix(callback)
        .and_then(|rest| rest.trim_start().strip_prefix('('))
        .ok_or_else(|| TransportError::Decode(format!("body is not wrapped in {callback}(...)")))?;
    let inner = inner.trim_end();
    let inner = inner.strip_suffix(';').unwrap_or(inner).trim_end();
    let inner = inner
        .strip_suffix(')')
        .ok_or_else(|| TransportError::Decode("unterminated callback body".into()))?;

    serde_json::from_str(inner).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Applies the response-side policies to a raw response.
///
/// Returns the processed value and, when unwrapping failed, the decode
/// error so the caller can flag it.
pub(crate) fn process(
    raw: &RawResponse,
    policies: Policies,
    callback: Option<&str>,
) -> (Processed, Option<TransportError>) {
    if policies.return_verbose {
        return (Processed::Verbose(ResponseMeta::from_raw(raw)), None);
    }

    match (policies.expect_async_callback, callback) {
        (true, Some(name)) => match unwrap_callback(&raw.body, name) {
            Ok(value) => (Processed::Callback(value), None),
            Err(e) => (Processed::Callback(Value::Null), Some(e)),
        },
        _ => (Processed::Body(raw.body.clone()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn callback_param_uses_right_separator() {
        assert_eq!(
            with_callback_param("https://api.example.com/v1", "cb1").unwrap(),
            "https://api.example.com/v1?callback=cb1"
        );
        assert_eq!(
            with_callback_param("https://api.example.com/v1?limit=1", "cb1").unwrap(),
            "https://api.example.com/v1?limit=1&callback=cb1"
        );
    }

    #[test]
    fn callback_param_goes_before_fragment() {
        assert_eq!(
            with_callback_param("http://x.example/status#v1", "cb1").unwrap(),
            "http://x.example/status?callback=cb1#v1"
        );
    }

    #[test]
    fn callback_param_on_unparsable_url_fails() {
        assert!(matches!(
            with_callback_param("/relative/path", "cb1"),
            Err(TransportError::Unsupported(_))
        ));
    }

    #[test]
    fn unwrap_callback_body() {
        let body = b"jsoncallback17_0({\"total\": 3, \"items\": []});\n";
        let value = unwrap_callback(body, "jsoncallback17_0").unwrap();
        assert_eq!(value, json!({"total": 3, "items": []}));
    }

    #[test]
    fn unwrap_callback_without_semicolon() {
        let value = unwrap_callback(b"cb([1,2])", "cb").unwrap();
        assert_eq!(value, json!([1, 2]));
    }

    #[test]
    fn unwrap_callback_wrong_name_fails() {
        let result = unwrap_callback(b"other({})", "cb");
        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[test]
    fn verbose_wins_over_callback() {
        let raw = RawResponse::new(404, "cb({});").with_message("Not Found");
        let policies = Policies::none().expecting_callback().verbose();

        let (processed, err) = process(&raw, policies, Some("cb"));
        assert!(err.is_none());
        match processed {
            Processed::Verbose(meta) => {
                assert_eq!(meta.code, Some(404));
                assert_eq!(meta.message.as_deref(), Some("Not Found"));
                assert_eq!(meta.data, b"cb({});");
                assert!(!meta.is_success());
            }
            other => panic!("expected verbose envelope, got {other:?}"),
        }
    }

    #[test]
    fn malformed_callback_reports_decode_error() {
        let raw = RawResponse::new(200, "not wrapped");
        let (processed, err) = process(&raw, Policies::none().expecting_callback(), Some("cb"));

        assert_eq!(processed, Processed::Callback(Value::Null));
        assert!(matches!(err, Some(TransportError::Decode(_))));
    }

    #[test]
    fn processed_json_from_body() {
        #[derive(serde::Deserialize)]
        struct Created {
            id: u64,
        }

        let created: Created = Processed::Body(br#"{"id": 42}"#.to_vec()).json().unwrap();
        assert_eq!(created.id, 42);
    }

    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn wrapped_payload_unwraps(
                ids in prop::collection::vec(any::<u32>(), 0..20),
                name in "[a-z ]{0,16}",
                trailer in prop::sample::select(vec!["", ";", ");\n", "\n"]),
            ) {
                let payload = serde_json::json!({"ids": ids, "name": name});
                let closing = if trailer.starts_with(')') { "" } else { ")" };
                let body = format!("cb_1({payload}{closing}{trailer}");

                prop_assert_eq!(unwrap_callback(body.as_bytes(), "cb_1").unwrap(), payload);
            }
        }
    }
}
