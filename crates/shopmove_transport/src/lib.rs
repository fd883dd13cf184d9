//! # Shopmove Transport
//!
//! Sends one HTTP request through the best available back-end and
//! post-processes the response according to per-request policies.
//!
//! This crate provides:
//! - The [`HttpBackend`] abstraction with two real back-ends: a managed
//!   client ([`ManagedClientBackend`], reqwest) and a raw socket fallback
//!   ([`RawStreamBackend`])
//! - Back-end negotiation with a persisted, TTL-bound preference per
//!   logical request name
//! - Response policies: error suppression, callback (JSONP) unwrapping and
//!   verbose metadata passthrough
//!
//! ## Negotiation
//!
//! For every call the cached preference for `(method, name)` is consulted.
//! A fresh preference is used without probing. Otherwise the back-ends are
//! tried in registration order; the first one that delivers a response
//! (any status code) becomes the preference and its response is the
//! call's response. When every back-end fails the call yields `None`.
//!
//! Detection is advisory: a stale or broken preference costs at most one
//! failed call, after which the entry is dropped and the next call probes
//! again.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod clock;
mod config;
mod error;
mod http;
mod managed;
mod negotiation;
mod policy;
mod stream;

pub use backend::{HttpBackend, HttpRequest, Method, RawResponse, RequestArgs};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use http::{HttpCall, HttpTransport};
pub use managed::ManagedClientBackend;
pub use negotiation::{PreferenceCache, TransportPreference};
pub use policy::{Policies, Processed, ResponseMeta};
pub use stream::RawStreamBackend;
