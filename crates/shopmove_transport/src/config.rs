//! Configuration for the transport layer.

use std::time::Duration;

/// How long a detected back-end preference stays valid.
pub const DEFAULT_CHECK_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Configuration for [`crate::HttpTransport`] and its back-ends.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// How long a recorded preference is trusted before re-probing.
    pub check_ttl: Duration,
    /// Timeout applied when a request does not carry its own.
    pub default_timeout: Duration,
    /// User agent sent by every back-end.
    pub user_agent: String,
    /// Maximum redirects followed by the managed client.
    pub max_redirects: usize,
}

impl TransportConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            check_ttl: DEFAULT_CHECK_TTL,
            default_timeout: Duration::from_secs(30),
            user_agent: format!("shopmove/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 10,
        }
    }

    /// Sets the preference TTL.
    pub fn with_check_ttl(mut self, ttl: Duration) -> Self {
        self.check_ttl = ttl;
        self
    }

    /// Sets the default request timeout.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the redirect limit.
    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}
