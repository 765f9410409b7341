use std::time::Duration;

use crate::auth::Credentials;

/// Public endpoint of the core-networks API.
pub const DEFAULT_BASE_URL: &str = "https://beta.api.core-networks.de";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub credentials: Credentials,
    /// Per-request timeout handed to the HTTP client.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: Credentials::new(user, password),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at another API root (staging, or a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL without trailing slash, ready for path concatenation.
    pub fn base_url_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
