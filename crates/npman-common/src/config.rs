//! Client configuration.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Connection settings for a Nginx Proxy Manager instance.
///
/// # Security
///
/// The account secret is held as a [`SecretString`] and never serialized.
///
/// # Examples
///
/// ```
/// use npman_common::Config;
///
/// let config = Config::new("http://localhost:81", "admin@example.com")
///     .with_secret("changeme")
///     .with_timeout_seconds(30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the instance, e.g. `http://localhost:81`. A trailing
    /// slash is tolerated.
    pub base_url: String,
    /// Account identity (the admin email); also the fallback notification
    /// address for certificate issuance.
    pub identity: String,
    /// Account secret. Required to connect; never serialized.
    #[serde(skip_serializing, default)]
    pub secret: Option<SecretString>,
    /// Transport-level request timeout. No timeout is enforced when unset;
    /// callers needing bounded latency must set one.
    pub timeout_seconds: Option<u64>,
}

impl Config {
    /// Create a configuration for the given instance and account.
    pub fn new(base_url: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            identity: identity.into(),
            secret: None,
            timeout_seconds: None,
        }
    }

    /// Set the account secret.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Set the transport-level request timeout.
    #[must_use]
    pub const fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}
