use std::time::Duration;

use serde::Deserialize;

use singleton_lock::LockError;

/// Configuration for the Redis lock backend.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis URL (e.g. `redis://127.0.0.1:6379/0`) or a Sentinel discovery
    /// address (e.g. `sentinel://h1:26379;sentinel://h2:26379`).
    pub url: String,

    /// Options that cannot be expressed in the URL.
    pub options: BackendOptions,

    /// Number of connections in the `deadpool-redis` pool.
    pub pool_size: usize,

    /// Timeout for creating and acquiring a pooled connection.
    pub connection_timeout: Duration,

    /// `COUNT` hint for each page of a prefix scan.
    pub scan_count: usize,
}

impl RedisConfig {
    /// Configuration for `url` with default pool settings and no options.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: BackendOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
            options: BackendOptions::default(),
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
            scan_count: 100,
        }
    }
}

/// Structured connection options, kept apart from the URL so that settings
/// for the Sentinel nodes never mix with settings for the master.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BackendOptions {
    /// Name of the monitored master set to resolve. Required in discovery
    /// mode, ignored otherwise.
    #[serde(default, alias = "masterName")]
    pub master_name: Option<String>,

    /// Credentials for the Sentinel nodes themselves.
    #[serde(default, alias = "sentinelCredentials", alias = "sentinel_kwargs")]
    pub sentinel_credentials: Option<SentinelCredentials>,
}

/// Authentication presented to each Sentinel node.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SentinelCredentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for SentinelCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SentinelCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl BackendOptions {
    /// Build options from a string-keyed map.
    ///
    /// Keys this backend does not know are ignored, since the same map is
    /// often shared with other components.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Configuration`] if a known key holds a value of
    /// the wrong type.
    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Result<Self, LockError> {
        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| LockError::Configuration(format!("invalid backend options: {e}")))
    }

    /// The master name, if set to something non-empty.
    pub fn master_name(&self) -> Option<&str> {
        self.master_name.as_deref().filter(|name| !name.is_empty())
    }
}
