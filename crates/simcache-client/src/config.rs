//! Cache client configuration.
//!
//! Points the client at a cache server. Defaults target a server on
//! localhost; override via environment variables or explicit construction.

use url::Url;

/// Server URL used when `SIM2L_CACHE_SERVER_URL` is unset.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Request timeout used when `SIM2L_CACHE_TIMEOUT_SECS` is unset or invalid.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for connecting to a cache server.
///
/// Custom `Debug` implementation redacts the `auth_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the cache server.
    pub server_url: Url,
    /// Bearer token, if the server requires one.
    pub auth_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_url", &self.server_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration for `server_url` with no token and the default timeout.
    pub fn new(server_url: Url) -> Self {
        Self {
            server_url,
            auth_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SIM2L_CACHE_SERVER_URL` (default: `http://localhost:5000`)
    /// - `SIM2L_CACHE_AUTH_TOKEN` (optional; empty means none)
    /// - `SIM2L_CACHE_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server_url: env_url("SIM2L_CACHE_SERVER_URL", DEFAULT_SERVER_URL)?,
            auth_token: std::env::var("SIM2L_CACHE_AUTH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            timeout_secs: std::env::var("SIM2L_CACHE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Replace the bearer token. An empty token clears it.
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.is_empty());
        self
    }

    /// Replace the request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Parse a server URL, reporting `source` on failure.
pub fn parse_url(source: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(source.to_string(), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    parse_url(var, &raw)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("auth token contains characters not allowed in a header")]
    InvalidToken,
}
