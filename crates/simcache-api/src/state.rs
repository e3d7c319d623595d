//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor. Holds the storage engine, the immutable
//! configuration, and the Prometheus handle when metrics are enabled.

use std::path::PathBuf;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use simcache_store::{CacheStore, StoreError};

/// Default request body cap for uploads: 1 GiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

/// Application configuration.
///
/// Custom `Debug` redacts the auth token.
#[derive(Clone)]
pub struct AppConfig {
    /// Directory holding every cache entry.
    pub cache_root: PathBuf,
    /// Shared bearer token. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Maximum accepted request body size.
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Configuration with defaults for everything but the cache root.
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            auth_token: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("cache_root", &self.cache_root)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: CacheStore,
    pub config: Arc<AppConfig>,
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// Open the cache store at the configured root.
    pub fn new(config: AppConfig) -> Result<Self, StoreError> {
        let store = CacheStore::open(&config.cache_root)?;
        Ok(Self {
            store,
            config: Arc::new(config),
            metrics: None,
        })
    }

    /// Attach the Prometheus handle rendered at `/metrics`.
    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}
