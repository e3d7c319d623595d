//! # Server Configuration
//!
//! Command-line flags with environment-variable fallbacks, converted into
//! an [`AppConfig`].

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use crate::state::AppConfig;

/// Directory name under the user cache directory.
const DEFAULT_CACHE_DIR: &str = "simtool_cache";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// simcache HTTP server.
#[derive(Parser)]
#[command(name = "simcache-api", version, about = "Content-addressed simulation result cache server")]
pub struct ServerArgs {
    /// Address to bind.
    #[arg(long, env = "SIMCACHE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind.
    #[arg(long, env = "SIMCACHE_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Root directory for cache storage (default: ~/.cache/simtool_cache).
    #[arg(long, env = "SIMCACHE_CACHE_ROOT")]
    pub cache_root: Option<PathBuf>,

    /// Bearer token required on API routes. Unset disables authentication.
    #[arg(long, env = "SIMCACHE_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Maximum upload request size in MiB.
    #[arg(long, env = "SIMCACHE_MAX_UPLOAD_MB", default_value_t = 1024)]
    pub max_upload_mb: u64,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Do not install the Prometheus recorder or serve `/metrics`.
    #[arg(long)]
    pub no_metrics: bool,
}

/// Invalid server configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no --cache-root given and the user cache directory is unknown")]
    NoCacheRoot,

    #[error("--max-upload-mb {0} does not fit in memory addressing on this platform")]
    UploadLimitTooLarge(u64),
}

impl ServerArgs {
    /// Resolve flags into the application configuration.
    pub fn app_config(&self) -> Result<AppConfig, ConfigError> {
        let cache_root = match &self.cache_root {
            Some(root) => root.clone(),
            None => default_cache_root().ok_or(ConfigError::NoCacheRoot)?,
        };
        let max_upload_bytes = self
            .max_upload_mb
            .checked_mul(1024 * 1024)
            .and_then(|b| usize::try_from(b).ok())
            .ok_or(ConfigError::UploadLimitTooLarge(self.max_upload_mb))?;
        let auth_token = self.auth_token.clone().filter(|t| !t.is_empty());
        Ok(AppConfig {
            cache_root,
            auth_token,
            max_upload_bytes,
        })
    }
}

/// `~/.cache/simtool_cache` on Linux, the platform cache directory elsewhere.
pub fn default_cache_root() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join(DEFAULT_CACHE_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DEFAULT_MAX_UPLOAD_BYTES;

    #[test]
    fn defaults() {
        let args = ServerArgs::try_parse_from(["simcache-api", "--cache-root", "/srv/cache"]).unwrap();
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 5000);
        assert_eq!(args.log_format, LogFormat::Text);
        assert!(!args.no_metrics);

        let config = args.app_config().unwrap();
        assert_eq!(config.cache_root, PathBuf::from("/srv/cache"));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn explicit_flags() {
        let args = ServerArgs::try_parse_from([
            "simcache-api",
            "--cache-root",
            "/c",
            "--port",
            "8081",
            "--auth-token",
            "s3cret",
            "--max-upload-mb",
            "2",
            "--log-format",
            "json",
            "--no-metrics",
        ])
        .unwrap();
        assert_eq!(args.port, 8081);
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(args.no_metrics);
        let config = args.app_config().unwrap();
        assert_eq!(config.auth_token.as_deref(), Some("s3cret"));
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn empty_token_disables_auth() {
        let args =
            ServerArgs::try_parse_from(["simcache-api", "--cache-root", "/c", "--auth-token", ""]).unwrap();
        assert!(args.app_config().unwrap().auth_token.is_none());
    }

    #[test]
    fn default_root_ends_with_cache_dir_name() {
        if let Some(root) = default_cache_root() {
            assert!(root.ends_with(DEFAULT_CACHE_DIR));
        }
    }
}
