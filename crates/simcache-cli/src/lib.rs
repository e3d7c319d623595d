//! # simcache-cli: Command-Line Client for the Simulation Result Cache
//!
//! Provides the `simcache` binary:
//!
//! ```bash
//! simcache id --tool material_simulator --revision r42 inputs.yaml
//! simcache exists material_simulator/r42/<digest>
//! simcache ls material_simulator/r42/<digest>
//! simcache push material_simulator/r42/<digest> --source run/ results.yml out
//! simcache fetch material_simulator/r42/<digest> --output restored/
//! ```
//!
//! Every subcommand except a local `id` talks to a cache server configured
//! by [`ConnectionArgs`].

pub mod identify;
pub mod remote;

use anyhow::{Context, Result};
use clap::Args;
use simcache_client::config::parse_url;
use simcache_client::{CacheClient, ClientConfig};
use simcache_core::Identifier;

/// Cache server connection flags. Unset flags fall back to the
/// `SIM2L_CACHE_*` environment variables read by [`ClientConfig::from_env`].
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Cache server URL.
    #[arg(long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Bearer token for the cache server.
    #[arg(long, global = true, value_name = "TOKEN")]
    pub auth_token: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
}

impl ConnectionArgs {
    /// Resolve flags over the environment into a client configuration.
    pub fn config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_env().context("invalid cache client environment")?;
        if let Some(server) = &self.server {
            config.server_url = parse_url("--server", server)?;
        }
        if self.auth_token.is_some() {
            config = config.with_auth_token(self.auth_token.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout_secs(secs);
        }
        Ok(config)
    }

    /// Build a client from [`config`](Self::config).
    pub fn client(&self) -> Result<CacheClient> {
        let config = self.config()?;
        tracing::debug!(?config, "connecting to cache server");
        Ok(CacheClient::new(config)?)
    }
}

/// Parse a `tool/revision/digest` argument.
pub fn parse_identifier(text: &str) -> Result<Identifier> {
    text.parse()
        .with_context(|| format!("invalid identifier {text:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let args = ConnectionArgs {
            server: Some("http://cache.example:8080".into()),
            auth_token: Some("tok".into()),
            timeout_secs: Some(7),
        };
        let config = args.config().unwrap();
        assert_eq!(config.server_url.as_str(), "http://cache.example:8080/");
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
        assert_eq!(config.timeout_secs, 7);
    }

    #[test]
    fn bad_server_url_is_an_error() {
        let args = ConnectionArgs {
            server: Some("not a url".into()),
            ..Default::default()
        };
        assert!(args.config().is_err());
    }

    #[test]
    fn identifier_argument_is_taken_verbatim() {
        let id = Identifier::derive("sim", "v1", &serde_json::json!({})).unwrap();
        assert_eq!(parse_identifier(&id.to_string()).unwrap(), id);
        assert!(parse_identifier(&format!(" {id}")).is_err());
        assert!(parse_identifier("sim/v1").is_err());
    }
}
