//! # simcache-api: Binary Entry Point
//!
//! Parses configuration, initializes tracing and the Prometheus recorder,
//! sweeps abandoned staging directories, and serves the cache API until
//! SIGINT/SIGTERM.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use simcache_api::config::{LogFormat, ServerArgs};
use simcache_api::state::AppState;
use tracing_subscriber::EnvFilter;

/// Staging directories older than this are left over from a crashed store.
const STAGING_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Interval for Prometheus histogram upkeep.
const METRICS_UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    init_tracing(args.log_format);

    let config = args.app_config()?;
    tracing::info!(?config, "starting simcache-api");

    let metrics = if args.no_metrics {
        None
    } else {
        Some(install_metrics()?)
    };

    let state = AppState::new(config)
        .context("failed to open cache store")?
        .with_metrics(metrics);

    if let Err(e) = state.store.sweep_staging(STAGING_MAX_AGE) {
        tracing::warn!(error = %e, "staging sweep failed");
    }

    let cache_root = state.store.root().display().to_string();
    let app = simcache_api::app(state);

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", args.host, args.port))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        cache_root = %cache_root,
        "simcache API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("simcache API stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(METRICS_UPKEEP_INTERVAL);
        loop {
            ticker.tick().await;
            upkeep.run_upkeep();
        }
    });
    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
