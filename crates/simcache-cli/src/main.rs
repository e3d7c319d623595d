//! # simcache CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use simcache_cli::identify::{run_id, IdArgs};
use simcache_cli::remote::{
    run_exists, run_fetch, run_ls, run_push, ExistsArgs, FetchArgs, LsArgs, PushArgs,
};
use simcache_cli::ConnectionArgs;

/// Client for the simulation result cache.
///
/// Derives content-addressed identifiers for simulation runs and moves
/// result directories into and out of a cache server.
#[derive(Parser, Debug)]
#[command(name = "simcache", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive the identifier for a tool, revision, and inputs document.
    Id(IdArgs),

    /// Check whether an entry is cached.
    Exists(ExistsArgs),

    /// List the files of a cached entry.
    Ls(LsArgs),

    /// Download a cached entry into a directory.
    Fetch(FetchArgs),

    /// Upload result files as a new entry.
    Push(PushArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match dispatch(&cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

async fn dispatch(cli: &Cli) -> anyhow::Result<u8> {
    let conn = &cli.connection;
    match &cli.command {
        Commands::Id(args) => run_id(args, conn).await,
        Commands::Exists(args) => run_exists(args, &conn.client()?).await,
        Commands::Ls(args) => run_ls(args, &conn.client()?).await,
        Commands::Fetch(args) => run_fetch(args, &conn.client()?).await,
        Commands::Push(args) => run_push(args, &conn.client()?).await,
    }
}
