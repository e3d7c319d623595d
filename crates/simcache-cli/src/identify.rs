//! # Id Subcommand
//!
//! Derives a cache identifier from a tool name, revision, and an inputs
//! document. Derivation is local unless `--remote` is given, in which case
//! the server parses the document and derives the identifier.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use simcache_client::CacheClient;
use simcache_core::{parse_inputs_document, Identifier};

use crate::ConnectionArgs;

/// Arguments for `simcache id`.
#[derive(Args, Debug)]
pub struct IdArgs {
    /// Simulation tool name.
    #[arg(long, value_name = "NAME")]
    pub tool: String,

    /// Tool revision.
    #[arg(long, value_name = "REV")]
    pub revision: String,

    /// JSON or YAML inputs document. Omit for empty inputs.
    #[arg(value_name = "INPUTS")]
    pub inputs: Option<PathBuf>,

    /// Ask the cache server instead of deriving locally.
    #[arg(long)]
    pub remote: bool,
}

/// Execute `simcache id`.
pub async fn run_id(args: &IdArgs, conn: &ConnectionArgs) -> Result<u8> {
    let text = match &args.inputs {
        Some(path) => read_inputs(path)?,
        None => String::new(),
    };

    let identifier = if args.remote {
        conn.client()?
            .run(&args.tool, &args.revision, &text)
            .await
            .context("remote derivation failed")?
    } else {
        derive_local(&args.tool, &args.revision, &text)?
    };
    println!("{identifier}");
    Ok(0)
}

fn read_inputs(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Derive an identifier from an inputs document without a server.
pub fn derive_local(tool: &str, revision: &str, text: &str) -> Result<Identifier> {
    let inputs = parse_inputs_document(text)?;
    Ok(CacheClient::local_identifier(tool, revision, &inputs)?)
}
