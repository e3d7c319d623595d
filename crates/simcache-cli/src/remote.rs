//! # Remote Subcommands
//!
//! `exists`, `ls`, `fetch`, and `push` against a cache server. Each returns
//! the process exit code: 0 on success, 1 when the entry is absent.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use simcache_client::archive::{fetch_result, store_result};
use simcache_client::{CacheClient, ClientError, UploadOutcome};
use simcache_core::ErrorKind;

use crate::parse_identifier;

/// Arguments for `simcache exists`.
#[derive(Args, Debug)]
pub struct ExistsArgs {
    /// Cache identifier (`tool/revision/digest`).
    pub identifier: String,
}

/// Arguments for `simcache ls`.
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Cache identifier (`tool/revision/digest`).
    pub identifier: String,

    /// Print the listing as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `simcache fetch`.
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Cache identifier (`tool/revision/digest`).
    pub identifier: String,

    /// Directory to write the result files into.
    #[arg(long, short, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,
}

/// Arguments for `simcache push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Cache identifier (`tool/revision/digest`).
    pub identifier: String,

    /// Directory the result paths are relative to.
    #[arg(long, short, value_name = "DIR", default_value = ".")]
    pub source: PathBuf,

    /// Files or directories to upload.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,
}

/// Execute `simcache exists`.
pub async fn run_exists(args: &ExistsArgs, client: &CacheClient) -> Result<u8> {
    let identifier = parse_identifier(&args.identifier)?;
    if client.exists(&identifier).await? {
        println!("FOUND: {identifier}");
        Ok(0)
    } else {
        println!("NOT FOUND: {identifier}");
        Ok(1)
    }
}

/// Execute `simcache ls`.
pub async fn run_ls(args: &LsArgs, client: &CacheClient) -> Result<u8> {
    let identifier = parse_identifier(&args.identifier)?;
    let files = match client.list_files(&identifier).await {
        Ok(files) => files,
        Err(e) if is_not_found(&e) => {
            println!("NOT FOUND: {identifier}");
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        for file in &files {
            println!("{:>12}  {}  {}", file.size, file.name, file.handle);
        }
    }
    Ok(0)
}

/// Execute `simcache fetch`.
pub async fn run_fetch(args: &FetchArgs, client: &CacheClient) -> Result<u8> {
    let identifier = parse_identifier(&args.identifier)?;
    match fetch_result(client, &identifier, &args.output).await {
        Ok(paths) => {
            println!(
                "OK: fetched {} file(s) into {}",
                paths.len(),
                args.output.display()
            );
            Ok(0)
        }
        Err(e) if is_not_found(&e) => {
            println!("NOT FOUND: {identifier}");
            Ok(1)
        }
        Err(e) => Err(e).context("fetch failed"),
    }
}

/// Execute `simcache push`.
pub async fn run_push(args: &PushArgs, client: &CacheClient) -> Result<u8> {
    let identifier = parse_identifier(&args.identifier)?;
    let outcome = store_result(client, &identifier, &args.source, args.paths.as_slice())
        .await
        .context("push failed")?;
    match outcome {
        UploadOutcome::Stored { count, total_bytes } => {
            println!("OK: stored {count} file(s), {total_bytes} bytes under {identifier}");
        }
        UploadOutcome::AlreadyCached => {
            println!("OK: {identifier} was already cached");
        }
    }
    Ok(0)
}

fn is_not_found(err: &ClientError) -> bool {
    err.kind() == Some(ErrorKind::EntryNotFound)
}
