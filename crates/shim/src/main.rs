// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! hone-shim: cache-rehydrating wrapper for in-container commands.
//!
//! Runs as the container entrypoint:
//!
//! ```text
//! hone-shim <command> [args...]
//! ```
//!
//! It reconnects to the remote cache from the environment the docker
//! executor exported, restores the job's cached outputs, strips every
//! cache credential from the environment, runs the wrapped command, and
//! captures its outputs back into the cache.

use anyhow::{bail, Context};
use hone_cache::{dump_outputs, Backend, S3Cache, MANIFESTS, SRCS};

/// Variables consumed here and never leaked into the wrapped command.
const SHIM_VARS: &[&str] = &[
    "S3_BUCKET",
    "S3_ENDPOINT",
    "S3_ACCESS_KEY",
    "S3_SECRET_KEY",
    "CA_FILE",
    "CACHE_KEY",
    "OUTPUTS",
    "REPO_OWNER",
    "REPO_NAME",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        bail!("usage: hone-shim <command> [args...]");
    }

    let mut cache = S3Cache::from_env();
    cache.init().await.context("initializing s3 cache")?;

    let cache_key = std::env::var("CACHE_KEY").unwrap_or_default();
    let outputs: Vec<String> = match std::env::var("OUTPUTS") {
        Ok(raw) => serde_json::from_str(&raw).context("parsing OUTPUTS")?,
        Err(_) => Vec::new(),
    };

    let manifest = cache
        .load_manifest(MANIFESTS, &cache_key)
        .await?
        .unwrap_or_default();
    for entry in &manifest {
        cache.get(SRCS, entry).await?;
        entry.sync_attrs()?;
        tracing::info!(file = %entry.filename, "loaded from cache ({})", cache.name());
    }

    for var in SHIM_VARS {
        std::env::remove_var(var);
    }

    let status = std::process::Command::new(&args[0])
        .args(&args[1..])
        .status()
        .with_context(|| format!("running {}", args[0]))?;

    if !status.success() {
        std::process::exit(status.code().unwrap_or(1));
    }

    dump_outputs(&cache_key, &cache, &outputs).await?;
    tracing::info!("dumped outputs to cache ({})", cache.name());

    Ok(())
}
