// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hone-cache: content-addressed build cache.
//!
//! Two backends share one contract: a local file tree and an
//! S3-compatible object store. Blobs are stored under their content
//! hash, manifests under the owning job's fingerprint, so equal content
//! always lands at equal keys and concurrent writers cannot corrupt
//! each other — at worst they overwrite a manifest with an equivalent
//! one.

pub mod entry;
pub mod file;
pub mod layer;
pub mod s3;
mod sign;
pub mod writer;

pub use entry::CacheEntry;
pub use file::FileCache;
pub use layer::CacheLayer;
pub use s3::S3Cache;
pub use writer::LogWriter;

use async_trait::async_trait;
use hone_core::{hash, BuildError, Job};
use std::collections::HashMap;
use std::path::Path;

/// Namespace for output blobs, keyed by content hash.
pub const SRCS: &str = "srcs";
/// Namespace for manifests, keyed by job fingerprint.
pub const MANIFESTS: &str = "srcs_manifests";
/// Namespace for uploaded build logs.
pub const LOGS: &str = "logs";

/// The capability set both cache backends implement.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short identifier used in log messages.
    fn name(&self) -> &'static str;

    /// Environment a child process needs to reconnect to this backend.
    /// Only the object store has one; the default is empty.
    fn env(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    /// Download the blob `namespace/entry.hash` to `entry.filename`,
    /// creating parent directories. An absent blob is a cache miss, not
    /// an error: the call succeeds without writing anything.
    async fn get(&self, namespace: &str, entry: &CacheEntry) -> Result<(), BuildError>;

    /// Hash `path` and upload it at `namespace/<hash>`. The upload may
    /// be skipped when the blob is already present.
    async fn set(&self, namespace: &str, path: &Path) -> Result<CacheEntry, BuildError>;

    /// Read and decode a manifest. An absent key yields `None`.
    async fn load_manifest(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<CacheEntry>>, BuildError>;

    /// Encode and write a manifest, replacing any existing one.
    async fn dump_manifest(
        &self,
        namespace: &str,
        key: &str,
        entries: &[CacheEntry],
    ) -> Result<(), BuildError>;

    /// Open a log sink at `namespace/path` and return it with the URL
    /// downstream consumers can fetch it from.
    fn writer(&self, namespace: &str, path: &str) -> Result<(LogWriter, String), BuildError>;
}

/// Capture a job's outputs into the backend and write the manifest.
///
/// Output globs resolve against the working directory. A pattern that
/// matches nothing contributes nothing — a condition-skipped job never
/// produced its outputs, and caching the empty result is what lets the
/// skip stick on the next run.
pub async fn dump_outputs(
    key: &str,
    backend: &dyn Backend,
    outputs: &[String],
) -> Result<Vec<CacheEntry>, BuildError> {
    let mut entries = Vec::new();

    for pattern in outputs {
        let paths = glob::glob(pattern)
            .map_err(|e| BuildError::CacheIo(format!("bad output glob {pattern}: {e}")))?;

        let before = entries.len();
        for path in paths.flatten() {
            if path.is_file() {
                entries.push(backend.set(SRCS, &path).await?);
            }
        }
        if entries.len() == before {
            tracing::debug!(pattern = %pattern, "output glob matched no files");
        }
    }

    backend.dump_manifest(MANIFESTS, key, &entries).await?;
    Ok(entries)
}

/// Environment for a cache-shim child process wrapping `job`'s command:
/// the backend's reconnection variables plus the job's cache key and
/// declared outputs.
pub fn shim_env(backend: &dyn Backend, job: &Job) -> Result<HashMap<String, String>, BuildError> {
    let mut env = backend.env();
    env.insert("CACHE_KEY".into(), hash::cache_key(job));
    env.insert(
        "OUTPUTS".into(),
        serde_json::to_string(&job.all_outputs())
            .map_err(|e| BuildError::CacheIo(e.to_string()))?,
    );
    Ok(env)
}
