// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cache decorator: manifest hit restores outputs and skips the
//! inner runner; miss runs it and captures the outputs.

use crate::{dump_outputs, Backend, MANIFESTS, SRCS};
use async_trait::async_trait;
use hone_core::{hash, BuildError, BuildLog, Job, Runner};
use std::sync::Arc;

/// Wraps an inner runner with one cache backend. Stacked twice in the
/// full pipeline: the file layer outside the remote layer, so a local
/// hit never touches the network and a remote hit seeds the local cache
/// on its way back.
pub struct CacheLayer {
    backend: Arc<dyn Backend>,
    inner: Arc<dyn Runner>,
    log: Arc<BuildLog>,
}

impl CacheLayer {
    pub fn new(backend: Arc<dyn Backend>, inner: Arc<dyn Runner>, log: Arc<BuildLog>) -> Self {
        Self { backend, inner, log }
    }
}

#[async_trait]
impl Runner for CacheLayer {
    async fn run(&self, job: &Job) -> Result<(), BuildError> {
        // A service's value is the side effect of it running; caching
        // one would keep it from ever starting again.
        if job.service {
            return self.inner.run(job).await;
        }

        let key = hash::cache_key(job);

        if let Some(entries) = self.backend.load_manifest(MANIFESTS, &key).await? {
            for entry in &entries {
                self.backend.get(SRCS, entry).await?;
                entry.sync_attrs()?;
                self.log.line(
                    &job.name,
                    &format!("Loaded {} from cache ({}).", entry.filename, self.backend.name()),
                );
            }
            return Ok(());
        }

        // Failures are never cached: an error propagates before any
        // manifest is written.
        self.inner.run(job).await?;

        let entries = dump_outputs(&key, self.backend.as_ref(), &job.all_outputs()).await?;
        if !entries.is_empty() {
            self.log.line(
                &job.name,
                &format!("Dumped {} outputs to cache ({}).", entries.len(), self.backend.name()),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "layer_tests.rs"]
mod tests;
