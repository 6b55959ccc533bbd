// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hone-executors: the innermost layer of the pipeline — actually
//! running a job's command, locally or in a container.

pub mod docker;
pub mod local;

use async_trait::async_trait;
use hone_core::{BuildError, BuildLog, Job, Runner};
use std::collections::HashMap;
use std::sync::Arc;

/// Engine dispatcher. Jobs pick an engine (`local` or `docker`); the
/// config-level engine applies to the rest.
pub struct Executors {
    default_engine: String,
    log: Arc<BuildLog>,
    /// Remote-cache reconnection env, exported into containers so a
    /// cache-shim entrypoint can re-hydrate the cache around the
    /// wrapped command.
    remote_env: Option<HashMap<String, String>>,
}

impl Executors {
    pub fn new(
        default_engine: impl Into<String>,
        log: Arc<BuildLog>,
        remote_env: Option<HashMap<String, String>>,
    ) -> Self {
        Self {
            default_engine: default_engine.into(),
            log,
            remote_env,
        }
    }
}

#[async_trait]
impl Runner for Executors {
    async fn run(&self, job: &Job) -> Result<(), BuildError> {
        match job.engine_or(&self.default_engine) {
            "local" => local::exec(job, &self.log).await,
            "docker" => docker::run(job, &self.log, self.remote_env.as_ref()).await,
            engine => Err(BuildError::ExecutorFailure {
                job: job.name.clone(),
                reason: format!("unknown engine: {engine}"),
            }),
        }
    }
}
