// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runner seam: every layer of the execution pipeline — executors,
//! cache layers, reporting, logging — implements [`Runner`] and wraps an
//! inner one.

use crate::cond;
use crate::error::BuildError;
use crate::job::Job;
use crate::logger::BuildLog;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// An execution callback: run one job to completion.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, job: &Job) -> Result<(), BuildError>;
}

/// Innermost decorator: skip the job when its condition is false.
///
/// A skipped job is a success; downstream jobs proceed as if it ran.
pub struct ConditionGate {
    env: HashMap<String, String>,
    inner: Arc<dyn Runner>,
    log: Arc<BuildLog>,
}

impl ConditionGate {
    pub fn new(env: HashMap<String, String>, inner: Arc<dyn Runner>, log: Arc<BuildLog>) -> Self {
        Self { env, inner, log }
    }
}

#[async_trait]
impl Runner for ConditionGate {
    async fn run(&self, job: &Job) -> Result<(), BuildError> {
        if cond::matches(job.condition.as_deref(), &self.env)? {
            return self.inner.run(job).await;
        }

        self.log.line(
            &job.name,
            &format!(
                "Skipping job, condition not met: {}",
                job.condition.as_deref().unwrap_or("")
            ),
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
