// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-level reporting: one [`Report`] per invocation posts lifecycle
//! statuses and decorates the job pipeline with per-job progress.

use crate::{build_completed, build_errored, build_failed, build_started, is_commit_not_found};
use crate::{Scm, ScmError, State};
use async_trait::async_trait;
use hone_core::{BuildError, Job, Runner};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct Report {
    scms: Vec<Scm>,
    commit: String,
    start_unix: u64,
    log_url: Mutex<String>,
}

impl Report {
    /// Bind a report to the current build. The commit comes from the
    /// initialized reporters, or from git directly when none came up;
    /// outside a repository it degrades to `local`.
    pub async fn new(scms: Vec<Scm>) -> Self {
        let commit = match scms.first() {
            Some(scm) => scm.commit().to_string(),
            None => crate::git::head_commit().await.unwrap_or_else(|_| "local".into()),
        };

        let start_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            scms,
            commit,
            start_unix,
            log_url: Mutex::new(String::new()),
        }
    }

    /// Where this build's log lives under the `logs` namespace.
    pub fn log_path(&self) -> String {
        format!("{}/{}.log", self.commit, self.start_unix)
    }

    pub fn set_log_url(&self, url: impl Into<String>) {
        *self.log_url.lock() = url.into();
    }

    fn log_url(&self) -> String {
        self.log_url.lock().clone()
    }

    pub async fn started(&self) -> Result<(), ScmError> {
        build_started(&self.scms).await
    }

    /// Post the terminal status for a finished build.
    pub async fn finish(&self, errors: usize) {
        let url = self.log_url();
        let result = if errors == 0 {
            build_completed(&self.scms, &url).await
        } else {
            build_failed(&self.scms, &url).await
        };
        if let Err(err) = result {
            tracing::error!(error = %err, "failed to post build status");
        }
    }

    /// Post the configuration-error status.
    pub async fn config_error(&self) {
        if let Err(err) = build_errored(&self.scms, &self.log_url()).await {
            tracing::error!(error = %err, "failed to post build status");
        }
    }

    /// Decorate the pipeline with per-job entry/exit statuses.
    pub fn wrap(self: &Arc<Self>, inner: Arc<dyn Runner>) -> Arc<dyn Runner> {
        Arc::new(ReportLayer {
            report: self.clone(),
            inner,
        })
    }

    async fn post_job(&self, state: State, message: &str) {
        for scm in &self.scms {
            if let Err(err) = scm.post_status(state, message, &self.log_url()).await {
                if !is_commit_not_found(&err) {
                    tracing::warn!(error = %err, "failed to post job status");
                }
            }
        }
    }
}

struct ReportLayer {
    report: Arc<Report>,
    inner: Arc<dyn Runner>,
}

#[async_trait]
impl Runner for ReportLayer {
    async fn run(&self, job: &Job) -> Result<(), BuildError> {
        self.report
            .post_job(State::Running, &format!("Job {} started.", job.name))
            .await;

        match self.inner.run(job).await {
            Ok(()) => {
                self.report
                    .post_job(State::Success, &format!("Job {} finished.", job.name))
                    .await;
                Ok(())
            }
            Err(err) => {
                self.report
                    .post_job(State::Failure, &format!("Job {} failed: {err}", job.name))
                    .await;
                Err(err)
            }
        }
    }
}
