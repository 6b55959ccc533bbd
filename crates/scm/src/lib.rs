// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hone-scm: build status reporting to source-hosting providers.
//!
//! Each configured reporter posts commit statuses (label `hone`) for
//! build lifecycle events and per-job progress. A reporter only comes
//! up when its condition matches the build env and it has a token.

pub mod git;
pub mod report;

pub use report::Report;

use hone_core::cond;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Build lifecycle states, mapped onto each provider's status set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Running,
    Success,
    Failure,
    Canceled,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
    Gitlab,
    Gitea,
}

impl Provider {
    fn as_str(self) -> &'static str {
        match self {
            Provider::Github => "github",
            Provider::Gitlab => "gitlab",
            Provider::Gitea => "gitea",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "github" => Some(Provider::Github),
            "gitlab" => Some(Provider::Gitlab),
            "gitea" => Some(Provider::Gitea),
            _ => None,
        }
    }

    fn from_host(host: &str) -> Option<Self> {
        match host {
            "github.com" => Some(Provider::Github),
            "gitlab.com" => Some(Provider::Gitlab),
            _ => None,
        }
    }

    fn default_url(self) -> Option<&'static str> {
        match self {
            Provider::Github => Some("https://api.github.com"),
            Provider::Gitlab => Some("https://gitlab.com"),
            // Gitea is self-hosted; there is no default.
            Provider::Gitea => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScmError {
    #[error("git: {0}")]
    Git(String),

    #[error("{provider} url must be configured")]
    MissingUrl { provider: &'static str },

    #[error("scm condition: {0}")]
    Condition(String),

    #[error("posting status: {0}")]
    Http(#[from] reqwest::Error),

    #[error("posting status: {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("scm not initialized")]
    NotInitialized,
}

/// One configured reporter, bound to a hosting provider.
///
/// The block label doubles as the provider name unless `provider` is
/// set explicitly; with neither, the provider is inferred from the
/// remote's hostname and falls back to GitHub.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scm {
    /// Injected from the block label.
    #[serde(skip)]
    pub name: String,
    pub provider: Option<Provider>,
    /// API base URL; required for self-hosted providers.
    pub url: Option<String>,
    #[serde(default)]
    pub token: String,
    /// `owner/name`; detected from the remote when unset.
    pub repo: Option<String>,
    /// Remote used for detection; `origin` when unset.
    pub remote: Option<String>,
    /// Reporter comes up only when this matches the build env.
    pub condition: Option<String>,

    #[serde(skip)]
    commit: String,
    #[serde(skip)]
    resolved_provider: Option<Provider>,
    #[serde(skip)]
    repo_path: String,
    #[serde(skip)]
    api_url: String,
    #[serde(skip)]
    client: Option<reqwest::Client>,
}

impl Scm {
    /// Resolve provider, repo and commit, and build the HTTP client.
    ///
    /// `REPO_OWNER`/`REPO_NAME` in the environment override repository
    /// detection (and force the GitHub provider), for runs inside CI
    /// checkouts without a usable remote.
    pub async fn init(&mut self) -> Result<(), ScmError> {
        let owner = std::env::var("REPO_OWNER").unwrap_or_default();
        let name = std::env::var("REPO_NAME").unwrap_or_default();
        if !owner.is_empty() && !name.is_empty() {
            self.repo = Some(format!("{owner}/{name}"));
            self.provider = Some(Provider::Github);
        }

        self.commit = git::head_commit().await?;
        let remote = self.remote.as_deref().unwrap_or("origin");

        let provider = match self.provider {
            Some(provider) => provider,
            None => match Provider::from_name(&self.name) {
                Some(provider) => provider,
                None => match git::remote_host(remote).await {
                    Ok(host) => Provider::from_host(&host).unwrap_or(Provider::Github),
                    Err(_) => Provider::Github,
                },
            },
        };
        self.resolved_provider = Some(provider);

        self.repo_path = match &self.repo {
            Some(repo) => repo.clone(),
            None => git::repo_path(remote).await?,
        };

        self.api_url = match &self.url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => provider
                .default_url()
                .ok_or(ScmError::MissingUrl {
                    provider: provider.as_str(),
                })?
                .to_string(),
        };

        self.client = Some(reqwest::Client::new());
        Ok(())
    }

    pub fn provider_name(&self) -> &'static str {
        self.resolved_provider
            .map(Provider::as_str)
            .unwrap_or("unknown")
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// Post one commit status with label `hone`.
    pub async fn post_status(
        &self,
        state: State,
        message: &str,
        target_url: &str,
    ) -> Result<(), ScmError> {
        let provider = self.resolved_provider.ok_or(ScmError::NotInitialized)?;
        let client = self.client.as_ref().ok_or(ScmError::NotInitialized)?;

        let request = match provider {
            Provider::Github => client
                .post(format!(
                    "{}/repos/{}/statuses/{}",
                    self.api_url, self.repo_path, self.commit
                ))
                .header("authorization", format!("token {}", self.token))
                .header("user-agent", "hone")
                .json(&serde_json::json!({
                    "state": github_state(state),
                    "context": "hone",
                    "description": message,
                    "target_url": target_url,
                })),
            Provider::Gitlab => client
                .post(format!(
                    "{}/api/v4/projects/{}/statuses/{}",
                    self.api_url,
                    self.repo_path.replace('/', "%2F"),
                    self.commit
                ))
                .header("private-token", self.token.clone())
                .json(&serde_json::json!({
                    "state": gitlab_state(state),
                    "context": "hone",
                    "description": message,
                    "target_url": target_url,
                })),
            Provider::Gitea => client
                .post(format!(
                    "{}/api/v1/repos/{}/statuses/{}",
                    self.api_url, self.repo_path, self.commit
                ))
                .header("authorization", format!("token {}", self.token))
                .json(&serde_json::json!({
                    "state": gitea_state(state),
                    "context": "hone",
                    "description": message,
                    "target_url": target_url,
                })),
        };

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScmError::Status { status, body });
        }
        Ok(())
    }
}

fn github_state(state: State) -> &'static str {
    match state {
        State::Pending | State::Running => "pending",
        State::Success => "success",
        State::Failure => "failure",
        State::Canceled | State::Error => "error",
    }
}

fn gitlab_state(state: State) -> &'static str {
    match state {
        State::Pending => "pending",
        State::Running => "running",
        State::Success => "success",
        State::Failure | State::Error => "failed",
        State::Canceled => "canceled",
    }
}

fn gitea_state(state: State) -> &'static str {
    match state {
        State::Pending | State::Running => "pending",
        State::Success => "success",
        State::Failure => "failure",
        State::Canceled | State::Error => "error",
    }
}

/// Initialize the reporters whose condition matches the env and whose
/// token is set. The rest are dropped silently.
pub async fn init_scms(
    scms: Vec<Scm>,
    env: &HashMap<String, String>,
) -> Result<Vec<Scm>, ScmError> {
    let mut ready = Vec::new();

    for mut scm in scms {
        let run = cond::matches(scm.condition.as_deref(), env)
            .map_err(|e| ScmError::Condition(e.to_string()))?;
        if !run || scm.token.is_empty() {
            continue;
        }

        scm.init().await?;
        tracing::info!(provider = scm.provider_name(), "initialized reporting provider");
        ready.push(scm);
    }

    Ok(ready)
}

/// A status post rejected because the commit is not upstream yet.
///
/// Happens whenever the working copy is ahead of the remote; it is a
/// notice, not a failure.
pub fn is_commit_not_found(err: &ScmError) -> bool {
    if err.to_string().contains("No commit found for SHA") {
        tracing::info!("not posting status: commit not found upstream");
        return true;
    }
    false
}

pub async fn post_all(
    scms: &[Scm],
    state: State,
    message: &str,
    target_url: &str,
) -> Result<(), ScmError> {
    for scm in scms {
        if let Err(err) = scm.post_status(state, message, target_url).await {
            if !is_commit_not_found(&err) {
                return Err(err);
            }
        }
    }
    Ok(())
}

pub async fn build_started(scms: &[Scm]) -> Result<(), ScmError> {
    post_all(scms, State::Running, "Build started!", "").await
}

pub async fn build_completed(scms: &[Scm], report_url: &str) -> Result<(), ScmError> {
    post_all(scms, State::Success, "Build completed successfully!", report_url).await
}

pub async fn build_failed(scms: &[Scm], report_url: &str) -> Result<(), ScmError> {
    post_all(scms, State::Error, "Build failed!", report_url).await
}

pub async fn build_errored(scms: &[Scm], report_url: &str) -> Result<(), ScmError> {
    post_all(
        scms,
        State::Error,
        "Build errored due to a configuration error!",
        report_url,
    )
    .await
}

pub async fn build_canceled(scms: &[Scm], report_url: &str) -> Result<(), ScmError> {
    post_all(scms, State::Canceled, "Build cancelled by user!", report_url).await
}

#[cfg(test)]
#[path = "scm_tests.rs"]
mod tests;
