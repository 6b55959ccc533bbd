// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git facts via the git CLI: the HEAD commit and the remote's host and
//! repository path.

use crate::ScmError;
use tokio::process::Command;

/// SHA of the working copy's HEAD.
pub async fn head_commit() -> Result<String, ScmError> {
    git(&["rev-parse", "HEAD"]).await
}

/// Hostname of the named remote, e.g. `github.com`.
pub async fn remote_host(remote: &str) -> Result<String, ScmError> {
    let url = git(&["remote", "get-url", remote]).await?;
    let (host, _) = parse_remote(&url)
        .ok_or_else(|| ScmError::Git(format!("unrecognized remote url: {url}")))?;
    Ok(host)
}

/// `owner/name` path of the named remote.
pub async fn repo_path(remote: &str) -> Result<String, ScmError> {
    let url = git(&["remote", "get-url", remote]).await?;
    let (_, path) = parse_remote(&url)
        .ok_or_else(|| ScmError::Git(format!("unrecognized remote url: {url}")))?;
    Ok(path)
}

async fn git(args: &[&str]) -> Result<String, ScmError> {
    let output = Command::new("git")
        .args(args)
        .output()
        .await
        .map_err(|e| ScmError::Git(format!("git {}: {e}", args.join(" "))))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScmError::Git(format!(
            "git {}: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Split a remote URL into `(host, owner/name)`.
///
/// Handles the ssh form (`git@host:owner/repo.git`) and the http(s)
/// form (`https://host/owner/repo.git`).
pub fn parse_remote(url: &str) -> Option<(String, String)> {
    let url = url.trim();

    if let Some(rest) = url.strip_prefix("git@") {
        let (host, path) = rest.split_once(':')?;
        return Some((host.to_string(), strip_repo_path(path)));
    }

    if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("ssh://git@"))
    {
        let (host, path) = rest.split_once('/')?;
        let host = host.split('@').next_back().unwrap_or(host);
        return Some((host.to_string(), strip_repo_path(path)));
    }

    None
}

fn strip_repo_path(path: &str) -> String {
    path.trim_start_matches('/')
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .to_string()
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
