// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container executor over the docker CLI.
//!
//! The workspace is bind-mounted at `/build` and used as the working
//! directory, so relative input/output paths mean the same thing inside
//! and outside the container.

use hone_core::{hash, BuildError, BuildLog, Job};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::process::Command;

const WORKDIR: &str = "/build";

/// Run the job's command inside its image.
pub async fn run(
    job: &Job,
    log: &Arc<BuildLog>,
    remote_env: Option<&HashMap<String, String>>,
) -> Result<(), BuildError> {
    let image = job.image().ok_or_else(|| BuildError::ExecutorFailure {
        job: job.name.clone(),
        reason: "image is required for the docker engine".into(),
    })?;

    let argv = job.shell_args();
    if argv.is_empty() {
        return Ok(());
    }

    ensure_image(&image, job, log).await?;

    let workspace = std::env::current_dir()
        .map_err(|e| BuildError::ExecutorFailure {
            job: job.name.clone(),
            reason: format!("resolving workspace: {e}"),
        })?;

    let mut cmd = Command::new("docker");
    cmd.arg("run")
        .arg("--rm")
        .arg("--workdir")
        .arg(WORKDIR)
        .arg("--volume")
        .arg(format!("{}:{WORKDIR}", workspace.display()));

    for (key, value) in job.env_map() {
        cmd.arg("--env").arg(format!("{key}={value}"));
    }

    // Reconnection variables for an in-container cache shim. The shim
    // unsets them before exec'ing the wrapped command.
    if let Some(env) = remote_env {
        for (key, value) in env {
            cmd.arg("--env").arg(format!("{key}={value}"));
        }
        cmd.arg("--env")
            .arg(format!("CACHE_KEY={}", hash::cache_key(job)));
        let outputs = serde_json::to_string(&job.all_outputs())
            .map_err(|e| BuildError::CacheIo(e.to_string()))?;
        cmd.arg("--env").arg(format!("OUTPUTS={outputs}"));
    }

    cmd.arg(&image).args(&argv);

    crate::local::run_command(cmd, job, log).await
}

/// Pull the image when it is not present locally.
async fn ensure_image(image: &str, job: &Job, log: &Arc<BuildLog>) -> Result<(), BuildError> {
    let inspect = Command::new("docker")
        .args(["image", "inspect", image])
        .output()
        .await
        .map_err(|e| BuildError::ExecutorFailure {
            job: job.name.clone(),
            reason: format!("docker image inspect: {e}"),
        })?;

    if inspect.status.success() {
        return Ok(());
    }

    log.line(&job.name, &format!("Pulling image {image}."));
    let pull = Command::new("docker")
        .args(["pull", image])
        .output()
        .await
        .map_err(|e| BuildError::ExecutorFailure {
            job: job.name.clone(),
            reason: format!("docker pull: {e}"),
        })?;

    if !pull.status.success() {
        return Err(BuildError::ExecutorFailure {
            job: job.name.clone(),
            reason: format!(
                "pulling {image}: {}",
                String::from_utf8_lossy(&pull.stderr).trim()
            ),
        });
    }

    Ok(())
}
