// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local process executor.

use hone_core::{BuildError, BuildLog, Job};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Run the job's command as a child process in the workspace.
///
/// The child inherits the parent environment with the job's env layered
/// on top. Output is streamed line by line into the build log under the
/// job's name.
pub async fn exec(job: &Job, log: &Arc<BuildLog>) -> Result<(), BuildError> {
    let argv = job.shell_args();
    if argv.is_empty() {
        // Aggregation-only job: nothing to run.
        return Ok(());
    }

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]).envs(job.env_map());
    run_command(cmd, job, log).await
}

/// Spawn `cmd`, stream its output, and wait for it.
///
/// A service watches the build's stop signal: when it flips, the child
/// is killed and the service exits cleanly — shutdown at the end of a
/// build is not a failure.
pub(crate) async fn run_command(
    mut cmd: Command,
    job: &Job,
    log: &Arc<BuildLog>,
) -> Result<(), BuildError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let spawn_err = |e: std::io::Error| BuildError::ExecutorFailure {
        job: job.name.clone(),
        reason: format!("spawning: {e}"),
    };
    let mut child = cmd.spawn().map_err(spawn_err)?;

    let stdout = stream_lines(child.stdout.take(), job.name.clone(), log.clone());
    let stderr = stream_lines(child.stderr.take(), job.name.clone(), log.clone());

    let status = match job.stop_signal().filter(|_| job.service) {
        Some(mut stop) => {
            tokio::select! {
                status = child.wait() => status,
                _ = wait_stop(&mut stop) => {
                    log.line(&job.name, "Stopping service.");
                    let _ = child.kill().await;
                    join_streams(stdout, stderr).await;
                    return Ok(());
                }
            }
        }
        None => child.wait().await,
    };

    join_streams(stdout, stderr).await;

    let status = status.map_err(|e| BuildError::ExecutorFailure {
        job: job.name.clone(),
        reason: format!("waiting: {e}"),
    })?;

    if !status.success() {
        return Err(BuildError::ExecutorFailure {
            job: job.name.clone(),
            reason: match status.code() {
                Some(code) => format!("exit status {code}"),
                None => "killed by signal".into(),
            },
        });
    }

    Ok(())
}

fn stream_lines<R>(reader: Option<R>, name: String, log: Arc<BuildLog>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(reader) = reader else { return };
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log.line(&name, &line);
        }
    })
}

async fn join_streams(stdout: JoinHandle<()>, stderr: JoinHandle<()>) {
    let _ = stdout.await;
    let _ = stderr.await;
}

async fn wait_stop(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
