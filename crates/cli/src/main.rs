// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! hone: declarative build orchestrator.
//!
//! Loads the Honefile, builds the job graph, and resolves the requested
//! target through the layered pipeline: log → report → file cache →
//! remote cache → condition gate → executor. The exit code is the
//! number of failed jobs.

use clap::Parser;
use hone_cache::{Backend, CacheLayer, LogWriter, LOGS};
use hone_config::Config;
use hone_core::{BuildLog, ConditionGate, LogLayer, Runner};
use hone_executors::Executors;
use hone_graph::JobGraph;
use hone_scm::{init_scms, Report};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "hone", version, about = "Declarative build orchestrator")]
struct Args {
    /// Honefile path when two arguments are given, otherwise the target.
    first: Option<String>,
    /// Build target.
    second: Option<String>,
}

impl Args {
    fn resolve(self) -> (PathBuf, String) {
        match (self.first, self.second) {
            (Some(config), Some(target)) => (config.into(), target),
            (Some(target), None) => ("Honefile".into(), target),
            _ => ("Honefile".into(), "all".into()),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (config_path, target) = Args::parse().resolve();

    match run(&config_path, &target).await {
        Ok(failed) => std::process::exit(failed as i32),
        Err(err) => {
            tracing::error!(error = %err, "build aborted");
            std::process::exit(1);
        }
    }
}

async fn run(config_path: &PathBuf, target: &str) -> anyhow::Result<usize> {
    let mut config = Config::load(config_path)?;
    let env = config.env.clone();

    let scms = init_scms(config.take_scms(), &env).await?;
    let report = Arc::new(Report::new(scms).await);

    if let Err(err) = report.started().await {
        report.config_error().await;
        return Err(err.into());
    }

    match build(config, env, report.clone(), target).await {
        Ok(failed) => Ok(failed),
        Err(err) => {
            report.config_error().await;
            Err(err)
        }
    }
}

async fn build(
    mut config: Config,
    env: HashMap<String, String>,
    report: Arc<Report>,
    target: &str,
) -> anyhow::Result<usize> {
    let jobs = config.take_jobs();
    let graph = JobGraph::build(&jobs)?;

    let (longest, errors) = graph.longest_target(target);
    if let Some(err) = errors.into_iter().next() {
        return Err(err.into());
    }

    let file_cache = std::mem::take(&mut config.cache.file);
    file_cache.init()?;

    // The remote tier also carries the uploaded build log.
    let mut log_writer = None;
    let mut log_url = String::new();
    let mut s3_cache = None;
    if let Some(mut s3) = config.cache.s3.take() {
        if !s3.disabled {
            s3.init().await?;
            let (writer, url) = s3.writer(LOGS, &report.log_path())?;
            log_writer = Some(Arc::new(Mutex::new(writer)));
            log_url = url;
            s3_cache = Some(s3);
        }
    }

    let log = Arc::new(match &log_writer {
        Some(writer) => BuildLog::with_sink(longest, Box::new(SharedWriter(writer.clone()))),
        None => BuildLog::new(longest),
    });
    report.set_log_url(log_url.clone());

    // Innermost to outermost: executor, condition gate, remote cache,
    // file cache, reporting, logging. A file-cache hit never consults
    // the remote; a remote hit seeds the file cache on the way back.
    let remote_env = s3_cache.as_ref().map(|s3| s3.env());
    let mut runner: Arc<dyn Runner> =
        Arc::new(Executors::new(config.engine(), log.clone(), remote_env));
    runner = Arc::new(ConditionGate::new(env, runner, log.clone()));
    if let Some(s3) = s3_cache {
        runner = Arc::new(CacheLayer::new(Arc::new(s3), runner, log.clone()));
    }
    runner = Arc::new(CacheLayer::new(Arc::new(file_cache), runner, log.clone()));
    runner = report.wrap(runner);
    runner = Arc::new(LogLayer::new(log.clone(), runner));

    let errors = graph.resolve_target(target, runner, log.clone()).await;

    if !log_url.is_empty() {
        log.notice(&format!("Logs available: {log_url}"));
    }

    report.finish(errors.len()).await;

    if let Some(writer) = log_writer {
        let pending = writer.lock().finish();
        match pending {
            Ok(Some(upload)) => {
                if let Err(err) = upload.send().await {
                    tracing::error!(error = %err, "failed to upload build log");
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "failed to close build log"),
        }
    }

    Ok(errors.len())
}

/// `Write` handle over the shared log writer, so the build log can tee
/// into it while the CLI keeps ownership for the final upload.
struct SharedWriter(Arc<Mutex<LogWriter>>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}
