// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build output log: one line per event, prefixed with the right-padded
//! job name, optionally teed to an upload sink.

use crate::error::BuildError;
use crate::job::Job;
use crate::runner::Runner;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

/// Shared build output stream.
///
/// The column width is the length of the longest reachable job name so
/// interleaved output from concurrent jobs stays aligned. Sink failures
/// are logged and swallowed — losing the uploaded copy must not break
/// the build.
pub struct BuildLog {
    width: usize,
    sink: Option<Mutex<Box<dyn Write + Send>>>,
}

impl BuildLog {
    pub fn new(width: usize) -> Self {
        Self { width, sink: None }
    }

    pub fn with_sink(width: usize, sink: Box<dyn Write + Send>) -> Self {
        Self {
            width,
            sink: Some(Mutex::new(sink)),
        }
    }

    /// Emit one line of output attributed to `job`.
    pub fn line(&self, job: &str, message: &str) {
        self.emit(&format!("{:<width$} | {}", job, message, width = self.width));
    }

    /// Emit an unattributed line.
    pub fn notice(&self, message: &str) {
        self.emit(message);
    }

    fn emit(&self, line: &str) {
        println!("{line}");
        if let Some(sink) = &self.sink {
            if let Err(e) = writeln!(sink.lock(), "{line}") {
                tracing::warn!(error = %e, "failed to write log sink");
            }
        }
    }
}

/// Outermost decorator: start/finish lines around every job.
pub struct LogLayer {
    log: Arc<BuildLog>,
    inner: Arc<dyn Runner>,
}

impl LogLayer {
    pub fn new(log: Arc<BuildLog>, inner: Arc<dyn Runner>) -> Self {
        Self { log, inner }
    }
}

#[async_trait]
impl Runner for LogLayer {
    async fn run(&self, job: &Job) -> Result<(), BuildError> {
        self.log.line(&job.name, "Running job.");
        let start = Instant::now();

        match self.inner.run(job).await {
            Ok(()) => {
                let elapsed = start.elapsed().as_secs_f64();
                self.log
                    .line(&job.name, &format!("Finished job in {elapsed:.1}s."));
                Ok(())
            }
            Err(err) => {
                self.log.line(&job.name, &format!("Job failed: {err}"));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
