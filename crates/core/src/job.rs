// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definition and template defaulting.

use crate::error::BuildError;
use crate::hash;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::watch;

/// A unit of build work.
///
/// The definition fields come straight from the Honefile and are
/// immutable after config loading. The runtime slots (`error`, `stop`)
/// are written by the scheduler: `error` exactly once by the task that
/// owns the job, `stop` once when the build starts.
#[derive(Debug, Default, Deserialize)]
pub struct Job {
    /// Job name (injected from the block label)
    #[serde(skip)]
    pub name: String,
    /// Name of the template whose fields fill unset ones
    pub template: Option<String>,
    /// Container image, required for any non-local engine
    pub image: Option<String>,
    /// Shell script, run as `/bin/sh -cex`
    pub shell: Option<String>,
    /// Argv run verbatim; mutually exclusive with `shell`
    pub exec: Option<Vec<String>>,
    /// Input file globs
    pub inputs: Option<Vec<String>>,
    /// Single input file glob (unioned with `inputs`)
    pub input: Option<String>,
    /// Output file globs captured into the cache
    pub outputs: Option<Vec<String>>,
    /// Single output file glob (unioned with `outputs`)
    pub output: Option<String>,
    /// Environment passed to the executor
    pub env: Option<HashMap<String, String>>,
    /// Names of jobs that must complete first
    pub deps: Option<Vec<String>>,
    /// Executor selector; falls back to the config-level engine
    pub engine: Option<String>,
    /// Boolean predicate over the build env; false skips the job
    pub condition: Option<String>,
    /// Long-running job kept alive for the rest of the build
    #[serde(default)]
    pub service: bool,

    #[serde(skip)]
    pub(crate) error: Mutex<Option<BuildError>>,
    #[serde(skip)]
    pub(crate) stop: OnceLock<watch::Receiver<bool>>,
}

impl Job {
    /// An empty job definition with the given name.
    ///
    /// The definition fields are public and filled in afterwards; the
    /// runtime slots start unset. This is the only way to construct a
    /// `Job` outside this crate.
    pub fn new(name: impl Into<String>) -> Job {
        Job {
            name: name.into(),
            ..Job::default()
        }
    }

    /// Graph-node identity: CRC-32 of the job name.
    pub fn id(&self) -> i64 {
        hash::job_id(&self.name)
    }

    /// The engine this job runs on, or `default` when unset.
    pub fn engine_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.engine.as_deref() {
            Some(engine) if !engine.is_empty() => engine,
            _ => default,
        }
    }

    /// Container image with `:latest` appended when no tag is given.
    pub fn image(&self) -> Option<String> {
        self.image.as_ref().map(|image| {
            if image.contains(':') {
                image.clone()
            } else {
                format!("{image}:latest")
            }
        })
    }

    /// Union of the plural and singular input globs, in that order.
    pub fn all_inputs(&self) -> Vec<String> {
        let mut inputs = self.inputs.clone().unwrap_or_default();
        if let Some(input) = &self.input {
            inputs.push(input.clone());
        }
        inputs
    }

    /// Union of the plural and singular output globs, in that order.
    pub fn all_outputs(&self) -> Vec<String> {
        let mut outputs = self.outputs.clone().unwrap_or_default();
        if let Some(output) = &self.output {
            outputs.push(output.clone());
        }
        outputs
    }

    /// The argv the executor should run.
    ///
    /// `exec` is taken verbatim; `shell` is wrapped in `/bin/sh -cex`.
    /// A job with neither is an aggregation-only target and yields an
    /// empty argv, which executors treat as an immediate success.
    pub fn shell_args(&self) -> Vec<String> {
        if let Some(exec) = &self.exec {
            return exec.clone();
        }
        match &self.shell {
            Some(shell) => vec!["/bin/sh".into(), "-cex".into(), shell.clone()],
            None => Vec::new(),
        }
    }

    pub fn env_map(&self) -> HashMap<String, String> {
        self.env.clone().unwrap_or_default()
    }

    /// Copy each unset definable field from `def`.
    ///
    /// `env` merges key-by-key with existing keys winning. The
    /// `inputs`/`input` pair defaults as one unit: both are copied only
    /// when both are unset, so a job that sets either form keeps it.
    /// Same for outputs.
    pub fn default_from(&mut self, def: &Job) {
        if self.image.is_none() {
            self.image = def.image.clone();
        }
        if self.shell.is_none() {
            self.shell = def.shell.clone();
        }
        if self.exec.is_none() {
            self.exec = def.exec.clone();
        }
        if self.inputs.is_none() && self.input.is_none() {
            self.inputs = def.inputs.clone();
            self.input = def.input.clone();
        }
        if self.outputs.is_none() && self.output.is_none() {
            self.outputs = def.outputs.clone();
            self.output = def.output.clone();
        }
        if self.engine.is_none() {
            self.engine = def.engine.clone();
        }
        if self.deps.is_none() {
            self.deps = def.deps.clone();
        }
        if let Some(def_env) = &def.env {
            let env = self.env.get_or_insert_with(HashMap::new);
            for (key, value) in def_env {
                if env.get(key).is_some_and(|v| !v.is_empty()) {
                    continue;
                }
                env.insert(key.clone(), value.clone());
            }
        }
    }

    /// Enforce the job invariants.
    ///
    /// `default_engine` applies when the job does not select one itself.
    pub fn validate(&self, default_engine: &str) -> Result<(), BuildError> {
        let engine = self.engine_or(default_engine);

        if self.image.is_none() && engine != "local" {
            return Err(BuildError::InvalidJob {
                job: self.name.clone(),
                rule: "image is required when engine is not local".into(),
            });
        }

        if self.shell.is_some() && self.exec.is_some() {
            return Err(BuildError::InvalidJob {
                job: self.name.clone(),
                rule: "shell and exec are mutually exclusive".into(),
            });
        }

        Ok(())
    }

    /// Record a failure. The first write wins; later writes are dropped
    /// so downstream observers always see the original error.
    pub fn fail(&self, err: BuildError) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    pub fn error(&self) -> Option<BuildError> {
        self.error.lock().clone()
    }

    /// Install the build-wide stop signal. Called once by the scheduler;
    /// later calls are no-ops.
    pub fn attach_stop(&self, rx: watch::Receiver<bool>) {
        let _ = self.stop.set(rx);
    }

    /// The stop signal, present once the scheduler has started the job.
    /// Services watch this to shut down when the build is done.
    pub fn stop_signal(&self) -> Option<watch::Receiver<bool>> {
        self.stop.get().cloned()
    }
}

/// Apply templates to jobs.
///
/// A job without an explicit `template` uses the template named
/// `"default"`. Unknown template names are silently ignored: a job that
/// names a template this config does not define is left untouched.
pub fn render_templates<'a>(
    jobs: impl IntoIterator<Item = &'a mut Job>,
    templates: &HashMap<String, Job>,
) {
    for job in jobs {
        let name = job.template.as_deref().unwrap_or("default");
        if let Some(template) = templates.get(name) {
            job.default_from(template);
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
