// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hone-config: Honefile loading.
//!
//! A Honefile declares jobs, templates, the cache tiers and status
//! reporters. HCL is the native format; `.toml` files parse the same
//! structure, selected by extension.

use hone_cache::{FileCache, S3Cache};
use hone_core::{render_templates, BuildError, Job};
use hone_scm::Scm;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Default local cache root when the config does not set one.
pub const DEFAULT_CACHE_DIR: &str = ".hone/cache";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("parsing {path}: {message}")]
    Parse { path: String, message: String },

    #[error(transparent)]
    Invalid(#[from] BuildError),
}

/// Honefile format, selected by file extension (`Honefile` itself is
/// HCL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Hcl,
    Toml,
}

impl Format {
    fn for_path(path: &Path) -> Format {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Format::Toml,
            _ => Format::Hcl,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub file: FileCache,
    pub s3: Option<S3Cache>,
}

/// The parsed Honefile.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    job: HashMap<String, Job>,
    #[serde(default)]
    template: HashMap<String, Job>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub scm: HashMap<String, Scm>,
    engine: Option<String>,
    /// Build environment; merged over the parent process environment,
    /// config values winning.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Config {
    /// Load, render templates, merge the environment and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = parse(&content, Format::for_path(path)).map_err(|message| {
            ConfigError::Parse {
                path: path.display().to_string(),
                message,
            }
        })?;
        config.finish()?;
        Ok(config)
    }

    /// Parse a Honefile from a string (tests, embedded configs).
    pub fn parse_str(content: &str, format: Format) -> Result<Config, ConfigError> {
        let mut config = parse(content, format).map_err(|message| ConfigError::Parse {
            path: "<inline>".into(),
            message,
        })?;
        config.finish()?;
        Ok(config)
    }

    fn finish(&mut self) -> Result<(), ConfigError> {
        // Names are map keys; inject them into the records.
        for (name, job) in self.job.iter_mut() {
            job.name = name.clone();
        }
        for (name, template) in self.template.iter_mut() {
            template.name = name.clone();
        }
        for (name, scm) in self.scm.iter_mut() {
            scm.name = name.clone();
        }

        render_templates(self.job.values_mut(), &self.template);

        let env: HashMap<String, String> = std::env::vars().chain(self.env.drain()).collect();
        self.env = env;

        if self.cache.file.path.as_os_str().is_empty() {
            self.cache.file.path = DEFAULT_CACHE_DIR.into();
        }

        let engine = self.engine().to_string();
        for job in self.job.values() {
            job.validate(&engine)?;
        }

        Ok(())
    }

    /// The config-level engine; `local` when unset.
    pub fn engine(&self) -> &str {
        match self.engine.as_deref() {
            Some(engine) if !engine.is_empty() => engine,
            _ => "local",
        }
    }

    /// Consume the job map, sorted by name so graph construction (and
    /// with it topological tie-breaking) is deterministic.
    pub fn take_jobs(&mut self) -> Vec<Arc<Job>> {
        let mut jobs: Vec<Job> = std::mem::take(&mut self.job).into_values().collect();
        jobs.sort_by(|a, b| a.name.cmp(&b.name));
        jobs.into_iter().map(Arc::new).collect()
    }

    /// Consume the reporter map in name order.
    pub fn take_scms(&mut self) -> Vec<Scm> {
        let mut scms: Vec<Scm> = std::mem::take(&mut self.scm).into_values().collect();
        scms.sort_by(|a, b| a.name.cmp(&b.name));
        scms
    }
}

fn parse(content: &str, format: Format) -> Result<Config, String> {
    match format {
        Format::Hcl => hcl::from_str(content).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
