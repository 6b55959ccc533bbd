// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job fingerprints and file content hashing.

use crate::error::BuildError;
use crate::job::Job;
use sha2::{Digest, Sha256};
use std::io;
use std::path::Path;

/// Graph-node identity for a job name.
pub fn job_id(name: &str) -> i64 {
    i64::from(crc32fast::hash(name.as_bytes()))
}

/// Deterministic hash of a job's semantic content.
///
/// `inputs`, `outputs`, `env` and `deps` are sorted before hashing, so
/// reordering them does not change the fingerprint. `template`, `engine`
/// and the runtime error slot are excluded: re-rendering a job from a
/// different template or moving it between executors must not invalidate
/// its cached outputs.
pub fn fingerprint(job: &Job) -> [u8; 32] {
    let mut hasher = Sha256::new();

    feed(&mut hasher, "name", &job.name);
    feed(&mut hasher, "image", job.image.as_deref().unwrap_or(""));
    feed(&mut hasher, "shell", job.shell.as_deref().unwrap_or(""));
    for arg in job.exec.iter().flatten() {
        feed(&mut hasher, "exec", arg);
    }

    let mut inputs = job.all_inputs();
    inputs.sort();
    for input in &inputs {
        feed(&mut hasher, "input", input);
    }

    let mut outputs = job.all_outputs();
    outputs.sort();
    for output in &outputs {
        feed(&mut hasher, "output", output);
    }

    let mut env: Vec<String> = job
        .env
        .iter()
        .flatten()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    env.sort();
    for pair in &env {
        feed(&mut hasher, "env", pair);
    }

    let mut deps = job.deps.clone().unwrap_or_default();
    deps.sort();
    for dep in &deps {
        feed(&mut hasher, "dep", dep);
    }

    feed(&mut hasher, "condition", job.condition.as_deref().unwrap_or(""));
    feed(&mut hasher, "service", if job.service { "true" } else { "false" });

    hasher.finalize().into()
}

/// Hex form of [`fingerprint`]; the cache key for the job's outputs.
pub fn cache_key(job: &Job) -> String {
    hex::encode(fingerprint(job))
}

/// Hex SHA-256 of a file's bytes. Metadata does not contribute, so the
/// hash is stable across checkouts and cache restores.
pub fn hash_file(path: &Path) -> Result<String, BuildError> {
    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => BuildError::MissingInput(path.display().to_string()),
        _ => BuildError::CacheIo(format!("{}: {e}", path.display())),
    })?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| BuildError::CacheIo(format!("{}: {e}", path.display())))?;

    Ok(hex::encode(hasher.finalize()))
}

// Length-prefixed so adjacent fields can never collide by concatenation.
fn feed(hasher: &mut Sha256, tag: &str, value: &str) {
    hasher.update((tag.len() as u64).to_le_bytes());
    hasher.update(tag.as_bytes());
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
