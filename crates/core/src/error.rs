// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared across the build pipeline.

use thiserror::Error;

/// Everything that can go wrong while resolving a target.
///
/// Configuration errors (`UnknownTarget`, `UnknownDep`, `CyclicGraph`,
/// `InvalidJob`) abort the build before any job runs. The remaining
/// variants are per-job: they land in the owning job's error slot and
/// surface to downstream jobs as `FailedDependencies`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("target not found: {0}")]
    UnknownTarget(String),

    #[error("dependency not found: {0}")]
    UnknownDep(String),

    #[error("dependency cycle involving {0}")]
    CyclicGraph(String),

    #[error("invalid job {job}: {rule}")]
    InvalidJob { job: String, rule: String },

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("bad condition {expr:?}: {reason}")]
    BadCondition { expr: String, reason: String },

    #[error("job {job} failed: {reason}")]
    ExecutorFailure { job: String, reason: String },

    /// Backend I/O failures. A blob or manifest that is simply absent is
    /// a cache miss, never this variant.
    #[error("cache i/o: {0}")]
    CacheIo(String),

    #[error("Failed dependencies: [{}]", .0.join(", "))]
    FailedDependencies(Vec<String>),
}
